//! Driver definition loading and validation.
//!
//! A definition is parsed from TOML, then checked as a whole: every
//! pattern must compile, every mode referenced by a macro or a step must
//! exist, and every rule must target a built-in field or an attribute the
//! driver declares at that level. A definition that fails any check is
//! rejected, never partially loaded.

use std::collections::HashSet;
use std::time::Duration;

use indexmap::IndexMap;
use log::debug;
use regex::Regex;

use super::attribute::{AttributeDefinition, DumpHints};
use super::definition::{DiscoveryRule, DriverDefinition, DriverInfo, TrapRule};
use super::document::{
    DriverDocument, FieldDoc, GroupRef, ModeDoc, RuleDoc, StepDoc, StructureDoc, TransformDoc,
};
use super::mode::{CliMode, MacroDef, Pager, ViewerQuit};
use super::rules::{
    Capture, ExtractionRule, FieldRule, ProgramStep, SectionMode, StepAction, StructField,
    StructureKind, StructureRule, Target, Transform,
};
use crate::channel::{CompiledPrompt, compile_text_pattern};
use crate::error::PlatformError;
use crate::model::{AttributeLevel, AttributeType, DeviceField};

/// Parse and compile one driver document.
pub fn parse_definition(text: &str, origin: &str) -> Result<DriverDefinition, PlatformError> {
    let doc: DriverDocument = toml::from_str(text).map_err(|e| PlatformError::Parse {
        origin: origin.to_owned(),
        message: e.to_string(),
    })?;
    let definition = Compiler {
        driver: doc.info.name.clone(),
        attributes: Vec::new(),
    }
    .compile(doc, origin)?;
    debug!(
        "Loaded driver {} {} from {} ({} modes, {} steps)",
        definition.info.name,
        definition.info.version,
        origin,
        definition.modes.len(),
        definition.program.len()
    );
    Ok(definition)
}

struct Compiler {
    driver: String,
    attributes: Vec<AttributeDefinition>,
}

impl Compiler {
    fn invalid(&self, message: impl Into<String>) -> PlatformError {
        PlatformError::InvalidDefinition {
            driver: self.driver.clone(),
            message: message.into(),
        }
    }

    fn regex(&self, what: &str, pattern: &str) -> Result<Regex, PlatformError> {
        compile_text_pattern(pattern).map_err(|e| self.invalid(format!("{what}: {e}")))
    }

    fn prompt(&self, what: &str, pattern: &str) -> Result<CompiledPrompt, PlatformError> {
        CompiledPrompt::new(pattern).map_err(|e| self.invalid(format!("{what}: {e}")))
    }

    fn compile(mut self, doc: DriverDocument, origin: &str) -> Result<DriverDefinition, PlatformError> {
        if doc.info.name.trim().is_empty() {
            return Err(self.invalid("empty driver name"));
        }
        if doc.info.protocols.is_empty() {
            return Err(self.invalid("no protocol declared"));
        }

        self.attributes = self.compile_attributes(&doc)?;
        let modes = self.compile_modes(doc.modes)?;

        for protocol in doc.info.protocols.iter().filter(|p| p.is_cli()) {
            let entry = modes
                .get(protocol.as_str())
                .ok_or_else(|| self.invalid(format!("no entry mode for protocol {protocol}")))?;
            if entry.get_macro(&doc.info.entry).is_none() {
                return Err(self.invalid(format!(
                    "entry mode '{protocol}' has no macro '{}'",
                    doc.info.entry
                )));
            }
        }

        let mut ids = HashSet::new();
        let mut program = Vec::with_capacity(doc.program.len());
        for step in doc.program {
            if !ids.insert(step.id.clone()) {
                return Err(self.invalid(format!("duplicate step id '{}'", step.id)));
            }
            program.push(self.compile_step(step, &modes)?);
        }

        let syslog = match &doc.syslog {
            Some(s) => s
                .patterns
                .iter()
                .map(|p| self.regex("syslog pattern", p))
                .collect::<Result<_, _>>()?,
            None => Vec::new(),
        };
        let traps = doc
            .traps
            .into_iter()
            .map(|t| TrapRule {
                oid_prefix: t.oid_prefix,
                value: t.value,
            })
            .collect();
        let discovery = match doc.discovery {
            Some(d) => {
                if d.sys_object_id.is_empty() && d.sys_descr.is_none() {
                    return Err(self.invalid("discovery rule without criteria"));
                }
                Some(DiscoveryRule {
                    sys_object_id: d.sys_object_id,
                    sys_descr: d
                        .sys_descr
                        .as_deref()
                        .map(|p| self.regex("discovery sys_descr", p))
                        .transpose()?,
                })
            }
            None => None,
        };

        Ok(DriverDefinition {
            info: DriverInfo {
                name: doc.info.name,
                description: doc.info.description,
                author: doc.info.author,
                version: doc.info.version,
                protocols: doc.info.protocols,
                entry: doc.info.entry,
            },
            attributes: self.attributes,
            modes,
            program,
            syslog,
            traps,
            discovery,
            origin: origin.to_owned(),
        })
    }

    fn compile_attributes(&self, doc: &DriverDocument) -> Result<Vec<AttributeDefinition>, PlatformError> {
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(doc.attributes.len());
        for attr in &doc.attributes {
            let builtin = match attr.level {
                AttributeLevel::Device => DeviceField::from_name(&attr.name).is_some(),
                AttributeLevel::Config => attr.name == "author",
                AttributeLevel::Interface | AttributeLevel::Module => false,
            };
            if builtin {
                return Err(self.invalid(format!(
                    "attribute '{}' shadows a built-in {} field",
                    attr.name, attr.level
                )));
            }
            if !seen.insert((attr.level, attr.name.clone())) {
                return Err(self.invalid(format!(
                    "attribute '{}' declared twice at level {}",
                    attr.name, attr.level
                )));
            }
            out.push(AttributeDefinition {
                level: attr.level,
                name: attr.name.clone(),
                value_type: attr.value_type,
                title: if attr.title.is_empty() {
                    attr.name.clone()
                } else {
                    attr.title.clone()
                },
                comparable: attr.comparable,
                dump: DumpHints {
                    pre: attr.dump_pre.clone(),
                    pre_line: attr.dump_pre_line.clone(),
                    post: attr.dump_post.clone(),
                },
            });
        }
        Ok(out)
    }

    fn compile_modes(&self, docs: IndexMap<String, ModeDoc>) -> Result<IndexMap<String, CliMode>, PlatformError> {
        let names: HashSet<&str> = docs.keys().map(String::as_str).collect();
        let prompted: HashSet<&str> = docs
            .iter()
            .filter(|(_, m)| m.prompt.is_some())
            .map(|(n, _)| n.as_str())
            .collect();

        let mut modes = IndexMap::with_capacity(docs.len());
        for (name, doc) in &docs {
            let mut mode = CliMode::new(name.clone(), doc.role);
            mode.prompt = doc
                .prompt
                .as_deref()
                .map(|p| self.prompt(&format!("prompt of mode '{name}'"), p))
                .transpose()?;
            mode.error = doc
                .error
                .as_deref()
                .map(|p| self.regex(&format!("error pattern of mode '{name}'"), p))
                .transpose()?;
            mode.pager = match &doc.pager {
                Some(p) => Some(Pager {
                    pattern: self.prompt(&format!("pager of mode '{name}'"), &p.pattern)?,
                    response: p.response.clone(),
                    avoid: p.avoid.clone(),
                }),
                None => None,
            };
            mode.clear_prompt = doc.clear_prompt;
            mode.fail = doc.fail.clone();

            if let Some(quit) = &doc.quit {
                if !prompted.contains(quit.back_to.as_str()) {
                    return Err(self.invalid(format!(
                        "viewer '{name}' returns to '{}', which is not a prompted mode",
                        quit.back_to
                    )));
                }
                if mode.prompt.is_none() {
                    return Err(self.invalid(format!("viewer '{name}' has no prompt")));
                }
                mode.quit = Some(ViewerQuit {
                    keys: quit.keys.clone(),
                    back_to: quit.back_to.clone(),
                });
            }

            for (macro_name, m) in &doc.macros {
                if m.options.is_empty() {
                    return Err(self.invalid(format!("macro '{name}.{macro_name}' has no options")));
                }
                for option in &m.options {
                    if !prompted.contains(option.as_str()) {
                        return Err(self.invalid(format!(
                            "macro '{name}.{macro_name}' waits for '{option}', which is not a prompted mode"
                        )));
                    }
                }
                if m.target.is_none() && macro_name != "auto" {
                    return Err(self.invalid(format!("macro '{name}.{macro_name}' has no target")));
                }
                if let Some(target) = &m.target {
                    if !names.contains(target.as_str()) {
                        return Err(self.invalid(format!(
                            "macro '{name}.{macro_name}' targets unknown mode '{target}'"
                        )));
                    }
                }
                mode.macros.insert(
                    macro_name.clone(),
                    MacroDef {
                        cmd: m.cmd.clone(),
                        options: m.options.clone(),
                        target: m.target.clone(),
                        no_cr: m.no_cr,
                        timeout: m.timeout_ms.map(Duration::from_millis),
                    },
                );
            }
            modes.insert(name.clone(), mode);
        }
        Ok(modes)
    }

    fn compile_step(&self, doc: StepDoc, modes: &IndexMap<String, CliMode>) -> Result<ProgramStep, PlatformError> {
        let id = doc.id.clone();
        let action = match (doc.command, doc.macro_name, doc.snmp_get) {
            (Some(c), None, None) => StepAction::Command(c),
            (None, Some(m), None) => {
                if !modes.values().any(|mode| mode.get_macro(&m).is_some()) {
                    return Err(self.invalid(format!("step '{id}' runs unknown macro '{m}'")));
                }
                StepAction::Macro(m)
            }
            (None, None, Some(oid)) => StepAction::SnmpGet(oid),
            _ => {
                return Err(self.invalid(format!(
                    "step '{id}' needs exactly one of command, macro, snmp_get"
                )));
            }
        };

        if let Some(mode) = &doc.mode {
            if !modes.get(mode).is_some_and(|m| m.prompt.is_some()) {
                return Err(self.invalid(format!("step '{id}' runs in unknown mode '{mode}'")));
            }
        }
        if doc.for_each.is_some() {
            let templated = matches!(&action, StepAction::Command(c) if c.contains("{name}"));
            if !templated {
                return Err(self.invalid(format!("for_each step '{id}' needs a command with {{name}}")));
            }
        } else if !doc.interface_fields.is_empty() {
            return Err(self.invalid(format!("step '{id}' has interface_fields without for_each")));
        }

        let rules = doc
            .rules
            .into_iter()
            .map(|r| self.compile_rule(&id, r))
            .collect::<Result<_, _>>()?;
        let structures = doc
            .structures
            .into_iter()
            .map(|s| self.compile_structure(&id, s))
            .collect::<Result<_, _>>()?;
        let interface_fields = doc
            .interface_fields
            .into_iter()
            .map(|f| self.compile_field(&id, StructureKind::Interface, None, f))
            .collect::<Result<_, _>>()?;

        Ok(ProgramStep {
            id,
            action,
            mode: doc.mode,
            no_cr: doc.no_cr,
            timeout: doc.timeout_ms.map(Duration::from_millis),
            max_lines: doc.max_lines,
            optional: doc.optional,
            diagnostic: doc.diagnostic,
            for_each: doc.for_each,
            rules,
            structures,
            interface_fields,
        })
    }

    fn resolve_target(&self, step: &str, target: &str) -> Result<(Target, AttributeType), PlatformError> {
        let unknown = || self.invalid(format!("step '{step}': unknown target '{target}'"));
        let (level, name) = target.split_once('.').ok_or_else(unknown)?;
        match level {
            "device" => {
                if let Some(field) = DeviceField::from_name(name) {
                    return Ok((Target::Device(field), AttributeType::Text));
                }
                let attr = self
                    .declared(AttributeLevel::Device, name)
                    .ok_or_else(unknown)?;
                Ok((Target::DeviceAttribute(name.to_owned()), attr.value_type))
            }
            "config" => {
                if name == "author" {
                    return Ok((Target::ConfigAuthor, AttributeType::Text));
                }
                let attr = self
                    .declared(AttributeLevel::Config, name)
                    .ok_or_else(unknown)?;
                Ok((Target::ConfigAttribute(name.to_owned()), attr.value_type))
            }
            _ => Err(unknown()),
        }
    }

    fn declared(&self, level: AttributeLevel, name: &str) -> Option<&AttributeDefinition> {
        self.attributes
            .iter()
            .find(|a| a.level == level && a.name == name)
    }

    fn compile_rule(&self, step: &str, doc: RuleDoc) -> Result<ExtractionRule, PlatformError> {
        let (target, value_type) = self.resolve_target(step, &doc.target)?;
        let what = format!("step '{step}' rule for '{}'", doc.target);
        let pattern = doc
            .pattern
            .as_deref()
            .map(|p| self.regex(&what, p))
            .transpose()?;

        let forms = [
            doc.group.is_some(),
            doc.template.is_some(),
            doc.sum.is_some(),
            doc.literal.is_some(),
            doc.span.is_some(),
        ];
        if forms.iter().filter(|set| **set).count() > 1 {
            return Err(self.invalid(format!("{what}: more than one capture form")));
        }

        let capture = if let Some(group) = doc.group {
            Capture::Group(group)
        } else if let Some(template) = doc.template {
            Capture::Template(template)
        } else if let Some(sum) = doc.sum {
            Capture::Sum(sum)
        } else if let Some(literal) = doc.literal {
            Capture::Literal(literal)
        } else if let Some(span) = doc.span {
            Capture::Span {
                until: span
                    .until
                    .as_deref()
                    .map(|p| self.regex(&what, p))
                    .transpose()?,
            }
        } else if pattern.as_ref().is_some_and(|p| p.captures_len() > 1) {
            Capture::Group(GroupRef::Index(1))
        } else {
            Capture::Whole
        };

        match (&pattern, &capture) {
            (None, Capture::Group(_) | Capture::Template(_) | Capture::Sum(_) | Capture::Span { .. }) => {
                return Err(self.invalid(format!("{what}: capture needs a pattern")));
            }
            (Some(p), Capture::Group(g)) => self.check_group(&what, p, g)?,
            (Some(p), Capture::Sum(groups)) => {
                for g in groups {
                    self.check_group(&what, p, &GroupRef::Index(*g))?;
                }
                if value_type != AttributeType::Numeric {
                    return Err(self.invalid(format!("{what}: sum needs a numeric target")));
                }
            }
            _ => {}
        }

        if let Some(other) = &doc.same_as {
            if value_type != AttributeType::Binary {
                return Err(self.invalid(format!("{what}: same_as needs a binary target")));
            }
            let known = self.declared(AttributeLevel::Device, other).is_some()
                || self.declared(AttributeLevel::Config, other).is_some();
            if !known {
                return Err(self.invalid(format!("{what}: same_as refers to unknown '{other}'")));
            }
        }

        Ok(ExtractionRule {
            target,
            value_type,
            pattern,
            capture,
            occurrence: doc.occurrence,
            default: doc.default,
            same_as: doc.same_as,
            transforms: self.compile_transforms(&what, doc.transforms)?,
        })
    }

    fn check_group(&self, what: &str, pattern: &Regex, group: &GroupRef) -> Result<(), PlatformError> {
        let ok = match group {
            GroupRef::Index(i) => *i < pattern.captures_len(),
            GroupRef::Name(n) => pattern.capture_names().flatten().any(|c| c == n),
        };
        if ok {
            Ok(())
        } else {
            Err(self.invalid(format!("{what}: pattern has no group {group:?}")))
        }
    }

    fn compile_transforms(&self, what: &str, docs: Vec<TransformDoc>) -> Result<Vec<Transform>, PlatformError> {
        docs.into_iter()
            .map(|doc| {
                Ok(match doc {
                    TransformDoc::Trim => Transform::Trim,
                    TransformDoc::Unquote => Transform::Unquote,
                    TransformDoc::StripPrefix { prefix } => Transform::StripPrefix(prefix),
                    TransformDoc::Replace { pattern, with } => Transform::Replace {
                        pattern: self.regex(what, &pattern)?,
                        with,
                    },
                    TransformDoc::Divide { by } => {
                        if by == 0.0 || !by.is_finite() {
                            return Err(self.invalid(format!("{what}: invalid divisor {by}")));
                        }
                        Transform::Divide(by)
                    }
                    TransformDoc::Round => Transform::Round,
                    TransformDoc::Classify { cases, otherwise } => Transform::Classify {
                        cases: cases
                            .into_iter()
                            .map(|c| Ok((self.regex(what, &c.pattern)?, c.value)))
                            .collect::<Result<_, PlatformError>>()?,
                        otherwise,
                    },
                })
            })
            .collect()
    }

    fn compile_structure(&self, step: &str, doc: StructureDoc) -> Result<StructureRule, PlatformError> {
        let what = format!("step '{step}' {:?} structure", doc.kind);
        let start = self.regex(&what, &doc.start)?;
        let named: HashSet<&str> = start.capture_names().flatten().collect();

        let key = match doc.kind {
            StructureKind::Interface => "name",
            StructureKind::Module => "slot",
        };
        let key_field = doc.fields.iter().any(|f| f.field.as_deref() == Some(key));
        if !named.contains(key) && !key_field {
            return Err(self.invalid(format!("{what}: no way to capture '{key}'")));
        }
        if doc.section == SectionMode::Grouped && !named.contains(key) {
            return Err(self.invalid(format!("{what}: grouped sections need a '{key}' start group")));
        }

        let fields = doc
            .fields
            .into_iter()
            .map(|f| self.compile_field(step, doc.kind, Some(&start), f))
            .collect::<Result<_, _>>()?;
        Ok(StructureRule {
            kind: doc.kind,
            start,
            section: doc.section,
            fields,
        })
    }

    fn compile_field(
        &self,
        step: &str,
        kind: StructureKind,
        start: Option<&Regex>,
        doc: FieldDoc,
    ) -> Result<FieldRule, PlatformError> {
        let field = match (&doc.field, doc.address) {
            (Some(name), None) => StructField::from_name(kind, name)
                .or_else(|| {
                    let level = match kind {
                        StructureKind::Interface => AttributeLevel::Interface,
                        StructureKind::Module => AttributeLevel::Module,
                    };
                    self.declared(level, name)
                        .map(|_| StructField::Attribute(name.clone()))
                })
                .ok_or_else(|| self.invalid(format!("step '{step}': unknown {kind:?} field '{name}'")))?,
            (None, Some(family)) if kind == StructureKind::Interface => StructField::Address(family),
            _ => {
                return Err(self.invalid(format!(
                    "step '{step}': a {kind:?} field needs exactly one of field, address"
                )));
            }
        };
        let what = format!("step '{step}' field {field:?}");
        let pattern = doc
            .pattern
            .as_deref()
            .map(|p| self.regex(&what, p))
            .transpose()?;

        if let StructField::Address(_) = field {
            let groups: HashSet<&str> = pattern
                .as_ref()
                .or(start)
                .map(|p| p.capture_names().flatten().collect())
                .unwrap_or_default();
            // Without mask or prefix the address is a host route.
            if !groups.contains("ip") {
                return Err(self.invalid(format!("{what}: needs an 'ip' group")));
            }
        } else if pattern.is_none() && doc.literal.is_none() && start.is_none() {
            return Err(self.invalid(format!("{what}: needs a pattern or a literal")));
        }
        if let (Some(p), Some(g)) = (&pattern, &doc.group) {
            self.check_group(&what, p, g)?;
        }

        Ok(FieldRule {
            field,
            pattern,
            group: doc.group,
            literal: doc.literal,
            transforms: self.compile_transforms(&what, doc.transforms)?,
        })
    }
}
