//! Repeated structures: interfaces and modules.
//!
//! Every match of a structure's start pattern opens a section of the
//! output. Named groups of the start match fill the fields they are named
//! after, then the field rules are evaluated against the section text.

use indexmap::IndexMap;
use regex::{Captures, Regex};

use super::Extractor;
use super::rules::{default_group, group};
use super::value::{apply_transforms, coerce, parse_bool};
use crate::model::{
    AddressUsage, AttributeLevel, InterfaceAddress, MacAddress, NetworkInterface, ObservedModule,
};
use crate::platform::{AddressFamily, FieldRule, SectionMode, StructField, StructureKind, StructureRule};

/// Named start captures that participated in the match.
type Named = IndexMap<String, String>;

struct Section {
    start: Named,
    text: String,
}

/// The structure being filled.
enum Draft {
    Interface(NetworkInterface),
    Module(ObservedModule),
}

impl Draft {
    fn new(kind: StructureKind) -> Self {
        match kind {
            StructureKind::Interface => Draft::Interface(NetworkInterface::new("")),
            StructureKind::Module => Draft::Module(ObservedModule::default()),
        }
    }
}

fn named_captures(pattern: &Regex, caps: &Captures<'_>) -> Named {
    pattern
        .capture_names()
        .flatten()
        .filter_map(|name| caps.name(name).map(|m| (name.to_owned(), m.as_str().to_owned())))
        .collect()
}

fn line_bounds(text: &str, at: usize) -> (usize, usize) {
    let start = text[..at].rfind('\n').map_or(0, |p| p + 1);
    let end = text[at..].find('\n').map_or(text.len(), |p| at + p);
    (start, end)
}

fn sections(rule: &StructureRule, output: &str) -> Vec<Section> {
    let starts: Vec<Captures<'_>> = rule.start.captures_iter(output).collect();
    match rule.section {
        SectionMode::UntilNext => starts
            .iter()
            .enumerate()
            .filter_map(|(i, caps)| {
                let whole = caps.get(0)?;
                let end = starts
                    .get(i + 1)
                    .and_then(|next| next.get(0))
                    .map_or(output.len(), |m| m.start());
                Some(Section {
                    start: named_captures(&rule.start, caps),
                    text: output[whole.end()..end.max(whole.end())].to_owned(),
                })
            })
            .collect(),
        SectionMode::Indented => starts
            .iter()
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let (begin, mut end) = line_bounds(output, whole.start());
                end = end.max(line_bounds(output, whole.end()).1);
                while end < output.len() {
                    let (_, next_end) = line_bounds(output, end + 1);
                    let line = &output[end + 1..next_end];
                    if line.trim().is_empty() || !line.starts_with([' ', '\t']) {
                        break;
                    }
                    end = next_end;
                }
                Some(Section {
                    start: named_captures(&rule.start, caps),
                    text: output[begin..end].to_owned(),
                })
            })
            .collect(),
        SectionMode::Grouped => {
            let key = match rule.kind {
                StructureKind::Interface => "name",
                StructureKind::Module => "slot",
            };
            let mut groups: IndexMap<String, Section> = IndexMap::new();
            for caps in &starts {
                let (Some(whole), Some(id)) = (caps.get(0), caps.name(key)) else {
                    continue;
                };
                let (begin, end) = line_bounds(output, whole.start());
                let line = &output[begin..end];
                let section = groups.entry(id.as_str().to_owned()).or_insert_with(|| Section {
                    start: named_captures(&rule.start, caps),
                    text: String::new(),
                });
                section.text.push_str(line);
                section.text.push('\n');
            }
            groups.into_values().collect()
        }
    }
}

fn field_name(field: &StructField) -> &str {
    match field {
        StructField::Name => "name",
        StructField::Description => "description",
        StructField::Vrf => "vrf",
        StructField::Mac => "mac",
        StructField::Enabled => "enabled",
        StructField::Level3 => "level3",
        StructField::VirtualDevice => "virtual_device",
        StructField::Slot => "slot",
        StructField::PartNumber => "part_number",
        StructField::SerialNumber => "serial_number",
        StructField::Address(AddressFamily::Ipv4) => "ipv4",
        StructField::Address(AddressFamily::Ipv6) => "ipv6",
        StructField::Attribute(name) => name,
    }
}

/// Build an address from `ip` plus `mask` or `prefix` groups.
fn address(family: AddressFamily, groups: &Named) -> Result<InterfaceAddress, String> {
    let ip = groups.get("ip").map(|s| s.trim()).unwrap_or_default();
    let parsed = if let Some(mask) = groups.get("mask") {
        InterfaceAddress::parse_mask(ip, mask)
    } else if let Some(prefix) = groups.get("prefix") {
        InterfaceAddress::parse_prefix(ip, prefix)
    } else {
        let host = match family {
            AddressFamily::Ipv4 => "32",
            AddressFamily::Ipv6 => "128",
        };
        InterfaceAddress::parse_prefix(ip, host)
    };
    let parsed = parsed.ok_or_else(|| format!("invalid address '{ip}'"))?;
    if parsed.address.is_ipv4() != (family == AddressFamily::Ipv4) {
        return Err(format!("'{ip}' is not an {family:?} address"));
    }

    let usage = match groups.get("usage").map(|u| u.trim().to_ascii_lowercase()).as_deref() {
        Some("standby" | "hsrp" | "glbp") => AddressUsage::Hsrp,
        Some("vrrp") => AddressUsage::Vrrp,
        _ if groups.get("secondary").is_some_and(|s| !s.trim().is_empty()) => AddressUsage::Secondary,
        _ => AddressUsage::Primary,
    };
    Ok(parsed.with_usage(usage))
}

impl Extractor<'_> {
    pub(super) fn apply_structure(&mut self, step: &str, rule: &StructureRule, output: &str) {
        for section in sections(rule, output) {
            let mut draft = Draft::new(rule.kind);
            for (name, value) in &section.start {
                let field = StructField::from_name(rule.kind, name)
                    .or_else(|| self.declared_field(rule.kind, name));
                if let Some(field) = field {
                    self.set_field(step, &mut draft, &field, value.clone());
                }
            }
            for field in &rule.fields {
                self.apply_field(step, &mut draft, field, &section.text, &section.start);
            }
            self.commit(step, draft);
        }
    }

    pub(super) fn apply_interface_fields(
        &mut self,
        step: &str,
        fields: &[FieldRule],
        interface: &str,
        output: &str,
    ) {
        let Some(index) = self
            .extracted
            .interfaces
            .iter()
            .position(|i| i.name == interface)
        else {
            self.warn(step, "interface", format!("no interface named '{interface}'"));
            return;
        };
        let mut draft = Draft::Interface(self.extracted.interfaces[index].clone());
        let start = Named::from([("name".to_owned(), interface.to_owned())]);
        for field in fields {
            self.apply_field(step, &mut draft, field, output, &start);
        }
        if let Draft::Interface(updated) = draft {
            self.extracted.interfaces[index] = updated;
        }
    }

    fn declared_field(&self, kind: StructureKind, name: &str) -> Option<StructField> {
        let level = match kind {
            StructureKind::Interface => AttributeLevel::Interface,
            StructureKind::Module => AttributeLevel::Module,
        };
        self.definition
            .attribute(level, name)
            .map(|_| StructField::Attribute(name.to_owned()))
    }

    fn apply_field(&mut self, step: &str, draft: &mut Draft, rule: &FieldRule, text: &str, start: &Named) {
        if let StructField::Address(family) = &rule.field {
            let found: Vec<Named> = match &rule.pattern {
                Some(pattern) => pattern
                    .captures_iter(text)
                    .map(|caps| named_captures(pattern, &caps))
                    .collect(),
                None if start.contains_key("ip") => vec![start.clone()],
                None => Vec::new(),
            };
            for groups in found {
                match (address(*family, &groups), &mut *draft) {
                    (Ok(address), Draft::Interface(interface)) => interface.addresses.push(address),
                    (Ok(_), Draft::Module(_)) => {}
                    (Err(message), _) => self.warn(step, field_name(&rule.field), message),
                }
            }
            return;
        }

        let value = match (&rule.pattern, &rule.literal) {
            (Some(pattern), literal) => {
                let Some(caps) = pattern.captures(text) else {
                    return;
                };
                match literal {
                    Some(literal) => literal.clone(),
                    None => {
                        let g = rule.group.clone().unwrap_or_else(|| default_group(pattern));
                        match group(&caps, &g) {
                            Some(m) => m.as_str().to_owned(),
                            None => return,
                        }
                    }
                }
            }
            (None, Some(literal)) => literal.clone(),
            (None, None) => match start.get(field_name(&rule.field)) {
                Some(value) => value.clone(),
                None => return,
            },
        };
        match apply_transforms(value, &rule.transforms) {
            Ok(value) => self.set_field(step, draft, &rule.field, value),
            Err(message) => self.warn(step, field_name(&rule.field), message),
        }
    }

    fn set_field(&mut self, step: &str, draft: &mut Draft, field: &StructField, value: String) {
        let text = value.trim().to_owned();
        let result: Result<(), String> = match (draft, field) {
            (Draft::Interface(i), StructField::Name) => {
                i.name = text;
                Ok(())
            }
            (Draft::Interface(i), StructField::Description) => {
                i.description = text;
                Ok(())
            }
            (Draft::Interface(i), StructField::Vrf) => {
                i.vrf = text;
                Ok(())
            }
            (Draft::Interface(i), StructField::VirtualDevice) => {
                i.virtual_device = text;
                Ok(())
            }
            (Draft::Interface(i), StructField::Mac) => text.parse::<MacAddress>().map(|mac| {
                i.mac_address = Some(mac);
            }),
            (Draft::Interface(i), StructField::Enabled) => match parse_bool(&text) {
                Some(flag) => {
                    i.enabled = flag;
                    Ok(())
                }
                None => Err(format!("'{text}' is not a boolean")),
            },
            (Draft::Interface(i), StructField::Level3) => match parse_bool(&text) {
                Some(flag) => {
                    i.level3 = flag;
                    Ok(())
                }
                None => Err(format!("'{text}' is not a boolean")),
            },
            (Draft::Interface(i), StructField::Attribute(name)) => {
                self.typed(AttributeLevel::Interface, name, &value)
                    .map(|v| {
                        i.attributes.insert(name.clone(), v);
                    })
            }
            (Draft::Module(m), StructField::Slot) => {
                m.slot = text;
                Ok(())
            }
            (Draft::Module(m), StructField::PartNumber) => {
                m.part_number = text;
                Ok(())
            }
            (Draft::Module(m), StructField::SerialNumber) => {
                m.serial_number = text;
                Ok(())
            }
            (Draft::Module(m), StructField::Attribute(name)) => {
                self.typed(AttributeLevel::Module, name, &value).map(|v| {
                    m.attributes.insert(name.clone(), v);
                })
            }
            _ => Err("field does not apply to this structure".to_owned()),
        };
        if let Err(message) = result {
            self.warn(step, field_name(field), message);
        }
    }

    fn typed(&self, level: AttributeLevel, name: &str, value: &str) -> Result<crate::model::AttributeValue, String> {
        let definition = self
            .definition
            .attribute(level, name)
            .ok_or_else(|| format!("undeclared {level} attribute"))?;
        coerce(value, definition.value_type)
    }

    /// Keep a finished structure, merging interfaces that share a name.
    fn commit(&mut self, step: &str, draft: Draft) {
        match draft {
            Draft::Interface(interface) => {
                if interface.name.is_empty() {
                    self.warn(step, "interface", "structure without a name");
                    return;
                }
                match self
                    .extracted
                    .interfaces
                    .iter_mut()
                    .find(|i| i.name == interface.name)
                {
                    Some(existing) => merge_interface(existing, interface),
                    None => self.extracted.interfaces.push(interface),
                }
            }
            Draft::Module(module) => {
                if module.slot.is_empty() {
                    self.warn(step, "module", "structure without a slot");
                    return;
                }
                self.extracted.modules.push(module);
            }
        }
    }
}

fn merge_interface(existing: &mut NetworkInterface, other: NetworkInterface) {
    let keep = |current: &mut String, new: String| {
        if !new.is_empty() {
            *current = new;
        }
    };
    keep(&mut existing.description, other.description);
    keep(&mut existing.vrf, other.vrf);
    keep(&mut existing.virtual_device, other.virtual_device);
    if other.mac_address.is_some() {
        existing.mac_address = other.mac_address;
    }
    existing.enabled &= other.enabled;
    existing.level3 &= other.level3;
    existing.addresses.extend(other.addresses);
    existing.attributes.extend(other.attributes);
}
