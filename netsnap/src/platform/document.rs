//! Raw driver definition documents, as deserialized from TOML.
//!
//! These types mirror the file format one to one. [`super::loader`]
//! validates them and compiles every pattern into a
//! [`DriverDefinition`](super::DriverDefinition).

use indexmap::IndexMap;
use serde::Deserialize;

use super::mode::ModeRole;
use crate::model::{AttributeLevel, AttributeType};
use crate::transport::Protocol;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriverDocument {
    pub info: InfoDoc,
    #[serde(default)]
    pub attributes: Vec<AttributeDoc>,
    #[serde(default)]
    pub modes: IndexMap<String, ModeDoc>,
    #[serde(default)]
    pub program: Vec<StepDoc>,
    #[serde(default)]
    pub syslog: Option<SyslogDoc>,
    #[serde(default)]
    pub traps: Vec<TrapDoc>,
    #[serde(default)]
    pub discovery: Option<DiscoveryDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InfoDoc {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub version: String,
    pub protocols: Vec<Protocol>,
    /// Macro run right after connecting; part of authentication.
    pub entry: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeDoc {
    pub level: AttributeLevel,
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: AttributeType,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub comparable: bool,
    pub dump_pre: Option<String>,
    pub dump_pre_line: Option<String>,
    pub dump_post: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModeDoc {
    #[serde(default)]
    pub role: ModeRole,
    pub prompt: Option<String>,
    pub error: Option<String>,
    pub pager: Option<PagerDoc>,
    #[serde(default)]
    pub clear_prompt: bool,
    pub fail: Option<String>,
    pub quit: Option<QuitDoc>,
    #[serde(default)]
    pub macros: IndexMap<String, MacroDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PagerDoc {
    #[serde(rename = "match")]
    pub pattern: String,
    pub response: String,
    #[serde(default)]
    pub avoid: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuitDoc {
    pub keys: String,
    pub back_to: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MacroDoc {
    pub cmd: Option<String>,
    pub options: Vec<String>,
    pub target: Option<String>,
    #[serde(default)]
    pub no_cr: bool,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForEach {
    Interface,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepDoc {
    pub id: String,
    pub command: Option<String>,
    #[serde(rename = "macro")]
    pub macro_name: Option<String>,
    pub snmp_get: Option<String>,
    pub mode: Option<String>,
    #[serde(default)]
    pub no_cr: bool,
    pub timeout_ms: Option<u64>,
    pub max_lines: Option<usize>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub diagnostic: bool,
    pub for_each: Option<ForEach>,
    #[serde(default)]
    pub rules: Vec<RuleDoc>,
    #[serde(default)]
    pub structures: Vec<StructureDoc>,
    #[serde(default)]
    pub interface_fields: Vec<FieldDoc>,
}

/// A capture group, by index or by name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum GroupRef {
    Index(usize),
    Name(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Occurrence {
    #[default]
    First,
    Last,
    Each,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpanDoc {
    pub until: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDoc {
    pub target: String,
    pub pattern: Option<String>,
    pub group: Option<GroupRef>,
    pub template: Option<String>,
    pub sum: Option<Vec<usize>>,
    pub literal: Option<String>,
    pub span: Option<SpanDoc>,
    #[serde(default)]
    pub occurrence: Occurrence,
    pub default: Option<String>,
    pub same_as: Option<String>,
    #[serde(default)]
    pub transforms: Vec<TransformDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifyCaseDoc {
    pub pattern: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformDoc {
    Trim,
    Unquote,
    StripPrefix {
        prefix: String,
    },
    Replace {
        pattern: String,
        #[serde(default)]
        with: String,
    },
    Divide {
        by: f64,
    },
    Round,
    Classify {
        cases: Vec<ClassifyCaseDoc>,
        otherwise: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureKind {
    Module,
    Interface,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionMode {
    /// From one start match to the next.
    #[default]
    UntilNext,
    /// The start line plus the following indented lines.
    Indented,
    /// Every line whose start capture `name` has the same value.
    Grouped,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructureDoc {
    pub kind: StructureKind,
    pub start: String,
    #[serde(default)]
    pub section: SectionMode,
    #[serde(default)]
    pub fields: Vec<FieldDoc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDoc {
    pub field: Option<String>,
    pub address: Option<AddressFamily>,
    pub pattern: Option<String>,
    pub group: Option<GroupRef>,
    pub literal: Option<String>,
    #[serde(default)]
    pub transforms: Vec<TransformDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyslogDoc {
    pub patterns: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrapDoc {
    pub oid_prefix: String,
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscoveryDoc {
    #[serde(default)]
    pub sys_object_id: Vec<String>,
    pub sys_descr: Option<String>,
}
