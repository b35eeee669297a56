//! Compiled command program and extraction rules.

use std::time::Duration;

use regex::Regex;

pub use super::document::{AddressFamily, ForEach, GroupRef, Occurrence, SectionMode, StructureKind};
use crate::model::{AttributeType, DeviceField};

/// Where an extracted value goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Device(DeviceField),
    DeviceAttribute(String),
    ConfigAuthor,
    ConfigAttribute(String),
}

/// How a matched value is taken out of a match.
#[derive(Debug, Clone)]
pub enum Capture {
    Group(GroupRef),
    /// `$1`, `${name}` style expansion of the match.
    Template(String),
    /// Sum of numeric groups (unmatched groups count as zero).
    Sum(Vec<usize>),
    /// Fixed value when the pattern matches.
    Literal(String),
    /// From the match start to the next match of `until` (or the end).
    Span { until: Option<Regex> },
    /// The whole match.
    Whole,
}

/// Text transforms applied to a captured value, in order.
#[derive(Debug, Clone)]
pub enum Transform {
    Trim,
    /// Drop surrounding double quotes and the padding inside them.
    Unquote,
    StripPrefix(String),
    Replace { pattern: Regex, with: String },
    Divide(f64),
    Round,
    /// Map to the value of the first case whose pattern matches.
    Classify {
        cases: Vec<(Regex, String)>,
        otherwise: Option<String>,
    },
}

/// One extraction rule of a step.
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    pub target: Target,
    /// Type of the target, resolved from the attribute schema.
    pub value_type: AttributeType,
    /// `None` means the whole output is the match.
    pub pattern: Option<Regex>,
    pub capture: Capture,
    pub occurrence: Occurrence,
    pub default: Option<String>,
    /// Binary targets: whether the value equals another attribute's value.
    pub same_as: Option<String>,
    pub transforms: Vec<Transform>,
}

/// A field of a repeated structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructField {
    Name,
    Description,
    Vrf,
    Mac,
    Enabled,
    Level3,
    VirtualDevice,
    Slot,
    PartNumber,
    SerialNumber,
    Address(AddressFamily),
    Attribute(String),
}

impl StructField {
    /// Resolve a field name for a structure kind.
    pub fn from_name(kind: StructureKind, name: &str) -> Option<Self> {
        let field = match (kind, name) {
            (StructureKind::Interface, "name") => StructField::Name,
            (StructureKind::Interface, "description") => StructField::Description,
            (StructureKind::Interface, "vrf") => StructField::Vrf,
            (StructureKind::Interface, "mac") => StructField::Mac,
            (StructureKind::Interface, "enabled") => StructField::Enabled,
            (StructureKind::Interface, "level3") => StructField::Level3,
            (StructureKind::Interface, "virtual_device") => StructField::VirtualDevice,
            (StructureKind::Module, "slot") => StructField::Slot,
            (StructureKind::Module, "part_number") => StructField::PartNumber,
            (StructureKind::Module, "serial_number") => StructField::SerialNumber,
            _ => return None,
        };
        Some(field)
    }
}

#[derive(Debug, Clone)]
pub struct FieldRule {
    pub field: StructField,
    /// Searched in the structure section; `None` takes the start capture
    /// named after the field.
    pub pattern: Option<Regex>,
    pub group: Option<GroupRef>,
    pub literal: Option<String>,
    pub transforms: Vec<Transform>,
}

/// A repeated structure (modules, interfaces).
#[derive(Debug, Clone)]
pub struct StructureRule {
    pub kind: StructureKind,
    pub start: Regex,
    pub section: SectionMode,
    pub fields: Vec<FieldRule>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    Command(String),
    Macro(String),
    SnmpGet(String),
}

/// One step of the snapshot program.
#[derive(Debug, Clone)]
pub struct ProgramStep {
    pub id: String,
    pub action: StepAction,
    /// Mode the command runs in (a viewer, or a mode reached by macro).
    pub mode: Option<String>,
    pub no_cr: bool,
    pub timeout: Option<Duration>,
    pub max_lines: Option<usize>,
    /// A rejection is recorded instead of failing the run.
    pub optional: bool,
    /// Skipped when the caller asks to skip diagnostics.
    pub diagnostic: bool,
    /// Run once per collected interface, `{name}` substituted.
    pub for_each: Option<ForEach>,
    pub rules: Vec<ExtractionRule>,
    pub structures: Vec<StructureRule>,
    /// Rules applied to the current interface of a `for_each` step.
    pub interface_fields: Vec<FieldRule>,
}
