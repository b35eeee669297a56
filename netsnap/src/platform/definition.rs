//! Compiled driver definition.

use indexmap::IndexMap;
use regex::Regex;

use super::attribute::AttributeDefinition;
use super::mode::CliMode;
use super::rules::ProgramStep;
use crate::error::CliError;
use crate::model::AttributeLevel;
use crate::transport::Protocol;

/// Descriptive header of a driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverInfo {
    /// Stable lookup name (e.g. "CiscoIOS12").
    pub name: String,
    pub description: String,
    pub author: String,
    pub version: String,
    /// Protocols in preferred order.
    pub protocols: Vec<Protocol>,
    /// Macro run right after connecting.
    pub entry: String,
}

/// Trap varbind that signals a configuration change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrapRule {
    pub oid_prefix: String,
    pub value: Option<String>,
}

/// SNMP auto-discovery rule.
#[derive(Debug, Clone)]
pub struct DiscoveryRule {
    pub sys_object_id: Vec<String>,
    pub sys_descr: Option<Regex>,
}

/// Everything the engine needs to snapshot one kind of device.
///
/// Definitions are immutable once compiled and shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct DriverDefinition {
    pub info: DriverInfo,
    pub attributes: Vec<AttributeDefinition>,
    pub modes: IndexMap<String, CliMode>,
    pub program: Vec<ProgramStep>,
    pub syslog: Vec<Regex>,
    pub traps: Vec<TrapRule>,
    pub discovery: Option<DiscoveryRule>,
    /// Where the definition was loaded from.
    pub origin: String,
}

impl DriverDefinition {
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Look a mode up by name.
    pub fn mode(&self, name: &str) -> Result<&CliMode, CliError> {
        self.modes.get(name).ok_or_else(|| CliError::UnknownMode {
            mode: name.to_owned(),
        })
    }

    /// Declared attribute at a level.
    pub fn attribute(&self, level: AttributeLevel, name: &str) -> Option<&AttributeDefinition> {
        self.attributes
            .iter()
            .find(|a| a.level == level && a.name == name)
    }

    pub fn attributes_at(&self, level: AttributeLevel) -> impl Iterator<Item = &AttributeDefinition> {
        self.attributes.iter().filter(move |a| a.level == level)
    }

    pub fn supports(&self, protocol: Protocol) -> bool {
        self.info.protocols.contains(&protocol)
    }

    /// Whether a syslog message announces a configuration change.
    pub fn analyze_syslog(&self, message: &str) -> bool {
        self.syslog.iter().any(|p| p.is_match(message))
    }

    /// Whether trap varbinds `(oid, value)` announce a configuration change.
    pub fn analyze_trap(&self, varbinds: &[(String, String)]) -> bool {
        self.traps.iter().any(|rule| {
            varbinds.iter().any(|(oid, value)| {
                oid.starts_with(&rule.oid_prefix)
                    && rule.value.as_deref().is_none_or(|v| v == value)
            })
        })
    }

    /// Whether SNMP system information identifies this driver.
    pub fn matches_discovery(&self, sys_object_id: &str, sys_descr: &str) -> bool {
        let Some(rule) = &self.discovery else {
            return false;
        };
        let oid_ok = rule.sys_object_id.is_empty()
            || rule
                .sys_object_id
                .iter()
                .any(|prefix| sys_object_id.starts_with(prefix.as_str()));
        let descr_ok = rule.sys_descr.as_ref().is_none_or(|p| p.is_match(sys_descr));
        oid_ok && descr_ok
    }
}
