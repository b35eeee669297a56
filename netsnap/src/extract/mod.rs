//! Output parser and attribute extractor.
//!
//! An [`Extractor`] applies the rules of each program step to the cleaned
//! output of its command and accumulates the results. Nothing here fails:
//! a rule that does not match leaves its target alone, and a value that
//! cannot be coerced to its declared type is dropped with a
//! [`ParseWarning`].

mod rules;
mod structures;
mod value;

use std::collections::BTreeSet;

use indexmap::IndexMap;
use log::warn;
use serde::Serialize;

use crate::model::{AttributeBag, DeviceField, NetworkInterface, ObservedModule};
use crate::platform::{DriverDefinition, ProgramStep};

/// A value that could not be extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseWarning {
    pub step: String,
    pub target: String,
    pub message: String,
}

/// Everything extracted from one snapshot run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extracted {
    pub device_fields: IndexMap<DeviceField, String>,
    pub vrfs: BTreeSet<String>,
    pub device_attributes: AttributeBag,
    pub config_author: Option<String>,
    pub config_attributes: AttributeBag,
    pub modules: Vec<ObservedModule>,
    pub interfaces: Vec<NetworkInterface>,
    pub warnings: Vec<ParseWarning>,
}

impl Extracted {
    pub fn device_field(&self, field: DeviceField) -> Option<&str> {
        self.device_fields.get(&field).map(String::as_str)
    }

    pub fn interface(&self, name: &str) -> Option<&NetworkInterface> {
        self.interfaces.iter().find(|i| i.name == name)
    }
}

/// Applies the rules of a driver's program steps.
pub struct Extractor<'d> {
    definition: &'d DriverDefinition,
    extracted: Extracted,
}

impl<'d> Extractor<'d> {
    pub fn new(definition: &'d DriverDefinition) -> Self {
        Self {
            definition,
            extracted: Extracted::default(),
        }
    }

    /// Apply the rules and structures of `step` to its output.
    pub fn apply(&mut self, step: &ProgramStep, output: &str) {
        for rule in &step.rules {
            self.apply_rule(&step.id, rule, output);
        }
        for structure in &step.structures {
            self.apply_structure(&step.id, structure, output);
        }
    }

    /// Apply the `interface_fields` of a `for_each` step to one interface.
    pub fn apply_to_interface(&mut self, step: &ProgramStep, interface: &str, output: &str) {
        self.apply_interface_fields(&step.id, &step.interface_fields, interface, output);
        for rule in &step.rules {
            self.apply_rule(&step.id, rule, output);
        }
    }

    /// Names of the interfaces collected so far.
    pub fn interface_names(&self) -> Vec<String> {
        self.extracted.interfaces.iter().map(|i| i.name.clone()).collect()
    }

    pub fn extracted(&self) -> &Extracted {
        &self.extracted
    }

    pub fn finish(self) -> Extracted {
        self.extracted
    }

    fn warn(&mut self, step: &str, target: &str, message: impl Into<String>) {
        let message = message.into();
        warn!("Step '{step}', {target}: {message}");
        self.extracted.warnings.push(ParseWarning {
            step: step.to_owned(),
            target: target.to_owned(),
            message,
        });
    }
}
