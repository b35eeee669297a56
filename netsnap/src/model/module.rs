//! Hardware inventory entries.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::attribute::AttributeBag;

/// A module as read from the device, before reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObservedModule {
    pub slot: String,
    pub part_number: String,
    pub serial_number: String,
    pub attributes: AttributeBag,
}

impl ObservedModule {
    pub fn new(
        slot: impl Into<String>,
        part_number: impl Into<String>,
        serial_number: impl Into<String>,
    ) -> Self {
        Self {
            slot: slot.into(),
            part_number: part_number.into(),
            serial_number: serial_number.into(),
            attributes: AttributeBag::new(),
        }
    }

    pub fn key(&self) -> ModuleKey {
        ModuleKey::new(&self.slot, &self.serial_number)
    }
}

/// A tracked inventory entry with its history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Module {
    pub slot: String,
    pub part_number: String,
    pub serial_number: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub removed: bool,
    pub attributes: AttributeBag,
}

impl Module {
    /// A module seen for the first time at `now`.
    pub fn first_seen(observed: &ObservedModule, now: DateTime<Utc>) -> Self {
        Self {
            slot: observed.slot.clone(),
            part_number: observed.part_number.clone(),
            serial_number: observed.serial_number.clone(),
            first_seen: now,
            last_seen: now,
            removed: false,
            attributes: observed.attributes.clone(),
        }
    }

    pub fn key(&self) -> ModuleKey {
        ModuleKey::new(&self.slot, &self.serial_number)
    }
}

/// Identity of a module: slot and serial when both are known, slot alone
/// otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleKey {
    pub slot: String,
    pub serial_number: Option<String>,
}

impl ModuleKey {
    pub fn new(slot: &str, serial_number: &str) -> Self {
        let serial_number = serial_number.trim();
        Self {
            slot: slot.trim().to_owned(),
            serial_number: (!serial_number.is_empty()).then(|| serial_number.to_owned()),
        }
    }
}
