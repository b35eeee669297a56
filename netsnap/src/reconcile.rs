//! Module inventory reconciliation.
//!
//! [`reconcile`] merges the modules observed by a snapshot into the
//! previously tracked inventory. It is a pure function of its inputs: the
//! same previous set, observed set and `now` always give the same diff.
//!
//! Interfaces are not reconciled, every snapshot replaces them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;
use crate::model::{Module, ObservedModule};

/// What happens to a removed module that is observed again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleReappearance {
    /// The old entry comes back: `removed` is cleared and `first_seen` kept.
    #[default]
    Resume,
    /// The old entry stays removed and a new one is tracked.
    NewIdentity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleChange {
    Kept,
    Added,
    Removed,
    StillRemoved,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleEntry {
    pub change: ModuleChange,
    pub module: Module,
}

/// The reconciled inventory: previous entries first, in their original
/// order, then the newly added ones in observation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModuleDiff {
    pub entries: Vec<ModuleEntry>,
}

impl ModuleDiff {
    /// Every tracked module after reconciliation.
    pub fn modules(&self) -> Vec<Module> {
        self.entries.iter().map(|e| e.module.clone()).collect()
    }

    fn with(&self, change: ModuleChange) -> impl Iterator<Item = &Module> {
        self.entries
            .iter()
            .filter(move |e| e.change == change)
            .map(|e| &e.module)
    }

    pub fn kept(&self) -> impl Iterator<Item = &Module> {
        self.with(ModuleChange::Kept)
    }

    pub fn added(&self) -> impl Iterator<Item = &Module> {
        self.with(ModuleChange::Added)
    }

    pub fn newly_removed(&self) -> impl Iterator<Item = &Module> {
        self.with(ModuleChange::Removed)
    }

    pub fn still_removed(&self) -> impl Iterator<Item = &Module> {
        self.with(ModuleChange::StillRemoved)
    }
}

/// Merge `observed` into `previous`.
///
/// Observed modules are matched on slot and serial number, or on the slot
/// alone when the serial number is empty. A live entry is preferred over a
/// removed one with the same key.
pub fn reconcile(
    previous: &[Module],
    observed: &[ObservedModule],
    now: DateTime<Utc>,
    policy: ModuleReappearance,
) -> Result<ModuleDiff, SnapshotError> {
    if let Some(bad) = observed.iter().find(|m| m.slot.trim().is_empty()) {
        return Err(SnapshotError::Reconciliation {
            message: format!(
                "module with part number '{}' and serial '{}' has no slot",
                bad.part_number, bad.serial_number
            ),
        });
    }

    let mut matched: Vec<Option<&ObservedModule>> = vec![None; previous.len()];
    let mut added = Vec::new();
    for module in observed {
        let key = module.key();
        let free = |i: &usize| matched[*i].is_none() && previous[*i].key() == key;
        let live = (0..previous.len()).find(|i| free(i) && !previous[*i].removed);
        let found = live.or_else(|| match policy {
            ModuleReappearance::Resume => (0..previous.len()).find(|i| free(i)),
            ModuleReappearance::NewIdentity => None,
        });
        match found {
            Some(i) => matched[i] = Some(module),
            None => added.push(module),
        }
    }

    let mut entries = Vec::with_capacity(previous.len() + added.len());
    for (old, seen) in previous.iter().zip(matched) {
        let (change, module) = match seen {
            Some(seen) => (
                ModuleChange::Kept,
                Module {
                    part_number: seen.part_number.clone(),
                    attributes: seen.attributes.clone(),
                    last_seen: now,
                    removed: false,
                    ..old.clone()
                },
            ),
            None if old.removed => (ModuleChange::StillRemoved, old.clone()),
            None => (
                ModuleChange::Removed,
                Module {
                    removed: true,
                    ..old.clone()
                },
            ),
        };
        entries.push(ModuleEntry { change, module });
    }
    entries.extend(added.into_iter().map(|m| ModuleEntry {
        change: ModuleChange::Added,
        module: Module::first_seen(m, now),
    }));
    Ok(ModuleDiff { entries })
}
