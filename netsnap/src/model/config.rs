//! Configuration snapshots.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::attribute::AttributeBag;

/// One immutable capture of a device configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    pub device_id: u64,
    pub created_at: DateTime<Utc>,
    pub author: String,
    pub attributes: AttributeBag,
}

impl Config {
    /// Whether `other` carries the same author and attribute values.
    ///
    /// Every attribute counts, whether or not the driver marks it
    /// comparable; that flag only selects what a diff view shows.
    /// Attribute order is ignored.
    pub fn same_content(&self, other: &Config) -> bool {
        self.author == other.author
            && self.attributes.len() == other.attributes.len()
            && self
                .attributes
                .iter()
                .all(|(name, value)| other.attributes.get(name) == Some(value))
    }
}
