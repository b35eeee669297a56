//! Attribute schema declared by a driver.

use crate::model::{AttributeLevel, AttributeType};

/// Text placed around an attribute in config dump files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpHints {
    /// Printed once before the value (`%when%` is replaced by the time).
    pub pre: Option<String>,
    /// Prefixed to every line of the value.
    pub pre_line: Option<String>,
    /// Printed once after the value.
    pub post: Option<String>,
}

impl DumpHints {
    pub fn is_empty(&self) -> bool {
        self.pre.is_none() && self.pre_line.is_none() && self.post.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDefinition {
    pub level: AttributeLevel,
    pub name: String,
    pub value_type: AttributeType,
    pub title: String,
    /// Shown in config diffs.
    pub comparable: bool,
    pub dump: DumpHints,
}
