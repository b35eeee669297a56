//! Typed attribute values.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Which entity an attribute belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeLevel {
    Device,
    Config,
    Interface,
    Module,
}

impl fmt::Display for AttributeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttributeLevel::Device => "device",
            AttributeLevel::Config => "config",
            AttributeLevel::Interface => "interface",
            AttributeLevel::Module => "module",
        };
        f.write_str(s)
    }
}

/// Value type, fixed by the driver definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttributeType {
    Numeric,
    Text,
    LongText,
    Binary,
    BinaryFile,
}

/// Reference to a file retrieved from the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRef {
    pub file_name: String,
}

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum AttributeValue {
    Numeric(f64),
    Text(String),
    LongText(String),
    Binary(bool),
    BinaryFile(FileRef),
}

impl AttributeValue {
    pub fn attribute_type(&self) -> AttributeType {
        match self {
            AttributeValue::Numeric(_) => AttributeType::Numeric,
            AttributeValue::Text(_) => AttributeType::Text,
            AttributeValue::LongText(_) => AttributeType::LongText,
            AttributeValue::Binary(_) => AttributeType::Binary,
            AttributeValue::BinaryFile(_) => AttributeType::BinaryFile,
        }
    }

    /// Text content for text and long-text values.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) | AttributeValue::LongText(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Numeric(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Binary(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Numeric(n) => write!(f, "{n}"),
            AttributeValue::Text(s) | AttributeValue::LongText(s) => f.write_str(s),
            AttributeValue::Binary(b) => write!(f, "{b}"),
            AttributeValue::BinaryFile(r) => f.write_str(&r.file_name),
        }
    }
}

/// Attributes of one entity, in driver declaration order.
pub type AttributeBag = IndexMap<String, AttributeValue>;
