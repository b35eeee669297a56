//! Transforms and type coercion of captured text.

use crate::model::{AttributeType, AttributeValue, FileRef};
use crate::platform::Transform;

/// Run `transforms` over `value` in order.
pub(super) fn apply_transforms(mut value: String, transforms: &[Transform]) -> Result<String, String> {
    for transform in transforms {
        value = match transform {
            Transform::Trim => value.trim().to_owned(),
            Transform::Unquote => unquote(&value),
            Transform::StripPrefix(prefix) => match value.strip_prefix(prefix.as_str()) {
                Some(rest) => rest.to_owned(),
                None => value,
            },
            Transform::Replace { pattern, with } => pattern.replace_all(&value, with.as_str()).into_owned(),
            Transform::Divide(by) => format_number(parse_number(&value)? / by),
            Transform::Round => format_number(parse_number(&value)?.round()),
            Transform::Classify { cases, otherwise } => {
                match cases.iter().find(|(pattern, _)| pattern.is_match(&value)) {
                    Some((_, mapped)) => mapped.clone(),
                    None => otherwise.clone().unwrap_or(value),
                }
            }
        };
    }
    Ok(value)
}

fn unquote(value: &str) -> String {
    let trimmed = value.trim();
    let inner = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    inner.trim().to_owned()
}

pub(super) fn parse_number(value: &str) -> Result<f64, String> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| format!("'{}' is not a number", value.trim()))
}

/// `1071` rather than `1071.0` for whole numbers.
pub(super) fn format_number(n: f64) -> String {
    n.to_string()
}

pub(super) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" | "enabled" => Some(true),
        "false" | "no" | "off" | "0" | "disabled" => Some(false),
        _ => None,
    }
}

/// Convert text to the declared attribute type.
pub(super) fn coerce(value: &str, value_type: AttributeType) -> Result<AttributeValue, String> {
    match value_type {
        AttributeType::Numeric => parse_number(value).map(AttributeValue::Numeric),
        AttributeType::Text => Ok(AttributeValue::Text(value.trim().to_owned())),
        AttributeType::LongText => Ok(AttributeValue::LongText(value.to_owned())),
        AttributeType::Binary => parse_bool(value)
            .map(AttributeValue::Binary)
            .ok_or_else(|| format!("'{}' is not a boolean", value.trim())),
        AttributeType::BinaryFile => {
            let name = value.trim();
            if name.is_empty() {
                Err("empty file name".to_owned())
            } else {
                Ok(AttributeValue::BinaryFile(FileRef {
                    file_name: name.to_owned(),
                }))
            }
        }
    }
}
