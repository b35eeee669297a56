//! Single-value extraction rules.

use regex::{Captures, Regex};

use super::Extractor;
use super::value::{apply_transforms, coerce, format_number};
use crate::model::{AttributeValue, DeviceField, NetworkClass};
use crate::platform::{Capture, ExtractionRule, GroupRef, Occurrence, Target};

impl Extractor<'_> {
    pub(super) fn apply_rule(&mut self, step: &str, rule: &ExtractionRule, output: &str) {
        let target = target_name(&rule.target);
        let captured = captured_values(rule, output);

        let values = if captured.is_empty() {
            // Defaults never replace a value set by an earlier rule
            match &rule.default {
                Some(default) if !self.is_set(&rule.target) => vec![default.clone()],
                _ => return,
            }
        } else {
            let mut values = Vec::with_capacity(captured.len());
            for value in captured {
                match apply_transforms(value, &rule.transforms) {
                    Ok(v) => values.push(v),
                    Err(message) => self.warn(step, &target, message),
                }
            }
            values
        };
        if values.is_empty() {
            return;
        }

        if rule.target == Target::Device(DeviceField::Vrf) {
            self.extracted.vrfs.extend(
                values
                    .iter()
                    .map(|v| v.trim())
                    .filter(|v| !v.is_empty())
                    .map(str::to_owned),
            );
            return;
        }
        let value = values.join("\n");

        match &rule.target {
            Target::Device(field) => {
                let value = value.trim().to_owned();
                if *field == DeviceField::NetworkClass {
                    if let Err(message) = value.parse::<NetworkClass>() {
                        self.warn(step, &target, message);
                        return;
                    }
                }
                self.extracted.device_fields.insert(*field, value);
            }
            Target::ConfigAuthor => {
                self.extracted.config_author = Some(value.trim().to_owned());
            }
            Target::DeviceAttribute(name) | Target::ConfigAttribute(name) => {
                let typed = match &rule.same_as {
                    Some(other) => match self.attribute_text(other) {
                        Some(reference) => Ok(AttributeValue::Binary(same_text(&value, &reference))),
                        None => Err(format!("'{other}' was not extracted")),
                    },
                    None => coerce(&value, rule.value_type),
                };
                match typed {
                    Ok(typed) => {
                        let bag = match rule.target {
                            Target::DeviceAttribute(_) => &mut self.extracted.device_attributes,
                            _ => &mut self.extracted.config_attributes,
                        };
                        bag.insert(name.clone(), typed);
                    }
                    Err(message) => self.warn(step, &target, message),
                }
            }
        }
    }

    fn is_set(&self, target: &Target) -> bool {
        let extracted = &self.extracted;
        match target {
            Target::Device(DeviceField::Vrf) => !extracted.vrfs.is_empty(),
            Target::Device(field) => extracted.device_fields.contains_key(field),
            Target::DeviceAttribute(name) => extracted.device_attributes.contains_key(name),
            Target::ConfigAuthor => extracted.config_author.is_some(),
            Target::ConfigAttribute(name) => extracted.config_attributes.contains_key(name),
        }
    }

    /// Text of an already extracted config or device attribute.
    fn attribute_text(&self, name: &str) -> Option<String> {
        self.extracted
            .config_attributes
            .get(name)
            .or_else(|| self.extracted.device_attributes.get(name))
            .map(ToString::to_string)
    }
}

fn target_name(target: &Target) -> String {
    match target {
        Target::Device(field) => format!("device.{}", field.as_str()),
        Target::DeviceAttribute(name) => format!("device.{name}"),
        Target::ConfigAuthor => "config.author".to_owned(),
        Target::ConfigAttribute(name) => format!("config.{name}"),
    }
}

/// Compare two texts, ignoring trailing whitespace on each line.
fn same_text(a: &str, b: &str) -> bool {
    let lines = |s: &str| {
        s.trim_end()
            .lines()
            .map(|l| l.trim_end().to_owned())
            .collect::<Vec<_>>()
    };
    lines(a) == lines(b)
}

/// Raw values captured by `rule`, in occurrence order.
fn captured_values(rule: &ExtractionRule, output: &str) -> Vec<String> {
    let Some(pattern) = &rule.pattern else {
        return match &rule.capture {
            Capture::Literal(value) => vec![value.clone()],
            _ => vec![output.to_owned()],
        };
    };
    let mut values = pattern
        .captures_iter(output)
        .filter_map(|caps| capture_value(&rule.capture, &caps, output));
    match rule.occurrence {
        Occurrence::First => values.next().into_iter().collect(),
        Occurrence::Last => values.last().into_iter().collect(),
        Occurrence::Each => values.collect(),
    }
}

pub(super) fn group<'h>(caps: &Captures<'h>, group: &GroupRef) -> Option<regex::Match<'h>> {
    match group {
        GroupRef::Index(i) => caps.get(*i),
        GroupRef::Name(name) => caps.name(name),
    }
}

/// The group a rule captures by default: 1 if the pattern has groups.
pub(super) fn default_group(pattern: &Regex) -> GroupRef {
    GroupRef::Index(usize::from(pattern.captures_len() > 1))
}

fn capture_value(capture: &Capture, caps: &Captures<'_>, output: &str) -> Option<String> {
    match capture {
        Capture::Group(g) => group(caps, g).map(|m| m.as_str().to_owned()),
        Capture::Template(template) => {
            let mut value = String::new();
            caps.expand(template, &mut value);
            Some(value)
        }
        Capture::Sum(groups) => {
            let total: f64 = groups
                .iter()
                .filter_map(|i| caps.get(*i))
                .filter_map(|m| m.as_str().trim().parse::<f64>().ok())
                .sum();
            Some(format_number(total))
        }
        Capture::Literal(value) => Some(value.clone()),
        Capture::Span { until } => {
            let whole = caps.get(0)?;
            let end = until
                .as_ref()
                .and_then(|u| u.find_at(output, whole.end()))
                .map_or(output.len(), |m| m.start());
            Some(output[whole.start()..end].to_owned())
        }
        Capture::Whole => caps.get(0).map(|m| m.as_str().to_owned()),
    }
}
