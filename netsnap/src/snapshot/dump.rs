//! Text dump of a new config.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::model::{AttributeLevel, Config};
use crate::platform::DriverDefinition;

/// Render the config attributes that carry dump hints.
pub(super) fn render(definition: &DriverDefinition, config: &Config, when: DateTime<Utc>) -> String {
    let when = when.to_rfc2822();
    let mut out = String::new();
    for attribute in definition.attributes_at(AttributeLevel::Config) {
        let hints = &attribute.dump;
        if hints.is_empty() {
            continue;
        }
        if let Some(pre) = &hints.pre {
            out.push_str(&pre.replace("%when%", &when));
            out.push_str("\r\n");
        }
        if let Some(value) = config.attributes.get(&attribute.name) {
            let text = value.to_string();
            match &hints.pre_line {
                Some(prefix) => {
                    for line in text.lines() {
                        out.push_str(prefix);
                        out.push_str(line);
                        out.push_str("\r\n");
                    }
                }
                None => out.push_str(&text),
            }
        }
        if let Some(post) = &hints.post {
            out.push_str(&post.replace("%when%", &when));
            out.push_str("\r\n");
        }
    }
    out
}

/// File the dump of `device_name` goes to.
pub(super) fn path(directory: &Path, device_name: &str) -> PathBuf {
    let name: String = device_name
        .chars()
        .map(|c| if c == '/' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    directory.join(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttributeValue;
    use crate::platform::DriverRegistry;
    use chrono::TimeZone;

    #[test]
    fn test_render_cisco_dump() {
        let registry = DriverRegistry::builtin().unwrap();
        let definition = registry.get_by_name("CiscoIOS12").unwrap();
        let mut config = Config {
            device_id: 1,
            created_at: Utc::now(),
            author: "admin".into(),
            attributes: Default::default(),
        };
        config.attributes.insert(
            "iosImageFile".into(),
            AttributeValue::Text("bootflash:packages.conf".into()),
        );
        config.attributes.insert(
            "runningConfig".into(),
            AttributeValue::LongText("hostname router1\n!\nend\n".into()),
        );
        let when = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let text = render(&definition, &config, when);

        assert!(text.starts_with("!! IOS image file:\r\n!!  bootflash:packages.conf\r\n"));
        assert!(text.contains("!! Running configuration (taken on Fri, "));
        assert!(text.contains("Mar 2024 08:00:00 +0000):\r\n"));
        assert!(text.contains("hostname router1\n!\nend\n!! End of running configuration\r\n"));
    }

    #[test]
    fn test_path_is_sanitized() {
        let path = path(Path::new("/tmp/dumps"), "core/1");
        assert_eq!(path, PathBuf::from("/tmp/dumps/core_1"));
    }
}
