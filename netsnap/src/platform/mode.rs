//! CLI mode definition.

use std::time::Duration;

use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;

use crate::channel::CompiledPrompt;

/// What a mode stands for in the session state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModeRole {
    /// Username / password prompts before a shell.
    Login,
    /// Unprivileged shell.
    Basic,
    /// Waiting for the elevation secret.
    PrivilegePrompt,
    /// Elevated shell.
    Privileged,
    /// Configuration shell.
    Configure,
    /// Interactive viewer left with a quit keystroke.
    Viewer,
    #[default]
    Other,
}

/// Paging behaviour of a mode.
#[derive(Debug, Clone)]
pub struct Pager {
    /// The "more" marker.
    pub pattern: CompiledPrompt,
    /// Keystrokes asking for the next page.
    pub response: String,
    /// Commands that disable paging, sent once per session.
    pub avoid: Vec<String>,
}

/// How to leave a viewer mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerQuit {
    pub keys: String,
    pub back_to: String,
}

/// One step of a mode transition.
///
/// `cmd` is sent (followed by a carriage return unless `no_cr`), then the
/// session waits for the prompt of one of the `options` modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDef {
    pub cmd: Option<String>,
    pub options: Vec<String>,
    /// Mode where the macro ends; `None` means "wherever the options lead".
    pub target: Option<String>,
    pub no_cr: bool,
    pub timeout: Option<Duration>,
}

/// A CLI mode (state) of a driver.
#[derive(Debug, Clone)]
pub struct CliMode {
    pub name: String,
    pub role: ModeRole,

    /// Prompt recognised in this mode. Entry modes (`ssh`, `telnet`) have
    /// none: they only exist before the first prompt.
    pub prompt: Option<CompiledPrompt>,

    /// Marker of a rejected command.
    pub error: Option<Regex>,

    pub pager: Option<Pager>,

    /// Do not lock the prompt to the first one seen.
    pub clear_prompt: bool,

    /// Reaching this mode means the credentials were refused.
    pub fail: Option<String>,

    pub quit: Option<ViewerQuit>,

    pub macros: IndexMap<String, MacroDef>,
}

impl CliMode {
    pub fn new(name: impl Into<String>, role: ModeRole) -> Self {
        Self {
            name: name.into(),
            role,
            prompt: None,
            error: None,
            pager: None,
            clear_prompt: false,
            fail: None,
            quit: None,
            macros: IndexMap::new(),
        }
    }

    pub fn is_viewer(&self) -> bool {
        self.quit.is_some()
    }

    pub fn get_macro(&self, name: &str) -> Option<&MacroDef> {
        self.macros.get(name)
    }

    /// The macro to continue with after landing in this mode while
    /// running `current`: `auto` if the mode has one, else `current`.
    pub fn next_macro(&self, current: &str) -> Option<(&str, &MacroDef)> {
        self.macros
            .get_key_value("auto")
            .or_else(|| self.macros.get_key_value(current))
            .map(|(k, v)| (k.as_str(), v))
    }

    /// Error text if `output` matches the error marker.
    pub fn detect_error(&self, output: &str) -> Option<String> {
        let caps = self.error.as_ref()?.captures(output)?;
        let text = caps.get(1).or_else(|| caps.get(0))?;
        Some(text.as_str().trim().to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::compile_text_pattern;

    fn macro_def(target: Option<&str>) -> MacroDef {
        MacroDef {
            cmd: None,
            options: vec![],
            target: target.map(str::to_owned),
            no_cr: false,
            timeout: None,
        }
    }

    #[test]
    fn test_next_macro_prefers_auto() {
        let mut mode = CliMode::new("password", ModeRole::Login);
        mode.macros.insert("enable".into(), macro_def(Some("enable")));
        assert_eq!(mode.next_macro("enable").unwrap().0, "enable");
        mode.macros.insert("auto".into(), macro_def(None));
        assert_eq!(mode.next_macro("enable").unwrap().0, "auto");
        assert!(CliMode::new("x", ModeRole::Other).next_macro("enable").is_none());
    }

    #[test]
    fn test_detect_error() {
        let mut mode = CliMode::new("enable", ModeRole::Privileged);
        mode.error = Some(compile_text_pattern(r"^% (.*)").unwrap());
        assert_eq!(
            mode.detect_error("foo\n% Invalid input detected at '^' marker.\n").as_deref(),
            Some("Invalid input detected at '^' marker.")
        );
        assert!(mode.detect_error("all good\n").is_none());
    }
}
