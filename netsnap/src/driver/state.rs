//! Session state tracking.

use serde::Serialize;

use crate::platform::{CliMode, ModeRole};

/// Where a CLI session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Connecting,
    AwaitingBanner,
    Login,
    Basic,
    PrivilegePrompt,
    Privileged,
    Configure,
    /// Inside a paged output.
    Paging,
    /// Inside an interactive viewer.
    Viewer,
    Other,
    Closed,
}

impl From<ModeRole> for SessionState {
    fn from(role: ModeRole) -> Self {
        match role {
            ModeRole::Login => SessionState::Login,
            ModeRole::Basic => SessionState::Basic,
            ModeRole::PrivilegePrompt => SessionState::PrivilegePrompt,
            ModeRole::Privileged => SessionState::Privileged,
            ModeRole::Configure => SessionState::Configure,
            ModeRole::Viewer => SessionState::Viewer,
            ModeRole::Other => SessionState::Other,
        }
    }
}

/// Current mode, locked prompt and state history of a session.
#[derive(Debug)]
pub struct ModeTracker {
    mode: String,
    /// Capture group 1 of the last prompt, required on later matches.
    strict_prompt: Option<String>,
    history: Vec<SessionState>,
}

impl ModeTracker {
    /// Start in the entry mode of `protocol` (e.g. "ssh").
    pub fn new(entry_mode: impl Into<String>) -> Self {
        Self {
            mode: entry_mode.into(),
            strict_prompt: None,
            history: Vec::new(),
        }
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    pub fn strict_prompt(&self) -> Option<&str> {
        self.strict_prompt.as_deref()
    }

    pub fn clear_strict_prompt(&mut self) {
        self.strict_prompt = None;
    }

    /// Record that `mode` was reached with prompt capture `capture`.
    pub fn enter(&mut self, mode: &CliMode, capture: Option<String>) {
        self.mode = mode.name.clone();
        self.strict_prompt = if mode.clear_prompt { None } else { capture };
        self.push(mode.role.into());
    }

    /// Record a state; consecutive duplicates are folded.
    pub fn push(&mut self, state: SessionState) {
        if self.history.last() != Some(&state) {
            self.history.push(state);
        }
    }

    pub fn state(&self) -> SessionState {
        self.history.last().copied().unwrap_or(SessionState::Connecting)
    }

    pub fn history(&self) -> &[SessionState] {
        &self.history
    }
}
