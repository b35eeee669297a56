//! Engine configuration.
//!
//! Every field has a default, so an empty document is a valid
//! configuration:
//!
//! ```toml
//! command_timeout_ms = 60000
//! elevation_retries = 1
//! host_key_verification = "strict"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::reconcile::ModuleReappearance;
use crate::transport::HostKeyVerification;

/// Tunables shared by every snapshot run of an engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// TCP / SSH connect timeout.
    pub connect_timeout_ms: u64,

    /// Per-command read deadline.
    pub command_timeout_ms: u64,

    /// Extra elevation attempts before the secret is declared wrong.
    pub elevation_retries: usize,

    /// Bound on mode transitions while running one macro.
    pub max_macro_steps: usize,

    /// How many bytes from the end of the buffer are searched for prompts.
    pub search_depth: usize,

    /// Pause between two credential attempts.
    pub attempt_pause_ms: u64,

    /// Terminal width for SSH PTYs.
    pub terminal_width: u32,

    /// Terminal height for SSH PTYs.
    pub terminal_height: u32,

    /// SSH host key checking.
    pub host_key_verification: HostKeyVerification,

    /// Alternative known_hosts file.
    pub known_hosts_path: Option<PathBuf>,

    /// What happens when a removed module shows up again.
    pub module_reappearance: ModuleReappearance,

    /// Write a text dump of every new config into this directory.
    pub dump_directory: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            command_timeout_ms: 120_000,
            elevation_retries: 2,
            max_macro_steps: 10,
            search_depth: 1000,
            attempt_pause_ms: 1_000,
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            module_reappearance: ModuleReappearance::default(),
            dump_directory: None,
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.command_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "command_timeout_ms",
                message: "must be greater than zero".into(),
            });
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "connect_timeout_ms",
                message: "must be greater than zero".into(),
            });
        }
        if self.max_macro_steps == 0 {
            return Err(ConfigError::Invalid {
                field: "max_macro_steps",
                message: "must be at least 1".into(),
            });
        }
        if self.search_depth < 64 {
            return Err(ConfigError::Invalid {
                field: "search_depth",
                message: format!("{} is too small to hold a prompt", self.search_depth),
            });
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn attempt_pause(&self) -> Duration {
        Duration::from_millis(self.attempt_pause_ms)
    }
}
