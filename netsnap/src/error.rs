//! Error types for netsnap.
//!
//! Errors are layered the same way the engine is: transport, channel
//! (prompt matching), CLI session, platform definitions, credentials and
//! the snapshot orchestrator each have their own enum, and [`Error`] wraps
//! them all. [`Error::kind`] folds any of them into the coarse
//! [`ErrorKind`] taxonomy that snapshot results report.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Main error type for netsnap operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Socket / SSH / Telnet level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Prompt matching errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// CLI session errors (modes, macros, rejected commands)
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// Driver definition errors
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Credentials refused by the device
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Snapshot orchestration errors
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Engine configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Why a connection attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectFailure {
    /// No route to the host, or the host did not answer.
    Unreachable,
    /// The port actively refused the connection.
    Refused,
    /// Connecting took longer than the connect timeout.
    Timeout,
    /// TCP connected but the SSH key exchange or host key check failed.
    Handshake,
}

impl fmt::Display for ConnectFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectFailure::Unreachable => "unreachable",
            ConnectFailure::Refused => "refused",
            ConnectFailure::Timeout => "timed out",
            ConnectFailure::Handshake => "handshake failed",
        };
        f.write_str(s)
    }
}

impl ConnectFailure {
    /// Classify an I/O error raised while connecting.
    pub fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => ConnectFailure::Refused,
            io::ErrorKind::TimedOut => ConnectFailure::Timeout,
            _ => ConnectFailure::Unreachable,
        }
    }
}

/// Transport layer errors (connection, authentication, raw I/O).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection to {host}:{port} {failure}: {message}")]
    Connect {
        host: String,
        port: u16,
        failure: ConnectFailure,
        message: String,
    },

    /// SSH protocol error after the session was established
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// The server presented a different key than the one in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Strict verification and the host is not in known_hosts
    #[error("Host key for {host}:{port} is unknown")]
    HostKeyUnknown { host: String, port: u16 },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// The credential set cannot be used with this protocol
    #[error("Credential '{credential}' cannot be used over {protocol}")]
    CredentialMismatch { credential: String, protocol: String },

    /// The connector has no implementation for this protocol
    #[error("Protocol {protocol} is not supported by this connector")]
    Unsupported { protocol: String },

    /// Nothing arrived before the read deadline
    #[error("No data received within {0:?}")]
    ReadTimeout(Duration),

    /// Operation on a transport that is not connected
    #[error("Transport not connected")]
    NotConnected,

    /// Connection was closed by the peer
    #[error("Connection disconnected")]
    Disconnected,

    /// SNMP request failure
    #[error("SNMP error: {0}")]
    Snmp(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Channel layer errors (buffering and prompt matching).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// None of the expected patterns showed up before the deadline
    #[error("No expected prompt within {timeout:?}")]
    PatternTimeout { timeout: Duration, partial: String },

    /// The transport went away while waiting for a prompt
    #[error("Channel closed")]
    Closed,

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// CLI session errors.
#[derive(Error, Debug)]
pub enum CliError {
    /// The device printed one of the mode's error markers
    #[error("Command '{command}' rejected: {message}")]
    CommandRejected { command: String, message: String },

    /// A mode name that the driver does not declare
    #[error("Unknown CLI mode '{mode}'")]
    UnknownMode { mode: String },

    /// The current mode has no such macro
    #[error("Mode '{mode}' has no macro '{name}'")]
    NoMacro { mode: String, name: String },

    /// Too many transitions without reaching the macro target
    #[error("Macro '{name}' did not reach '{target}' within {steps} steps")]
    MacroLoop {
        name: String,
        target: String,
        steps: usize,
    },

    /// The macro landed in a mode with nowhere else to go
    #[error("Macro '{name}' stopped in mode '{mode}' instead of '{target}'")]
    TargetNotReached {
        name: String,
        target: String,
        mode: String,
    },

    /// A previous timeout or disconnection left the session unusable
    #[error("Session is broken after a previous failure")]
    SessionBroken,
}

/// The device refused the credentials during login or elevation.
#[derive(Error, Debug)]
pub enum CredentialError {
    /// A driver-declared failure mode was reached
    #[error("{message}")]
    Rejected { message: String },

    /// Elevation kept bouncing back to the unprivileged mode
    #[error("Elevation to '{target}' rejected after {attempts} attempts")]
    ElevationRejected { target: String, attempts: usize },
}

/// Driver definition errors.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Invalid driver definition
    #[error("Invalid driver definition '{driver}': {message}")]
    InvalidDefinition { driver: String, message: String },

    /// The definition document could not be parsed
    #[error("Failed to parse driver document {origin}: {message}")]
    Parse { origin: String, message: String },

    /// Two definitions share a name
    #[error("Driver '{name}' is already registered")]
    AlreadyRegistered { name: String },

    /// A driver source could not be read
    #[error("Failed to read driver source {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Snapshot orchestration errors.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// The device references a driver that is not registered
    #[error("No driver named '{name}'")]
    MissingDriver { name: String },

    /// The device is not in production
    #[error("Device '{device}' is disabled")]
    DeviceDisabled { device: String },

    /// No protocol could even be connected
    #[error("Failed to connect via {protocols}")]
    ConnectFailed { protocols: String },

    /// Every credential candidate was refused
    #[error("Couldn't find valid credentials ({tried} tried)")]
    AuthenticationExhausted { tried: usize },

    /// A required step of the command program failed
    #[error("Required step '{step}' failed: {source}")]
    Incomplete {
        step: String,
        #[source]
        source: Box<Error>,
    },

    /// Observed inventory violates the module identity rules
    #[error("Reconciliation failed: {message}")]
    Reconciliation { message: String },

    /// A device repository or result sink failed
    #[error("{what} failed: {message}")]
    Collaborator { what: &'static str, message: String },
}

/// Engine configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The configuration is not valid TOML for [`crate::EngineConfig`]
    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("Invalid value for '{field}': {message}")]
    Invalid { field: &'static str, message: String },
}

/// Coarse error classification reported in snapshot results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Connect,
    AuthenticationExhausted,
    Credential,
    ReadTimeout,
    CommandRejected,
    SnapshotIncomplete,
    MissingDriver,
    Reconciliation,
    Definition,
    DeviceDisabled,
    Collaborator,
    Other,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport(e) => match e {
                TransportError::Connect { .. }
                | TransportError::HostKeyChanged { .. }
                | TransportError::HostKeyUnknown { .. }
                | TransportError::KnownHosts(_)
                | TransportError::Unsupported { .. } => ErrorKind::Connect,
                TransportError::AuthenticationFailed { .. }
                | TransportError::Key(_)
                | TransportError::CredentialMismatch { .. } => ErrorKind::Credential,
                TransportError::ReadTimeout(_) => ErrorKind::ReadTimeout,
                _ => ErrorKind::Other,
            },
            Error::Channel(e) => match e {
                ChannelError::PatternTimeout { .. } => ErrorKind::ReadTimeout,
                ChannelError::InvalidPattern(_) => ErrorKind::Definition,
                ChannelError::Closed => ErrorKind::Other,
            },
            Error::Cli(e) => match e {
                CliError::CommandRejected { .. } => ErrorKind::CommandRejected,
                CliError::SessionBroken => ErrorKind::Other,
                _ => ErrorKind::Definition,
            },
            Error::Platform(_) => ErrorKind::Definition,
            Error::Credential(_) => ErrorKind::Credential,
            Error::Snapshot(e) => match e {
                SnapshotError::MissingDriver { .. } => ErrorKind::MissingDriver,
                SnapshotError::DeviceDisabled { .. } => ErrorKind::DeviceDisabled,
                SnapshotError::ConnectFailed { .. } => ErrorKind::Connect,
                SnapshotError::AuthenticationExhausted { .. } => {
                    ErrorKind::AuthenticationExhausted
                }
                SnapshotError::Incomplete { .. } => ErrorKind::SnapshotIncomplete,
                SnapshotError::Reconciliation { .. } => ErrorKind::Reconciliation,
                SnapshotError::Collaborator { .. } => ErrorKind::Collaborator,
            },
            Error::Config(_) => ErrorKind::Other,
        }
    }

    /// True when the next credential candidate should be tried.
    pub fn is_credential_failure(&self) -> bool {
        self.kind() == ErrorKind::Credential
    }

    /// True when the current protocol should be abandoned.
    pub fn is_connect_failure(&self) -> bool {
        self.kind() == ErrorKind::Connect
    }
}

/// Result type alias using netsnap's Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let err: Error = TransportError::Connect {
            host: "10.0.0.1".into(),
            port: 22,
            failure: ConnectFailure::Refused,
            message: "connection refused".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Connect);
        assert!(err.is_connect_failure());

        let err: Error = TransportError::AuthenticationFailed {
            user: "admin".into(),
        }
        .into();
        assert!(err.is_credential_failure());

        let err: Error = ChannelError::PatternTimeout {
            timeout: Duration::from_secs(1),
            partial: String::new(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::ReadTimeout);

        let err: Error = CliError::CommandRejected {
            command: "show foo".into(),
            message: "Invalid input".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::CommandRejected);
    }

    #[test]
    fn test_incomplete_keeps_source() {
        let inner: Error = CliError::CommandRejected {
            command: "show inventory".into(),
            message: "Invalid input".into(),
        }
        .into();
        let err: Error = SnapshotError::Incomplete {
            step: "inventory".into(),
            source: Box::new(inner),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::SnapshotIncomplete);
        assert!(err.to_string().contains("show inventory"));
    }

    #[test]
    fn test_connect_failure_from_io() {
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert_eq!(ConnectFailure::from_io(&refused), ConnectFailure::Refused);
        let other = io::Error::other("no route");
        assert_eq!(ConnectFailure::from_io(&other), ConnectFailure::Unreachable);
    }
}
