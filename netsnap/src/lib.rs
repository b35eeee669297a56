//! # netsnap
//!
//! Async snapshot engine for network devices.
//!
//! netsnap logs into a device over SSH or Telnet, runs the command
//! program of a declarative driver definition, extracts device, config,
//! module and interface data from the output and reconciles the module
//! inventory with what was known before.
//!
//! ## Features
//!
//! - Async SSH (russh) and Telnet transports
//! - Driver definitions in TOML: CLI modes, login and elevation macros,
//!   pagers, interactive viewers, extraction rules
//! - Tail-search prompt matching with prompt locking
//! - Credential fallback across protocols and credential scopes
//! - Module first-seen/last-seen tracking
//! - Hot reload of the driver registry
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::net::{IpAddr, Ipv4Addr};
//! use std::sync::Arc;
//!
//! use netsnap::credentials::CredentialScope;
//! use netsnap::model::Device;
//! use netsnap::{CredentialSet, DriverRegistry, EngineConfig, NetworkConnector, SnapshotEngine, SnapshotOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), netsnap::Error> {
//!     let engine = SnapshotEngine::new(
//!         Arc::new(DriverRegistry::builtin()?),
//!         Arc::new(NetworkConnector),
//!         EngineConfig::from_file("netsnap.toml")?,
//!     );
//!
//!     let device = Device::new(1, "CiscoIOS12", IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1)));
//!     let credentials = vec![CredentialSet::cli_account(
//!         1,
//!         "lab",
//!         CredentialScope::Global,
//!         "admin",
//!         "secret",
//!         Some("enable-secret"),
//!     )];
//!
//!     let result = engine
//!         .run_snapshot(&device, &credentials, SnapshotOptions::default())
//!         .await;
//!     if let Some(device) = &result.device {
//!         println!("{} runs {}", device.name, device.software_version);
//!     }
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod config;
pub mod credentials;
pub mod driver;
pub mod error;
pub mod extract;
pub mod model;
pub mod platform;
pub mod reconcile;
pub mod snapshot;
pub mod transport;

// Re-export main types for convenience
pub use config::EngineConfig;
pub use credentials::CredentialSet;
pub use driver::{CliSession, CommandOptions, Response};
pub use error::{Error, ErrorKind, Result};
pub use extract::{Extracted, Extractor, ParseWarning};
pub use platform::{DriverDefinition, DriverRegistry};
pub use reconcile::{ModuleDiff, ModuleReappearance, reconcile};
pub use snapshot::{
    ConfigOutcome, DeviceRepository, SnapshotEngine, SnapshotOptions, SnapshotPhase, SnapshotResult,
    SnapshotSink, SnapshotStatus,
};
pub use transport::{Connector, NetworkConnector, Protocol, Transport};
