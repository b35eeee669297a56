//! Snapshot orchestration.
//!
//! A [`SnapshotEngine`] takes one device through
//! `INIT → DRIVER_RESOLVED → CREDENTIALS_RESOLVED → CONNECTED →
//! COMMANDS_RUN → PARSED → RECONCILED → DONE`: it resolves the driver,
//! logs in with the first working protocol and credential, runs the
//! driver's command program, extracts values and reconciles the module
//! inventory. Any failure ends the run with a
//! [`SnapshotStatus::Failure`] result that carries nothing to persist.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use netsnap::{DriverRegistry, EngineConfig, NetworkConnector, SnapshotEngine, SnapshotOptions};
//! # async fn example(device: netsnap::model::Device, credentials: Vec<netsnap::CredentialSet>) -> Result<(), netsnap::Error> {
//! let engine = SnapshotEngine::new(
//!     Arc::new(DriverRegistry::builtin()?),
//!     Arc::new(NetworkConnector),
//!     EngineConfig::default(),
//! );
//! let result = engine.run_snapshot(&device, &credentials, SnapshotOptions::default()).await;
//! println!("{:?}: {:?}", result.status, result.error);
//! # Ok(())
//! # }
//! ```

mod collaborators;
mod dump;
mod engine;
mod result;

use std::net::IpAddr;

use chrono::{DateTime, Utc};

use crate::credentials::CredentialSet;

pub use collaborators::{DeviceRepository, SnapshotSink};
pub use engine::SnapshotEngine;
pub use result::{ConfigOutcome, SnapshotPhase, SnapshotResult, SnapshotStatus, StepFailure};

/// Per-run options.
#[derive(Debug, Default)]
pub struct SnapshotOptions {
    /// Connect to this address instead of the device's own.
    pub force_connect_address: Option<IpAddr>,
    /// Skip program steps flagged as diagnostics.
    pub skip_diagnostics: bool,
    /// Record a masked transcript of the CLI traffic.
    pub debug_enabled: bool,
    /// Try only this credential set.
    pub credentials_override: Option<CredentialSet>,
    /// Time stamped on the config and modules; now when `None`.
    pub timestamp: Option<DateTime<Utc>>,
}
