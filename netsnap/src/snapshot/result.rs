//! Snapshot run outcome.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::credentials::CredentialSummary;
use crate::driver::TranscriptEntry;
use crate::error::{Error, ErrorKind};
use crate::extract::ParseWarning;
use crate::model::{Config, Device, NetworkInterface};
use crate::reconcile::ModuleDiff;
use crate::transport::Protocol;

/// Progress of a run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapshotPhase {
    Init,
    DriverResolved,
    CredentialsResolved,
    Connected,
    CommandsRun,
    Parsed,
    Reconciled,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapshotStatus {
    Success,
    /// Done, but some optional steps failed.
    Partial,
    Failure,
}

/// The config taken by a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "config", rename_all = "snake_case")]
pub enum ConfigOutcome {
    New(Config),
    /// Same content as the device's last config.
    Unchanged,
}

impl ConfigOutcome {
    pub fn new_config(&self) -> Option<&Config> {
        match self {
            ConfigOutcome::New(config) => Some(config),
            ConfigOutcome::Unchanged => None,
        }
    }
}

/// An optional step that failed without stopping the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    pub step: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl StepFailure {
    pub(super) fn new(step: &str, error: &Error) -> Self {
        Self {
            step: step.to_owned(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Everything a run produced.
///
/// A failed run never carries a device, config or module diff: the
/// previous state stays current. Its step outputs are kept for
/// diagnostics only.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotResult {
    pub device_id: u64,
    pub status: SnapshotStatus,
    /// Last phase reached.
    pub phase: SnapshotPhase,
    /// Phase that was running when the run failed.
    pub failed_in: Option<SnapshotPhase>,
    pub error_kind: Option<ErrorKind>,
    pub error: Option<String>,
    /// The device with its updated fields, attributes, modules and
    /// interfaces.
    pub device: Option<Device>,
    pub config: Option<ConfigOutcome>,
    pub module_diff: Option<ModuleDiff>,
    pub interfaces: Vec<NetworkInterface>,
    pub warnings: Vec<ParseWarning>,
    pub partial_failures: Vec<StepFailure>,
    pub protocol: Option<Protocol>,
    pub credential: Option<CredentialSummary>,
    /// Connection attempts, all protocols included.
    pub attempts: usize,
    /// Step outputs of a failed run.
    pub outputs: IndexMap<String, String>,
    pub debug_transcript: Option<Vec<TranscriptEntry>>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SnapshotResult {
    pub(super) fn new(device_id: u64, started_at: DateTime<Utc>) -> Self {
        Self {
            device_id,
            status: SnapshotStatus::Failure,
            phase: SnapshotPhase::Init,
            failed_in: None,
            error_kind: None,
            error: None,
            device: None,
            config: None,
            module_diff: None,
            interfaces: Vec::new(),
            warnings: Vec::new(),
            partial_failures: Vec::new(),
            protocol: None,
            credential: None,
            attempts: 0,
            outputs: IndexMap::new(),
            debug_transcript: None,
            started_at,
            finished_at: started_at,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status != SnapshotStatus::Failure
    }

    /// Output of a step, kept only when the run failed.
    pub fn output(&self, step: &str) -> Option<&str> {
        self.outputs.get(step).map(String::as_str)
    }
}
