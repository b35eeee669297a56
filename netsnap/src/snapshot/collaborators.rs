//! Seams to the persistence layer.

use async_trait::async_trait;
use log::info;

use super::{SnapshotEngine, SnapshotOptions, SnapshotResult};
use crate::credentials::CredentialSet;
use crate::error::{Result, SnapshotError};
use crate::model::{Config, Device, NetworkInterface};
use crate::reconcile::ModuleDiff;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Where devices and their credential pool come from.
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    async fn load_device(&self, id: u64) -> std::result::Result<Device, BoxError>;

    /// Credential sets the resolver may pick from for `device`.
    async fn credentials_for(&self, device: &Device) -> std::result::Result<Vec<CredentialSet>, BoxError>;
}

/// Stores snapshot results.
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    /// `config` is `None` when the configuration did not change.
    async fn save_snapshot_result(
        &self,
        device: &Device,
        config: Option<&Config>,
        modules: &ModuleDiff,
        interfaces: &[NetworkInterface],
    ) -> std::result::Result<(), BoxError>;

    /// Store `last_snapshot_failure` of a device whose run failed.
    async fn record_failure(&self, _device: &Device) -> std::result::Result<(), BoxError> {
        Ok(())
    }
}

fn collaborator(what: &'static str, error: BoxError) -> SnapshotError {
    SnapshotError::Collaborator {
        what,
        message: error.to_string(),
    }
}

impl SnapshotEngine {
    /// Load a device, snapshot it and hand a successful result to `sink`.
    ///
    /// After a failed run only the failure time of the device is
    /// recorded.
    pub async fn run_and_save(
        &self,
        repository: &dyn DeviceRepository,
        sink: &dyn SnapshotSink,
        device_id: u64,
        options: SnapshotOptions,
    ) -> Result<SnapshotResult> {
        let device = repository
            .load_device(device_id)
            .await
            .map_err(|e| collaborator("Loading the device", e))?;
        let credentials = repository
            .credentials_for(&device)
            .await
            .map_err(|e| collaborator("Loading the credentials", e))?;

        let result = self.run_snapshot(&device, &credentials, options).await;
        if let (Some(device), Some(modules)) = (&result.device, &result.module_diff) {
            let config = result.config.as_ref().and_then(|c| c.new_config());
            sink.save_snapshot_result(device, config, modules, &result.interfaces)
                .await
                .map_err(|e| collaborator("Saving the snapshot", e))?;
            info!("Snapshot of {} saved", device.label());
        } else {
            let mut device = device;
            device.last_snapshot_failure = Some(result.finished_at);
            sink.record_failure(&device)
                .await
                .map_err(|e| collaborator("Recording the failure", e))?;
            info!("Snapshot failure of {} recorded", device.label());
        }
        Ok(result)
    }
}
