mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use common::*;
use netsnap::credentials::CredentialSet;
use netsnap::model::{Config, Device, NetworkInterface};
use netsnap::{DeviceRepository, ErrorKind, ModuleDiff, SnapshotOptions, SnapshotSink, SnapshotStatus};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

struct Repository {
    device: Device,
    enable_secret: &'static str,
}

#[async_trait]
impl DeviceRepository for Repository {
    async fn load_device(&self, id: u64) -> Result<Device, BoxError> {
        if id == self.device.id {
            Ok(self.device.clone())
        } else {
            Err(format!("no device {id}").into())
        }
    }

    async fn credentials_for(&self, _device: &Device) -> Result<Vec<CredentialSet>, BoxError> {
        Ok(vec![account(1, "lab", "admin", Some(self.enable_secret))])
    }
}

#[derive(Default)]
struct Saved {
    name: String,
    config_author: Option<String>,
    modules: usize,
    interfaces: usize,
}

#[derive(Default)]
struct Sink {
    saved: Mutex<Vec<Saved>>,
    failed: Mutex<Vec<Device>>,
}

#[async_trait]
impl SnapshotSink for Sink {
    async fn save_snapshot_result(
        &self,
        device: &Device,
        config: Option<&Config>,
        modules: &ModuleDiff,
        interfaces: &[NetworkInterface],
    ) -> Result<(), BoxError> {
        self.saved.lock().unwrap().push(Saved {
            name: device.name.clone(),
            config_author: config.map(|c| c.author.clone()),
            modules: modules.entries.len(),
            interfaces: interfaces.len(),
        });
        Ok(())
    }

    async fn record_failure(&self, device: &Device) -> Result<(), BoxError> {
        self.failed.lock().unwrap().push(device.clone());
        Ok(())
    }
}

#[tokio::test]
async fn test_successful_run_is_saved() {
    init_logging();
    let engine = engine(Arc::new(FakeConnector::cisco("enable-secret")));
    let repository = Repository {
        device: cisco_device(),
        enable_secret: "enable-secret",
    };
    let sink = Sink::default();

    let result = engine
        .run_and_save(&repository, &sink, 1, SnapshotOptions::default())
        .await
        .unwrap();

    assert_eq!(result.status, SnapshotStatus::Success);
    let saved = sink.saved.lock().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].name, "router1");
    assert_eq!(saved[0].config_author.as_deref(), Some("admin"));
    assert_eq!(saved[0].modules, 5);
    assert_eq!(saved[0].interfaces, 5);
    assert!(sink.failed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_run_is_not_saved() {
    let engine = engine(Arc::new(FakeConnector::cisco("enable-secret")));
    let repository = Repository {
        device: cisco_device(),
        enable_secret: "wrong",
    };
    let sink = Sink::default();

    let result = engine
        .run_and_save(&repository, &sink, 1, SnapshotOptions::default())
        .await
        .unwrap();

    assert_eq!(result.status, SnapshotStatus::Failure);
    assert!(sink.saved.lock().unwrap().is_empty());
    let failed = sink.failed.lock().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].id, 1);
    assert_eq!(failed[0].last_snapshot_failure, Some(result.finished_at));
    assert!(failed[0].last_snapshot_success.is_none());
}

#[tokio::test]
async fn test_unknown_device_is_a_collaborator_error() {
    let engine = engine(Arc::new(FakeConnector::cisco("enable-secret")));
    let repository = Repository {
        device: cisco_device(),
        enable_secret: "enable-secret",
    };

    let err = engine
        .run_and_save(&repository, &Sink::default(), 42, SnapshotOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Collaborator);
    assert!(err.to_string().contains("no device 42"));
}

#[tokio::test]
async fn test_new_config_is_dumped() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config();
    config.dump_directory = Some(dir.path().to_path_buf());
    let engine = netsnap::SnapshotEngine::new(
        Arc::new(netsnap::DriverRegistry::builtin().unwrap()),
        Arc::new(FakeConnector::cisco("enable-secret")),
        config,
    );
    let credentials = vec![account(1, "lab", "admin", Some("enable-secret"))];

    let result = engine
        .run_snapshot(&cisco_device(), &credentials, SnapshotOptions::default())
        .await;
    assert_eq!(result.status, SnapshotStatus::Success);

    let dump = std::fs::read_to_string(dir.path().join("router1")).unwrap();
    assert!(dump.starts_with("!! IOS image file:\r\n!!  bootflash:packages.conf\r\n"));
    assert!(dump.contains("ip ssh version 2"));
    assert!(dump.contains("!! End of running configuration"));
}
