mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;

use common::*;
use netsnap::model::{AttributeValue, NetworkClass};
use netsnap::{ConfigOutcome, ErrorKind, Protocol, SnapshotOptions, SnapshotPhase, SnapshotStatus};

fn options() -> SnapshotOptions {
    SnapshotOptions {
        timestamp: Some(now()),
        ..SnapshotOptions::default()
    }
}

#[tokio::test]
async fn test_cisco_snapshot() {
    init_logging();
    let connector = Arc::new(FakeConnector::cisco("enable-secret"));
    let engine = engine(Arc::clone(&connector));
    let credentials = vec![account(1, "lab", "admin", Some("enable-secret"))];

    let result = engine.run_snapshot(&cisco_device(), &credentials, options()).await;

    assert_eq!(result.status, SnapshotStatus::Success, "{:?}", result.error);
    assert_eq!(result.phase, SnapshotPhase::Done);
    assert_eq!(result.protocol, Some(Protocol::Ssh));
    assert_eq!(result.attempts, 1);
    assert_eq!(result.credential.as_ref().map(|c| c.name.as_str()), Some("lab"));
    assert!(result.partial_failures.is_empty());
    assert!(result.outputs.is_empty());

    let device = result.device.as_ref().unwrap();
    assert_eq!(device.name, "router1");
    assert_eq!(device.software_version, "15.5(3)S7b");
    assert_eq!(device.family, "Cisco CSR1000V");
    assert_eq!(device.location, "SNMPLOCATION");
    assert_eq!(device.contact, "SNMPCONTACT");
    assert_eq!(device.network_class, NetworkClass::Router);
    assert_eq!(device.serial_number, "96NETS96HOT");
    assert_eq!(device.attributes.get("mainMemorySize"), Some(&AttributeValue::Numeric(1071.0)));
    assert_eq!(
        device.attributes.get("configRegister"),
        Some(&AttributeValue::Text("0x2102".into()))
    );
    assert_eq!(
        device.attributes.get("configurationSaved"),
        Some(&AttributeValue::Binary(true))
    );
    assert_eq!(device.last_snapshot_success, Some(now()));

    let Some(ConfigOutcome::New(config)) = &result.config else {
        panic!("expected a new config, got {:?}", result.config);
    };
    assert_eq!(config.author, "admin");
    assert_eq!(config.created_at, now());
    assert_eq!(
        config.attributes.get("iosImageFile").and_then(|v| v.as_text()),
        Some("bootflash:packages.conf")
    );
    assert_eq!(
        config.attributes.get("iosVersion").and_then(|v| v.as_text()),
        Some("15.5(3)S7b")
    );
    let running = config
        .attributes
        .get("runningConfig")
        .and_then(|v| v.as_text())
        .unwrap();
    assert!(running.starts_with("version 15.5\n"));
    assert!(running.contains("ip ssh version 2"));
    assert_eq!(device.last_config.as_ref(), Some(config));
}

#[tokio::test]
async fn test_cisco_modules_reconciled() {
    let connector = Arc::new(FakeConnector::cisco("enable-secret"));
    let engine = engine(connector);
    let credentials = vec![account(1, "lab", "admin", Some("enable-secret"))];

    let result = engine.run_snapshot(&cisco_device(), &credentials, options()).await;
    let device = result.device.as_ref().unwrap();
    let modules = &device.modules;

    assert_eq!(modules.len(), 5);
    assert!(modules[0].removed);
    assert_eq!(modules[0].serial_number, "16161616TEST16");
    assert_eq!(modules[0].first_seen, earlier());
    assert!(modules[1].removed);
    assert_eq!(modules[2].slot, "Chassis");
    assert_eq!(modules[2].serial_number, "96NETS96HOT");
    assert_eq!(modules[2].part_number, "CSR1000V");
    assert_eq!(modules[2].first_seen, now());
    assert!(!modules[2].removed);
    assert_eq!(modules[3].slot, "module R0");
    assert_eq!(modules[4].slot, "module F0");
    assert_eq!(modules[4].serial_number, "");

    let diff = result.module_diff.as_ref().unwrap();
    assert_eq!(diff.added().count(), 3);
    assert_eq!(diff.newly_removed().count(), 2);
    assert_eq!(diff.kept().count(), 0);
}

#[tokio::test]
async fn test_cisco_interfaces() {
    let connector = Arc::new(FakeConnector::cisco("enable-secret"));
    let engine = engine(connector);
    let credentials = vec![account(1, "lab", "admin", Some("enable-secret"))];

    let result = engine.run_snapshot(&cisco_device(), &credentials, options()).await;
    let device = result.device.as_ref().unwrap();
    let names: Vec<&str> = device.interfaces.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Loopback0",
            "GigabitEthernet1",
            "GigabitEthernet2",
            "GigabitEthernet3",
            "GigabitEthernet4"
        ]
    );
    assert_eq!(result.interfaces, device.interfaces);

    let ge1 = device.interface("GigabitEthernet1").unwrap();
    assert_eq!(ge1.description, "Management");
    assert!(ge1.enabled);
    let addresses: Vec<String> = ge1.addresses.iter().map(|a| a.to_string()).collect();
    assert_eq!(addresses, vec!["192.168.200.101/24"]);
    assert_eq!(
        ge1.mac_address.map(|m| m.to_string()).as_deref(),
        Some("50:00:00:01:00:00")
    );

    let ge2 = device.interface("GigabitEthernet2").unwrap();
    assert_eq!(ge2.addresses[0].to_string(), "10.0.0.1/31");

    let ge3 = device.interface("GigabitEthernet3").unwrap();
    assert!(!ge3.enabled);
    assert!(ge3.addresses.is_empty());
    assert_eq!(
        ge3.mac_address.map(|m| m.to_string()).as_deref(),
        Some("50:00:00:01:00:02")
    );

    let loopback = device.interface("Loopback0").unwrap();
    assert_eq!(loopback.addresses[0].to_string(), "10.255.0.1/32");
    assert!(loopback.mac_address.is_none());
}

#[tokio::test]
async fn test_unchanged_config_is_not_stored_again() {
    let connector = Arc::new(FakeConnector::cisco("enable-secret"));
    let engine = engine(connector);
    let credentials = vec![account(1, "lab", "admin", Some("enable-secret"))];

    let first = engine.run_snapshot(&cisco_device(), &credentials, options()).await;
    let device = first.device.unwrap();

    let second = engine.run_snapshot(&device, &credentials, options()).await;
    assert_eq!(second.status, SnapshotStatus::Success);
    assert!(matches!(second.config, Some(ConfigOutcome::Unchanged)));

    // Stale modules stay removed, observed ones are kept
    let diff = second.module_diff.unwrap();
    assert_eq!(diff.kept().count(), 3);
    assert_eq!(diff.still_removed().count(), 2);
    assert_eq!(diff.added().count(), 0);
}

#[tokio::test]
async fn test_debug_transcript_masks_secrets() {
    let connector = Arc::new(FakeConnector::cisco("enable-secret"));
    let engine = engine(connector);
    let credentials = vec![account(1, "lab", "admin", Some("enable-secret"))];
    let options = SnapshotOptions {
        debug_enabled: true,
        ..options()
    };

    let result = engine.run_snapshot(&cisco_device(), &credentials, options).await;
    assert_eq!(result.status, SnapshotStatus::Success);

    let transcript = result.debug_transcript.unwrap();
    assert!(!transcript.is_empty());
    assert!(transcript.iter().any(|e| e.text.contains("show running-config")));
    assert!(transcript.iter().any(|e| e.text.contains(netsnap::driver::MASK)));
    assert!(transcript.iter().all(|e| !e.text.contains("enable-secret")));
}

#[tokio::test]
async fn test_required_step_failure() {
    let connector = Arc::new(FakeConnector::new("admin", "admin", |_| {
        Box::new(FakeCisco::new("enable-secret").rejecting("show version"))
    }));
    let engine = engine(connector);
    let credentials = vec![account(1, "lab", "admin", Some("enable-secret"))];

    let result = engine.run_snapshot(&cisco_device(), &credentials, options()).await;

    assert_eq!(result.status, SnapshotStatus::Failure);
    assert_eq!(result.failed_in, Some(SnapshotPhase::Connected));
    assert_eq!(result.error_kind, Some(ErrorKind::SnapshotIncomplete));
    assert!(result.error.as_deref().unwrap().contains("'version'"));
    assert!(result.device.is_none());
    assert!(result.config.is_none());
    assert!(result.module_diff.is_none());
    assert!(result.output("running-config").unwrap().contains("ip ssh version 2"));
    assert!(result.output("version").is_none());
}

#[tokio::test]
async fn test_optional_step_failure_is_partial() {
    let connector = Arc::new(FakeConnector::new("admin", "admin", |_| {
        Box::new(FakeCisco::new("enable-secret").rejecting("show inventory"))
    }));
    let engine = engine(connector);
    let credentials = vec![account(1, "lab", "admin", Some("enable-secret"))];

    let result = engine.run_snapshot(&cisco_device(), &credentials, options()).await;

    assert_eq!(result.status, SnapshotStatus::Partial);
    assert_eq!(result.partial_failures.len(), 1);
    assert_eq!(result.partial_failures[0].step, "inventory");
    assert_eq!(result.partial_failures[0].kind, ErrorKind::CommandRejected);

    // No inventory: every previous module is now removed
    let device = result.device.unwrap();
    assert_eq!(device.modules.len(), 2);
    assert!(device.modules.iter().all(|m| m.removed));
    assert_eq!(device.name, "router1");
}
