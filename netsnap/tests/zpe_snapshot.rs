mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;

use common::*;
use netsnap::model::{AttributeValue, NetworkClass};
use netsnap::{ConfigOutcome, SnapshotOptions, SnapshotResult, SnapshotStatus};

async fn snapshot(page_size: usize) -> SnapshotResult {
    init_logging();
    let engine = engine(Arc::new(FakeConnector::zpe(page_size)));
    let credentials = vec![account(1, "console", "admin", None)];
    let options = SnapshotOptions {
        timestamp: Some(now()),
        ..SnapshotOptions::default()
    };
    engine.run_snapshot(&zpe_device(), &credentials, options).await
}

#[tokio::test]
async fn test_zpe_snapshot() {
    let result = snapshot(13).await;
    assert_eq!(result.status, SnapshotStatus::Success, "{:?}", result.error);

    let device = result.device.as_ref().unwrap();
    assert_eq!(device.name, "NODEGRID-1");
    assert_eq!(device.software_version, "3.1.16");
    assert_eq!(device.family, "NSC-T16S");
    assert_eq!(device.location, "Nodegrid");
    assert_eq!(device.contact, "support@zpesystems.com");
    assert_eq!(device.network_class, NetworkClass::Switch);
    assert_eq!(device.serial_number, "1416161616");
    assert_eq!(device.attributes.get("mainMemorySize"), Some(&AttributeValue::Numeric(3842.0)));
    assert_eq!(device.attributes.get("licenseCount"), Some(&AttributeValue::Numeric(16.0)));
    assert_eq!(
        device.attributes.get("biosVersion").and_then(|v| v.as_text()),
        Some("80168T00")
    );
    assert_eq!(
        device.attributes.get("cpuInfo").and_then(|v| v.as_text()),
        Some("Intel(R) Atom(TM) CPU E3827  @ 1.74GHz (2 core(s))")
    );

    let Some(ConfigOutcome::New(config)) = &result.config else {
        panic!("expected a new config, got {:?}", result.config);
    };
    assert_eq!(config.author, "homer");
    assert_eq!(
        config.attributes.get("softwareVersion").and_then(|v| v.as_text()),
        Some("3.1.16")
    );
    let settings = config.attributes.get("settings").and_then(|v| v.as_text()).unwrap();
    assert!(settings.contains("/settings/system_preferences enable_banner=no"));

    assert_eq!(device.modules.len(), 1);
    assert_eq!(device.modules[0].slot, "Chassis");
    assert_eq!(device.modules[0].serial_number, "1416161616");
    assert_eq!(device.modules[0].part_number, "NSC-T16S-STND-DAC-F-SFP");
}

#[tokio::test]
async fn test_zpe_interfaces() {
    let result = snapshot(13).await;
    let device = result.device.as_ref().unwrap();

    let ports: Vec<&str> = device
        .interfaces
        .iter()
        .map(|i| i.name.as_str())
        .filter(|n| n.starts_with("ttyS"))
        .collect();
    assert_eq!(ports.len(), 10);

    let tty10 = device.interface("ttyS10").unwrap();
    assert_eq!(tty10.description, "JJJ-JJJ-JJJ-JJJ-JJJJ");
    let tty1 = device.interface("ttyS1").unwrap();
    assert_eq!(tty1.description, "AAA-AAA-AAA-AAA-AAAA");
    assert!(device.interface("usbS1").is_some());

    let bond = device.interface("bond").unwrap();
    let addresses: Vec<String> = bond.addresses.iter().map(|a| a.to_string()).collect();
    assert_eq!(addresses, vec!["10.10.16.16/24"]);
    assert!(device.interface("ETH0").unwrap().addresses.is_empty());
    assert!(device.interface("ETH1").is_some());
}

#[tokio::test]
async fn test_paged_output_reads_like_unpaged() {
    let unpaged = snapshot(1000).await;
    let paged = snapshot(5).await;
    assert_eq!(paged.status, SnapshotStatus::Success, "{:?}", paged.error);

    let (unpaged, paged) = (unpaged.device.unwrap(), paged.device.unwrap());
    assert_eq!(paged.name, unpaged.name);
    assert_eq!(paged.software_version, unpaged.software_version);
    assert_eq!(paged.attributes, unpaged.attributes);
    assert_eq!(paged.modules, unpaged.modules);
    assert_eq!(paged.interfaces, unpaged.interfaces);
    assert_eq!(paged.last_config, unpaged.last_config);
}
