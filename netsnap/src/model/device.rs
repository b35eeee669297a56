//! Devices.

use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::attribute::AttributeBag;
use super::config::Config;
use super::interface::NetworkInterface;
use super::module::Module;
use crate::transport::{ConnectTarget, Protocol};

/// Broad role of a device, as declared by its driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NetworkClass {
    Router,
    Switch,
    Switchrouter,
    Firewall,
    Loadbalancer,
    Server,
    Accesspoint,
    Wirelesscontroller,
    Consoleserver,
    Voicegateway,
    #[default]
    Unknown,
}

impl FromStr for NetworkClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let class = match s.trim().to_ascii_uppercase().as_str() {
            "ROUTER" => NetworkClass::Router,
            "SWITCH" => NetworkClass::Switch,
            "SWITCHROUTER" => NetworkClass::Switchrouter,
            "FIREWALL" => NetworkClass::Firewall,
            "LOADBALANCER" => NetworkClass::Loadbalancer,
            "SERVER" => NetworkClass::Server,
            "ACCESSPOINT" => NetworkClass::Accesspoint,
            "WIRELESSCONTROLLER" => NetworkClass::Wirelesscontroller,
            "CONSOLESERVER" => NetworkClass::Consoleserver,
            "VOICEGATEWAY" => NetworkClass::Voicegateway,
            "UNKNOWN" => NetworkClass::Unknown,
            other => return Err(format!("unknown network class '{other}'")),
        };
        Ok(class)
    }
}

/// Whether the device takes part in snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceStatus {
    #[default]
    InProduction,
    Disabled,
}

/// Device fields that driver rules may set directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceField {
    Name,
    Family,
    Location,
    Contact,
    SoftwareVersion,
    SerialNumber,
    NetworkClass,
    /// Accumulates into the VRF set.
    Vrf,
}

impl DeviceField {
    pub fn from_name(name: &str) -> Option<Self> {
        let field = match name {
            "name" => DeviceField::Name,
            "family" => DeviceField::Family,
            "location" => DeviceField::Location,
            "contact" => DeviceField::Contact,
            "softwareVersion" => DeviceField::SoftwareVersion,
            "serialNumber" => DeviceField::SerialNumber,
            "networkClass" => DeviceField::NetworkClass,
            "vrf" => DeviceField::Vrf,
            _ => return None,
        };
        Some(field)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceField::Name => "name",
            DeviceField::Family => "family",
            DeviceField::Location => "location",
            DeviceField::Contact => "contact",
            DeviceField::SoftwareVersion => "softwareVersion",
            DeviceField::SerialNumber => "serialNumber",
            DeviceField::NetworkClass => "networkClass",
            DeviceField::Vrf => "vrf",
        }
    }
}

impl fmt::Display for DeviceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// In-memory representation of one managed device.
#[derive(Debug, Clone, Serialize)]
pub struct Device {
    pub id: u64,
    pub name: String,
    pub management_address: IpAddr,
    /// Address to connect to when it differs from the management address.
    pub connect_address: Option<IpAddr>,
    pub ssh_port: Option<u16>,
    pub telnet_port: Option<u16>,
    pub driver: String,
    /// Management domain, used to pick domain-scoped credentials.
    pub domain: Option<String>,
    pub status: DeviceStatus,
    pub network_class: NetworkClass,
    pub family: String,
    pub location: String,
    pub contact: String,
    pub software_version: String,
    pub serial_number: String,
    pub vrfs: BTreeSet<String>,
    pub attributes: AttributeBag,
    pub modules: Vec<Module>,
    pub interfaces: Vec<NetworkInterface>,
    pub last_config: Option<Config>,
    /// Protocols to try, in order; empty means the driver's own order.
    pub protocol_order: Vec<Protocol>,
    /// Fall back to shared credentials when the device-specific set fails.
    pub auto_try_credentials: bool,
    pub last_snapshot_success: Option<DateTime<Utc>>,
    pub last_snapshot_failure: Option<DateTime<Utc>>,
}

impl Device {
    pub fn new(id: u64, driver: impl Into<String>, management_address: IpAddr) -> Self {
        Self {
            id,
            name: String::new(),
            management_address,
            connect_address: None,
            ssh_port: None,
            telnet_port: None,
            driver: driver.into(),
            domain: None,
            status: DeviceStatus::default(),
            network_class: NetworkClass::default(),
            family: String::new(),
            location: String::new(),
            contact: String::new(),
            software_version: String::new(),
            serial_number: String::new(),
            vrfs: BTreeSet::new(),
            attributes: AttributeBag::new(),
            modules: Vec::new(),
            interfaces: Vec::new(),
            last_config: None,
            protocol_order: Vec::new(),
            auto_try_credentials: true,
            last_snapshot_success: None,
            last_snapshot_failure: None,
        }
    }

    /// Where to connect, honouring the connect address and port overrides.
    pub fn connect_target(&self, force_address: Option<IpAddr>) -> ConnectTarget {
        let address = force_address
            .or(self.connect_address)
            .unwrap_or(self.management_address);
        let mut target = ConnectTarget::new(address);
        if let Some(port) = self.ssh_port {
            target.ssh_port = port;
        }
        if let Some(port) = self.telnet_port {
            target.telnet_port = port;
        }
        target
    }

    pub fn interface(&self, name: &str) -> Option<&NetworkInterface> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    /// Display label for logs.
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            format!("#{} ({})", self.id, self.management_address)
        } else {
            format!("{} ({})", self.name, self.management_address)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_connect_target_overrides() {
        let mut device = Device::new(1, "CiscoIOS12", IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
        device.ssh_port = Some(2222);
        device.connect_address = Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)));

        let target = device.connect_target(None);
        assert_eq!(target.address.to_string(), "10.0.0.2");
        assert_eq!(target.ssh_port, 2222);
        assert_eq!(target.telnet_port, 23);

        let forced = device.connect_target(Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 3))));
        assert_eq!(forced.address.to_string(), "10.0.0.3");
    }

    #[test]
    fn test_network_class_parse() {
        assert_eq!("router".parse::<NetworkClass>().unwrap(), NetworkClass::Router);
        assert_eq!("SWITCH".parse::<NetworkClass>().unwrap(), NetworkClass::Switch);
        assert!("toaster".parse::<NetworkClass>().is_err());
    }

    #[test]
    fn test_builtin_fields() {
        assert_eq!(DeviceField::from_name("softwareVersion"), Some(DeviceField::SoftwareVersion));
        assert_eq!(DeviceField::from_name("mainMemorySize"), None);
    }
}
