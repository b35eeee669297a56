//! Network interfaces.

use serde::Serialize;

use super::address::{InterfaceAddress, MacAddress};
use super::attribute::AttributeBag;

/// One interface as observed in a snapshot.
///
/// Interfaces are replaced wholesale by every snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkInterface {
    pub name: String,
    /// Parent virtual device (context, VDOM, ...), empty for the main system.
    pub virtual_device: String,
    pub description: String,
    pub vrf: String,
    pub mac_address: Option<MacAddress>,
    pub enabled: bool,
    pub level3: bool,
    pub addresses: Vec<InterfaceAddress>,
    pub attributes: AttributeBag,
}

impl NetworkInterface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            virtual_device: String::new(),
            description: String::new(),
            vrf: String::new(),
            mac_address: None,
            enabled: true,
            level3: true,
            addresses: Vec::new(),
            attributes: AttributeBag::new(),
        }
    }

    pub fn ipv4_addresses(&self) -> impl Iterator<Item = &InterfaceAddress> {
        self.addresses.iter().filter(|a| a.address.is_ipv4())
    }

    pub fn ipv6_addresses(&self) -> impl Iterator<Item = &InterfaceAddress> {
        self.addresses.iter().filter(|a| a.address.is_ipv6())
    }
}
