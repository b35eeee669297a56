//! Interface IP and MAC addresses.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// What an address is used for on its interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AddressUsage {
    #[default]
    Primary,
    Secondary,
    Hsrp,
    Vrrp,
}

/// An address with its prefix length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct InterfaceAddress {
    pub address: IpAddr,
    pub prefix_len: u8,
    pub usage: AddressUsage,
}

impl InterfaceAddress {
    /// Build from an address and a prefix length, checking the length.
    pub fn new(address: IpAddr, prefix_len: u8) -> Option<Self> {
        let max = if address.is_ipv4() { 32 } else { 128 };
        (prefix_len <= max).then_some(Self {
            address,
            prefix_len,
            usage: AddressUsage::Primary,
        })
    }

    /// Parse textual address and prefix length (`10.0.0.1`, `24`).
    pub fn parse_prefix(address: &str, prefix: &str) -> Option<Self> {
        let address = IpAddr::from_str(address.trim()).ok()?;
        let prefix = prefix.trim().parse().ok()?;
        Self::new(address, prefix)
    }

    /// Parse an IPv4 address with a dotted mask (`255.255.255.0`).
    pub fn parse_mask(address: &str, mask: &str) -> Option<Self> {
        let address = Ipv4Addr::from_str(address.trim()).ok()?;
        let mask = Ipv4Addr::from_str(mask.trim()).ok()?;
        let prefix = mask_to_prefix(mask)?;
        Self::new(IpAddr::V4(address), prefix)
    }

    pub fn with_usage(mut self, usage: AddressUsage) -> Self {
        self.usage = usage;
        self
    }
}

impl fmt::Display for InterfaceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

/// Prefix length of a contiguous dotted mask.
pub fn mask_to_prefix(mask: Ipv4Addr) -> Option<u8> {
    let bits = u32::from(mask);
    let ones = bits.leading_ones();
    // A valid mask has no set bit after the first zero
    (bits.checked_shl(ones).unwrap_or(0) == 0).then_some(ones as u8)
}

/// A MAC address, printed as `aa:bb:cc:dd:ee:ff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for MacAddress {
    type Err = String;

    /// Accepts `5000.0001.0000`, `50:00:00:01:00:00` and `50-00-00-01-00-00`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '.' | ':' | '-'))
            .collect();
        if hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("invalid MAC address '{s}'"));
        }
        let mut octets = [0u8; 6];
        for (i, octet) in octets.iter_mut().enumerate() {
            *octet = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|e| format!("invalid MAC address '{s}': {e}"))?;
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
