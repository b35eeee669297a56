//! Plain data handed to and returned by the engine.
//!
//! Everything here derives `Serialize` so a persistence layer can store
//! results without knowing the engine's internals.

mod address;
mod attribute;
mod config;
mod device;
mod interface;
mod module;

pub use address::{AddressUsage, InterfaceAddress, MacAddress, mask_to_prefix};
pub use attribute::{AttributeBag, AttributeLevel, AttributeType, AttributeValue, FileRef};
pub use config::Config;
pub use device::{Device, DeviceField, DeviceStatus, NetworkClass};
pub use interface::NetworkInterface;
pub use module::{Module, ModuleKey, ObservedModule};
