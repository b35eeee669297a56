//! Credential candidate ordering.

use super::{CredentialScope, CredentialSet};
use crate::model::Device;
use crate::transport::Protocol;

/// Order the credential sets to try against `device` over `protocol`.
///
/// The device-specific set comes first. When it exists and the device
/// does not allow automatic fallback, it is the only candidate. Otherwise
/// sets of the device's domain follow, then global sets. Sets owned by
/// other devices and sets that cannot be used over `protocol` are left out.
pub fn candidates<'a>(
    device: &Device,
    sets: &'a [CredentialSet],
    protocol: Protocol,
) -> Vec<&'a CredentialSet> {
    let usable = || sets.iter().filter(move |s| s.usable_over(protocol));

    let specific: Vec<&CredentialSet> = usable()
        .filter(|s| s.scope == CredentialScope::Device(device.id))
        .collect();
    if !specific.is_empty() && !device.auto_try_credentials {
        return specific;
    }

    let domain = usable().filter(|s| match (&s.scope, &device.domain) {
        (CredentialScope::Domain(owner), Some(domain)) => owner == domain,
        _ => false,
    });
    let global = usable().filter(|s| s.scope == CredentialScope::Global);

    specific.into_iter().chain(domain).chain(global).collect()
}
