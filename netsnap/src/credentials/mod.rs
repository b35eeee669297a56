//! Credential sets and candidate ordering.
//!
//! Secrets are held as [`SecretString`] and never printed. Boundaries that
//! need to show a credential use [`CredentialSet::summary`], a projection
//! without any secret field.

mod resolver;

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

pub use resolver::candidates;

use crate::transport::Protocol;

/// Who may use a credential set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", content = "owner", rename_all = "lowercase")]
pub enum CredentialScope {
    /// Belongs to one device (by id).
    Device(u64),
    /// Shared by the devices of one management domain.
    Domain(String),
    /// Shared by every device.
    Global,
}

/// Username and password, with an optional enable secret.
pub struct CliAccount {
    pub username: String,
    pub password: SecretString,
    pub super_password: Option<SecretString>,
}

/// SSH public key login.
pub struct SshKeyAccount {
    pub username: String,
    /// OpenSSH private key text.
    pub private_key: SecretString,
    pub passphrase: Option<SecretString>,
    pub super_password: Option<SecretString>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SnmpVersion {
    V1,
    V2c,
}

pub struct SnmpCommunity {
    pub version: SnmpVersion,
    pub community: SecretString,
}

pub struct Snmpv3User {
    pub username: String,
    pub auth_protocol: Option<String>,
    pub auth_key: Option<SecretString>,
    pub privacy_protocol: Option<String>,
    pub privacy_key: Option<SecretString>,
}

/// The closed set of credential kinds.
pub enum CredentialKind {
    CliAccount(CliAccount),
    SshKeyAccount(SshKeyAccount),
    SnmpCommunity(SnmpCommunity),
    Snmpv3User(Snmpv3User),
}

impl CredentialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKind::CliAccount(_) => "cli-account",
            CredentialKind::SshKeyAccount(_) => "ssh-key-account",
            CredentialKind::SnmpCommunity(_) => "snmp-community",
            CredentialKind::Snmpv3User(_) => "snmpv3-user",
        }
    }
}

/// A named credential set.
pub struct CredentialSet {
    pub id: u64,
    pub name: String,
    pub scope: CredentialScope,
    pub kind: CredentialKind,
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("kind", &self.kind.as_str())
            .finish_non_exhaustive()
    }
}

/// Redacted view of a credential set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialSummary {
    pub id: u64,
    pub name: String,
    pub kind: &'static str,
    pub scope: CredentialScope,
    pub username: Option<String>,
}

impl CredentialSet {
    pub fn new(id: u64, name: impl Into<String>, scope: CredentialScope, kind: CredentialKind) -> Self {
        Self {
            id,
            name: name.into(),
            scope,
            kind,
        }
    }

    /// Convenience constructor for a CLI account.
    pub fn cli_account(
        id: u64,
        name: impl Into<String>,
        scope: CredentialScope,
        username: impl Into<String>,
        password: &str,
        super_password: Option<&str>,
    ) -> Self {
        Self::new(
            id,
            name,
            scope,
            CredentialKind::CliAccount(CliAccount {
                username: username.into(),
                password: SecretString::from(password.to_owned()),
                super_password: super_password.map(|s| SecretString::from(s.to_owned())),
            }),
        )
    }

    pub fn summary(&self) -> CredentialSummary {
        CredentialSummary {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind.as_str(),
            scope: self.scope.clone(),
            username: self.username().map(str::to_owned),
        }
    }

    pub fn username(&self) -> Option<&str> {
        match &self.kind {
            CredentialKind::CliAccount(a) => Some(&a.username),
            CredentialKind::SshKeyAccount(a) => Some(&a.username),
            CredentialKind::Snmpv3User(u) => Some(&u.username),
            CredentialKind::SnmpCommunity(_) => None,
        }
    }

    /// Password sent at a login prompt.
    pub fn password(&self) -> Option<&SecretString> {
        match &self.kind {
            CredentialKind::CliAccount(a) => Some(&a.password),
            _ => None,
        }
    }

    /// Secret sent at an elevation prompt; falls back to the password.
    pub fn super_password(&self) -> Option<&SecretString> {
        match &self.kind {
            CredentialKind::CliAccount(a) => a.super_password.as_ref().or(Some(&a.password)),
            CredentialKind::SshKeyAccount(a) => a.super_password.as_ref(),
            _ => None,
        }
    }

    /// Whether this set can authenticate over `protocol`.
    pub fn usable_over(&self, protocol: Protocol) -> bool {
        matches!(
            (&self.kind, protocol),
            (CredentialKind::CliAccount(_), Protocol::Ssh | Protocol::Telnet)
                | (CredentialKind::SshKeyAccount(_), Protocol::Ssh)
                | (
                    CredentialKind::SnmpCommunity(_) | CredentialKind::Snmpv3User(_),
                    Protocol::Snmp
                )
        )
    }

    /// Every non-empty secret of this set, for transcript masking.
    pub fn secrets(&self) -> Vec<&str> {
        let secrets: Vec<Option<&SecretString>> = match &self.kind {
            CredentialKind::CliAccount(a) => vec![Some(&a.password), a.super_password.as_ref()],
            CredentialKind::SshKeyAccount(a) => {
                vec![a.passphrase.as_ref(), a.super_password.as_ref()]
            }
            CredentialKind::SnmpCommunity(c) => vec![Some(&c.community)],
            CredentialKind::Snmpv3User(u) => vec![u.auth_key.as_ref(), u.privacy_key.as_ref()],
        };
        secrets
            .into_iter()
            .flatten()
            .map(|s| s.expose_secret())
            .filter(|s| !s.is_empty())
            .collect()
    }
}
