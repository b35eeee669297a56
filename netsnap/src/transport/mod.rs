//! Byte-stream transports to one device.
//!
//! A [`Transport`] knows how to reach a device and move bytes; it never
//! interprets them. SSH and Telnet implementations are provided, and the
//! [`Connector`] trait is the seam through which the snapshot engine
//! obtains them (tests plug in scripted fakes here).

pub mod config;
mod snmp;
mod ssh;
mod telnet;

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

pub use config::{AuthMethod, HostKeyVerification, SshConfig, TelnetConfig};
pub use snmp::{
    SYS_UPTIME_OID, SnmpAuth, SnmpAuthProtocol, SnmpClient, SnmpPrivacyProtocol, SnmpV3Security,
    UdpSnmpClient,
};
pub use ssh::SshTransport;
pub use telnet::{TelnetCodec, TelnetTransport};

use crate::config::EngineConfig;
use crate::credentials::{CredentialKind, CredentialSet, SnmpVersion};
use crate::error::TransportError;

/// Raw connection to a device.
///
/// `disconnect` must be idempotent. Implementations release their socket
/// on drop as well, so a cancelled snapshot never leaks a connection.
#[async_trait]
pub trait Transport: Send {
    /// Open the connection (and authenticate, for SSH).
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Send bytes to the device.
    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Wait up to `timeout` for newly arrived bytes.
    ///
    /// Fails with [`TransportError::ReadTimeout`] when nothing arrived.
    async fn read_available(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError>;

    /// Close the connection.
    async fn disconnect(&mut self);

    /// Whether `connect` succeeded and `disconnect` was not called since.
    fn is_connected(&self) -> bool;
}

/// Access protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Ssh,
    Telnet,
    Snmp,
}

impl Protocol {
    /// CLI protocols drive an interactive session.
    pub fn is_cli(self) -> bool {
        matches!(self, Protocol::Ssh | Protocol::Telnet)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Ssh => "ssh",
            Protocol::Telnet => "telnet",
            Protocol::Snmp => "snmp",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Protocol::Ssh => 22,
            Protocol::Telnet => 23,
            Protocol::Snmp => 161,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where to connect for one snapshot run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    pub address: IpAddr,
    pub ssh_port: u16,
    pub telnet_port: u16,
    pub snmp_port: u16,
}

impl ConnectTarget {
    pub fn new(address: IpAddr) -> Self {
        Self {
            address,
            ssh_port: Protocol::Ssh.default_port(),
            telnet_port: Protocol::Telnet.default_port(),
            snmp_port: Protocol::Snmp.default_port(),
        }
    }

    pub fn port(&self, protocol: Protocol) -> u16 {
        match protocol {
            Protocol::Ssh => self.ssh_port,
            Protocol::Telnet => self.telnet_port,
            Protocol::Snmp => self.snmp_port,
        }
    }
}

/// Builds transports for the snapshot engine.
pub trait Connector: Send + Sync {
    /// Build an unconnected CLI transport.
    fn cli_transport(
        &self,
        protocol: Protocol,
        target: &ConnectTarget,
        credential: &CredentialSet,
        config: &EngineConfig,
    ) -> Result<Box<dyn Transport>, TransportError>;

    /// Build an SNMP client.
    fn snmp_client(
        &self,
        _target: &ConnectTarget,
        _credential: &CredentialSet,
        _config: &EngineConfig,
    ) -> Result<Box<dyn SnmpClient>, TransportError> {
        Err(TransportError::Unsupported {
            protocol: Protocol::Snmp.to_string(),
        })
    }
}

/// Default connector: real SSH, Telnet and SNMP sockets.
#[derive(Debug, Default, Clone, Copy)]
pub struct NetworkConnector;

impl Connector for NetworkConnector {
    fn cli_transport(
        &self,
        protocol: Protocol,
        target: &ConnectTarget,
        credential: &CredentialSet,
        config: &EngineConfig,
    ) -> Result<Box<dyn Transport>, TransportError> {
        let host = target.address.to_string();
        let port = target.port(protocol);
        let mismatch = || TransportError::CredentialMismatch {
            credential: credential.name.clone(),
            protocol: protocol.to_string(),
        };

        match protocol {
            Protocol::Ssh => {
                let (username, auth) = match &credential.kind {
                    CredentialKind::CliAccount(account) => (
                        account.username.clone(),
                        AuthMethod::Password(copy_secret(&account.password)),
                    ),
                    CredentialKind::SshKeyAccount(account) => (
                        account.username.clone(),
                        AuthMethod::PrivateKey {
                            key: copy_secret(&account.private_key),
                            passphrase: account.passphrase.as_ref().map(copy_secret),
                        },
                    ),
                    _ => return Err(mismatch()),
                };
                let ssh = SshConfig::new(host, port, username, auth)
                    .with_timeout(config.connect_timeout())
                    .with_terminal_size(config.terminal_width, config.terminal_height)
                    .with_host_key_verification(
                        config.host_key_verification.clone(),
                        config.known_hosts_path.clone(),
                    );
                Ok(Box::new(SshTransport::new(ssh)))
            }
            Protocol::Telnet => match &credential.kind {
                CredentialKind::CliAccount(_) => {
                    let telnet =
                        TelnetConfig::new(host, port).with_timeout(config.connect_timeout());
                    Ok(Box::new(TelnetTransport::new(telnet)))
                }
                _ => Err(mismatch()),
            },
            Protocol::Snmp => Err(mismatch()),
        }
    }

    fn snmp_client(
        &self,
        target: &ConnectTarget,
        credential: &CredentialSet,
        config: &EngineConfig,
    ) -> Result<Box<dyn SnmpClient>, TransportError> {
        let auth = match &credential.kind {
            CredentialKind::SnmpCommunity(c) => match c.version {
                SnmpVersion::V1 => SnmpAuth::V1 {
                    community: copy_secret(&c.community),
                },
                SnmpVersion::V2c => SnmpAuth::V2c {
                    community: copy_secret(&c.community),
                },
            },
            CredentialKind::Snmpv3User(user) => {
                let auth = match (&user.auth_protocol, &user.auth_key) {
                    (Some(protocol), Some(key)) => Some((protocol.parse()?, copy_secret(key))),
                    _ => None,
                };
                let privacy = match (&user.privacy_protocol, &user.privacy_key) {
                    (Some(protocol), Some(key)) if auth.is_some() => Some((protocol.parse()?, copy_secret(key))),
                    _ => None,
                };
                SnmpAuth::V3(SnmpV3Security {
                    username: user.username.clone(),
                    auth,
                    privacy,
                })
            }
            _ => {
                return Err(TransportError::CredentialMismatch {
                    credential: credential.name.clone(),
                    protocol: Protocol::Snmp.to_string(),
                });
            }
        };
        let agent = SocketAddr::new(target.address, target.port(Protocol::Snmp));
        Ok(Box::new(UdpSnmpClient::new(agent, auth, config.connect_timeout())))
    }
}

fn copy_secret(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_owned())
}
