//! SNMP GET access over UDP.
//!
//! [`UdpSnmpClient`] speaks v1, v2c and v3 through `snmp2`. The session is
//! opened on the first request; v3 sessions discover the agent engine
//! before their first GET.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, trace};
use secrecy::{ExposeSecret, SecretString};
use snmp2::{AsyncSession, Oid, Value, v3};

use crate::error::TransportError;

/// `sysUpTime.0`, read to validate SNMP credentials.
pub const SYS_UPTIME_OID: &str = "1.3.6.1.2.1.1.3.0";

/// Minimal SNMP GET client.
#[async_trait]
pub trait SnmpClient: Send {
    /// Read one OID and render its value as text.
    async fn get(&mut self, oid: &str) -> Result<String, TransportError>;

    /// Release the socket.
    async fn close(&mut self) {}
}

/// How a [`UdpSnmpClient`] authenticates.
pub enum SnmpAuth {
    V1 { community: SecretString },
    V2c { community: SecretString },
    V3(SnmpV3Security),
}

/// USM parameters of an SNMPv3 user.
pub struct SnmpV3Security {
    pub username: String,
    pub auth: Option<(SnmpAuthProtocol, SecretString)>,
    pub privacy: Option<(SnmpPrivacyProtocol, SecretString)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnmpAuthProtocol {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl std::str::FromStr for SnmpAuthProtocol {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "md5" => Ok(SnmpAuthProtocol::Md5),
            "sha" | "sha1" => Ok(SnmpAuthProtocol::Sha1),
            "sha224" => Ok(SnmpAuthProtocol::Sha224),
            "sha256" => Ok(SnmpAuthProtocol::Sha256),
            "sha384" => Ok(SnmpAuthProtocol::Sha384),
            "sha512" => Ok(SnmpAuthProtocol::Sha512),
            other => Err(TransportError::Snmp(format!("unknown auth protocol '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnmpPrivacyProtocol {
    Des,
    Aes128,
    Aes192,
    Aes256,
}

impl std::str::FromStr for SnmpPrivacyProtocol {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "des" => Ok(SnmpPrivacyProtocol::Des),
            "aes" | "aes128" => Ok(SnmpPrivacyProtocol::Aes128),
            "aes192" => Ok(SnmpPrivacyProtocol::Aes192),
            "aes256" => Ok(SnmpPrivacyProtocol::Aes256),
            other => Err(TransportError::Snmp(format!("unknown privacy protocol '{other}'"))),
        }
    }
}

impl SnmpV3Security {
    fn to_security(&self) -> v3::Security {
        let password = self
            .auth
            .as_ref()
            .map(|(_, key)| key.expose_secret().as_bytes())
            .unwrap_or_default();
        let security = v3::Security::new(self.username.as_bytes(), password);
        let Some((protocol, _)) = &self.auth else {
            return security.with_auth(v3::Auth::NoAuthNoPriv);
        };
        let security = security.with_auth_protocol(match protocol {
            SnmpAuthProtocol::Md5 => v3::AuthProtocol::Md5,
            SnmpAuthProtocol::Sha1 => v3::AuthProtocol::Sha1,
            SnmpAuthProtocol::Sha224 => v3::AuthProtocol::Sha224,
            SnmpAuthProtocol::Sha256 => v3::AuthProtocol::Sha256,
            SnmpAuthProtocol::Sha384 => v3::AuthProtocol::Sha384,
            SnmpAuthProtocol::Sha512 => v3::AuthProtocol::Sha512,
        });
        match &self.privacy {
            None => security.with_auth(v3::Auth::AuthNoPriv),
            Some((cipher, key)) => security.with_auth(v3::Auth::AuthPriv {
                cipher: match cipher {
                    SnmpPrivacyProtocol::Des => v3::Cipher::Des,
                    SnmpPrivacyProtocol::Aes128 => v3::Cipher::Aes128,
                    SnmpPrivacyProtocol::Aes192 => v3::Cipher::Aes192,
                    SnmpPrivacyProtocol::Aes256 => v3::Cipher::Aes256,
                },
                privacy_password: key.expose_secret().as_bytes().to_vec(),
            }),
        }
    }
}

/// SNMP client over a UDP socket.
pub struct UdpSnmpClient {
    agent: SocketAddr,
    auth: SnmpAuth,
    timeout: Duration,
    session: Option<AsyncSession>,
}

impl UdpSnmpClient {
    pub fn new(agent: SocketAddr, auth: SnmpAuth, timeout: Duration) -> Self {
        Self {
            agent,
            auth,
            timeout,
            session: None,
        }
    }

    async fn open(&self) -> Result<AsyncSession, TransportError> {
        debug!("Opening SNMP session to {}", self.agent);
        let session = match &self.auth {
            SnmpAuth::V1 { community } => {
                AsyncSession::new_v1(self.agent, community.expose_secret().as_bytes(), 0).await?
            }
            SnmpAuth::V2c { community } => {
                AsyncSession::new_v2c(self.agent, community.expose_secret().as_bytes(), 0).await?
            }
            SnmpAuth::V3(security) => {
                let mut session = AsyncSession::new_v3(self.agent, 0, security.to_security()).await?;
                tokio::time::timeout(self.timeout, session.init())
                    .await
                    .map_err(|_| TransportError::ReadTimeout(self.timeout))?
                    .map_err(snmp_error)?;
                session
            }
        };
        Ok(session)
    }
}

#[async_trait]
impl SnmpClient for UdpSnmpClient {
    async fn get(&mut self, oid: &str) -> Result<String, TransportError> {
        let parsed = parse_oid(oid)?;
        let session = match self.session.take() {
            Some(session) => session,
            None => self.open().await?,
        };
        let session = self.session.insert(session);

        trace!("SNMP GET {oid}");
        let mut response = tokio::time::timeout(self.timeout, session.get(&parsed))
            .await
            .map_err(|_| TransportError::ReadTimeout(self.timeout))?
            .map_err(snmp_error)?;
        match response.varbinds.next() {
            Some((_, value)) => render(&value),
            None => Err(TransportError::Snmp(format!("empty response for {oid}"))),
        }
    }

    async fn close(&mut self) {
        self.session = None;
    }
}

fn snmp_error(e: snmp2::Error) -> TransportError {
    TransportError::Snmp(e.to_string())
}

/// Parse a dotted OID such as `1.3.6.1.2.1.1.3.0`.
fn parse_oid(text: &str) -> Result<Oid<'static>, TransportError> {
    let invalid = || TransportError::Snmp(format!("invalid OID '{text}'"));
    let arcs = text
        .trim_start_matches('.')
        .split('.')
        .map(|arc| arc.parse::<u64>().map_err(|_| invalid()))
        .collect::<Result<Vec<u64>, _>>()?;
    if arcs.len() < 2 {
        return Err(invalid());
    }
    Oid::from(&arcs).map_err(|_| invalid())
}

/// Render a varbind value the way drivers match it.
fn render(value: &Value<'_>) -> Result<String, TransportError> {
    let text = match value {
        Value::OctetString(bytes) | Value::Opaque(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        Value::Integer(n) => n.to_string(),
        Value::Counter32(n) | Value::Unsigned32(n) | Value::Timeticks(n) => n.to_string(),
        Value::Counter64(n) => n.to_string(),
        Value::IpAddress(octets) => Ipv4Addr::from(*octets).to_string(),
        Value::ObjectIdentifier(oid) => oid.to_id_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Null => String::new(),
        Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => {
            return Err(TransportError::Snmp(format!("no such object ({value:?})")));
        }
        other => format!("{other:?}"),
    };
    Ok(text)
}
