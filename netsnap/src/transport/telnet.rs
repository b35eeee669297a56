//! Telnet transport over a tokio TCP stream.
//!
//! Only enough of RFC 854 is implemented to get a line-oriented session:
//! the server may echo and suppress go-ahead, every other option is
//! refused and sub-negotiations are skipped. Login prompts are handled by
//! the driver's CLI modes, not here.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use log::{debug, trace};
use memchr::memchr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use super::Transport;
use super::config::TelnetConfig;
use crate::error::{ConnectFailure, TransportError};

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

const OPT_ECHO: u8 = 1;
const OPT_SGA: u8 = 3;

/// Any bidirectional async byte stream.
pub trait TelnetStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> TelnetStream for T {}

/// Telnet transport.
pub struct TelnetTransport {
    config: TelnetConfig,
    stream: Option<Box<dyn TelnetStream>>,
    codec: TelnetCodec,
    read_buf: BytesMut,
}

impl TelnetTransport {
    /// Create an unconnected transport; `connect` dials TCP.
    pub fn new(config: TelnetConfig) -> Self {
        Self {
            config,
            stream: None,
            codec: TelnetCodec::default(),
            read_buf: BytesMut::with_capacity(4096),
        }
    }

    /// Wrap an already connected stream.
    pub fn from_stream(config: TelnetConfig, stream: impl TelnetStream + 'static) -> Self {
        let mut transport = Self::new(config);
        transport.stream = Some(Box::new(stream));
        transport
    }

    fn connect_error(&self, failure: ConnectFailure, message: impl Into<String>) -> TransportError {
        TransportError::Connect {
            host: self.config.host.clone(),
            port: self.config.port,
            failure,
            message: message.into(),
        }
    }
}

#[async_trait]
impl Transport for TelnetTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.stream.is_some() {
            return Ok(());
        }
        debug!("Connecting to {}:{} over Telnet", self.config.host, self.config.port);

        let stream = tokio::time::timeout(
            self.config.timeout,
            TcpStream::connect((self.config.host.as_str(), self.config.port)),
        )
        .await
        .map_err(|_| {
            self.connect_error(
                ConnectFailure::Timeout,
                format!("no answer within {:?}", self.config.timeout),
            )
        })?
        .map_err(|e| self.connect_error(ConnectFailure::from_io(&e), e.to_string()))?;

        stream.set_nodelay(true)?;
        self.stream = Some(Box::new(stream));
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        if data.is_empty() {
            return Ok(());
        }
        stream.write_all(&TelnetCodec::encode(data)).await?;
        stream.flush().await?;
        Ok(())
    }

    async fn read_available(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
            self.read_buf.clear();
            let read = tokio::time::timeout_at(deadline, stream.read_buf(&mut self.read_buf))
                .await
                .map_err(|_| TransportError::ReadTimeout(timeout))??;
            if read == 0 {
                return Err(TransportError::Disconnected);
            }

            let decoded = self.codec.decode(&self.read_buf);
            if !decoded.replies.is_empty() {
                trace!("Telnet negotiation reply {:?}", decoded.replies);
                stream.write_all(&decoded.replies).await?;
                stream.flush().await?;
            }
            if !decoded.data.is_empty() {
                return Ok(decoded.data);
            }
        }
    }

    async fn disconnect(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum State {
    #[default]
    Data,
    Iac,
    Negotiate(u8),
    Sub,
    SubIac,
}

/// Output of one [`TelnetCodec::decode`] call.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Decoded {
    /// Application bytes with all telnet commands removed.
    pub data: Vec<u8>,
    /// Negotiation answers to send back.
    pub replies: Vec<u8>,
}

/// Incremental telnet command parser.
///
/// State survives across calls, so a command split over two reads is
/// decoded correctly.
#[derive(Debug, Default)]
pub struct TelnetCodec {
    state: State,
    answered: HashSet<(u8, u8)>,
}

impl TelnetCodec {
    pub fn decode(&mut self, input: &[u8]) -> Decoded {
        let mut out = Decoded::default();
        let mut i = 0;

        while i < input.len() {
            match self.state {
                State::Data => match memchr(IAC, &input[i..]) {
                    Some(pos) => {
                        out.data.extend_from_slice(&input[i..i + pos]);
                        i += pos + 1;
                        self.state = State::Iac;
                    }
                    None => {
                        out.data.extend_from_slice(&input[i..]);
                        i = input.len();
                    }
                },
                State::Iac => {
                    let byte = input[i];
                    i += 1;
                    self.state = match byte {
                        IAC => {
                            out.data.push(IAC);
                            State::Data
                        }
                        WILL | WONT | DO | DONT => State::Negotiate(byte),
                        SB => State::Sub,
                        // NOP, GA, DM and friends carry no payload
                        _ => State::Data,
                    };
                }
                State::Negotiate(command) => {
                    let option = input[i];
                    i += 1;
                    self.negotiate(command, option, &mut out.replies);
                    self.state = State::Data;
                }
                State::Sub => {
                    if input[i] == IAC {
                        self.state = State::SubIac;
                    }
                    i += 1;
                }
                State::SubIac => {
                    self.state = if input[i] == SE { State::Data } else { State::Sub };
                    i += 1;
                }
            }
        }

        out
    }

    fn negotiate(&mut self, command: u8, option: u8, replies: &mut Vec<u8>) {
        let answer = match command {
            WILL if option == OPT_ECHO || option == OPT_SGA => DO,
            WILL => DONT,
            DO if option == OPT_SGA => WILL,
            DO => WONT,
            WONT => DONT,
            DONT => WONT,
            _ => return,
        };
        // Answer each (verb, option) once so peers cannot make us loop
        if self.answered.insert((answer, option)) {
            replies.extend_from_slice(&[IAC, answer, option]);
        }
    }

    /// Escape outgoing data (IAC is doubled).
    pub fn encode(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(data.len());
        let mut rest = data;
        while let Some(pos) = memchr(IAC, rest) {
            out.extend_from_slice(&rest[..=pos]);
            out.push(IAC);
            rest = &rest[pos + 1..];
        }
        out.extend_from_slice(rest);
        out
    }
}
