//! Transport plus pattern buffer: the "expect" primitive.

use std::time::Duration;

use log::trace;
use tokio::time::Instant;

use super::buffer::PatternBuffer;
use super::patterns::CompiledPrompt;
use crate::error::{ChannelError, Result, TransportError};
use crate::transport::Transport;

/// Result of waiting for one of several prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectMatch {
    /// Index of the prompt that matched in the slice passed to `expect`.
    pub index: usize,
    /// Everything received before the match.
    pub before: String,
    /// The matched text itself.
    pub matched: String,
    /// Capture group 1 of the match.
    pub capture: Option<String>,
}

/// A connected transport with its receive buffer.
pub struct Channel {
    transport: Box<dyn Transport>,
    buffer: PatternBuffer,
}

impl Channel {
    pub fn new(transport: Box<dyn Transport>, search_depth: usize) -> Self {
        Self {
            transport,
            buffer: PatternBuffer::new(search_depth),
        }
    }

    /// Open the underlying transport.
    pub async fn connect(&mut self) -> Result<()> {
        self.transport.connect().await?;
        Ok(())
    }

    /// Send raw bytes.
    pub async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.transport.write(data).await?;
        Ok(())
    }

    /// Read until one of `prompts` matches the tail of the buffer.
    ///
    /// Prompts are tried in order, so the first entry wins when several
    /// match the same data. Everything up to the match is returned; bytes
    /// received after the match stay buffered for the next call.
    pub async fn expect(&mut self, prompts: &[&CompiledPrompt], timeout: Duration) -> Result<ExpectMatch> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(found) = self.find(prompts) {
                return Ok(found);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(ChannelError::PatternTimeout {
                    timeout,
                    partial: self.buffer.as_str_lossy().into_owned(),
                }
                .into());
            }

            match self.transport.read_available(deadline - now).await {
                Ok(data) => {
                    trace!("Received {} bytes", data.len());
                    self.buffer.extend(&data);
                }
                Err(TransportError::ReadTimeout(_)) => continue,
                Err(TransportError::Disconnected) => return Err(ChannelError::Closed.into()),
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn find(&mut self, prompts: &[&CompiledPrompt]) -> Option<ExpectMatch> {
        let offset = self.buffer.tail_start();
        let (index, found) = prompts
            .iter()
            .enumerate()
            .find_map(|(i, p)| p.find(self.buffer.tail()).map(|m| (i, m)))?;

        let start = offset + found.start;
        let end = offset + found.end;
        let data = self.buffer.take_until(end);
        Some(ExpectMatch {
            index,
            before: String::from_utf8_lossy(&data[..start]).into_owned(),
            matched: String::from_utf8_lossy(&data[start..end]).into_owned(),
            capture: found.capture,
        })
    }

    /// Discard anything received so far.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Disconnect the transport (idempotent).
    pub async fn close(&mut self) {
        self.transport.disconnect().await;
    }
}
