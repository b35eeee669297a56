//! Debug transcript of a CLI session.
//!
//! Every byte sent and received is recorded with a timestamp when
//! debugging is enabled for a run. Known secrets are replaced with a mask
//! before anything is stored, including in received text (devices that
//! echo what is typed would otherwise leak the password).

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

/// Replacement for masked secrets.
pub const MASK: &str = "********";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sent,
    Received,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    pub at: DateTime<Utc>,
    pub direction: Direction,
    pub text: String,
}

/// Recorded session exchanges.
#[derive(Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
    masks: Vec<SecretString>,
}

impl std::fmt::Debug for Transcript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transcript")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a secret to hide.
    pub fn mask(&mut self, secret: &str) {
        if !secret.is_empty() && !self.masks.iter().any(|m| m.expose_secret() == secret) {
            self.masks.push(SecretString::from(secret.to_owned()));
        }
    }

    fn masked(&self, text: &str) -> String {
        let mut text = text.to_owned();
        for secret in &self.masks {
            let secret = secret.expose_secret();
            if text.contains(secret) {
                text = text.replace(secret, MASK);
            }
        }
        text
    }

    fn push(&mut self, direction: Direction, text: &str) {
        if text.is_empty() {
            return;
        }
        let text = self.masked(text);
        self.entries.push(TranscriptEntry {
            at: Utc::now(),
            direction,
            text,
        });
    }

    pub fn sent(&mut self, text: &str) {
        self.push(Direction::Sent, text);
    }

    pub fn received(&mut self, text: &str) {
        self.push(Direction::Received, text);
    }

    /// Move the entries of `other` after ours.
    pub fn append(&mut self, other: Transcript) {
        self.entries.extend(other.entries);
        for secret in other.masks {
            self.mask(secret.expose_secret());
        }
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<TranscriptEntry> {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secrets_are_masked_both_ways() {
        let mut transcript = Transcript::new();
        transcript.mask("s3cret");
        transcript.sent("s3cret\r");
        transcript.received("s3cret\r\nrouter1#");
        transcript.received("");

        let entries = transcript.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].text, "********\r");
        assert_eq!(entries[0].direction, Direction::Sent);
        assert_eq!(entries[1].text, "********\r\nrouter1#");
        assert!(!format!("{transcript:?}").contains("s3cret"));
    }
}
