//! Pattern matching utilities for prompt detection.
//!
//! All driver patterns are compiled multi-line and CRLF aware: `^` and `$`
//! match at every line boundary whether the device ends lines with `\n`
//! or `\r\n`.

use regex::bytes::{Regex, RegexBuilder};

/// Trait for prompt matching - regex by default, extensible for custom parsers.
pub trait PromptMatcher: Send + Sync {
    /// Returns byte offset where match ends, or None if no match.
    fn find_match(&self, data: &[u8]) -> Option<usize>;

    /// Check if the data matches the pattern.
    fn is_match(&self, data: &[u8]) -> bool {
        self.find_match(data).is_some()
    }
}

impl PromptMatcher for Regex {
    fn find_match(&self, data: &[u8]) -> Option<usize> {
        self.find(data).map(|m| m.end())
    }
}

/// Compile a driver pattern (multi-line, CRLF aware).
pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .multi_line(true)
        .crlf(true)
        .build()
}

/// Compile a pattern applied to normalized command output.
pub fn compile_text_pattern(pattern: &str) -> Result<regex::Regex, regex::Error> {
    regex::RegexBuilder::new(pattern)
        .multi_line(true)
        .crlf(true)
        .build()
}

/// Where a prompt matched inside a haystack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMatch {
    pub start: usize,
    pub end: usize,
    /// First capture group, if the pattern has one and it participated.
    pub capture: Option<String>,
}

/// A compiled prompt pattern, optionally locked to a strict prompt.
///
/// Once a session has seen its first real prompt, capture group 1 of the
/// prompt pattern (typically the hostname plus the prompt character) is
/// remembered. A locked prompt only matches when group 1 is exactly that
/// text, so configuration lines that happen to look like a prompt are not
/// mistaken for the end of the output.
#[derive(Debug, Clone)]
pub struct CompiledPrompt {
    pattern: Regex,
    strict: Option<String>,
}

impl CompiledPrompt {
    /// Create a new compiled prompt from a pattern string.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: compile_pattern(pattern)?,
            strict: None,
        })
    }

    /// Wrap an already compiled regex.
    pub fn from_regex(pattern: Regex) -> Self {
        Self {
            pattern,
            strict: None,
        }
    }

    /// Copy of this prompt locked to `strict` (or unlocked with `None`).
    pub fn locked(&self, strict: Option<&str>) -> Self {
        Self {
            pattern: self.pattern.clone(),
            strict: strict.map(str::to_owned),
        }
    }

    /// Get a reference to the underlying regex.
    pub fn regex(&self) -> &Regex {
        &self.pattern
    }

    /// Find the first acceptable match.
    pub fn find(&self, data: &[u8]) -> Option<PromptMatch> {
        for caps in self.pattern.captures_iter(data) {
            let whole = caps.get(0)?;
            let capture = caps
                .get(1)
                .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned());
            if let (Some(strict), Some(seen)) = (self.strict.as_deref(), capture.as_deref()) {
                if strict != seen {
                    continue;
                }
            }
            return Some(PromptMatch {
                start: whole.start(),
                end: whole.end(),
                capture,
            });
        }
        None
    }
}

impl PromptMatcher for CompiledPrompt {
    fn find_match(&self, data: &[u8]) -> Option<usize> {
        self.find(data).map(|m| m.end)
    }
}
