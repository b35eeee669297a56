//! Pattern buffer with efficient tail-search optimization.
//!
//! Only the last N bytes of the buffer are searched for prompt patterns,
//! rather than the entire output. For large outputs (full configurations,
//! routing tables) this keeps prompt detection cheap.
//!
//! Incoming bytes go through a `vte` parser so terminal escape sequences
//! (colours, cursor movement, screen clearing) never reach the buffer.
//! The parser is kept between chunks, so an escape sequence split across
//! two reads is still removed.

use memchr::memchr;
use regex::bytes::Regex;

/// Buffer for accumulating output and efficiently searching for patterns.
pub struct PatternBuffer {
    /// The accumulated output buffer.
    buffer: Vec<u8>,

    /// How many bytes from the end to search for patterns.
    search_depth: usize,

    /// Terminal escape sequence parser.
    parser: vte::Parser,
}

impl std::fmt::Debug for PatternBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternBuffer")
            .field("len", &self.buffer.len())
            .field("search_depth", &self.search_depth)
            .finish()
    }
}

/// Collects printable text and the control characters the engine needs.
struct Printable<'a>(&'a mut Vec<u8>);

impl vte::Perform for Printable<'_> {
    fn print(&mut self, c: char) {
        let mut utf8 = [0u8; 4];
        self.0.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        // LF, CR, TAB, BEL and backspace are interpreted later
        if matches!(byte, b'\n' | b'\r' | b'\t' | 0x07 | 0x08) {
            self.0.push(byte);
        }
    }
}

impl PatternBuffer {
    /// Create a new pattern buffer with the specified search depth.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            search_depth,
            parser: vte::Parser::new(),
        }
    }

    /// Extend the buffer with new data, stripping terminal escape codes.
    pub fn extend(&mut self, data: &[u8]) {
        let mut sink = Printable(&mut self.buffer);
        self.parser.advance(&mut sink, data);
    }

    /// Offset where the tail search region starts.
    ///
    /// The region is aligned to a line start so anchored prompt patterns
    /// never match the truncated end of an earlier line.
    pub fn tail_start(&self) -> usize {
        let cut = self.buffer.len().saturating_sub(self.search_depth);
        if cut == 0 {
            return 0;
        }
        match memchr(b'\n', &self.buffer[cut..]) {
            Some(pos) => cut + pos + 1,
            None => cut,
        }
    }

    /// Search only the tail of the buffer for the pattern.
    ///
    /// Returns the match with byte offsets relative to the start of the
    /// search region (see [`tail_start`](Self::tail_start)).
    pub fn search_tail(&self, pattern: &Regex) -> Option<regex::bytes::Match<'_>> {
        pattern.find(self.tail())
    }

    /// The tail search region.
    pub fn tail(&self) -> &[u8] {
        &self.buffer[self.tail_start()..]
    }

    /// Search the entire buffer for a pattern.
    pub fn search_full(&self, pattern: &Regex) -> Option<regex::bytes::Match<'_>> {
        pattern.find(&self.buffer)
    }

    /// Take the contents up to `end`; later bytes stay for the next search.
    pub fn take_until(&mut self, end: usize) -> Vec<u8> {
        let rest = self.buffer.split_off(end.min(self.buffer.len()));
        std::mem::replace(&mut self.buffer, rest)
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the buffer contents as a string (lossy UTF-8 conversion).
    pub fn as_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.buffer)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn search_depth(&self) -> usize {
        self.search_depth
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}
