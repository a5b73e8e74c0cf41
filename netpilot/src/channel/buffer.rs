//! Output buffer with ANSI stripping and tail-only prompt search.
//!
//! Prompts always sit at the very end of what the device has sent, so only
//! the last `search_depth` bytes are searched. For a `show running-config`
//! on a large chassis that keeps prompt detection cheap.

use bytes::{Bytes, BytesMut};
use regex::bytes::Regex;
use vte::{Parser, Perform};

/// Buffer for accumulating device output and searching for prompts.
pub struct PatternBuffer {
    /// The accumulated, ANSI-free output.
    buffer: BytesMut,

    /// How many bytes from the end to search for patterns.
    search_depth: usize,

    /// Escape-sequence parser. Kept across `extend` calls so a sequence
    /// split over two reads is still removed.
    parser: Parser,
}

impl std::fmt::Debug for PatternBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternBuffer")
            .field("len", &self.buffer.len())
            .field("search_depth", &self.search_depth)
            .finish()
    }
}

/// Collects printable output, dropping escape and control sequences.
struct Printable<'a> {
    out: &'a mut BytesMut,
}

impl Perform for Printable<'_> {
    fn print(&mut self, c: char) {
        let mut utf8 = [0u8; 4];
        self.out
            .extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.out.extend_from_slice(&[byte]);
        }
    }
}

impl PatternBuffer {
    /// Create a new pattern buffer with the specified search depth.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            search_depth,
            parser: Parser::new(),
        }
    }

    /// Extend the buffer with new data, stripping ANSI escape codes.
    pub fn extend(&mut self, data: &[u8]) {
        let mut performer = Printable {
            out: &mut self.buffer,
        };
        self.parser.advance(&mut performer, data);
    }

    /// Search only the tail of the buffer for the pattern.
    ///
    /// Offsets in the returned match are relative to the start of the
    /// searched tail, not the full buffer.
    pub fn search_tail(&self, pattern: &Regex) -> Option<regex::bytes::Match<'_>> {
        pattern.find(self.tail())
    }

    /// Check if the tail contains a pattern match.
    pub fn tail_contains(&self, pattern: &Regex) -> bool {
        pattern.is_match(self.tail())
    }

    fn tail(&self) -> &[u8] {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        &self.buffer[start..]
    }

    /// The last line of the buffer (the prompt, once one has been matched).
    pub fn last_line(&self) -> &[u8] {
        last_line(&self.buffer)
    }

    /// Whether the last line, and only the last line, matches `pattern`.
    pub fn ends_with_match(&self, pattern: &Regex) -> bool {
        !self.buffer.is_empty() && pattern.is_match(self.last_line())
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Bytes {
        self.buffer.split().freeze()
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// The last non-blank line of `data`, without surrounding whitespace.
pub fn last_line(data: &[u8]) -> &[u8] {
    let trimmed = trim_end_whitespace(data);
    match memchr::memrchr(b'\n', trimmed) {
        Some(pos) => trim_start_cr(&trimmed[pos + 1..]),
        None => trim_start_cr(trimmed),
    }
}

fn trim_end_whitespace(data: &[u8]) -> &[u8] {
    let end = data
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |pos| pos + 1);
    &data[..end]
}

fn trim_start_cr(data: &[u8]) -> &[u8] {
    let start = data.iter().position(|b| *b != b'\r').unwrap_or(data.len());
    &data[start..]
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}
