//! PTY channel for interactive device sessions.

use std::time::Duration;

use bytes::Bytes;
use log::trace;
use regex::bytes::Regex;
use russh::client::Msg;
use russh::{Channel, ChannelMsg};

use super::buffer::PatternBuffer;
use super::transcript::SessionTranscript;
use crate::error::{ChannelError, Result};

/// Default number of trailing bytes searched for a prompt.
pub const DEFAULT_SEARCH_DEPTH: usize = 1000;

/// Interactive shell channel with prompt-bounded reads.
///
/// One channel carries one conversation with the device's CLI, so all
/// operations take `&mut self`.
pub struct PtyChannel {
    /// The SSH shell channel.
    channel: Channel<Msg>,

    /// Pattern buffer for accumulating output.
    buffer: PatternBuffer,

    /// Optional verbose transcript.
    transcript: Option<SessionTranscript>,

    /// Whether the channel is open.
    is_open: bool,
}

impl PtyChannel {
    /// Wrap an opened shell channel.
    pub fn new(
        channel: Channel<Msg>,
        search_depth: usize,
        transcript: Option<SessionTranscript>,
    ) -> Self {
        Self {
            channel,
            buffer: PatternBuffer::new(search_depth),
            transcript,
            is_open: true,
        }
    }

    /// Check if the channel is open.
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Send a line of input, terminated with a newline.
    pub async fn send(&mut self, line: &str) -> Result<()> {
        self.write_line(line, false).await
    }

    /// Send a line that must not appear in the transcript or logs.
    pub async fn send_hidden(&mut self, line: &str) -> Result<()> {
        self.write_line(line, true).await
    }

    async fn write_line(&mut self, line: &str, hidden: bool) -> Result<()> {
        if !self.is_open {
            return Err(ChannelError::Closed.into());
        }
        if hidden {
            trace!("send: <hidden>");
        } else {
            trace!("send: {:?}", line);
        }
        if let Some(transcript) = self.transcript.as_mut() {
            transcript.sent(line, hidden).await;
        }

        let mut data = Vec::with_capacity(line.len() + 1);
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');
        self.channel
            .data(&data[..])
            .await
            .map_err(ChannelError::Ssh)?;
        Ok(())
    }

    /// Read until `pattern` matches the tail of the output or `timeout`
    /// elapses. Returns everything read, ANSI-stripped.
    pub async fn read_until_pattern(&mut self, pattern: &Regex, timeout: Duration) -> Result<Bytes> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if self.buffer.tail_contains(pattern) {
                return Ok(self.buffer.take());
            }

            let chunk = self.read_raw_chunk(deadline, timeout).await?;
            self.buffer.extend(&chunk);
        }
    }

    /// Read until the last line of output is a prompt matching `pattern`.
    ///
    /// Stricter than [`read_until_pattern`](Self::read_until_pattern): a line
    /// in the middle of command output that looks like a prompt does not end
    /// the read.
    pub async fn read_until_prompt(&mut self, pattern: &Regex, timeout: Duration) -> Result<Bytes> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if self.buffer.ends_with_match(pattern) {
                return Ok(self.buffer.take());
            }

            let chunk = self.read_raw_chunk(deadline, timeout).await?;
            self.buffer.extend(&chunk);
        }
    }

    /// Wait for the next chunk of raw output.
    pub async fn read_raw_chunk(
        &mut self,
        deadline: tokio::time::Instant,
        timeout: Duration,
    ) -> Result<Vec<u8>> {
        loop {
            let msg = tokio::time::timeout_at(deadline, self.channel.wait())
                .await
                .map_err(|_| ChannelError::PatternTimeout(timeout))?;

            match msg {
                Some(ChannelMsg::Data { data }) => {
                    return Ok(self.record(&data).await);
                }
                Some(ChannelMsg::ExtendedData { data, .. }) => {
                    return Ok(self.record(&data).await);
                }
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    self.is_open = false;
                    return Err(ChannelError::Closed.into());
                }
                Some(other) => {
                    trace!("ignoring channel message: {:?}", other);
                }
            }
        }
    }

    async fn record(&mut self, data: &[u8]) -> Vec<u8> {
        if let Some(transcript) = self.transcript.as_mut() {
            transcript.received(data).await;
        }
        data.to_vec()
    }

    /// Discard any buffered, not yet consumed output.
    pub fn clear_buffer(&mut self) {
        self.buffer.clear();
    }

    /// Write a marker line into the transcript, if one is attached.
    pub async fn note(&mut self, message: &str) {
        if let Some(transcript) = self.transcript.as_mut() {
            transcript.note(message).await;
        }
    }

    /// Close the channel and flush the transcript. Errors are ignored: the
    /// transport is torn down right after.
    pub async fn close(&mut self) {
        if self.is_open {
            let _ = self.channel.eof().await;
            let _ = self.channel.close().await;
            self.is_open = false;
        }
        if let Some(transcript) = self.transcript.as_mut() {
            transcript.flush().await;
        }
    }
}
