//! Scripted in-memory transport for driver and service tests.

extern crate std;

use std::collections::VecDeque;
use std::vec::Vec;

use pn532_proto::frame::{checksum, wrapping_sum, TFI_PN532_TO_HOST};
use pn532_proto::{response_code, ACK_FRAME, WAKEUP_SEQUENCE};

use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError;

/// Build a chip-to-host data frame answering `command`.
pub fn response(command: u8, payload: &[u8]) -> Vec<u8> {
    let code = response_code(command);
    let len = (payload.len() + 2) as u8;
    let mut frame = std::vec![0x00, 0x00, 0xFF, len, checksum(len), TFI_PN532_TO_HOST, code];
    frame.extend_from_slice(payload);
    frame.push(checksum(
        TFI_PN532_TO_HOST
            .wrapping_add(code)
            .wrapping_add(wrapping_sum(payload)),
    ));
    frame.push(0x00);
    frame
}

/// ACK followed by the response to `command`, in one contiguous buffer.
pub fn ack_and_response(command: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = ACK_FRAME.to_vec();
    bytes.extend_from_slice(&response(command, payload));
    bytes
}

/// Split `bytes` into chunks of at most `size` bytes.
pub fn chunked(bytes: &[u8], size: usize) -> Vec<Vec<u8>> {
    bytes.chunks(size).map(<[u8]>::to_vec).collect()
}

/// Transport that answers each command write with a scripted reply.
///
/// Every non-wake-up write pops the next reply off the script and makes its
/// chunks readable, one chunk per `read` call. Wake-up writes are recorded but
/// never consume a reply.
#[derive(Default)]
pub struct MockTransport {
    script: VecDeque<Vec<Vec<u8>>>,
    rx: VecDeque<Vec<u8>>,
    written: Vec<Vec<u8>>,
    latency: usize,
    idle_left: usize,
    short_writes: bool,
    fail_reads: bool,
    polls: usize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply delivered as a single chunk.
    pub fn reply(self, bytes: Vec<u8>) -> Self {
        self.reply_chunks(std::vec![bytes])
    }

    /// Queue a reply delivered in the given chunks.
    pub fn reply_chunks(mut self, chunks: Vec<Vec<u8>>) -> Self {
        self.script.push_back(chunks);
        self
    }

    /// Make `bytes` readable now, without waiting for a command.
    pub fn inject(&mut self, bytes: Vec<u8>) {
        self.rx.push_back(bytes);
    }

    /// Report nothing available for `polls` polls before each chunk.
    pub fn with_latency(mut self, polls: usize) -> Self {
        self.latency = polls;
        self
    }

    /// Accept one byte less than requested on every write.
    pub fn short_writes(mut self) -> Self {
        self.short_writes = true;
        self
    }

    /// Fail every read with [`MockError`].
    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    /// Every write, wake-up sequences included.
    pub fn written(&self) -> &[Vec<u8>] {
        &self.written
    }

    /// Command frames written, wake-up sequences excluded.
    pub fn commands(&self) -> Vec<Vec<u8>> {
        self.written
            .iter()
            .filter(|w| w.as_slice() != WAKEUP_SEQUENCE.as_slice())
            .cloned()
            .collect()
    }

    /// Number of `bytes_available` calls so far.
    pub fn polls(&self) -> usize {
        self.polls
    }

    /// Replies not yet requested by a command.
    pub fn remaining_replies(&self) -> usize {
        self.script.len()
    }
}

impl Transport for MockTransport {
    type Error = MockError;

    async fn write(&mut self, data: &[u8]) -> Result<usize, MockError> {
        self.written.push(data.to_vec());
        if data != WAKEUP_SEQUENCE.as_slice() {
            if let Some(chunks) = self.script.pop_front() {
                self.rx.extend(chunks);
                self.idle_left = self.latency;
            }
        }
        if self.short_writes {
            Ok(data.len().saturating_sub(1))
        } else {
            Ok(data.len())
        }
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, MockError> {
        if self.fail_reads {
            return Err(MockError);
        }
        let Some(mut chunk) = self.rx.pop_front() else {
            return Ok(0);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            chunk.drain(..n);
            self.rx.push_front(chunk);
        } else {
            self.idle_left = self.latency;
        }
        Ok(n)
    }

    fn bytes_available(&mut self) -> Result<usize, MockError> {
        self.polls += 1;
        if self.rx.is_empty() {
            return Ok(0);
        }
        if self.idle_left > 0 {
            self.idle_left -= 1;
            return Ok(0);
        }
        Ok(self.rx.front().map_or(0, Vec::len))
    }
}
