//! Incremental PN532 frame decoder.
//!
//! Bytes coming back from the chip arrive in arbitrary chunks: a frame may be
//! split across several transport reads, and a single read may hold more than
//! one frame (typically an ACK immediately followed by the response). The
//! decoder therefore consumes one byte at a time and, once a frame completes,
//! keeps the unconsumed tail of the chunk so that the next call picks up
//! exactly where the previous one stopped.
//!
//! Framing errors (bad length checksum, bad data checksum, oversize length,
//! wrong direction byte) are recoverable: the decoder drops the frame in
//! progress, counts it in [`FrameDecoder::discarded`] and hunts for the next
//! start code.

use heapless::Vec;

use crate::frame::{wrapping_sum, START_CODE_1, START_CODE_2, TFI_PN532_TO_HOST};

/// Capacity of the frame body accumulator (`TFI + CMD + DATA`).
pub const BODY_CAPACITY: usize = 64;

/// Largest data payload a response frame can carry.
pub const MAX_RESPONSE_PAYLOAD: usize = BODY_CAPACITY - 2;

/// Capacity of the carry-over buffer between decode calls.
pub const PENDING_CAPACITY: usize = 128;

/// Kind of a decoded frame, handy for logging and error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameKind {
    Ack,
    Nack,
    Data,
}

/// Information frame sent by the chip in response to a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    /// Response code, the command code plus one.
    pub command: u8,
    /// Response data following the response code.
    pub payload: Vec<u8, MAX_RESPONSE_PAYLOAD>,
}

/// A complete frame produced by [`FrameDecoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Frame {
    Ack,
    Nack,
    Data(DataFrame),
}

impl Frame {
    #[inline]
    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::Ack => FrameKind::Ack,
            Frame::Nack => FrameKind::Nack,
            Frame::Data(_) => FrameKind::Data,
        }
    }
}

/// Error returned by [`FrameDecoder::feed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// The chunk does not fit behind the carried-over bytes.
    ChunkTooLarge,
}

impl core::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ChunkTooLarge => write!(f, "chunk too large"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    StartCode,
    Length,
    LengthChecksum,
    Body,
    DataChecksum,
    Postamble,
}

/// Byte-at-a-time PN532 frame decoder with carry-over of unconsumed bytes.
///
/// # Usage
///
/// Always call [`drain_pending`](Self::drain_pending) before feeding freshly
/// read bytes, so that bytes left over from a previous chunk are decoded
/// first:
///
/// ```
/// use pn532_proto::{Frame, FrameDecoder, ACK_FRAME};
///
/// let mut decoder = FrameDecoder::new();
/// let mut chunk = [0u8; 12];
/// chunk[..6].copy_from_slice(&ACK_FRAME);
/// chunk[6..].copy_from_slice(&ACK_FRAME);
///
/// assert_eq!(decoder.feed(&chunk), Ok(Some(Frame::Ack)));
/// assert_eq!(decoder.drain_pending(), Some(Frame::Ack));
/// assert_eq!(decoder.drain_pending(), None);
/// ```
pub struct FrameDecoder {
    state: State,
    len: u8,
    body: [u8; BODY_CAPACITY],
    body_pos: usize,
    pending: Vec<u8, PENDING_CAPACITY>,
    discarded: u32,
}

impl FrameDecoder {
    /// Create a decoder in the idle state with no carried-over bytes.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: State::Idle,
            len: 0,
            body: [0u8; BODY_CAPACITY],
            body_pos: 0,
            pending: Vec::new(),
            discarded: 0,
        }
    }

    /// Abandon any partially decoded frame.
    ///
    /// Carried-over bytes are kept; they belong to frames that have not been
    /// looked at yet.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.body_pos = 0;
    }

    /// Abandon the frame in progress and drop carried-over bytes.
    pub fn clear(&mut self) {
        self.reset();
        self.pending.clear();
    }

    /// Number of carried-over bytes waiting to be decoded.
    #[inline]
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Total number of frames dropped because of framing errors.
    #[inline]
    #[must_use]
    pub fn discarded(&self) -> u32 {
        self.discarded
    }

    /// Room left for [`feed`](Self::feed) before it rejects a chunk.
    #[inline]
    #[must_use]
    pub fn free_capacity(&self) -> usize {
        PENDING_CAPACITY - self.pending.len()
    }

    /// Decode carried-over bytes from the previous call.
    ///
    /// Returns `None` once every carried-over byte has been consumed without
    /// completing a frame; any partial frame state is kept for the next
    /// [`feed`](Self::feed).
    pub fn drain_pending(&mut self) -> Option<Frame> {
        if self.pending.is_empty() {
            return None;
        }
        let pending = core::mem::take(&mut self.pending);
        self.decode(&pending)
    }

    /// Decode a chunk of freshly received bytes.
    ///
    /// Stops at the first complete frame; bytes after it are carried over to
    /// the next call. If carried-over bytes are still waiting, the chunk is
    /// queued behind them and decoding resumes from the oldest byte.
    ///
    /// Returns [`DecodeError::ChunkTooLarge`] without consuming anything when
    /// the chunk is longer than [`free_capacity`](Self::free_capacity).
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Option<Frame>, DecodeError> {
        if chunk.len() > self.free_capacity() {
            return Err(DecodeError::ChunkTooLarge);
        }
        if self.pending.is_empty() {
            return Ok(self.decode(chunk));
        }
        // Fits: checked against free_capacity above
        let _ = self.pending.extend_from_slice(chunk);
        Ok(self.drain_pending())
    }

    fn decode(&mut self, bytes: &[u8]) -> Option<Frame> {
        for (i, &byte) in bytes.iter().enumerate() {
            if let Some(frame) = self.push_byte(byte) {
                self.carry_over(&bytes[i + 1..]);
                return Some(frame);
            }
        }
        None
    }

    /// Feed a single byte to the state machine.
    ///
    /// Returns `Some(frame)` on the byte that completes a frame.
    pub fn push_byte(&mut self, byte: u8) -> Option<Frame> {
        match self.state {
            State::Idle => {
                if byte == START_CODE_1 {
                    self.state = State::StartCode;
                }
            }
            State::StartCode => {
                if byte == START_CODE_2 {
                    self.state = State::Length;
                } else if byte != START_CODE_1 {
                    self.state = State::Idle;
                }
            }
            State::Length => {
                self.len = byte;
                self.state = State::LengthChecksum;
            }
            State::LengthChecksum => match (self.len, byte) {
                (0x00, 0xFF) => {
                    self.state = State::Idle;
                    return Some(Frame::Ack);
                }
                (0xFF, 0x00) => {
                    self.state = State::Idle;
                    return Some(Frame::Nack);
                }
                (len, lcs) if len.wrapping_add(lcs) != 0 => self.discard(),
                // A data frame needs at least TFI and a response code.
                (len, _) if len < 2 || usize::from(len) > BODY_CAPACITY => self.discard(),
                _ => {
                    self.body_pos = 0;
                    self.state = State::Body;
                }
            },
            State::Body => {
                self.body[self.body_pos] = byte;
                self.body_pos += 1;
                if self.body_pos >= usize::from(self.len) {
                    self.state = State::DataChecksum;
                }
            }
            State::DataChecksum => {
                let body = &self.body[..usize::from(self.len)];
                if wrapping_sum(body).wrapping_add(byte) != 0 {
                    self.discard();
                } else {
                    self.state = State::Postamble;
                }
            }
            State::Postamble => {
                if self.body[0] != TFI_PN532_TO_HOST {
                    self.discard();
                    return None;
                }
                self.state = State::Idle;

                let len = usize::from(self.len);
                let mut payload = Vec::new();
                // Cannot overflow: len <= BODY_CAPACITY
                let _ = payload.extend_from_slice(&self.body[2..len]);

                return Some(Frame::Data(DataFrame {
                    command: self.body[1],
                    payload,
                }));
            }
        }
        None
    }

    fn discard(&mut self) {
        self.discarded = self.discarded.wrapping_add(1);
        self.reset();
    }

    fn carry_over(&mut self, rest: &[u8]) {
        self.pending.clear();
        // Cannot overflow: `feed` bounds every input by PENDING_CAPACITY
        let _ = self.pending.extend_from_slice(rest);
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}
