//! PN532 frame layout and command frame encoding.
//!
//! Every normal information frame exchanged with the chip has the shape:
//!
//! ```text
//! 00 00 FF LEN LCS TFI CMD DATA... DCS 00
//! ```
//!
//! - `LEN` counts `TFI + CMD + DATA`
//! - `LCS` is chosen so that `LEN + LCS == 0 (mod 256)`
//! - `DCS` is chosen so that `TFI + CMD + sum(DATA) + DCS == 0 (mod 256)`
//!
//! The ACK (`00 00 FF 00 FF 00`) and NACK (`00 00 FF FF 00 00`) control
//! frames carry no body.

/// Preamble byte sent before the start code.
pub const PREAMBLE: u8 = 0x00;

/// First start-code byte.
pub const START_CODE_1: u8 = 0x00;

/// Second start-code byte.
pub const START_CODE_2: u8 = 0xFF;

/// Postamble byte closing a frame.
pub const POSTAMBLE: u8 = 0x00;

/// Frame identifier for host-to-chip frames.
pub const TFI_HOST_TO_PN532: u8 = 0xD4;

/// Frame identifier for chip-to-host frames.
pub const TFI_PN532_TO_HOST: u8 = 0xD5;

/// Size of the reusable command frame buffer.
pub const MAX_FRAME_SIZE: usize = 64;

/// Bytes a command frame adds around its data:
/// preamble(1) + start(2) + LEN(1) + LCS(1) + TFI(1) + CMD(1) + DCS(1) + postamble(1).
pub const FRAME_OVERHEAD: usize = 9;

/// Largest command payload that fits in [`MAX_FRAME_SIZE`].
pub const MAX_PAYLOAD_SIZE: usize = MAX_FRAME_SIZE - FRAME_OVERHEAD;

/// ACK control frame as sent by the chip.
pub const ACK_FRAME: [u8; 6] = [0x00, 0x00, 0xFF, 0x00, 0xFF, 0x00];

/// NACK control frame.
pub const NACK_FRAME: [u8; 6] = [0x00, 0x00, 0xFF, 0xFF, 0x00, 0x00];

/// Wake-up sequence for a chip sitting in power-down over HSU.
///
/// Two `0x55` bytes followed by enough zeros to keep the line busy while the
/// oscillator starts. No response is expected.
pub const WAKEUP_SEQUENCE: [u8; 16] = [
    0x55, 0x55, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00,
];

/// Error type for frame encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// Payload exceeds [`MAX_PAYLOAD_SIZE`] or the output buffer is too small.
    FrameTooLarge,
}

impl core::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::FrameTooLarge => write!(f, "frame too large"),
        }
    }
}

/// Two's-complement checksum: the byte that brings `sum` to zero mod 256.
#[inline]
#[must_use]
pub const fn checksum(sum: u8) -> u8 {
    sum.wrapping_neg()
}

/// Wrapping sum of a byte slice.
#[inline]
#[must_use]
pub fn wrapping_sum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Encode a host-to-chip command frame into `buf`.
///
/// Returns the number of bytes written.
///
/// # Errors
///
/// Returns [`EncodeError::FrameTooLarge`] if `data` is longer than
/// [`MAX_PAYLOAD_SIZE`] or `buf` cannot hold the whole frame.
///
/// # Example
///
/// ```
/// use pn532_proto::frame::encode_command;
///
/// let mut buf = [0u8; 64];
/// let len = encode_command(0x02, &[], &mut buf).unwrap();
/// assert_eq!(&buf[..len], &[0x00, 0x00, 0xFF, 0x02, 0xFE, 0xD4, 0x02, 0x2A, 0x00]);
/// ```
pub fn encode_command(command: u8, data: &[u8], buf: &mut [u8]) -> Result<usize, EncodeError> {
    let frame_len = data.len() + FRAME_OVERHEAD;
    if data.len() > MAX_PAYLOAD_SIZE || buf.len() < frame_len {
        return Err(EncodeError::FrameTooLarge);
    }

    // TFI + command + data
    let len = (data.len() + 2) as u8;

    buf[0] = PREAMBLE;
    buf[1] = START_CODE_1;
    buf[2] = START_CODE_2;
    buf[3] = len;
    buf[4] = checksum(len);
    buf[5] = TFI_HOST_TO_PN532;
    buf[6] = command;
    buf[7..7 + data.len()].copy_from_slice(data);

    let sum = TFI_HOST_TO_PN532
        .wrapping_add(command)
        .wrapping_add(wrapping_sum(data));
    buf[7 + data.len()] = checksum(sum);
    buf[8 + data.len()] = POSTAMBLE;

    Ok(frame_len)
}
