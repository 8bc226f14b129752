//! PN532 wire protocol: frame encoding, incremental decoding and response
//! parsing.
//!
//! This crate contains everything about the PN532 host interface that does not
//! touch a transport:
//!
//! - [`frame`]: frame layout constants and [`encode_command`]
//! - [`decoder`]: the byte-at-a-time [`FrameDecoder`] with carry-over of bytes
//!   that follow a completed frame
//! - [`command`]: command codes, command data helpers and response parsers
//!   ([`parse_firmware_version`], [`parse_passive_target`])
//! - [`uid`]: the fixed-capacity [`Uid`] value type
//!
//! # Frame Format
//!
//! ```text
//! 00 00 FF LEN LCS TFI CMD DATA... DCS 00
//! ```
//!
//! `LEN + LCS` and `TFI + CMD + sum(DATA) + DCS` are both zero modulo 256.
//! The chip answers every command with an ACK frame followed by a response
//! frame whose TFI is `0xD5` and whose response code is the command code plus
//! one.
//!
//! # Example
//!
//! ```
//! use pn532_proto::{encode_command, Frame, FrameDecoder, ACK_FRAME, CMD_GET_FIRMWARE_VERSION};
//!
//! let mut buf = [0u8; 64];
//! let len = encode_command(CMD_GET_FIRMWARE_VERSION, &[], &mut buf).unwrap();
//! assert_eq!(&buf[..len], &[0x00, 0x00, 0xFF, 0x02, 0xFE, 0xD4, 0x02, 0x2A, 0x00]);
//!
//! let mut decoder = FrameDecoder::new();
//! assert_eq!(decoder.feed(&ACK_FRAME), Ok(Some(Frame::Ack)));
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod command;
pub mod decoder;
pub mod frame;
pub mod uid;

pub use command::{
    list_passive_target_data, max_retries_data, parse_firmware_version, parse_passive_target,
    response_code, sam_configuration_data, FirmwareVersion, ResponseError, SamMode,
    CMD_GET_FIRMWARE_VERSION, CMD_IN_LIST_PASSIVE_TARGET, CMD_RF_CONFIGURATION,
    CMD_SAM_CONFIGURATION,
};
pub use decoder::{
    DataFrame, DecodeError, Frame, FrameDecoder, FrameKind, MAX_RESPONSE_PAYLOAD, PENDING_CAPACITY,
};
pub use frame::{
    encode_command, EncodeError, ACK_FRAME, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE, NACK_FRAME,
    WAKEUP_SEQUENCE,
};
pub use uid::{Uid, MAX_UID_LEN};
