//! PN532 command codes and response parsing.
//!
//! The parsers here work on the data payload of a response frame (the bytes
//! after the response code) and do not perform any I/O.

use crate::uid::Uid;

/// GetFirmwareVersion command (§7.2.2).
pub const CMD_GET_FIRMWARE_VERSION: u8 = 0x02;

/// SAMConfiguration command (§7.2.10).
pub const CMD_SAM_CONFIGURATION: u8 = 0x14;

/// RFConfiguration command (§7.3.1).
pub const CMD_RF_CONFIGURATION: u8 = 0x32;

/// InListPassiveTarget command (§7.3.5).
pub const CMD_IN_LIST_PASSIVE_TARGET: u8 = 0x4A;

/// RFConfiguration item selecting the retry counters.
pub const RF_ITEM_MAX_RETRIES: u8 = 0x05;

/// SAM configuration timeout byte (units of 50 ms), used in virtual card mode.
pub const SAM_TIMEOUT: u8 = 0x14;

/// Baud rate / modulation selector for 106 kbps type A (ISO/IEC 14443 Type A).
pub const BAUD_106_TYPE_A: u8 = 0x00;

/// Response code the chip sends for a given command.
#[inline]
#[must_use]
pub const fn response_code(command: u8) -> u8 {
    command.wrapping_add(1)
}

/// Way the chip uses its Security Access Module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SamMode {
    /// No SAM in use.
    Normal = 0x01,
    VirtualCard = 0x02,
    WiredCard = 0x03,
    DualCard = 0x04,
}

/// Firmware information reported by GetFirmwareVersion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FirmwareVersion {
    /// IC version, `0x32` for a PN532.
    pub ic: u8,
    pub version: u8,
    pub revision: u8,
    /// Bitfield of supported protocols.
    pub support: u8,
}

/// Error type for response parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResponseError {
    /// No target was in the field.
    NoTag,
    /// The response is shorter than its declared content.
    EmptyFrame,
}

impl core::fmt::Display for ResponseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoTag => write!(f, "no tag detected"),
            Self::EmptyFrame => write!(f, "empty frame"),
        }
    }
}

/// Parse a GetFirmwareVersion response payload.
///
/// # Errors
///
/// Returns [`ResponseError::EmptyFrame`] if fewer than 4 bytes are present.
pub fn parse_firmware_version(data: &[u8]) -> Result<FirmwareVersion, ResponseError> {
    match *data {
        [ic, version, revision, support, ..] => Ok(FirmwareVersion {
            ic,
            version,
            revision,
            support,
        }),
        _ => Err(ResponseError::EmptyFrame),
    }
}

/// Parse an InListPassiveTarget response payload for a 106 kbps type A target.
///
/// Layout: `NbTg, Tg, SENS_RES(2), SEL_RES, NFCIDLength, NFCID1...`
///
/// # Errors
///
/// - [`ResponseError::NoTag`] if the payload is empty or reports zero targets
/// - [`ResponseError::EmptyFrame`] if the declared UID length is zero or
///   exceeds the received bytes
pub fn parse_passive_target(data: &[u8]) -> Result<Uid, ResponseError> {
    match data.first() {
        None | Some(0) => return Err(ResponseError::NoTag),
        Some(_) => {}
    }

    let uid_len = usize::from(*data.get(5).ok_or(ResponseError::EmptyFrame)?);
    if uid_len == 0 {
        return Err(ResponseError::EmptyFrame);
    }
    let uid = data.get(6..6 + uid_len).ok_or(ResponseError::EmptyFrame)?;

    Ok(Uid::new(uid))
}

/// Data bytes for a SAMConfiguration command.
#[inline]
#[must_use]
pub const fn sam_configuration_data(mode: SamMode) -> [u8; 3] {
    [mode as u8, SAM_TIMEOUT, 0x01]
}

/// Data bytes for an RFConfiguration MaxRetries command.
///
/// ATR retries stay at the chip default (`0xFF`), PSL retries at `0x01`.
#[inline]
#[must_use]
pub const fn max_retries_data(passive_activation: u8) -> [u8; 4] {
    [RF_ITEM_MAX_RETRIES, 0xFF, 0x01, passive_activation]
}

/// Data bytes for an InListPassiveTarget command looking for one type A tag.
#[inline]
#[must_use]
pub const fn list_passive_target_data() -> [u8; 2] {
    [0x01, BAUD_106_TYPE_A]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_firmware_version() {
        let version = parse_firmware_version(&[0x32, 0x01, 0x06, 0x07]).unwrap();
        assert_eq!(
            version,
            FirmwareVersion {
                ic: 0x32,
                version: 1,
                revision: 6,
                support: 7,
            }
        );
    }

    #[test]
    fn test_parse_firmware_version_short() {
        assert_eq!(
            parse_firmware_version(&[0x32, 0x01, 0x06]),
            Err(ResponseError::EmptyFrame)
        );
    }

    #[test]
    fn test_parse_passive_target_uid() {
        let data = [0x01, 0x01, 0x00, 0x44, 0x00, 0x07, 0x04, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66];
        let uid = parse_passive_target(&data).unwrap();
        assert_eq!(uid.as_bytes(), &[0x04, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
    }

    #[test]
    fn test_parse_passive_target_no_tag() {
        assert_eq!(parse_passive_target(&[]), Err(ResponseError::NoTag));
        assert_eq!(parse_passive_target(&[0x00]), Err(ResponseError::NoTag));
    }

    #[test]
    fn test_parse_passive_target_truncated() {
        // Declares 7 UID bytes, carries 4.
        let data = [0x01, 0x01, 0x00, 0x44, 0x00, 0x07, 0x04, 0x11, 0x22, 0x33];
        assert_eq!(parse_passive_target(&data), Err(ResponseError::EmptyFrame));
        // Header cut before the length byte.
        assert_eq!(
            parse_passive_target(&[0x01, 0x01, 0x00]),
            Err(ResponseError::EmptyFrame)
        );
    }

    #[test]
    fn test_parse_passive_target_zero_length_uid() {
        let data = [0x01, 0x01, 0x00, 0x44, 0x00, 0x00];
        assert_eq!(parse_passive_target(&data), Err(ResponseError::EmptyFrame));
    }

    #[test]
    fn test_command_data() {
        assert_eq!(sam_configuration_data(SamMode::Normal), [0x01, 0x14, 0x01]);
        assert_eq!(max_retries_data(0x10), [0x05, 0xFF, 0x01, 0x10]);
        assert_eq!(list_passive_target_data(), [0x01, 0x00]);
        assert_eq!(response_code(CMD_IN_LIST_PASSIVE_TARGET), 0x4B);
    }
}
