//! Fixed-capacity NFC tag identifier.

use core::fmt;

/// Longest UID an ISO14443A tag can report (triple size).
pub const MAX_UID_LEN: usize = 10;

/// Unique identifier of an NFC tag.
///
/// A small value type that can be copied, compared and stored without heap
/// allocation. The empty UID means "no tag". Formats as colon-separated
/// uppercase hex, e.g. `04:A3:2B:1C`.
///
/// # Example
///
/// ```
/// use pn532_proto::Uid;
///
/// let uid = Uid::new(&[0x04, 0xA3, 0x2B, 0x1C]);
/// assert_eq!(uid.len(), 4);
/// assert!(!uid.is_empty());
/// assert_eq!(uid, Uid::new(&[0x04, 0xA3, 0x2B, 0x1C]));
/// assert!(Uid::EMPTY.is_empty());
/// ```
#[derive(Clone, Copy, Default)]
pub struct Uid {
    data: [u8; MAX_UID_LEN],
    len: u8,
}

impl Uid {
    /// The empty UID.
    pub const EMPTY: Self = Self {
        data: [0u8; MAX_UID_LEN],
        len: 0,
    };

    /// Create a UID from raw bytes.
    ///
    /// Bytes beyond [`MAX_UID_LEN`] are silently truncated.
    #[must_use]
    pub fn new(bytes: &[u8]) -> Self {
        let len = bytes.len().min(MAX_UID_LEN);
        let mut uid = Self::EMPTY;
        uid.data[..len].copy_from_slice(&bytes[..len]);
        uid.len = len as u8;
        uid
    }

    /// Raw UID bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..usize::from(self.len)]
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.len)
    }

    /// Check if this is the empty UID ("no tag").
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reset to the empty UID.
    #[inline]
    pub fn clear(&mut self) {
        *self = Self::EMPTY;
    }
}

impl PartialEq for Uid {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Uid {}

impl AsRef<[u8]> for Uid {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.as_bytes().iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uid({})", self)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Uid {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=[u8]:X}", self.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::format;

    use super::*;

    #[test]
    fn test_display_colon_hex() {
        let uid = Uid::new(&[0x04, 0xA3, 0x2B, 0x1C]);
        assert_eq!(format!("{}", uid), "04:A3:2B:1C");
    }

    #[test]
    fn test_display_empty() {
        assert_eq!(format!("{}", Uid::EMPTY), "");
    }

    #[test]
    fn test_truncates_oversize_source() {
        let bytes = [0xAAu8; 14];
        let uid = Uid::new(&bytes);
        assert_eq!(uid.len(), MAX_UID_LEN);
        assert_eq!(uid.as_bytes(), &bytes[..MAX_UID_LEN]);
    }

    #[test]
    fn test_equality_compares_length_and_content() {
        let a = Uid::new(&[0x01, 0x02, 0x03, 0x04]);
        let prefix = Uid::new(&[0x01, 0x02, 0x03]);
        let other = Uid::new(&[0x01, 0x02, 0x03, 0x05]);
        assert_eq!(a, Uid::new(&[0x01, 0x02, 0x03, 0x04]));
        assert_ne!(a, prefix);
        assert_ne!(a, other);
    }

    #[test]
    fn test_default_is_empty() {
        let mut uid = Uid::new(&[0x42]);
        assert!(!uid.is_empty());
        uid.clear();
        assert!(uid.is_empty());
        assert_eq!(uid, Uid::default());
    }
}
