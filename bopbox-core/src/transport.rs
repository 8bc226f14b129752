//! Byte-stream port between the PN532 driver and the serial hardware.

use core::fmt::Debug;
use core::future::Future;

/// Bound on transport error types.
///
/// Errors end up in log lines, so they must be printable by whichever
/// logging backend is compiled in.
#[cfg(feature = "defmt")]
pub trait TransportError: Debug + defmt::Format {}
#[cfg(feature = "defmt")]
impl<E: Debug + defmt::Format> TransportError for E {}

/// Bound on transport error types.
#[cfg(not(feature = "defmt"))]
pub trait TransportError: Debug {}
#[cfg(not(feature = "defmt"))]
impl<E: Debug> TransportError for E {}

/// Bidirectional byte stream to the PN532 (HSU at 115200 baud on hardware).
///
/// Implementations must not reorder bytes. Reads are only issued after
/// [`bytes_available`](Transport::bytes_available) reported pending data, so
/// `read` is expected to return promptly.
pub trait Transport {
    /// Error type reported by the underlying device.
    type Error: TransportError;

    /// Write `data`, returning how many bytes were accepted.
    ///
    /// Accepting fewer bytes than requested is treated as a failed write
    /// by the driver.
    fn write(&mut self, data: &[u8]) -> impl Future<Output = Result<usize, Self::Error>>;

    /// Read up to `buf.len()` bytes, returning how many were stored.
    fn read(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<usize, Self::Error>>;

    /// Number of bytes that can be read without waiting.
    ///
    /// Must not block. A lower bound is acceptable as long as it is non-zero
    /// whenever data is pending.
    fn bytes_available(&mut self) -> Result<usize, Self::Error>;
}

/// [`Transport`] over any `embedded-io-async` device with `ReadReady`.
///
/// `embedded-io` only reports readiness, not a count, so
/// [`bytes_available`](Transport::bytes_available) returns 1 while data is
/// pending and the driver reads a full buffer's worth.
#[cfg(feature = "embedded-io")]
pub struct IoTransport<U> {
    io: U,
}

#[cfg(feature = "embedded-io")]
impl<U> IoTransport<U> {
    /// Wrap a serial device.
    pub fn new(io: U) -> Self {
        Self { io }
    }

    /// Give back the wrapped device.
    pub fn into_inner(self) -> U {
        self.io
    }
}

#[cfg(feature = "embedded-io")]
impl<U> Transport for IoTransport<U>
where
    U: embedded_io_async::Read + embedded_io_async::Write + embedded_io::ReadReady,
{
    type Error = embedded_io::ErrorKind;

    async fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        use embedded_io::Error as _;
        embedded_io_async::Write::write(&mut self.io, data)
            .await
            .map_err(|e| e.kind())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        use embedded_io::Error as _;
        embedded_io_async::Read::read(&mut self.io, buf)
            .await
            .map_err(|e| e.kind())
    }

    fn bytes_available(&mut self) -> Result<usize, Self::Error> {
        use embedded_io::Error as _;
        self.io
            .read_ready()
            .map(usize::from)
            .map_err(|e| e.kind())
    }
}
