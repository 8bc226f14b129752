//! Async PN532 driver over a [`Transport`].
//!
//! Every command is a full exchange: wake-up, command frame, ACK, response.
//! Only one exchange is ever in flight; the driver is owned by a single task.
//!
//! Bytes left over from an earlier exchange never answer a later one: the
//! decoder's carry-over is dropped whenever an exchange fails, and whatever
//! the transport still holds is flushed before the next command goes out.

use core::fmt;

use embassy_time::{Duration, Instant, Timer};
use pn532_proto::{
    encode_command, list_passive_target_data, max_retries_data, parse_firmware_version,
    parse_passive_target, response_code, sam_configuration_data, DataFrame, DecodeError,
    EncodeError, FirmwareVersion, Frame, FrameDecoder, ResponseError, SamMode, Uid,
    CMD_GET_FIRMWARE_VERSION, CMD_IN_LIST_PASSIVE_TARGET, CMD_RF_CONFIGURATION,
    CMD_SAM_CONFIGURATION, MAX_FRAME_SIZE, WAKEUP_SEQUENCE,
};

use crate::transport::Transport;

/// Upper bound on a single frame read.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause after the wake-up sequence before the command frame.
pub const DEFAULT_WAKE_DELAY: Duration = Duration::from_millis(1);

/// Pause between polls of an idle transport.
pub const DEFAULT_POLL_DELAY: Duration = Duration::from_millis(1);

const RX_CHUNK_SIZE: usize = 64;

/// Reads spent flushing stale input before a command.
const MAX_FLUSH_READS: usize = 8;

/// Driver timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pn532Config {
    /// Deadline for each of the ACK and response reads.
    pub command_timeout: Duration,
    /// Settle time after writing the wake-up sequence.
    pub wake_delay: Duration,
    /// Sleep between `bytes_available` polls while nothing is pending.
    pub poll_delay: Duration,
}

impl Default for Pn532Config {
    fn default() -> Self {
        Self {
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            wake_delay: DEFAULT_WAKE_DELAY,
            poll_delay: DEFAULT_POLL_DELAY,
        }
    }
}

/// Driver error, generic over the transport's error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// No complete frame arrived before the deadline.
    Timeout,
    /// Passive-target scan found no card.
    NoTag,
    /// Response too short for the expected content.
    EmptyFrame,
    /// Command payload does not fit in one frame, or a read overflowed the decoder.
    FrameTooLarge,
    /// Transport accepted fewer bytes than requested.
    WriteFail,
    /// Wrong frame type or response code.
    UnexpectedFrame,
    /// Underlying transport failure.
    Transport(E),
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Timeout => write!(f, "timed out waiting for frame"),
            Error::NoTag => write!(f, "no tag present"),
            Error::EmptyFrame => write!(f, "response frame too short"),
            Error::FrameTooLarge => write!(f, "command payload too large"),
            Error::WriteFail => write!(f, "incomplete write"),
            Error::UnexpectedFrame => write!(f, "unexpected frame"),
            Error::Transport(e) => write!(f, "transport error: {:?}", e),
        }
    }
}

impl<E> From<EncodeError> for Error<E> {
    fn from(e: EncodeError) -> Self {
        match e {
            EncodeError::FrameTooLarge => Error::FrameTooLarge,
        }
    }
}

impl<E> From<DecodeError> for Error<E> {
    fn from(e: DecodeError) -> Self {
        match e {
            DecodeError::ChunkTooLarge => Error::FrameTooLarge,
        }
    }
}

impl<E> From<ResponseError> for Error<E> {
    fn from(e: ResponseError) -> Self {
        match e {
            ResponseError::NoTag => Error::NoTag,
            ResponseError::EmptyFrame => Error::EmptyFrame,
        }
    }
}

/// PN532 in HSU mode.
pub struct Pn532<T> {
    transport: T,
    config: Pn532Config,
    decoder: FrameDecoder,
    tx_buf: [u8; MAX_FRAME_SIZE],
    rx_buf: [u8; RX_CHUNK_SIZE],
}

impl<T: Transport> Pn532<T> {
    /// Create a driver. No bytes are exchanged until [`init`](Self::init).
    pub fn new(transport: T, config: Pn532Config) -> Self {
        Self {
            transport,
            config,
            decoder: FrameDecoder::new(),
            tx_buf: [0; MAX_FRAME_SIZE],
            rx_buf: [0; RX_CHUNK_SIZE],
        }
    }

    /// Driver timing in use.
    pub fn config(&self) -> &Pn532Config {
        &self.config
    }

    /// Borrow the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the driver, returning the transport.
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Wake the chip from power-down.
    pub async fn init(&mut self) -> Result<(), Error<T::Error>> {
        self.wake().await
    }

    /// Query IC, version, revision and supported card families.
    pub async fn firmware_version(&mut self) -> Result<FirmwareVersion, Error<T::Error>> {
        let frame = self.send_command(CMD_GET_FIRMWARE_VERSION, &[]).await?;
        Ok(parse_firmware_version(&frame.payload)?)
    }

    /// Configure the Security Access Module.
    ///
    /// `SamMode::Normal` is required before the reader will scan for tags.
    pub async fn sam_configuration(&mut self, mode: SamMode) -> Result<(), Error<T::Error>> {
        self.send_command(CMD_SAM_CONFIGURATION, &sam_configuration_data(mode))
            .await?;
        Ok(())
    }

    /// Bound the number of passive activation attempts per scan.
    ///
    /// The power-on default is `0xFF` (retry forever), which turns every scan
    /// without a card into a [`Error::Timeout`].
    pub async fn set_passive_activation_retries(
        &mut self,
        retries: u8,
    ) -> Result<(), Error<T::Error>> {
        self.send_command(CMD_RF_CONFIGURATION, &max_retries_data(retries))
            .await?;
        Ok(())
    }

    /// Scan for one ISO14443A tag and return its UID.
    pub async fn read_tag(&mut self) -> Result<Uid, Error<T::Error>> {
        let frame = self
            .send_command(CMD_IN_LIST_PASSIVE_TARGET, &list_passive_target_data())
            .await?;
        Ok(parse_passive_target(&frame.payload)?)
    }

    /// Run one command exchange and return the response frame.
    ///
    /// The response code is checked against `command + 1`. On any error the
    /// decoder's carry-over is dropped, so a late answer to this command is
    /// never taken for the answer to the next one.
    pub async fn send_command(
        &mut self,
        command: u8,
        data: &[u8],
    ) -> Result<DataFrame, Error<T::Error>> {
        let result = self.exchange(command, data).await;
        if result.is_err() {
            self.decoder.clear();
        }
        result
    }

    async fn exchange(&mut self, command: u8, data: &[u8]) -> Result<DataFrame, Error<T::Error>> {
        self.wake().await?;
        self.flush_input().await?;

        let len = encode_command(command, data, &mut self.tx_buf)?;
        write_all(&mut self.transport, &self.tx_buf[..len]).await?;
        trace!("pn532 command=0x{:02x} sent len={}", command, len);

        match self.read_frame().await? {
            Frame::Ack => {}
            other => {
                warn!("pn532 expected ack kind={:?}", other.kind());
                return Err(Error::UnexpectedFrame);
            }
        }

        match self.read_frame().await? {
            Frame::Data(frame) if frame.command == response_code(command) => Ok(frame),
            Frame::Data(frame) => {
                warn!(
                    "pn532 response code mismatch expected=0x{:02x} got=0x{:02x}",
                    response_code(command),
                    frame.command
                );
                Err(Error::UnexpectedFrame)
            }
            other => {
                warn!("pn532 expected response kind={:?}", other.kind());
                Err(Error::UnexpectedFrame)
            }
        }
    }

    /// Drop carried-over bytes and anything already buffered by the transport.
    async fn flush_input(&mut self) -> Result<(), Error<T::Error>> {
        let mut flushed = self.decoder.pending_len();
        self.decoder.clear();

        for _ in 0..MAX_FLUSH_READS {
            if self.transport.bytes_available().map_err(Error::Transport)? == 0 {
                break;
            }
            let n = self
                .transport
                .read(&mut self.rx_buf)
                .await
                .map_err(Error::Transport)?;
            if n == 0 {
                break;
            }
            flushed += n;
        }

        if flushed > 0 {
            debug!("pn532 flushed stale input len={}", flushed);
        }
        Ok(())
    }

    async fn wake(&mut self) -> Result<(), Error<T::Error>> {
        write_all(&mut self.transport, &WAKEUP_SEQUENCE).await?;
        Timer::after(self.config.wake_delay).await;
        Ok(())
    }

    /// Read one frame, carried-over bytes first.
    async fn read_frame(&mut self) -> Result<Frame, Error<T::Error>> {
        let deadline = Instant::now() + self.config.command_timeout;
        let discarded = self.decoder.discarded();
        self.decoder.reset();

        let result = self.poll_frame(deadline).await;

        let dropped = self.decoder.discarded().wrapping_sub(discarded);
        if dropped > 0 {
            debug!(
                "pn532 discarded malformed frames count={} total={}",
                dropped,
                self.decoder.discarded()
            );
        }
        if result.is_err() {
            // Partial frame state is meaningless for the next exchange.
            self.decoder.reset();
        }
        result
    }

    async fn poll_frame(&mut self, deadline: Instant) -> Result<Frame, Error<T::Error>> {
        if let Some(frame) = self.decoder.drain_pending() {
            return Ok(frame);
        }

        loop {
            if Instant::now() >= deadline {
                return Err(Error::Timeout);
            }

            let available = self.transport.bytes_available().map_err(Error::Transport)?;
            if available == 0 {
                Timer::after(self.config.poll_delay).await;
                continue;
            }

            let n = self
                .transport
                .read(&mut self.rx_buf)
                .await
                .map_err(Error::Transport)?;
            if let Some(frame) = self.decoder.feed(&self.rx_buf[..n])? {
                return Ok(frame);
            }
        }
    }
}

async fn write_all<T: Transport>(transport: &mut T, data: &[u8]) -> Result<(), Error<T::Error>> {
    let written = transport.write(data).await.map_err(Error::Transport)?;
    if written < data.len() {
        warn!("pn532 short write written={} len={}", written, data.len());
        return Err(Error::WriteFail);
    }
    Ok(())
}
