//! Tag polling service.
//!
//! Polls the PN532 for an ISO14443A tag at a fixed interval and publishes
//! [`EventKind::TagDetected`](crate::EventKind::TagDetected) once per new
//! UID and [`EventKind::TagRemoved`](crate::EventKind::TagRemoved) when the
//! tag goes away.
//!
//! Starting the service only wakes the chip. Reader configuration (firmware
//! query, SAM mode, retry limit) runs inside the loop and is retried every
//! poll interval until it succeeds, so a chip that is slow to come up after
//! power-on does not take the service down.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Timer};
use pn532_proto::{SamMode, Uid};

use crate::event::{Event, EventBus};
use crate::pn532::{Error, Pn532};
use crate::service::{Lifecycle, Service, ServiceError};
use crate::transport::Transport;

/// Time between tag scans.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Passive activation attempts per scan before the chip reports no tag.
pub const DEFAULT_PASSIVE_ACTIVATION_RETRIES: u8 = 0x10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NfcConfig {
    /// Pause after each scan or failed configuration attempt.
    pub poll_interval: Duration,
    /// SAM mode applied during configuration.
    pub sam_mode: SamMode,
    /// Passive activation attempts per scan.
    pub passive_activation_retries: u8,
}

impl Default for NfcConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            sam_mode: SamMode::Normal,
            passive_activation_retries: DEFAULT_PASSIVE_ACTIVATION_RETRIES,
        }
    }
}

/// Reader service owning the PN532 driver.
pub struct NfcService<'a, T, M: RawMutex> {
    lifecycle: &'a Lifecycle,
    config: NfcConfig,
    bus: &'a EventBus<M>,
    device: Pn532<T>,
    /// UID seen by the last successful scan, empty if none.
    last_uid: Uid,
    configured: bool,
}

impl<'a, T: Transport, M: RawMutex> NfcService<'a, T, M> {
    pub fn new(
        lifecycle: &'a Lifecycle,
        config: NfcConfig,
        bus: &'a EventBus<M>,
        device: Pn532<T>,
    ) -> Self {
        Self {
            lifecycle,
            config,
            bus,
            device,
            last_uid: Uid::EMPTY,
            configured: false,
        }
    }

    /// UID currently considered present.
    #[inline]
    pub fn last_uid(&self) -> &Uid {
        &self.last_uid
    }

    /// Whether the reader has been configured since the last start.
    #[inline]
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    #[inline]
    pub fn device(&self) -> &Pn532<T> {
        &self.device
    }

    /// One scan, with debouncing.
    ///
    /// Returns the UID when it differs from the previous scan (a
    /// `TagDetected` event has been published for it). A failed scan clears
    /// the remembered UID, publishing `TagRemoved` if a tag was present.
    pub async fn poll_once(&mut self) -> Option<Uid> {
        match self.device.read_tag().await {
            Ok(uid) if uid == self.last_uid => None,
            Ok(uid) => {
                info!("tag detected uid={}", uid);
                self.last_uid = uid;
                self.bus.publish(Event::tag_detected(&uid)).await;
                Some(uid)
            }
            Err(err) => {
                if !matches!(err, Error::NoTag) {
                    error!("tag read failed error={:?}", err);
                }
                if !self.last_uid.is_empty() {
                    info!("tag removed uid={}", self.last_uid);
                    self.bus.publish(Event::tag_removed(&self.last_uid)).await;
                    self.last_uid.clear();
                }
                None
            }
        }
    }

    async fn configure(&mut self) -> Result<(), Error<T::Error>> {
        let version = self.device.firmware_version().await?;
        info!(
            "pn532 firmware ic=0x{:02x} version={}.{} support=0x{:02x}",
            version.ic,
            version.version,
            version.revision,
            version.support
        );

        self.device.sam_configuration(self.config.sam_mode).await?;
        self.device
            .set_passive_activation_retries(self.config.passive_activation_retries)
            .await?;
        Ok(())
    }
}

impl<T: Transport, M: RawMutex> Service for NfcService<'_, T, M> {
    fn lifecycle(&self) -> &Lifecycle {
        self.lifecycle
    }

    async fn start(&mut self) -> Result<(), ServiceError> {
        info!("service={} starting", self.lifecycle.name());
        if let Err(e) = self.lifecycle.begin_start() {
            error!("service={} start rejected error={:?}", self.lifecycle.name(), e);
            return Err(e);
        }

        if let Err(e) = self.device.init().await {
            error!("service={} wake-up failed error={:?}", self.lifecycle.name(), e);
            self.lifecycle.fail();
            return Err(ServiceError::Setup);
        }

        self.configured = false;
        self.last_uid.clear();
        info!(
            "service={} started poll_ms={}",
            self.lifecycle.name(),
            self.config.poll_interval.as_millis()
        );
        Ok(())
    }

    async fn run(&mut self) -> Result<(), ServiceError> {
        self.lifecycle.enter_running()?;
        while self.lifecycle.is_running() {
            if !self.configured {
                match self.configure().await {
                    Ok(()) => {
                        info!("service={} reader configured", self.lifecycle.name());
                        self.configured = true;
                    }
                    Err(e) => {
                        warn!(
                            "service={} reader configuration failed error={:?}",
                            self.lifecycle.name(),
                            e
                        );
                        Timer::after(self.config.poll_interval).await;
                        continue;
                    }
                }
            }
            self.poll_once().await;
            Timer::after(self.config.poll_interval).await;
        }
        Ok(())
    }
}
