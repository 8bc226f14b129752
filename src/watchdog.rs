//! RP2040 hardware watchdog binding.

use bopbox_core::Watchdog;
use embassy_rp::watchdog::Watchdog as HwWatchdog;
use embassy_time::Duration;

/// [`Watchdog`] port backed by the RP2040 watchdog peripheral.
///
/// The timeout set through [`configure`](Watchdog::configure) is applied when
/// the watchdog is started.
pub struct RpWatchdog {
    inner: HwWatchdog,
    timeout: Duration,
}

impl RpWatchdog {
    pub fn new(inner: HwWatchdog) -> Self {
        Self {
            inner,
            timeout: bopbox_core::service::watchdog::DEFAULT_TIMEOUT,
        }
    }
}

impl Watchdog for RpWatchdog {
    fn configure(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    fn start(&mut self) {
        self.inner.start(self.timeout);
    }

    fn feed(&mut self) {
        self.inner.feed();
    }
}
