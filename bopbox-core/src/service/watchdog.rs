//! Hardware watchdog feeding service.

use embassy_time::{Duration, Timer};

use crate::service::{Lifecycle, Service, ServiceError};

/// Reset deadline armed on the hardware.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Time between feeds.
pub const DEFAULT_FEED_INTERVAL: Duration = Duration::from_millis(500);

/// Hardware watchdog port.
///
/// Once started, the device resets unless `feed` is called within the
/// configured timeout.
pub trait Watchdog {
    /// Set the reset deadline used by the next `start`.
    fn configure(&mut self, timeout: Duration);
    /// Arm the hardware with the configured timeout.
    fn start(&mut self);
    /// Push the reset deadline out by the configured timeout.
    fn feed(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogConfig {
    /// Reset deadline armed on the hardware.
    pub timeout: Duration,
    /// Time between feeds, must be shorter than `timeout`.
    pub interval: Duration,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            interval: DEFAULT_FEED_INTERVAL,
        }
    }
}

/// Keeps the hardware watchdog fed while the firmware is healthy.
pub struct WatchdogService<'a, W> {
    lifecycle: &'a Lifecycle,
    config: WatchdogConfig,
    watchdog: W,
}

impl<'a, W: Watchdog> WatchdogService<'a, W> {
    pub fn new(lifecycle: &'a Lifecycle, config: WatchdogConfig, watchdog: W) -> Self {
        Self {
            lifecycle,
            config,
            watchdog,
        }
    }

    #[inline]
    pub fn watchdog(&self) -> &W {
        &self.watchdog
    }
}

impl<W: Watchdog> Service for WatchdogService<'_, W> {
    fn lifecycle(&self) -> &Lifecycle {
        self.lifecycle
    }

    async fn start(&mut self) -> Result<(), ServiceError> {
        info!("service={} starting", self.lifecycle.name());
        if let Err(e) = self.lifecycle.begin_start() {
            error!("service={} start rejected error={:?}", self.lifecycle.name(), e);
            return Err(e);
        }

        if self.config.interval >= self.config.timeout {
            error!(
                "service={} feed interval must be below timeout interval_ms={} timeout_ms={}",
                self.lifecycle.name(),
                self.config.interval.as_millis(),
                self.config.timeout.as_millis()
            );
            self.lifecycle.fail();
            return Err(ServiceError::Setup);
        }

        self.watchdog.configure(self.config.timeout);
        self.watchdog.start();
        info!(
            "service={} armed timeout_ms={} interval_ms={}",
            self.lifecycle.name(),
            self.config.timeout.as_millis(),
            self.config.interval.as_millis()
        );
        Ok(())
    }

    async fn run(&mut self) -> Result<(), ServiceError> {
        self.lifecycle.enter_running()?;
        while self.lifecycle.is_running() {
            self.watchdog.feed();
            Timer::after(self.config.interval).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use crate::service::{run_service, ServiceState};
    use embassy_futures::block_on;
    use embassy_futures::join::join;

    #[derive(Default)]
    struct MockWatchdog {
        timeout: Option<Duration>,
        started: bool,
        feeds: u32,
    }

    impl Watchdog for MockWatchdog {
        fn configure(&mut self, timeout: Duration) {
            self.timeout = Some(timeout);
        }

        fn start(&mut self) {
            self.started = true;
        }

        fn feed(&mut self) {
            self.feeds += 1;
        }
    }

    fn fast_config() -> WatchdogConfig {
        WatchdogConfig {
            timeout: Duration::from_millis(100),
            interval: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_start_arms_hardware() {
        let lifecycle = Lifecycle::new("watchdog");
        let mut service =
            WatchdogService::new(&lifecycle, WatchdogConfig::default(), MockWatchdog::default());

        assert_eq!(block_on(service.start()), Ok(()));
        assert!(service.watchdog().started);
        assert_eq!(service.watchdog().timeout, Some(Duration::from_millis(5000)));
        assert_eq!(service.watchdog().feeds, 0);
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let lifecycle = Lifecycle::new("watchdog");
        let mut service = WatchdogService::new(&lifecycle, fast_config(), MockWatchdog::default());

        block_on(service.start()).unwrap();
        assert_eq!(block_on(service.start()), Err(ServiceError::AlreadyRunning));
    }

    #[test]
    fn test_interval_not_below_timeout_rejected() {
        let lifecycle = Lifecycle::new("watchdog");
        let config = WatchdogConfig {
            timeout: Duration::from_millis(500),
            interval: Duration::from_millis(500),
        };
        let mut service = WatchdogService::new(&lifecycle, config, MockWatchdog::default());

        assert_eq!(block_on(service.start()), Err(ServiceError::Setup));
        assert!(!service.watchdog().started);
        assert_eq!(lifecycle.state(), ServiceState::Errored);
    }

    #[test]
    fn test_stop_never_started() {
        let lifecycle = Lifecycle::new("watchdog");
        let service = WatchdogService::new(&lifecycle, fast_config(), MockWatchdog::default());
        assert_eq!(service.stop(), Err(ServiceError::NotRunning));
    }

    #[test]
    fn test_feeds_until_stopped() {
        let lifecycle = Lifecycle::new("watchdog");
        let mut service = WatchdogService::new(&lifecycle, fast_config(), MockWatchdog::default());
        block_on(service.start()).unwrap();

        let (result, _) = block_on(join(run_service(&mut service), async {
            Timer::after(Duration::from_millis(60)).await;
            lifecycle.stop().unwrap();
        }));

        assert_eq!(result, Ok(()));
        assert_eq!(lifecycle.state(), ServiceState::Stopped);
        // First feed is immediate, then one per interval.
        assert!(service.watchdog().feeds >= 2);
        assert!(service.watchdog().feeds <= 20);
    }
}
