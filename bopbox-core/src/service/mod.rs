//! Service lifecycle.
//!
//! A service is started once by the assembly (hardware setup, state
//! `Starting`) and then driven by its own task through [`run_service`]. The
//! [`Lifecycle`] is shared between the two so the assembly can observe and
//! stop a service whose run loop is owned by a task.
//!
//! ```text
//! Stopped/Errored --start--> Starting --run--> Running --stop--> Stopping --> Stopped
//!                               |                 |
//!                               +----failure------+--> Errored
//! ```

use core::fmt;
use core::future::Future;

use portable_atomic::{AtomicU8, Ordering};

pub mod nfc;
pub mod watchdog;

/// Observable service state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ServiceState {
    Stopped = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
    Errored = 4,
}

impl ServiceState {
    const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => ServiceState::Stopped,
            1 => ServiceState::Starting,
            2 => ServiceState::Running,
            3 => ServiceState::Stopping,
            _ => ServiceState::Errored,
        }
    }

    /// Whether a start request must be rejected in this state.
    #[inline]
    pub const fn is_live(self) -> bool {
        matches!(
            self,
            ServiceState::Starting | ServiceState::Running | ServiceState::Stopping
        )
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceState::Stopped => "stopped",
            ServiceState::Starting => "starting",
            ServiceState::Running => "running",
            ServiceState::Stopping => "stopping",
            ServiceState::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Lifecycle and service failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServiceError {
    /// Start or run requested while an instance is live.
    AlreadyRunning,
    /// Stop or run requested while nothing is running.
    NotRunning,
    /// Hardware setup during start failed.
    Setup,
    /// The run loop hit an unrecoverable failure.
    Fault,
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::AlreadyRunning => write!(f, "service already running"),
            ServiceError::NotRunning => write!(f, "service not running"),
            ServiceError::Setup => write!(f, "service setup failed"),
            ServiceError::Fault => write!(f, "service run loop failed"),
        }
    }
}

/// Shared, lock-free service state.
///
/// Usually a `static`, so that both the assembly and the service task can
/// reach it.
pub struct Lifecycle {
    name: &'static str,
    state: AtomicU8,
}

impl Lifecycle {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            state: AtomicU8::new(ServiceState::Stopped as u8),
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn state(&self) -> ServiceState {
        ServiceState::from_raw(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state() == ServiceState::Running
    }

    /// `Stopped`/`Errored` -> `Starting`.
    pub fn begin_start(&self) -> Result<(), ServiceError> {
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                if ServiceState::from_raw(raw).is_live() {
                    None
                } else {
                    Some(ServiceState::Starting as u8)
                }
            })
            .map(|_| ())
            .map_err(|_| ServiceError::AlreadyRunning)
    }

    /// `Starting` -> `Running`, once per start.
    ///
    /// A second run loop for the same start fails with `AlreadyRunning`; a run
    /// loop without a preceding start (or after a stop) fails with
    /// `NotRunning`.
    pub fn enter_running(&self) -> Result<(), ServiceError> {
        match self.state.compare_exchange(
            ServiceState::Starting as u8,
            ServiceState::Running as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => Ok(()),
            Err(raw) if ServiceState::from_raw(raw) == ServiceState::Running => {
                Err(ServiceError::AlreadyRunning)
            }
            Err(_) => Err(ServiceError::NotRunning),
        }
    }

    /// Any state but `Stopped` -> `Stopping` -> `Stopped`.
    ///
    /// The run loop notices at its next iteration and returns.
    pub fn stop(&self) -> Result<(), ServiceError> {
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                match ServiceState::from_raw(raw) {
                    ServiceState::Stopped => None,
                    _ => Some(ServiceState::Stopping as u8),
                }
            })
            .map_err(|_| ServiceError::NotRunning)?;
        self.state
            .store(ServiceState::Stopped as u8, Ordering::Release);
        Ok(())
    }

    /// Mark the service `Errored`.
    pub fn fail(&self) {
        self.state
            .store(ServiceState::Errored as u8, Ordering::Release);
    }
}

/// A long-running firmware service.
///
/// `start` is called from the assembly and performs setup; `run` is the
/// body of the service's task and normally reached through [`run_service`].
pub trait Service {
    /// Lifecycle shared with the assembly.
    fn lifecycle(&self) -> &Lifecycle;

    /// Guard against double start and perform hardware setup.
    fn start(&mut self) -> impl Future<Output = Result<(), ServiceError>>;

    /// Run loop. Returns once the service is no longer `Running`.
    fn run(&mut self) -> impl Future<Output = Result<(), ServiceError>>;

    fn name(&self) -> &'static str {
        self.lifecycle().name()
    }

    fn state(&self) -> ServiceState {
        self.lifecycle().state()
    }

    fn stop(&self) -> Result<(), ServiceError> {
        stop_service(self.lifecycle())
    }
}

/// Stop through a shared [`Lifecycle`], with logging.
///
/// This is what the assembly uses once the service itself has moved into
/// its task.
pub fn stop_service(lifecycle: &Lifecycle) -> Result<(), ServiceError> {
    info!("service={} stopping", lifecycle.name());
    match lifecycle.stop() {
        Ok(()) => {
            info!("service={} stopped", lifecycle.name());
            Ok(())
        }
        Err(e) => {
            warn!("service={} stop rejected error={:?}", lifecycle.name(), e);
            Err(e)
        }
    }
}

/// Drive a started service's run loop to completion.
///
/// Failures are logged and leave the service `Errored`; a rejected
/// double-entry leaves the live instance untouched. Nothing is propagated
/// further than the returned result.
pub async fn run_service<S: Service>(service: &mut S) -> Result<(), ServiceError> {
    let name = service.name();
    info!("service={} run loop entered", name);

    let result = service.run().await;
    match result {
        Ok(()) => info!("service={} run loop exited", name),
        Err(e @ (ServiceError::AlreadyRunning | ServiceError::NotRunning)) => {
            error!("service={} run loop refused error={:?}", name, e)
        }
        Err(e) => {
            error!("service={} run loop failed error={:?}", name, e);
            service.lifecycle().fail();
        }
    }
    result
}
