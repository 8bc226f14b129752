//! Chip-agnostic core of the bopbox NFC reader firmware.
//!
//! Everything here builds for `thumbv6m-none-eabi` as well as on the host,
//! where the test suite runs against in-memory transports.
//!
//! # Overview
//!
//! - [`transport`]: byte-stream port the driver talks through ([`Transport`])
//! - [`pn532`]: async PN532 driver over a [`Transport`] ([`Pn532`])
//! - [`event`]: bounded publish/subscribe bus ([`EventBus`], [`Event`])
//! - [`service`]: service lifecycle ([`Lifecycle`], [`Service`]) and the
//!   [`NfcService`] and [`WatchdogService`] implementations
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Log through `defmt` and derive `defmt::Format`
//! - **`log`**: Log through the `log` facade (mutually exclusive with `defmt`)
//! - **`embedded-io`**: [`IoTransport`] adapter for `embedded-io-async` devices

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(test)]
extern crate std;

// Must come first so the macros are visible to the modules below.
mod fmt;

pub mod event;
pub mod pn532;
pub mod service;
pub mod transport;

#[cfg(test)]
mod testing;

pub use event::{
    BusError, Event, EventBus, EventKind, Inbox, Mailbox, DEFAULT_INBOX_DEPTH, EVENT_PAYLOAD_LEN,
    MAX_EVENT_KINDS, MAX_SUBSCRIBERS,
};
pub use pn532::{Error, Pn532, Pn532Config};
pub use service::nfc::{NfcConfig, NfcService};
pub use service::watchdog::{Watchdog, WatchdogConfig, WatchdogService};
pub use service::{run_service, stop_service, Lifecycle, Service, ServiceError, ServiceState};
pub use transport::{Transport, TransportError};

#[cfg(feature = "embedded-io")]
pub use transport::IoTransport;

pub use pn532_proto::{FirmwareVersion, SamMode, Uid};
