//! bopbox NFC reader firmware for RP2040.
//!
//! # Overview
//!
//! The firmware runs on a Raspberry Pi Pico (RP2040) wired to a PN532 NFC
//! module in HSU (UART) mode and:
//! 1. Arms the hardware watchdog and keeps it fed
//! 2. Configures the PN532 and scans for ISO14443A tags every 500 ms
//! 3. Publishes tag arrival and removal on the in-firmware event bus
//!
//! # Hardware Configuration
//!
//! | Function | GPIO | Description |
//! |----------|------|-------------|
//! | UART0 TX | 0    | To PN532 RX (115200 baud, 8N1) |
//! | UART0 RX | 1    | From PN532 TX |
//!
//! # Architecture
//!
//! One embassy task per service run loop (`watchdog`, `nfc`) plus a task
//! that logs bus events. Services share their [`Lifecycle`] with `main`
//! through statics; the [`EventBus`] and inboxes live in `StaticCell`s.
//!
//! # Features
//!
//! - **`dev-panic`** (default): Use `panic-probe` for development (prints panic info via RTT)
//! - **`prod-panic`**: Use `panic-reset` for production (silent reset)
//!
//! # Re-exports
//!
//! This crate re-exports the public items of [`bopbox_core`] used by the
//! firmware so the binary only needs this crate.

#![no_std]

#[cfg(all(feature = "dev-panic", feature = "prod-panic"))]
compile_error!("Cannot enable both `dev-panic` and `prod-panic` features");

pub use bopbox_core::{
    run_service, stop_service, Event, EventBus, EventKind, Inbox, IoTransport, Lifecycle,
    NfcConfig, NfcService, Pn532, Pn532Config, Service, ServiceError, ServiceState, Uid,
    Watchdog, WatchdogConfig, WatchdogService, DEFAULT_INBOX_DEPTH,
};

pub mod transport;
pub mod watchdog;

pub use transport::{UartTransport, UART_BAUDRATE};
pub use watchdog::RpWatchdog;
