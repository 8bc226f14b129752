#![no_std]
#![no_main]

use bopbox::transport::UART_BUFFER_SIZE;
use bopbox::{
    run_service, EventBus, EventKind, Inbox, IoTransport, Lifecycle, NfcConfig, NfcService, Pn532,
    Pn532Config, RpWatchdog, Service, UartTransport, WatchdogConfig, WatchdogService,
    DEFAULT_INBOX_DEPTH, UART_BAUDRATE,
};
use defmt::{error, info, warn};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, BufferedUart, Config as UartConfig};
use embassy_rp::watchdog::Watchdog as HwWatchdog;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use static_cell::StaticCell;

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

type Bus = EventBus<CriticalSectionRawMutex>;
type EventInbox = Inbox<CriticalSectionRawMutex, DEFAULT_INBOX_DEPTH>;
type Nfc = NfcService<'static, UartTransport, CriticalSectionRawMutex>;
type Wdt = WatchdogService<'static, RpWatchdog>;

/// Service lifecycles, shared between `main` and the service tasks.
static NFC: Lifecycle = Lifecycle::new("nfc");
static WATCHDOG: Lifecycle = Lifecycle::new("watchdog");

static BUS: StaticCell<Bus> = StaticCell::new();

/// Inbox of the event log task.
static EVENT_INBOX: StaticCell<EventInbox> = StaticCell::new();

/// UART ring buffers.
static UART_TX_BUF: StaticCell<[u8; UART_BUFFER_SIZE]> = StaticCell::new();
static UART_RX_BUF: StaticCell<[u8; UART_BUFFER_SIZE]> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("bopbox starting...");

    let p = embassy_rp::init(embassy_rp::config::Config::default());

    // --- Event bus ---
    let bus: &'static Bus = BUS.init(EventBus::new());
    let inbox: &'static EventInbox = EVENT_INBOX.init(Channel::new());
    if let Err(e) = bus
        .subscribe(inbox, &[EventKind::TagDetected, EventKind::TagRemoved])
        .await
    {
        error!("event log subscription failed: {:?}", e);
    }

    // --- Watchdog ---
    // Armed first so a wedged PN532 setup still ends in a reset.
    let mut watchdog = WatchdogService::new(
        &WATCHDOG,
        WatchdogConfig::default(),
        RpWatchdog::new(HwWatchdog::new(p.WATCHDOG)),
    );
    match watchdog.start().await {
        Ok(()) => spawner.spawn(watchdog_task(watchdog).unwrap()),
        Err(e) => error!("watchdog service not started: {:?}", e),
    }

    // --- UART Setup ---
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = UART_BAUDRATE;

    let uart = BufferedUart::new(
        p.UART0,
        p.PIN_0, // TX
        p.PIN_1, // RX
        Irqs,
        UART_TX_BUF.init([0; UART_BUFFER_SIZE]),
        UART_RX_BUF.init([0; UART_BUFFER_SIZE]),
        uart_config,
    );
    let device = Pn532::new(IoTransport::new(uart), Pn532Config::default());

    // --- NFC ---
    let mut nfc = NfcService::new(&NFC, NfcConfig::default(), bus, device);
    match nfc.start().await {
        Ok(()) => spawner.spawn(nfc_task(nfc).unwrap()),
        Err(e) => error!("nfc service not started: {:?}", e),
    }

    spawner.spawn(event_log_task(inbox).unwrap());

    info!(
        "bopbox initialized, nfc={} watchdog={}",
        NFC.state(),
        WATCHDOG.state()
    );
}

/// Watchdog task - feeds the hardware watchdog until stopped.
#[embassy_executor::task]
async fn watchdog_task(mut service: Wdt) {
    let _ = run_service(&mut service).await;
}

/// NFC task - polls the PN532 and publishes tag events.
#[embassy_executor::task]
async fn nfc_task(mut service: Nfc) {
    let _ = run_service(&mut service).await;
}

/// Event log task - prints every tag event received from the bus.
#[embassy_executor::task]
async fn event_log_task(inbox: &'static EventInbox) {
    loop {
        let event = inbox.receive().await;
        match (event.kind(), event.uid()) {
            (EventKind::TagDetected, Some(uid)) => info!("event=tag_detected uid={}", uid),
            (EventKind::TagRemoved, Some(uid)) => info!("event=tag_removed uid={}", uid),
            (kind, None) => warn!("event={:?} without uid", kind),
        }
    }
}
