//! PN532 serial link over the RP2040's buffered UART.

use bopbox_core::IoTransport;
use embassy_rp::uart::BufferedUart;

/// PN532 HSU default baud rate.
pub const UART_BAUDRATE: u32 = 115_200;

/// Size of each UART ring buffer. Holds several complete PN532 frames.
pub const UART_BUFFER_SIZE: usize = 256;

/// Transport used by the NFC service on hardware.
pub type UartTransport = IoTransport<BufferedUart>;
