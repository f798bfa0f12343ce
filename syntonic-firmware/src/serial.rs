//! USB CDC-ACM port as an `embedded_io_async` byte sink

use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_usb::class::cdc_acm::CdcAcmClass;
use embedded_io_async::{ErrorKind, ErrorType, Write};

/// Packet payload size; one less than the endpoint size so no write ever
/// needs a trailing zero-length packet
const CHUNK: usize = 63;

/// The host closed the port or the cable was pulled
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct Disconnected;

impl embedded_io_async::Error for Disconnected {
    fn kind(&self) -> ErrorKind {
        ErrorKind::NotConnected
    }
}

/// Write side of the serial port
pub struct SerialOut<'a> {
    class: &'a mut CdcAcmClass<'static, Driver<'static, USB>>,
}

impl<'a> SerialOut<'a> {
    pub fn new(class: &'a mut CdcAcmClass<'static, Driver<'static, USB>>) -> Self {
        Self { class }
    }
}

impl ErrorType for SerialOut<'_> {
    type Error = Disconnected;
}

impl Write for SerialOut<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Disconnected> {
        let len = buf.len().min(CHUNK);
        self.class
            .write_packet(&buf[..len])
            .await
            .map_err(|_| Disconnected)?;
        Ok(len)
    }
}
