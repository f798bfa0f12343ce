//! I2C master on an RP2040 I2C block
//!
//! The driver owns the I2C instance and both pins for the lifetime of the
//! firmware. The embassy driver is built on `enable` and dropped on
//! `disable`; in between the pins can be handed to [`GpioLine`]s for bus
//! recovery.

use embassy_rp::gpio::Flex;
use embassy_rp::i2c::{self, AbortReason, Async, I2c, Instance, InterruptHandler, SclPin, SdaPin};
use embassy_rp::interrupt::typelevel::Binding;
use embassy_rp::Peri;
use embassy_time::{with_timeout, Duration};
use embedded_hal_async::i2c::I2c as _;
use syntonic_hal::{I2cBus, I2cConfig, I2cError, I2cPeripheral, RecoveryLines};

use crate::gpio::GpioLine;

/// I2C block plus its SCL/SDA pins
pub struct Rp2040I2c<T, SCL, SDA, IRQ>
where
    T: Instance + 'static,
    SCL: SclPin<T> + 'static,
    SDA: SdaPin<T> + 'static,
{
    instance: Peri<'static, T>,
    scl: Peri<'static, SCL>,
    sda: Peri<'static, SDA>,
    irqs: IRQ,
    driver: Option<I2c<'static, T, Async>>,
    clock: GpioLine,
    data: GpioLine,
}

impl<T, SCL, SDA, IRQ> Rp2040I2c<T, SCL, SDA, IRQ>
where
    T: Instance + 'static,
    SCL: SclPin<T> + 'static,
    SDA: SdaPin<T> + 'static,
    IRQ: Binding<T::Interrupt, InterruptHandler<T>> + Copy,
{
    /// Take ownership of the block and pins; nothing is configured yet
    pub fn new(
        instance: Peri<'static, T>,
        scl: Peri<'static, SCL>,
        sda: Peri<'static, SDA>,
        irqs: IRQ,
    ) -> Self {
        Self {
            instance,
            scl,
            sda,
            irqs,
            driver: None,
            clock: GpioLine::default(),
            data: GpioLine::default(),
        }
    }

    fn driver(&mut self) -> Result<&mut I2c<'static, T, Async>, I2cError> {
        self.driver.as_mut().ok_or(I2cError::Bus)
    }

    /// Address-only probe
    ///
    /// The RP2040 block cannot issue a zero-length write, so presence is
    /// probed with a one-byte read instead.
    async fn probe(&mut self, address: u8, timeout: Duration) -> Result<(), I2cError> {
        let driver = self.driver()?;
        let mut byte = [0u8; 1];
        match with_timeout(timeout, driver.read(address, &mut byte)).await {
            Ok(result) => result.map_err(map_error),
            Err(_) => Err(I2cError::Timeout),
        }
    }
}

/// Translate an embassy-rp I2C error
fn map_error(error: i2c::Error) -> I2cError {
    match error {
        i2c::Error::Abort(AbortReason::NoAcknowledge) => I2cError::Nack,
        i2c::Error::Abort(AbortReason::ArbitrationLoss) => I2cError::ArbitrationLost,
        i2c::Error::Abort(AbortReason::TxNotEmpty(_)) => I2cError::Overrun,
        _ => I2cError::Other,
    }
}

impl<T, SCL, SDA, IRQ> I2cBus for Rp2040I2c<T, SCL, SDA, IRQ>
where
    T: Instance + 'static,
    SCL: SclPin<T> + 'static,
    SDA: SdaPin<T> + 'static,
    IRQ: Binding<T::Interrupt, InterruptHandler<T>> + Copy,
{
    async fn write(&mut self, address: u8, data: &[u8], timeout_us: u32) -> Result<(), I2cError> {
        let timeout = Duration::from_micros(timeout_us as u64);
        if data.is_empty() {
            return self.probe(address, timeout).await;
        }
        let driver = self.driver()?;
        match with_timeout(timeout, driver.write(address, data)).await {
            Ok(result) => result.map_err(map_error),
            Err(_) => Err(I2cError::Timeout),
        }
    }

    async fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
        timeout_us: u32,
    ) -> Result<(), I2cError> {
        // The repeated START keeps both phases in one driver future, so the
        // two per-phase bounds are applied as their sum
        let timeout = Duration::from_micros(timeout_us as u64 * 2);
        let driver = self.driver()?;
        match with_timeout(timeout, driver.write_read(address, write_data, read_buf)).await {
            Ok(result) => result.map_err(map_error),
            Err(_) => Err(I2cError::Timeout),
        }
    }
}

impl<T, SCL, SDA, IRQ> I2cPeripheral for Rp2040I2c<T, SCL, SDA, IRQ>
where
    T: Instance + 'static,
    SCL: SclPin<T> + 'static,
    SDA: SdaPin<T> + 'static,
    IRQ: Binding<T::Interrupt, InterruptHandler<T>> + Copy,
{
    #[allow(unsafe_code)]
    fn enable(&mut self, config: &I2cConfig) -> Result<(), I2cError> {
        if !config.is_supported_speed() {
            return Err(I2cError::InvalidConfig);
        }
        self.driver = None;

        let mut i2c_config = i2c::Config::default();
        i2c_config.frequency = config.frequency;
        i2c_config.sda_pullup = config.sda_pull_up;
        i2c_config.scl_pullup = config.scl_pull_up;

        // SAFETY: the previous driver and any GPIO use of the pins were
        // dropped above or in `leave_gpio`; only one user exists at a time.
        let (instance, scl, sda) = unsafe {
            (
                self.instance.clone_unchecked(),
                self.scl.clone_unchecked(),
                self.sda.clone_unchecked(),
            )
        };
        self.driver = Some(I2c::new_async(instance, scl, sda, self.irqs, i2c_config));
        Ok(())
    }

    fn disable(&mut self) {
        self.driver = None;
    }
}

impl<T, SCL, SDA, IRQ> RecoveryLines for Rp2040I2c<T, SCL, SDA, IRQ>
where
    T: Instance + 'static,
    SCL: SclPin<T> + 'static,
    SDA: SdaPin<T> + 'static,
    IRQ: Binding<T::Interrupt, InterruptHandler<T>> + Copy,
{
    type Clock = GpioLine;
    type Data = GpioLine;

    #[allow(unsafe_code)]
    fn enter_gpio(&mut self, config: &I2cConfig) {
        self.driver = None;
        // SAFETY: the I2C driver was dropped above; the pins have no other
        // user until `leave_gpio`.
        let (scl, sda) = unsafe { (self.scl.clone_unchecked(), self.sda.clone_unchecked()) };
        self.clock = GpioLine::output(Flex::new(scl), config.scl_pull_up);
        self.data = GpioLine::input(Flex::new(sda), config.sda_pull_up);
    }

    fn leave_gpio(&mut self) {
        self.clock.release();
        self.data.release();
    }

    fn clock(&mut self) -> &mut GpioLine {
        &mut self.clock
    }

    fn data(&self) -> &GpioLine {
        &self.data
    }
}
