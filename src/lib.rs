#![cfg_attr(not(test), no_std)]

//! # BME680 Forced-Mode Driver
//!
//! An async, `no_std` driver for the Bosch BME680 that reads temperature, pressure and humidity
//! one forced measurement at a time, over any [`embedded_hal_async::i2c::I2c`] bus.
//!
//! The driver owns its calibration data and runs the manufacturer's integer compensation
//! formulas bit for bit. The gas sensor is switched off.
//!
//! ## Lifecycle
//! 1. [`Bme680::new`] wraps a bus and a delay provider. Nothing is sent yet.
//! 2. [`Bme680::initialize`] checks the chip id, soft-resets the device, loads the calibration
//!    and writes the oversampling configuration.
//! 3. [`Bme680::read_sample`] triggers a measurement, polls until it completes and returns a
//!    [`CompensatedSample`].
//!
//! The bus is used exclusively for the duration of each call. To share a driver between tasks,
//! guard the whole driver with a mutex.
//!
//! ## Units
//! - **Temperature**: °C
//! - **Pressure**: hPa
//! - **Humidity**: %RH
//!
//! The bit-exact integer results are available through [`CalibrationData::compensate`] as a
//! [`FixedPointSample`] (0.01 °C, Pa, 0.001 %RH).

mod fmt;

mod bus;
mod calc;
mod calibration;
mod measurement;
pub mod regs;
mod settings;

#[cfg(test)]
mod testing;

use embedded_hal_async::{delay::DelayNs, i2c::I2c};

use crate::bus::Bus;
use crate::fmt::{debug, trace, warn};
use crate::measurement::MeasurementController;

pub use calc::{TFine, TemperatureComp};
pub use calibration::CalibrationData;
pub use measurement::MeasurementPhase;
pub use settings::{Config, ConfigBuilder, DegeneratePressure, IirFilter, Oversampling};

/// Settle time after a soft reset before the device answers again.
pub const SOFT_RESET_DELAY_MS: u32 = 100;

/// Error types for the BME680 driver.
pub mod error {
    use embedded_hal::i2c::ErrorKind;

    /// Errors that can occur during initialization or a measurement.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum Bme680Error<E> {
        /// A register read or write failed on the bus.
        Bus(E),
        /// The chip id register did not hold `0x61`.
        IdentityMismatch { found: u8 },
        /// The driver is not in the `Ready` state.
        NotInitialized,
        /// The device was still measuring when the poll budget ran out.
        Timeout,
        /// The pressure formula hit its zero divisor and the configuration rejects that.
        DegenerateComputation,
    }

    impl<E: embedded_hal::i2c::Error> Bme680Error<E> {
        /// The generic kind of a bus failure, `None` for the other variants.
        pub fn bus_kind(&self) -> Option<ErrorKind> {
            match self {
                Bme680Error::Bus(e) => Some(e.kind()),
                _ => None,
            }
        }
    }

    impl<E> core::fmt::Display for Bme680Error<E> {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            match self {
                Bme680Error::Bus(_) => write!(f, "bus transaction failed"),
                Bme680Error::IdentityMismatch { found } => {
                    write!(f, "unexpected chip id {found:#04x}, expected 0x61")
                }
                Bme680Error::NotInitialized => write!(f, "sensor is not initialized"),
                Bme680Error::Timeout => write!(f, "measurement did not complete in time"),
                Bme680Error::DegenerateComputation => {
                    write!(f, "pressure compensation hit a zero divisor")
                }
            }
        }
    }

    impl<E: core::fmt::Debug> core::error::Error for Bme680Error<E> {}

    /// Result type alias for BME680 operations.
    pub type Result<T, E> = core::result::Result<T, Bme680Error<E>>;
}

use error::Bme680Error;

/// Lifecycle state of a [`Bme680`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverState {
    /// Created, never initialized.
    Uninitialized,
    /// Calibration loaded and configuration written.
    Ready,
    /// The last initialization attempt failed.
    Faulted,
}

/// Steps of [`Bme680::initialize`], in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum InitStage {
    Start,
    IdentityChecked,
    Reset,
    CalibrationLoaded,
    Configured,
}

/// Raw ADC counts of one measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSample {
    /// 20-bit pressure count.
    pub pressure: u32,
    /// 20-bit temperature count.
    pub temperature: u32,
    /// 16-bit humidity count.
    pub humidity: u16,
}

/// Integer output of the compensation formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FixedPointSample {
    /// Temperature in 0.01 °C (2279 = 22.79 °C).
    pub temperature: i32,
    /// Pressure in Pa, `None` when the formula hit its zero divisor.
    pub pressure: Option<u32>,
    /// Relative humidity in 0.001 % (45272 = 45.272 %RH).
    pub humidity: u32,
}

/// Compensated measurement in physical units.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CompensatedSample {
    /// °C
    pub temperature: f64,
    /// hPa. `0.0` when `pressure_degenerate` is set.
    pub pressure: f64,
    /// %RH. The integer result is in thousandths of %RH, so this is that value divided by 1000
    /// (not by 1024).
    pub humidity: f64,
    /// The pressure formula hit its zero divisor or produced an out-of-range value, and
    /// `pressure` is the `0` fallback, not a reading.
    pub pressure_degenerate: bool,
}

impl From<FixedPointSample> for CompensatedSample {
    fn from(fixed: FixedPointSample) -> Self {
        Self {
            temperature: f64::from(fixed.temperature) / 100.0,
            pressure: f64::from(fixed.pressure.unwrap_or(0)) / 100.0,
            humidity: f64::from(fixed.humidity) / 1000.0,
            pressure_degenerate: fixed.pressure.is_none(),
        }
    }
}

/// The main BME680 driver structure.
///
/// Owns the bus, the delay provider and, once initialized, the calibration data. Several
/// instances on different buses or addresses are fully independent.
pub struct Bme680<I2C, D> {
    bus: Bus<I2C>,
    delay: D,
    config: Config,
    state: DriverState,
    calib_data: Option<CalibrationData>,
    last_phase: MeasurementPhase,
}

impl<I2C, D, E> Bme680<I2C, D>
where
    I2C: I2c<Error = E>,
    D: DelayNs,
{
    /// Creates a new driver instance in the `Uninitialized` state.
    ///
    /// This does not communicate with the sensor yet.
    ///
    /// # Arguments
    /// * `i2c` - The I2C bus object.
    /// * `delay` - Async delay provider used for the reset settle time and status polling.
    /// * `address` - The I2C address of the sensor ([`regs::DEFAULT_ADDRESS`] or
    ///   [`regs::ALTERNATE_ADDRESS`]).
    /// * `config` - Oversampling, filter and polling settings applied by `initialize`.
    pub fn new(i2c: I2C, delay: D, address: u8, config: Config) -> Self {
        Self {
            bus: Bus::new(i2c, address),
            delay,
            config,
            state: DriverState::Uninitialized,
            calib_data: None,
            last_phase: MeasurementPhase::Idle,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Calibration coefficients, available in the `Ready` state.
    pub fn calibration(&self) -> Option<&CalibrationData> {
        self.calib_data.as_ref()
    }

    /// Phase the most recent [`read_sample`](Self::read_sample) reached: `Complete` once the
    /// device finished converting, `TimedOut` after the poll budget ran out, `Idle` before any
    /// measurement.
    pub fn last_phase(&self) -> MeasurementPhase {
        self.last_phase
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn address(&self) -> u8 {
        self.bus.address()
    }

    /// Gives back the bus and the delay provider.
    pub fn release(self) -> (I2C, D) {
        (self.bus.release(), self.delay)
    }

    /// Reads the chip id register (expected value: `0x61`). Works in any state.
    pub async fn read_chip_id(&mut self) -> error::Result<u8, E> {
        self.bus.read_u8(regs::ADDR_CHIP_ID).await
    }

    /// Checks the chip id, soft-resets the sensor, loads the calibration and writes the
    /// configuration.
    ///
    /// Can be called again to re-initialize. On any failure the driver ends up `Faulted`, no
    /// calibration is kept and nothing is retried.
    ///
    /// # Errors
    /// [`Bme680Error::IdentityMismatch`] if the chip id is wrong (the reset command is then never
    /// sent), [`Bme680Error::Bus`] if any transaction fails.
    pub async fn initialize(&mut self) -> error::Result<(), E> {
        self.calib_data = None;
        let mut stage = InitStage::Start;

        match self.run_init(&mut stage).await {
            Ok(calib_data) => {
                self.calib_data = Some(calib_data);
                self.state = DriverState::Ready;
                debug!("BME680 at {} ready", self.bus.address());
                Ok(())
            }
            Err(e) => {
                self.state = DriverState::Faulted;
                warn!("BME680 initialization failed after stage {:?}", stage);
                Err(e)
            }
        }
    }

    async fn run_init(&mut self, stage: &mut InitStage) -> error::Result<CalibrationData, E> {
        // 1. Identity
        let found = self.read_chip_id().await?;
        if found != regs::CHIP_ID {
            return Err(Bme680Error::IdentityMismatch { found });
        }
        *stage = InitStage::IdentityChecked;

        // 2. Soft reset, then let the device reboot
        self.bus
            .write_u8(regs::ADDR_RESET, regs::SOFT_RESET_CMD)
            .await?;
        self.delay.delay_ms(SOFT_RESET_DELAY_MS).await;
        *stage = InitStage::Reset;

        // 3. Factory calibration
        let calib_data = CalibrationData::load(&mut self.bus).await?;
        *stage = InitStage::CalibrationLoaded;

        // 4. Oversampling, gas off, filter, sleep mode. ctrl_hum only takes effect once
        // ctrl_meas is written, so ctrl_meas goes last.
        self.bus
            .write_u8(regs::ADDR_CTRL_HUM, self.config.ctrl_hum())
            .await?;
        self.bus.write_u8(regs::ADDR_CTRL_GAS_1, 0x00).await?;
        self.bus
            .write_u8(regs::ADDR_CONFIG, self.config.config_reg())
            .await?;
        self.bus
            .write_u8(regs::ADDR_CTRL_MEAS, self.config.ctrl_meas())
            .await?;
        *stage = InitStage::Configured;

        trace!("init stages done: {:?}", *stage);
        Ok(calib_data)
    }

    /// Triggers a forced measurement, waits for it and returns compensated values.
    ///
    /// Failures are transient: the state and the calibration are left untouched and the next
    /// call starts a fresh measurement.
    ///
    /// # Errors
    /// [`Bme680Error::NotInitialized`] before a successful `initialize` (no bus traffic),
    /// [`Bme680Error::Bus`], [`Bme680Error::Timeout`], and
    /// [`Bme680Error::DegenerateComputation`] if configured with [`DegeneratePressure::Error`].
    pub async fn read_sample(&mut self) -> error::Result<CompensatedSample, E> {
        let calib_data = match (self.state, self.calib_data) {
            (DriverState::Ready, Some(calib_data)) => calib_data,
            _ => return Err(Bme680Error::NotInitialized),
        };

        let mut controller =
            MeasurementController::new(self.config.poll_interval_ms, self.config.max_poll_attempts);
        let outcome = controller.run(&mut self.bus, &mut self.delay).await;
        self.last_phase = controller.phase();
        let raw = match outcome {
            Ok(raw) => raw,
            Err(e) => {
                debug!("measurement aborted in phase {:?}", controller.phase());
                return Err(e);
            }
        };
        trace!(
            "raw sample after {} status reads: p={} t={} h={}",
            controller.status_reads(),
            raw.pressure,
            raw.temperature,
            raw.humidity
        );

        let fixed = calib_data.compensate(&raw);
        if fixed.pressure.is_none() {
            debug!("pressure compensation is degenerate");
            if self.config.degenerate_pressure == DegeneratePressure::Error {
                return Err(Bme680Error::DegenerateComputation);
            }
        }

        Ok(fixed.into())
    }

    /// Like [`read_sample`](Self::read_sample), but treats every failure as "no data this cycle".
    pub async fn try_read_sample(&mut self) -> Option<CompensatedSample> {
        match self.read_sample().await {
            Ok(sample) => Some(sample),
            Err(_e) => {
                warn!("BME680 sample dropped");
                None
            }
        }
    }
}
