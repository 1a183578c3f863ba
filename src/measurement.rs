use embedded_hal_async::{delay::DelayNs, i2c::I2c};

use crate::bus::Bus;
use crate::error::{self, Bme680Error};
use crate::fmt::{debug, trace};
use crate::regs;
use crate::RawSample;

/// Phases of one forced-mode measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MeasurementPhase {
    Idle,
    /// Forced mode written to `ctrl_meas`.
    Triggered,
    /// The device reported `measuring` at least once.
    Measuring,
    /// The `measuring` flag cleared.
    Complete,
    /// The poll budget ran out while the device was still measuring.
    TimedOut,
}

/// Drives the trigger/poll cycle and fetches the raw ADC block.
pub(crate) struct MeasurementController {
    phase: MeasurementPhase,
    poll_interval_ms: u32,
    max_attempts: u16,
    status_reads: u16,
}

impl MeasurementController {
    pub(crate) fn new(poll_interval_ms: u32, max_attempts: u16) -> Self {
        Self {
            phase: MeasurementPhase::Idle,
            poll_interval_ms,
            max_attempts: max_attempts.max(1),
            status_reads: 0,
        }
    }

    pub(crate) fn phase(&self) -> MeasurementPhase {
        self.phase
    }

    pub(crate) fn status_reads(&self) -> u16 {
        self.status_reads
    }

    /// Triggers one measurement, waits for it and returns the raw sample.
    pub(crate) async fn run<I2C, E, D>(
        &mut self,
        bus: &mut Bus<I2C>,
        delay: &mut D,
    ) -> error::Result<RawSample, E>
    where
        I2C: I2c<Error = E>,
        D: DelayNs,
    {
        self.trigger(bus).await?;
        self.wait_until_complete(bus, delay).await?;
        self.fetch(bus).await
    }

    /// Switches `ctrl_meas` to forced mode. Only the two mode bits change.
    async fn trigger<I2C, E>(&mut self, bus: &mut Bus<I2C>) -> error::Result<(), E>
    where
        I2C: I2c<Error = E>,
    {
        let ctrl_meas = bus.read_u8(regs::ADDR_CTRL_MEAS).await?;
        bus.write_u8(
            regs::ADDR_CTRL_MEAS,
            (ctrl_meas & !regs::MODE_MASK) | regs::MODE_FORCED,
        )
        .await?;
        self.phase = MeasurementPhase::Triggered;
        Ok(())
    }

    /// Polls `meas_status_0` until `measuring` clears, at most `max_attempts` reads.
    async fn wait_until_complete<I2C, E, D>(
        &mut self,
        bus: &mut Bus<I2C>,
        delay: &mut D,
    ) -> error::Result<(), E>
    where
        I2C: I2c<Error = E>,
        D: DelayNs,
    {
        loop {
            let status = bus.read_u8(regs::ADDR_MEAS_STATUS_0).await?;
            self.status_reads += 1;

            if status & regs::MEASURING_BIT == 0 {
                self.phase = MeasurementPhase::Complete;
                trace!("measurement complete after {} status reads", self.status_reads);
                return Ok(());
            }

            self.phase = MeasurementPhase::Measuring;
            if self.status_reads >= self.max_attempts {
                self.phase = MeasurementPhase::TimedOut;
                debug!("still measuring after {} status reads", self.status_reads);
                return Err(Bme680Error::Timeout);
            }

            delay.delay_ms(self.poll_interval_ms).await;
        }
    }

    async fn fetch<I2C, E>(&mut self, bus: &mut Bus<I2C>) -> error::Result<RawSample, E>
    where
        I2C: I2c<Error = E>,
    {
        let mut block = [0u8; regs::RAW_BLOCK_SIZE];
        bus.read_block(regs::ADDR_PRESS_MSB, &mut block).await?;
        Ok(RawSample::from_block(&block))
    }
}

impl RawSample {
    /// Decodes the `press_msb..=hum_lsb` burst `[p0, p1, p2, t0, t1, t2, h0, h1]`.
    ///
    /// Pressure and temperature are 20-bit values whose four least significant bits sit in the
    /// high nibble of the `xlsb` byte.
    pub fn from_block(block: &[u8; regs::RAW_BLOCK_SIZE]) -> Self {
        let [p0, p1, p2, t0, t1, t2, h0, h1] = *block;

        let pressure = (u32::from(p0) << 12) | (u32::from(p1) << 4) | (u32::from(p2) >> 4);
        let temperature = (u32::from(t0) << 12) | (u32::from(t1) << 4) | (u32::from(t2) >> 4);
        let humidity = (u16::from(h0) << 8) | u16::from(h1);

        Self {
            pressure,
            temperature,
            humidity,
        }
    }
}
