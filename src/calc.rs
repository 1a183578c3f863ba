//! Integer compensation formulas (Bosch BME680 reference API, fixed-point variant).
//!
//! Intermediates are `i64` so no product is truncated. Shifts are arithmetic and divisions
//! truncate toward zero, as in the reference.

use crate::{CalibrationData, FixedPointSample, RawSample};

/// Fine temperature carried from temperature compensation into pressure and humidity.
///
/// Only [`CalibrationData::compensate_temperature`] produces one, so pressure and humidity can
/// only be computed after temperature for the same sample. It is never stored by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TFine(i32);

impl TFine {
    pub fn value(self) -> i32 {
        self.0
    }

    /// Temperature in 0.01 °C.
    fn scaled(self) -> i64 {
        ((i64::from(self.0) * 5) + 128) >> 8
    }
}

/// Result of temperature compensation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TemperatureComp {
    pub t_fine: TFine,
    /// Temperature in 0.01 °C.
    pub centi_celsius: i32,
}

impl CalibrationData {
    /// Converts the raw temperature ADC value to 0.01 °C and produces `t_fine`.
    pub fn compensate_temperature(&self, temp_adc: u32) -> TemperatureComp {
        let par_t1 = i64::from(self.par_t1);
        let par_t2 = i64::from(self.par_t2);
        let par_t3 = i64::from(self.par_t3);

        let var1 = (i64::from(temp_adc) >> 3) - (par_t1 << 1);
        let var2 = (var1 * par_t2) >> 11;
        let var3 = ((var1 >> 1) * (var1 >> 1)) >> 12;
        let var3 = (var3 * (par_t3 << 4)) >> 14;

        let t_fine = TFine((var2 + var3) as i32);

        TemperatureComp {
            t_fine,
            centi_celsius: t_fine.scaled() as i32,
        }
    }

    /// Converts the raw pressure ADC value to Pascal.
    ///
    /// Returns `None` when the normalised `var1` factor is zero (the reference returns `0` in
    /// that case instead of dividing), when a correction term overflows `i64`, or when the result
    /// falls outside `0..=u32::MAX`. Each of these is reported as degenerate pressure.
    pub fn compensate_pressure(&self, t_fine: TFine, press_adc: u32) -> Option<u32> {
        let par_p1 = i64::from(self.par_p1);
        let par_p2 = i64::from(self.par_p2);
        let par_p3 = i64::from(self.par_p3);
        let par_p4 = i64::from(self.par_p4);
        let par_p5 = i64::from(self.par_p5);
        let par_p6 = i64::from(self.par_p6);
        let par_p7 = i64::from(self.par_p7);
        let par_p8 = i64::from(self.par_p8);
        let par_p9 = i64::from(self.par_p9);
        let par_p10 = i64::from(self.par_p10);

        let var1 = (i64::from(t_fine.0) >> 1) - 64_000;
        let quarter_sq = (var1 >> 2) * (var1 >> 2);

        let var2 = ((quarter_sq >> 11) * par_p6) >> 2;
        let var2 = var2 + ((var1 * par_p5) << 1);
        let var2 = (var2 >> 2) + (par_p4 << 16);

        let var1 = ((((quarter_sq >> 13) * (par_p3 << 5)) >> 3) + ((par_p2 * var1) >> 1)) >> 18;
        let var1 = ((32_768 + var1) * par_p1) >> 15;

        if var1 == 0 {
            return None;
        }

        let press = 1_048_576 - i64::from(press_adc);
        let press = (press - (var2 >> 12)) * 3125;
        let press = if press >= (1 << 30) {
            (press / var1) << 1
        } else {
            (press << 1) / var1
        };

        // A tiny but non-zero divisor above inflates `press` far enough to overflow these.
        let var1 = par_p9.checked_mul((press >> 3).checked_mul(press >> 3)? >> 13)? >> 12;
        let var2 = (press >> 2).checked_mul(par_p8)? >> 13;
        let press_hi = press >> 8;
        let var3 = press_hi
            .checked_mul(press_hi)?
            .checked_mul(press_hi)?
            .checked_mul(par_p10)?
            >> 17;

        let correction = var1
            .checked_add(var2)?
            .checked_add(var3)?
            .checked_add(par_p7 << 7)?;
        let press = press.checked_add(correction >> 4)?;

        u32::try_from(press).ok()
    }

    /// Converts the raw humidity ADC value to 0.001 %RH, clamped to `0..=100_000`.
    pub fn compensate_humidity(&self, t_fine: TFine, hum_adc: u16) -> u32 {
        let par_h1 = i64::from(self.par_h1);
        let par_h2 = i64::from(self.par_h2);
        let par_h3 = i64::from(self.par_h3);
        let par_h4 = i64::from(self.par_h4);
        let par_h5 = i64::from(self.par_h5);
        let par_h6 = i64::from(self.par_h6);
        let par_h7 = i64::from(self.par_h7);

        let temp_scaled = t_fine.scaled();

        let var1 = (i64::from(hum_adc) - (par_h1 * 16)) - (((temp_scaled * par_h3) / 100) >> 1);
        let var2 = (par_h2
            * (((temp_scaled * par_h4) / 100)
                + (((temp_scaled * ((temp_scaled * par_h5) / 100)) >> 6) / 100)
                + (1 << 14)))
            >> 10;
        let var3 = var1 * var2;
        let var4 = ((par_h6 << 7) + ((temp_scaled * par_h7) / 100)) >> 4;
        let var5 = ((var3 >> 14) * (var3 >> 14)) >> 10;
        let var6 = (var4 * var5) >> 1;

        let hum = (((var3 + var6) >> 10) * 1000) >> 12;

        hum.clamp(0, 100_000) as u32
    }

    /// Runs all three formulas on one raw sample, temperature first.
    pub fn compensate(&self, raw: &RawSample) -> FixedPointSample {
        let temp = self.compensate_temperature(raw.temperature);
        let pressure = self.compensate_pressure(temp.t_fine, raw.pressure);
        let humidity = self.compensate_humidity(temp.t_fine, raw.humidity);

        FixedPointSample {
            temperature: temp.centi_celsius,
            pressure,
            humidity,
        }
    }
}
