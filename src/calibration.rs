use embedded_hal_async::i2c::I2c;

use crate::bus::Bus;
use crate::error;
use crate::fmt::trace;
use crate::regs::calib;

/// Factory-trimmed calibration coefficients read from the sensor.
///
/// These are unique to every chip and required by the compensation formulas. Each field has the
/// width and signedness given in the datasheet; `par_h1` and `par_h2` are 12-bit values.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationData {
    pub par_t1: u16,
    pub par_t2: i16,
    pub par_t3: i8,
    pub par_p1: u16,
    pub par_p2: i16,
    pub par_p3: i8,
    pub par_p4: i16,
    pub par_p5: i16,
    pub par_p6: i8,
    pub par_p7: i8,
    pub par_p8: i16,
    pub par_p9: i16,
    pub par_p10: u8,
    pub par_h1: u16,
    pub par_h2: u16,
    pub par_h3: i8,
    pub par_h4: i8,
    pub par_h5: i8,
    pub par_h6: u8,
    pub par_h7: i8,
}

/// `par_h1 = msb<11:4> | shared<3:0>`.
pub(crate) fn merge_h1(msb: u8, shared: u8) -> u16 {
    (u16::from(msb) << 4) | u16::from(shared & 0x0F)
}

/// `par_h2 = msb<11:4> | shared<7:4>`.
pub(crate) fn merge_h2(msb: u8, shared: u8) -> u16 {
    (u16::from(msb) << 4) | u16::from(shared >> 4)
}

impl CalibrationData {
    /// Reads every coefficient from the sensor, one register (or register pair) at a time.
    ///
    /// The shared register `0xE2` is read once for `par_h1` and again for `par_h2`.
    pub(crate) async fn load<I2C, E>(bus: &mut Bus<I2C>) -> error::Result<Self, E>
    where
        I2C: I2c<Error = E>,
    {
        let par_t1 = bus.read_u16_le(calib::PAR_T1).await?;
        let par_t2 = bus.read_i16_le(calib::PAR_T2).await?;
        let par_t3 = bus.read_i8(calib::PAR_T3).await?;

        let par_p1 = bus.read_u16_le(calib::PAR_P1).await?;
        let par_p2 = bus.read_i16_le(calib::PAR_P2).await?;
        let par_p3 = bus.read_i8(calib::PAR_P3).await?;
        let par_p4 = bus.read_i16_le(calib::PAR_P4).await?;
        let par_p5 = bus.read_i16_le(calib::PAR_P5).await?;
        let par_p6 = bus.read_i8(calib::PAR_P6).await?;
        let par_p7 = bus.read_i8(calib::PAR_P7).await?;
        let par_p8 = bus.read_i16_le(calib::PAR_P8).await?;
        let par_p9 = bus.read_i16_le(calib::PAR_P9).await?;
        let par_p10 = bus.read_u8(calib::PAR_P10).await?;

        let h1_msb = bus.read_u8(calib::PAR_H1_MSB).await?;
        let h1_lsb = bus.read_u8(calib::PAR_H1_H2_LSB).await?;
        let par_h1 = merge_h1(h1_msb, h1_lsb);

        let h2_msb = bus.read_u8(calib::PAR_H2_MSB).await?;
        let h2_lsb = bus.read_u8(calib::PAR_H1_H2_LSB).await?;
        let par_h2 = merge_h2(h2_msb, h2_lsb);

        let par_h3 = bus.read_i8(calib::PAR_H3).await?;
        let par_h4 = bus.read_i8(calib::PAR_H4).await?;
        let par_h5 = bus.read_i8(calib::PAR_H5).await?;
        let par_h6 = bus.read_u8(calib::PAR_H6).await?;
        let par_h7 = bus.read_i8(calib::PAR_H7).await?;

        trace!("calibration: par_t1={} par_h1={} par_h2={}", par_t1, par_h1, par_h2);

        Ok(Self {
            par_t1,
            par_t2,
            par_t3,
            par_p1,
            par_p2,
            par_p3,
            par_p4,
            par_p5,
            par_p6,
            par_p7,
            par_p8,
            par_p9,
            par_p10,
            par_h1,
            par_h2,
            par_h3,
            par_h4,
            par_h5,
            par_h6,
            par_h7,
        })
    }
}
