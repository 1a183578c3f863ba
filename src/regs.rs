//! BME680 register map (datasheet section 5.2) and the calibration register layout
//! (datasheet section 3.11.1).

/// Default I2C address (SDO tied to GND).
pub const DEFAULT_ADDRESS: u8 = 0x76;
/// Alternate I2C address (SDO tied to VDDIO).
pub const ALTERNATE_ADDRESS: u8 = 0x77;

pub const ADDR_CHIP_ID: u8 = 0xD0;
pub const CHIP_ID: u8 = 0x61;

pub const ADDR_RESET: u8 = 0xE0;
pub const SOFT_RESET_CMD: u8 = 0xB6;

pub const ADDR_CTRL_GAS_1: u8 = 0x71;
pub const ADDR_CTRL_HUM: u8 = 0x72;
pub const ADDR_CTRL_MEAS: u8 = 0x74;
pub const ADDR_CONFIG: u8 = 0x75;

pub const ADDR_MEAS_STATUS_0: u8 = 0x1D;
/// `measuring` flag in `meas_status_0`.
pub const MEASURING_BIT: u8 = 1 << 5;

/// Start of the `press_msb..=hum_lsb` burst.
pub const ADDR_PRESS_MSB: u8 = 0x1F;
pub const RAW_BLOCK_SIZE: usize = 8;

/// `ctrl_meas` mode bits.
pub const MODE_MASK: u8 = 0b11;
pub const MODE_SLEEP: u8 = 0b00;
pub const MODE_FORCED: u8 = 0b01;

/// Calibration registers. 16-bit values name their LSB; the MSB follows at `+1`.
pub mod calib {
    pub const PAR_T1: u8 = 0xE9;
    pub const PAR_T2: u8 = 0x8A;
    pub const PAR_T3: u8 = 0x8C;

    pub const PAR_P1: u8 = 0x8E;
    pub const PAR_P2: u8 = 0x90;
    pub const PAR_P3: u8 = 0x92;
    pub const PAR_P4: u8 = 0x94;
    pub const PAR_P5: u8 = 0x96;
    pub const PAR_P6: u8 = 0x99;
    pub const PAR_P7: u8 = 0x98;
    pub const PAR_P8: u8 = 0x9C;
    pub const PAR_P9: u8 = 0x9E;
    pub const PAR_P10: u8 = 0xA0;

    /// `par_h2<11:4>`.
    pub const PAR_H2_MSB: u8 = 0xE1;
    /// Shared register: `par_h2<3:0>` in the high nibble, `par_h1<3:0>` in the low nibble.
    pub const PAR_H1_H2_LSB: u8 = 0xE2;
    /// `par_h1<11:4>`.
    pub const PAR_H1_MSB: u8 = 0xE3;
    pub const PAR_H3: u8 = 0xE4;
    pub const PAR_H4: u8 = 0xE5;
    pub const PAR_H5: u8 = 0xE6;
    pub const PAR_H6: u8 = 0xE7;
    pub const PAR_H7: u8 = 0xE8;
}
