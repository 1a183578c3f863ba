//! Test doubles: a simulated BME680 register file and a delay provider that records its calls.

use std::collections::{BTreeSet, VecDeque};

use embedded_hal::i2c::{ErrorKind, ErrorType, NoAcknowledgeSource, Operation};

use crate::regs::{self, calib};
use crate::CalibrationData;

/// Calibration stored in [`FakeBme680`]'s register image.
pub(crate) fn golden_calibration() -> CalibrationData {
    CalibrationData {
        par_t1: 26_090,
        par_t2: 26_460,
        par_t3: 3,
        par_p1: 36_477,
        par_p2: -10_371,
        par_p3: 88,
        par_p4: 6_944,
        par_p5: -134,
        par_p6: 30,
        par_p7: 33,
        par_p8: -2_530,
        par_p9: -2_617,
        par_p10: 30,
        par_h1: 754,
        par_h2: 1_015,
        par_h3: 0,
        par_h4: 45,
        par_h5: 20,
        par_h6: 120,
        par_h7: -100,
    }
}

/// Raw block for T = 22.79 °C, P = 1014.42 hPa, H = 45.272 %RH with [`golden_calibration`].
pub(crate) const GOLDEN_BLOCK: [u8; regs::RAW_BLOCK_SIZE] =
    [0x53, 0xA4, 0x00, 0x77, 0x8E, 0x00, 0x51, 0xC4];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BusOp {
    Read { reg: u8, len: usize },
    Write { reg: u8, value: u8 },
    Reset,
}

/// In-memory BME680: auto-incrementing reads, `[reg, value]` pair writes.
pub(crate) struct FakeBme680 {
    address: u8,
    regs: [u8; 256],
    pointer: u8,
    status_script: VecDeque<u8>,
    failing: BTreeSet<u8>,
    log: Vec<BusOp>,
}

impl FakeBme680 {
    pub(crate) fn new() -> Self {
        let mut fake = Self {
            address: regs::DEFAULT_ADDRESS,
            regs: [0; 256],
            pointer: 0,
            status_script: VecDeque::new(),
            failing: BTreeSet::new(),
            log: Vec::new(),
        };

        fake.regs[usize::from(regs::ADDR_CHIP_ID)] = regs::CHIP_ID;

        let cal = golden_calibration();
        fake.set_word(calib::PAR_T1, cal.par_t1);
        fake.set_word(calib::PAR_T2, cal.par_t2 as u16);
        fake.set_byte(calib::PAR_T3, cal.par_t3 as u8);
        fake.set_word(calib::PAR_P1, cal.par_p1);
        fake.set_word(calib::PAR_P2, cal.par_p2 as u16);
        fake.set_byte(calib::PAR_P3, cal.par_p3 as u8);
        fake.set_word(calib::PAR_P4, cal.par_p4 as u16);
        fake.set_word(calib::PAR_P5, cal.par_p5 as u16);
        fake.set_byte(calib::PAR_P6, cal.par_p6 as u8);
        fake.set_byte(calib::PAR_P7, cal.par_p7 as u8);
        fake.set_word(calib::PAR_P8, cal.par_p8 as u16);
        fake.set_word(calib::PAR_P9, cal.par_p9 as u16);
        fake.set_byte(calib::PAR_P10, cal.par_p10);
        // par_h1 = 0x2F2, par_h2 = 0x3F7
        fake.set_byte(calib::PAR_H2_MSB, 0x3F);
        fake.set_byte(calib::PAR_H1_H2_LSB, 0x72);
        fake.set_byte(calib::PAR_H1_MSB, 0x2F);
        fake.set_byte(calib::PAR_H3, cal.par_h3 as u8);
        fake.set_byte(calib::PAR_H4, cal.par_h4 as u8);
        fake.set_byte(calib::PAR_H5, cal.par_h5 as u8);
        fake.set_byte(calib::PAR_H6, cal.par_h6);
        fake.set_byte(calib::PAR_H7, cal.par_h7 as u8);

        for (offset, byte) in GOLDEN_BLOCK.iter().enumerate() {
            fake.regs[usize::from(regs::ADDR_PRESS_MSB) + offset] = *byte;
        }

        fake
    }

    pub(crate) fn set_byte(&mut self, reg: u8, value: u8) {
        self.regs[usize::from(reg)] = value;
    }

    /// Stores a little-endian word at `reg`, `reg + 1`.
    pub(crate) fn set_word(&mut self, reg: u8, value: u16) {
        let [lsb, msb] = value.to_le_bytes();
        self.set_byte(reg, lsb);
        self.set_byte(reg + 1, msb);
    }

    pub(crate) fn set_chip_id(&mut self, id: u8) {
        self.set_byte(regs::ADDR_CHIP_ID, id);
    }

    /// Overwrites the 20-bit temperature count in the raw block.
    pub(crate) fn set_raw_temperature(&mut self, adc: u32) {
        let base = regs::ADDR_PRESS_MSB + 3;
        self.set_byte(base, (adc >> 12) as u8);
        self.set_byte(base + 1, (adc >> 4) as u8);
        self.set_byte(base + 2, ((adc & 0x0F) << 4) as u8);
    }

    /// Values returned by successive `meas_status_0` reads; once used up the register reads
    /// as idle.
    pub(crate) fn script_status(&mut self, statuses: &[u8]) {
        self.status_script.extend(statuses.iter().copied());
    }

    /// Makes every read starting at `reg` fail.
    pub(crate) fn fail_reads_of(&mut self, reg: u8) {
        self.failing.insert(reg);
    }

    pub(crate) fn clear_failures(&mut self) {
        self.failing.clear();
    }

    pub(crate) fn log(&self) -> &[BusOp] {
        &self.log
    }

    pub(crate) fn writes(&self) -> Vec<(u8, u8)> {
        self.log
            .iter()
            .filter_map(|op| match op {
                BusOp::Write { reg, value } => Some((*reg, *value)),
                BusOp::Reset => Some((regs::ADDR_RESET, regs::SOFT_RESET_CMD)),
                BusOp::Read { .. } => None,
            })
            .collect()
    }

    pub(crate) fn reads_of(&self, reg: u8) -> usize {
        self.log
            .iter()
            .filter(|op| matches!(op, BusOp::Read { reg: r, .. } if *r == reg))
            .count()
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<(), ErrorKind> {
        let start = self.pointer;
        if self.failing.contains(&start) {
            return Err(ErrorKind::Other);
        }
        self.log.push(BusOp::Read {
            reg: start,
            len: buffer.len(),
        });

        for (offset, byte) in buffer.iter_mut().enumerate() {
            let reg = start.wrapping_add(offset as u8);
            *byte = if reg == regs::ADDR_MEAS_STATUS_0 {
                self.status_script
                    .pop_front()
                    .unwrap_or(self.regs[usize::from(reg)])
            } else {
                self.regs[usize::from(reg)]
            };
        }
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) {
        if let [reg] = bytes {
            self.pointer = *reg;
            return;
        }
        for pair in bytes.chunks_exact(2) {
            let (reg, value) = (pair[0], pair[1]);
            self.pointer = reg;
            if reg == regs::ADDR_RESET {
                if value == regs::SOFT_RESET_CMD {
                    self.log.push(BusOp::Reset);
                }
                continue;
            }
            self.regs[usize::from(reg)] = value;
            self.log.push(BusOp::Write { reg, value });
        }
    }
}

impl ErrorType for FakeBme680 {
    type Error = ErrorKind;
}

impl embedded_hal_async::i2c::I2c for FakeBme680 {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address != self.address {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        for operation in operations {
            match operation {
                Operation::Write(bytes) => self.write(bytes),
                Operation::Read(buffer) => self.read(buffer)?,
            }
        }
        Ok(())
    }
}

/// Async delay that returns immediately and remembers every requested duration.
#[derive(Debug, Default)]
pub(crate) struct RecordingDelay {
    calls_ns: Vec<u32>,
}

impl RecordingDelay {
    pub(crate) fn millis(&self) -> Vec<u32> {
        self.calls_ns.iter().map(|ns| ns / 1_000_000).collect()
    }
}

impl embedded_hal_async::delay::DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.calls_ns.push(ns);
    }
}
