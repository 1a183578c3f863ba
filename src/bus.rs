use embedded_hal_async::i2c::I2c;

use crate::error::{self, Bme680Error};

/// Register-level access to a device at a fixed I2C address.
///
/// Every method is one bus transaction. Nothing here groups transactions, so two reads that
/// belong together (for example both halves of a nibble-merged constant) may be interleaved
/// with other bus traffic if the bus is shared.
#[derive(Debug)]
pub(crate) struct Bus<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C, E> Bus<I2C>
where
    I2C: I2c<Error = E>,
{
    pub(crate) fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    pub(crate) fn address(&self) -> u8 {
        self.address
    }

    pub(crate) fn release(self) -> I2C {
        self.i2c
    }

    #[cfg(test)]
    pub(crate) fn inner_mut(&mut self) -> &mut I2C {
        &mut self.i2c
    }

    /// Reads `buffer.len()` consecutive registers starting at `reg`.
    pub(crate) async fn read_block(&mut self, reg: u8, buffer: &mut [u8]) -> error::Result<(), E> {
        self.i2c
            .write_read(self.address, &[reg], buffer)
            .await
            .map_err(Bme680Error::Bus)
    }

    pub(crate) async fn read_u8(&mut self, reg: u8) -> error::Result<u8, E> {
        let mut buffer = [0u8; 1];
        self.read_block(reg, &mut buffer).await?;
        Ok(buffer[0])
    }

    pub(crate) async fn read_i8(&mut self, reg: u8) -> error::Result<i8, E> {
        Ok(self.read_u8(reg).await? as i8)
    }

    /// Reads a little-endian word: LSB at `reg`, MSB at `reg + 1`.
    pub(crate) async fn read_u16_le(&mut self, reg: u8) -> error::Result<u16, E> {
        let mut buffer = [0u8; 2];
        self.read_block(reg, &mut buffer).await?;
        Ok(u16::from_le_bytes(buffer))
    }

    pub(crate) async fn read_i16_le(&mut self, reg: u8) -> error::Result<i16, E> {
        let mut buffer = [0u8; 2];
        self.read_block(reg, &mut buffer).await?;
        Ok(i16::from_le_bytes(buffer))
    }

    pub(crate) async fn write_u8(&mut self, reg: u8, value: u8) -> error::Result<(), E> {
        self.i2c
            .write(self.address, &[reg, value])
            .await
            .map_err(Bme680Error::Bus)
    }
}
