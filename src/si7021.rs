// Licensed under the Apache-2.0 license

//! Si7021 relative humidity and temperature sensor.
//!
//! Works over any `embedded-hal` I2C bus; on this board that is
//! [`crate::i2c::I2cController`]. Measurements use the "no hold master" commands: the
//! command is written, the conversion time is waited out, and the result is read back with
//! a few retries since the sensor NACKs reads while still converting.

use core::fmt;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{I2c, SevenBitAddress};

use crate::common::{Logger, NoOpLogger};
use crate::i2c::registers::MAX_7BIT_ADDRESS;

pub const SI7021_DEFAULT_ADDR: SevenBitAddress = 0x40;

const RESET_CMD: u8 = 0xFE;
const RESET_DELAY_MS: u32 = 15;

const REVISION_CMD: u16 = 0x84B8;
const REVISION_RSP_LEN: usize = 2;

const MEAS_TEMP_NOHOLD_CMD: u8 = 0xF3;
const MEAS_RH_NOHOLD_CMD: u8 = 0xF5;
const MEASUREMENT_DELAY_MS: u32 = 20;
/// MSB, LSB, checksum.
const MEASUREMENT_RSP_LEN: usize = 3;

/// x^8 + x^5 + x^4 + 1, aligned for a 16 bit shift register.
const CRC8_POLY: u32 = 0x1_3100;

const MAX_READ_ATTEMPTS: u8 = 4;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FirmwareRevision {
    Rev1,
    Rev2,
    Unknown,
}

impl From<u8> for FirmwareRevision {
    fn from(value: u8) -> Self {
        match value {
            0xFF => Self::Rev1,
            0x20 => Self::Rev2,
            _ => Self::Unknown,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Si7021Error<E> {
    InvalidInput,
    I2c(E),
    /// Measurement failed its CRC check.
    Checksum,
}

impl<E: fmt::Debug> fmt::Display for Si7021Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput => f.write_str("invalid input"),
            Self::I2c(err) => write!(f, "I2C error: {err:?}"),
            Self::Checksum => f.write_str("checksum mismatch"),
        }
    }
}

/// Outcome of one monitoring cycle. A failed quantity is `None`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Reading {
    pub temperature: Option<f32>,
    pub humidity: Option<f32>,
}

pub struct Si7021<I, D, L: Logger = NoOpLogger> {
    i2c: I,
    delay: D,
    logger: L,
    address: SevenBitAddress,
    revision: Option<FirmwareRevision>,
}

impl<I: I2c, D: DelayNs, L: Logger> Si7021<I, D, L> {
    pub fn new(i2c: I, delay: D, logger: L) -> Self {
        Self {
            i2c,
            delay,
            logger,
            address: SI7021_DEFAULT_ADDR,
            revision: None,
        }
    }

    /// Select the sensor at `address` and reset it.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for addresses beyond 7 bits, `I2c` if the reset command fails.
    pub fn acquire(&mut self, address: u16) -> Result<(), Si7021Error<I::Error>> {
        if address > MAX_7BIT_ADDRESS {
            return Err(Si7021Error::InvalidInput);
        }
        // Checked against the 7-bit limit above.
        self.address = address as SevenBitAddress;
        self.reset()
    }

    /// Give back the bus, the delay and the logger.
    pub fn release(self) -> (I, D, L) {
        (self.i2c, self.delay, self.logger)
    }

    pub fn address(&self) -> SevenBitAddress {
        self.address
    }

    /// Revision read by the last successful [`Si7021::read_revision`].
    pub fn revision(&self) -> Option<FirmwareRevision> {
        self.revision
    }

    /// Software reset, followed by the power-up time of the sensor.
    ///
    /// # Errors
    ///
    /// `I2c` if the command is not acknowledged.
    pub fn reset(&mut self) -> Result<(), Si7021Error<I::Error>> {
        match self.i2c.write(self.address, &[RESET_CMD]) {
            Ok(()) => {
                self.delay.delay_ms(RESET_DELAY_MS);
                Ok(())
            }
            Err(err) => {
                self.logger
                    .error(format_args!("Si7021 reset failed: {err:?}"));
                Err(Si7021Error::I2c(err))
            }
        }
    }

    /// # Errors
    ///
    /// `I2c` if either the command or the response transfer fails.
    pub fn read_revision(&mut self) -> Result<FirmwareRevision, Si7021Error<I::Error>> {
        if let Err(err) = self.i2c.write(self.address, &REVISION_CMD.to_be_bytes()) {
            self.logger
                .error(format_args!("Si7021 revision command failed: {err:?}"));
            return Err(Si7021Error::I2c(err));
        }

        let mut rsp = [0u8; REVISION_RSP_LEN];
        self.i2c
            .read(self.address, &mut rsp)
            .map_err(Si7021Error::I2c)?;

        let [code, _] = rsp;
        let revision = FirmwareRevision::from(code);
        self.logger
            .info(format_args!("Si7021 firmware revision: {revision:?}"));
        self.revision = Some(revision);
        Ok(revision)
    }

    /// Temperature in degrees Celsius.
    ///
    /// # Errors
    ///
    /// `I2c` on bus failure, `Checksum` if the result is corrupted.
    pub fn read_temperature(&mut self) -> Result<f32, Si7021Error<I::Error>> {
        let code = self.measure_raw(MEAS_TEMP_NOHOLD_CMD)?;
        self.logger.debug(format_args!("temp_code: {code}"));
        Ok(convert_temperature(code))
    }

    /// Relative humidity in percent, clamped to 100.
    ///
    /// # Errors
    ///
    /// `I2c` on bus failure, `Checksum` if the result is corrupted.
    pub fn read_humidity(&mut self) -> Result<f32, Si7021Error<I::Error>> {
        let code = self.measure_raw(MEAS_RH_NOHOLD_CMD)?;
        self.logger.debug(format_args!("rh_code: {code}"));
        Ok(convert_humidity(code))
    }

    /// One monitoring cycle: reset, revision (first cycle only), temperature, humidity.
    ///
    /// Failures are logged and leave the corresponding field empty.
    pub fn measure(&mut self) -> Reading {
        if self.reset().is_err() {
            self.logger.error(format_args!("Si7021 acquire failed"));
        }
        if self.revision.is_none() && self.read_revision().is_err() {
            self.logger.error(format_args!("Si7021 read_revision failed"));
        }

        let temperature = match self.read_temperature() {
            Ok(celsius) => {
                self.logger
                    .info(format_args!("Temperature: {}", celsius as i32));
                Some(celsius)
            }
            Err(err) => {
                self.logger
                    .error(format_args!("read_temperature failed: {err}"));
                None
            }
        };
        let humidity = match self.read_humidity() {
            Ok(percent) => {
                self.logger
                    .info(format_args!("Humidity: {}%", percent as i32));
                Some(percent)
            }
            Err(err) => {
                self.logger.error(format_args!("read_humidity failed: {err}"));
                None
            }
        };
        Reading {
            temperature,
            humidity,
        }
    }

    fn measure_raw(&mut self, cmd: u8) -> Result<u16, Si7021Error<I::Error>> {
        if let Err(err) = self.i2c.write(self.address, &[cmd]) {
            self.logger
                .error(format_args!("Si7021 command {cmd:#x} failed: {err:?}"));
            return Err(Si7021Error::I2c(err));
        }
        self.delay.delay_ms(MEASUREMENT_DELAY_MS);

        let mut rsp = [0u8; MEASUREMENT_RSP_LEN];
        let mut attempt = 1;
        while let Err(err) = self.i2c.read(self.address, &mut rsp) {
            if attempt >= MAX_READ_ATTEMPTS {
                return Err(Si7021Error::I2c(err));
            }
            attempt += 1;
        }

        let [msb, lsb, checksum] = rsp;
        self.logger.debug(format_args!(
            "(MSB): {msb:#x}, (LSB): {lsb:#x}, (CHXSUM): {checksum:#x}"
        ));
        let code = u16::from_be_bytes([msb, lsb]);
        if crc8(code) != checksum {
            self.logger.error(format_args!("CRC Check Failed"));
            return Err(Si7021Error::Checksum);
        }
        Ok(code)
    }
}

/// CRC-8 of a measurement word as computed by the sensor.
#[must_use]
pub fn crc8(data: u16) -> u8 {
    let mut crc = data;
    for _ in 0..16 {
        crc = if crc & 0x8000 != 0 {
            // Truncation to the 16 bit register drops the x^16 term.
            ((u32::from(crc) << 1) ^ CRC8_POLY) as u16
        } else {
            crc << 1
        };
    }
    (crc >> 8) as u8
}

#[must_use]
pub fn convert_temperature(code: u16) -> f32 {
    f32::from(code) * 175.72 / 65536.0 - 46.85
}

#[must_use]
pub fn convert_humidity(code: u16) -> f32 {
    let humidity = f32::from(code) * 125.0 / 65536.0 - 6.0;
    humidity.min(100.0)
}
