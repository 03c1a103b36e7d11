// Licensed under the Apache-2.0 license

//! Common types and constants for the ATCIIC100 I2C driver modules.
//!
//! This module provides shared definitions for error handling, controller configuration
//! and the transaction descriptor handed to the transaction engine.

use core::fmt;

use crate::i2c::traits::CompletionHandler;

/// Largest transfer the data-count field can express.
pub const MAX_TRANSFER_LEN: usize = 256;

/// I2C return codes other than `Ok`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Error {
    InvalidInput = 1,
    ControllerNotEnabled = 2,
    CommandPending = 3,
    /// The addressed target did not respond.
    AddrHitError = 4,
    DmacError = 5,
}

impl Error {
    /// Inverse of `error as u8`.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::InvalidInput),
            2 => Some(Self::ControllerNotEnabled),
            3 => Some(Self::CommandPending),
            4 => Some(Self::AddrHitError),
            5 => Some(Self::DmacError),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::InvalidInput => "invalid input",
            Self::ControllerNotEnabled => "controller not enabled",
            Self::CommandPending => "command pending",
            Self::AddrHitError => "address not acknowledged",
            Self::DmacError => "DMA controller error",
        };
        f.write_str(msg)
    }
}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> embedded_hal::i2c::ErrorKind {
        use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
        match self {
            Self::AddrHitError => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
            _ => ErrorKind::Other,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum I2cSpeed {
    Standard = 100_000,
    Fast = 400_000,
    FastPlus = 1_000_000,
}

impl TryFrom<u8> for I2cSpeed {
    type Error = Error;

    /// Mode index as used on the wire of the setup interface: 0 standard, 1 fast, 2 fast-plus.
    /// Anything from 3 up is the unsupported sentinel.
    fn try_from(value: u8) -> Result<Self, Error> {
        match value {
            0 => Ok(Self::Standard),
            1 => Ok(Self::Fast),
            2 => Ok(Self::FastPlus),
            _ => Err(Error::InvalidInput),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum I2cXferMode {
    FifoMode,
    DmaMode,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum I2cRole {
    Slave = 0,
    Master = 1,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum I2cDirection {
    Transmit = 0,
    Receive = 1,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum AddressingMode {
    SevenBit = 0,
    TenBit = 1,
}

impl AddressingMode {
    #[must_use]
    pub fn max_address(self) -> u16 {
        match self {
            Self::SevenBit => crate::i2c::registers::MAX_7BIT_ADDRESS,
            Self::TenBit => crate::i2c::registers::MAX_10BIT_ADDRESS,
        }
    }
}

/// Identification register contents.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct IdRev {
    pub id: u32,
    pub major: u8,
    pub minor: u8,
}

/// Fixed hardware parameters sampled once when the driver is created.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct HardwareConfig {
    pub id_rev: IdRev,
    /// FIFO depth in bytes.
    pub fifo_size: u8,
}

/// Role and bus speed applied by `setup_controller`, plus the data path the blocking
/// wrapper uses for its transactions.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct I2cConfig {
    pub role: I2cRole,
    pub speed: I2cSpeed,
    pub xfer_mode: I2cXferMode,
}

impl Default for I2cConfig {
    fn default() -> Self {
        I2cConfigBuilder::new().build()
    }
}

pub struct I2cConfigBuilder {
    role: I2cRole,
    speed: I2cSpeed,
    xfer_mode: I2cXferMode,
}

impl Default for I2cConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl I2cConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            role: I2cRole::Master,
            speed: I2cSpeed::Standard,
            xfer_mode: I2cXferMode::FifoMode,
        }
    }
    #[must_use]
    pub fn role(mut self, role: I2cRole) -> Self {
        self.role = role;
        self
    }
    #[must_use]
    pub fn speed(mut self, speed: I2cSpeed) -> Self {
        self.speed = speed;
        self
    }
    #[must_use]
    pub fn xfer_mode(mut self, mode: I2cXferMode) -> Self {
        self.xfer_mode = mode;
        self
    }
    #[must_use]
    pub fn build(self) -> I2cConfig {
        I2cConfig {
            role: self.role,
            speed: self.speed,
            xfer_mode: self.xfer_mode,
        }
    }
}

/// One transaction to launch.
///
/// The buffer is lent to the controller for the lifetime of the transaction; the interrupt
/// handler fills or drains it lazily. `data: None` with `data_count == 0` is an address-only
/// scan and is only valid for [`I2cDirection::Transmit`].
pub struct TransactionDescriptor<'a> {
    pub direction: I2cDirection,
    pub addressing_mode: AddressingMode,
    pub address: u16,
    pub xfer_mode: I2cXferMode,
    pub data: Option<&'a mut [u8]>,
    /// Bytes to move, at most [`MAX_TRANSFER_LEN`] and at most the buffer length.
    pub data_count: u16,
    pub callback: Option<&'a dyn CompletionHandler>,
}

impl<'a> TransactionDescriptor<'a> {
    /// Transmit all of `data` to a 7-bit `address`.
    #[must_use]
    pub fn write(address: u8, data: &'a mut [u8], xfer_mode: I2cXferMode) -> Self {
        Self::with_buffer(I2cDirection::Transmit, address, data, xfer_mode)
    }

    /// Receive `data.len()` bytes from a 7-bit `address`.
    #[must_use]
    pub fn read(address: u8, data: &'a mut [u8], xfer_mode: I2cXferMode) -> Self {
        Self::with_buffer(I2cDirection::Receive, address, data, xfer_mode)
    }

    /// Address-only probe of a 7-bit `address`.
    #[must_use]
    pub fn scan(address: u8) -> Self {
        Self {
            direction: I2cDirection::Transmit,
            addressing_mode: AddressingMode::SevenBit,
            address: u16::from(address),
            xfer_mode: I2cXferMode::FifoMode,
            data: None,
            data_count: 0,
            callback: None,
        }
    }

    #[must_use]
    pub fn with_callback(mut self, callback: &'a dyn CompletionHandler) -> Self {
        self.callback = Some(callback);
        self
    }

    #[must_use]
    pub fn with_addressing(mut self, mode: AddressingMode, address: u16) -> Self {
        self.addressing_mode = mode;
        self.address = address;
        self
    }

    fn with_buffer(
        direction: I2cDirection,
        address: u8,
        data: &'a mut [u8],
        xfer_mode: I2cXferMode,
    ) -> Self {
        // Oversized buffers keep a count the validator rejects.
        let data_count = u16::try_from(data.len()).unwrap_or(u16::MAX);
        Self {
            direction,
            addressing_mode: AddressingMode::SevenBit,
            address: u16::from(address),
            xfer_mode,
            data: Some(data),
            data_count,
            callback: None,
        }
    }

    /// Check the descriptor on its own, without looking at the controller.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for inconsistent buffer/count combinations, receive
    /// scans, counts above [`MAX_TRANSFER_LEN`] and addresses out of range for the mode.
    pub fn validate(&self) -> Result<(), Error> {
        match &self.data {
            None if self.data_count != 0 => return Err(Error::InvalidInput),
            None if self.direction != I2cDirection::Transmit => return Err(Error::InvalidInput),
            Some(_) if self.data_count == 0 => return Err(Error::InvalidInput),
            Some(buf) if usize::from(self.data_count) > buf.len() => {
                return Err(Error::InvalidInput)
            }
            _ => {}
        }
        if usize::from(self.data_count) > MAX_TRANSFER_LEN {
            return Err(Error::InvalidInput);
        }
        if self.address > self.addressing_mode.max_address() {
            return Err(Error::InvalidInput);
        }
        Ok(())
    }
}

impl fmt::Debug for TransactionDescriptor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionDescriptor")
            .field("direction", &self.direction)
            .field("addressing_mode", &self.addressing_mode)
            .field("address", &self.address)
            .field("xfer_mode", &self.xfer_mode)
            .field("data_count", &self.data_count)
            .field("has_data", &self.data.is_some())
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}
