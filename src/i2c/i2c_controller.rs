// Licensed under the Apache-2.0 license

//! Blocking I2C controller on top of the interrupt-driven engine.
//!
//! Every operation is one hardware transaction (START, address, data, STOP). The caller is
//! serialised through the bus lock of [`SharedI2c`], data is staged in a buffer owned by the
//! controller for the lifetime of the transaction, and completion is awaited by polling the
//! completion signal.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource, Operation, SevenBitAddress};
use fugit::MicrosDurationU32;

use crate::common::{Logger, NoOpLogger};
use crate::i2c::common::{
    AddressingMode, Error, I2cConfig, I2cDirection, TransactionDescriptor, MAX_TRANSFER_LEN,
};
use crate::i2c::shared::SharedI2c;
use crate::i2c::traits::I2cHardware;

/// Longest wait for a transaction to complete.
pub const TRANSACTION_TIMEOUT: MicrosDurationU32 = MicrosDurationU32::millis(25);

const POLL_INTERVAL: MicrosDurationU32 = MicrosDurationU32::micros(100);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WrapperError {
    InvalidInput,
    /// Another user holds the bus.
    BusBusy,
    Timeout,
    I2c(Error),
}

impl From<Error> for WrapperError {
    fn from(err: Error) -> Self {
        Self::I2c(err)
    }
}

impl core::fmt::Display for WrapperError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidInput => f.write_str("invalid input"),
            Self::BusBusy => f.write_str("bus busy"),
            Self::Timeout => f.write_str("transaction timed out"),
            Self::I2c(err) => write!(f, "{err}"),
        }
    }
}

impl embedded_hal::i2c::Error for WrapperError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::I2c(Error::AddrHitError) => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
            _ => ErrorKind::Other,
        }
    }
}

pub struct I2cController<'a, H, D: DelayNs, L: Logger = NoOpLogger> {
    pub bus: &'a SharedI2c<H>,
    pub config: I2cConfig,
    pub delay: D,
    pub logger: L,
    staging: Option<&'a mut [u8]>,
}

impl<'a, H: I2cHardware<'a>, D: DelayNs, L: Logger> I2cController<'a, H, D, L> {
    /// `staging` bounds the longest single transfer (at most 256 bytes are used).
    pub fn new(
        bus: &'a SharedI2c<H>,
        config: I2cConfig,
        staging: &'a mut [u8],
        delay: D,
        logger: L,
    ) -> Self {
        Self {
            bus,
            config,
            delay,
            logger,
            staging: Some(staging),
        }
    }

    /// Probe `address` with an address-only transaction.
    ///
    /// # Errors
    ///
    /// `WrapperError::I2c(Error::AddrHitError)` if nothing answers.
    pub fn scan(&mut self, address: SevenBitAddress) -> Result<(), WrapperError> {
        self.execute(address, &mut Operation::Write(&[]))
    }

    fn execute(
        &mut self,
        address: SevenBitAddress,
        operation: &mut Operation<'_>,
    ) -> Result<(), WrapperError> {
        let Some(_lock) = self.bus.try_lock() else {
            self.logger
                .error(format_args!("I2C bus busy, transaction to {address:#x} dropped"));
            return Err(WrapperError::BusBusy);
        };
        self.execute_locked(address, operation)
    }

    fn execute_locked(
        &mut self,
        address: SevenBitAddress,
        operation: &mut Operation<'_>,
    ) -> Result<(), WrapperError> {
        let (direction, count) = match &*operation {
            Operation::Write(bytes) => (I2cDirection::Transmit, bytes.len()),
            Operation::Read(buffer) => (I2cDirection::Receive, buffer.len()),
        };
        let staging = self.reclaim_staging()?;
        let Some(data_count) = u16::try_from(count)
            .ok()
            .filter(|&n| usize::from(n) <= MAX_TRANSFER_LEN.min(staging.len()))
        else {
            self.staging = Some(staging);
            return Err(WrapperError::InvalidInput);
        };

        if let (Operation::Write(bytes), Some(dst)) = (&*operation, staging.get_mut(..count)) {
            dst.copy_from_slice(bytes);
        }
        let (lent, kept) = if count == 0 {
            (None, Some(staging))
        } else {
            (Some(staging), None)
        };

        let desc = TransactionDescriptor {
            direction,
            addressing_mode: AddressingMode::SevenBit,
            address: u16::from(address),
            xfer_mode: self.config.xfer_mode,
            data: lent,
            data_count,
            callback: Some(self.bus.signal()),
        };
        let config = self.config;
        self.bus.signal().reset();
        let launched = self.bus.with_hardware(|hw| {
            hw.setup_controller(&config)?;
            hw.launch_transaction(desc)
        });

        let outcome = match launched {
            Ok(()) => self.wait_for_completion(),
            Err(err) => {
                self.logger
                    .error(format_args!("Error {} in launch_transaction", err as u8));
                Err(WrapperError::I2c(err))
            }
        };

        let staging = match kept {
            Some(staging) => staging,
            None => match self.bus.with_hardware(|hw| hw.take_buffer()) {
                Some(staging) => staging,
                None => {
                    // Reclaimed by a later call once the transaction retires.
                    self.logger.debug(format_args!(
                        "I2C staging buffer still lent to the controller"
                    ));
                    return outcome;
                }
            },
        };
        if let (Ok(()), Operation::Read(buffer), Some(src)) =
            (&outcome, operation, staging.get(..count))
        {
            buffer.copy_from_slice(src);
        }
        self.staging = Some(staging);
        outcome
    }

    /// The staging buffer, fetched back from the controller if a timed-out transaction
    /// has retired since.
    fn reclaim_staging(&mut self) -> Result<&'a mut [u8], WrapperError> {
        if let Some(staging) = self.staging.take() {
            return Ok(staging);
        }
        self.bus.with_hardware(|hw| hw.take_buffer()).ok_or_else(|| {
            self.logger.error(format_args!(
                "I2C transaction still in flight, staging buffer unavailable"
            ));
            WrapperError::I2c(Error::CommandPending)
        })
    }

    fn wait_for_completion(&mut self) -> Result<(), WrapperError> {
        let mut waited = MicrosDurationU32::from_ticks(0);
        loop {
            match self.bus.signal().poll() {
                Ok(result) => {
                    if let Err(err) = result {
                        self.logger
                            .error(format_args!("I2C transaction failed: {err}"));
                    }
                    return result.map_err(WrapperError::I2c);
                }
                Err(nb::Error::WouldBlock) => {}
                Err(nb::Error::Other(never)) => match never {},
            }
            if waited >= TRANSACTION_TIMEOUT {
                self.logger.error(format_args!(
                    "I2C transaction timed out after {} ms",
                    TRANSACTION_TIMEOUT.to_millis()
                ));
                return Err(WrapperError::Timeout);
            }
            self.delay.delay_us(POLL_INTERVAL.ticks());
            waited += POLL_INTERVAL;
        }
    }
}

impl<'a, H: I2cHardware<'a>, D: DelayNs, L: Logger> embedded_hal::i2c::ErrorType
    for I2cController<'a, H, D, L>
{
    type Error = WrapperError;
}

impl<'a, H: I2cHardware<'a>, D: DelayNs, L: Logger> embedded_hal::i2c::I2c
    for I2cController<'a, H, D, L>
{
    fn read(&mut self, addr: SevenBitAddress, buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.execute(addr, &mut Operation::Read(buffer))
    }

    fn write(&mut self, addr: SevenBitAddress, bytes: &[u8]) -> Result<(), Self::Error> {
        self.execute(addr, &mut Operation::Write(bytes))
    }

    fn write_read(
        &mut self,
        addr: SevenBitAddress,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.transaction(
            addr,
            &mut [Operation::Write(bytes), Operation::Read(buffer)],
        )
    }

    /// Operations run under one bus lock, but each one is a separate addressed transfer
    /// ending in STOP. No repeated START is issued between them.
    fn transaction(
        &mut self,
        addr: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let Some(_lock) = self.bus.try_lock() else {
            return Err(WrapperError::BusBusy);
        };
        operations
            .iter_mut()
            .try_for_each(|operation| self.execute_locked(addr, operation))
    }
}
