// Licensed under the Apache-2.0 license

//! # I2C Hardware Abstraction Traits
//!
//! The transaction engine is asynchronous: a launch returns as soon as the command is
//! issued and the outcome is delivered later, from interrupt context, to the
//! [`CompletionHandler`] attached to the transaction.
//!
//! [`I2cHardware`] is the capability the layers above depend on. The ATCIIC100 driver is
//! the production implementation; tests substitute scripted doubles.
//!
//! ```text
//! I2cHardware (controller capability)
//!     ├── Atciic100            (register level driver)
//!     └── SharedI2c            (interrupt-safe cell around an I2cHardware)
//!         └── I2cController    (blocking embedded-hal adapter)
//! ```

use crate::dmac::DmacStatus;
use crate::i2c::common::{Error, HardwareConfig, I2cConfig, TransactionDescriptor};

/// Receiver of a transaction outcome.
///
/// Invoked at most once per launched transaction, from interrupt context, after the launch
/// call has returned. Implementations must not block.
pub trait CompletionHandler: Sync {
    fn complete(&self, result: Result<(), Error>);
}

/// Interrupt-driven I2C controller.
///
/// `'a` is the lifetime of the buffers and completion handlers lent to transactions.
pub trait I2cHardware<'a> {
    /// Hardware parameters sampled at creation.
    fn config(&self) -> &HardwareConfig;

    /// Program role and bus timing, then enable the controller.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the configuration is rejected.
    fn setup_controller(&mut self, config: &I2cConfig) -> Result<(), Error>;

    /// Disable the controller interrupt line and the controller. Idempotent.
    fn shutdown_controller(&mut self);

    /// Validate `desc` and start it on the bus.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidInput`] if the descriptor is inconsistent
    /// * [`Error::ControllerNotEnabled`] if `setup_controller` has not run
    /// * [`Error::CommandPending`] if a transaction is still in flight
    /// * [`Error::DmacError`] if the DMA data path cannot be set up
    fn launch_transaction(&mut self, desc: TransactionDescriptor<'a>) -> Result<(), Error>;

    /// Controller interrupt service routine.
    fn handle_interrupt(&mut self);

    /// DMA channel event for the channel serving this controller.
    fn dma_callback(&mut self, status: DmacStatus);

    /// Give back a lent buffer: first one refused by `launch_transaction`, then the one of
    /// the last launched transaction once it has retired. `None` while that transaction is
    /// still in flight.
    fn take_buffer(&mut self) -> Option<&'a mut [u8]>;
}
