// Licensed under the Apache-2.0 license

//! ATCIIC100 I2C driver module.
//!
//! Register model, timing tables and the interrupt-driven transaction engine for the
//! ATCIIC100 controller, plus a blocking `embedded-hal` adapter for `no_std` firmware.

pub mod atciic100;
pub mod common;
pub mod i2c_controller;
pub mod registers;
pub mod shared;
pub mod timing;
pub mod traits;

pub use atciic100::Atciic100;
pub use common::{
    AddressingMode, Error, HardwareConfig, I2cConfig, I2cConfigBuilder, I2cDirection, I2cRole,
    I2cSpeed, I2cXferMode, IdRev, TransactionDescriptor,
};
pub use i2c_controller::{I2cController, WrapperError};
pub use registers::I2cRegistersRef;
pub use shared::{CompletionSignal, SharedI2c};
pub use traits::{CompletionHandler, I2cHardware};
