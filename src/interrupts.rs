// Licensed under the Apache-2.0 license

//! External interrupt controller contract.

/// Interrupt source number on the external interrupt controller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IrqSource(pub u8);

/// Source wired to the I2C controller on this board.
pub const EXTERNAL_IRQ_I2C_SOURCE: IrqSource = IrqSource(8);

/// Enable/disable of individual interrupt sources. Both calls are fire-and-forget.
pub trait ExternalInterrupts {
    fn enable_interrupt(&mut self, source: IrqSource, priority: u8);
    fn disable_interrupt(&mut self, source: IrqSource);
}
