// Licensed under the Apache-2.0 license

//! DMA controller contract used by peripheral drivers.
//!
//! The DMA controller driver itself lives outside this crate. Peripheral drivers describe
//! what they need through [`ChannelConfig`] and [`TransferConfig`] and hand them to an
//! implementation of [`Dmac`]. Channel events (terminal count, error, abort) are routed by
//! the DMA interrupt handler to the owning peripheral driver, e.g.
//! [`crate::i2c::atciic100::Atciic100::dma_callback`].

/// DMA channel number.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DmacChannel(pub u8);

/// Channel reserved for the I2C controller on this board.
pub const DMAC_CHANNEL_I2C: DmacChannel = DmacChannel(2);

/// Hardware handshake request line of the I2C controller.
pub const DMAC_REQUEST_I2C: u8 = 2;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum BurstSize {
    Transfers1 = 0,
    Transfers2 = 1,
    Transfers4 = 2,
    Transfers8 = 3,
    Transfers16 = 4,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TransferWidth {
    Byte = 0,
    HalfWord = 1,
    Word = 2,
}

/// Address update applied after every beat.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum AddrCtrl {
    Increment = 0,
    Decrement = 1,
    Fixed = 2,
}

/// Which channel events raise the DMA interrupt.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChannelInterrupts {
    pub abort: bool,
    pub error: bool,
    pub terminal_count: bool,
}

impl ChannelInterrupts {
    pub const ALL: Self = Self {
        abort: true,
        error: true,
        terminal_count: true,
    };
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChannelConfig {
    pub channel: DmacChannel,
    pub src_bus_index: u8,
    pub dst_bus_index: u8,
    pub priority: u8,
    pub src_burst_size: BurstSize,
    pub src_transfer_width: TransferWidth,
    pub dst_transfer_width: TransferWidth,
    /// Source side is paced by a peripheral request line.
    pub src_handshake: bool,
    /// Destination side is paced by a peripheral request line.
    pub dst_handshake: bool,
    pub src_addr_ctrl: AddrCtrl,
    pub dst_addr_ctrl: AddrCtrl,
    /// Request line paired with the source side, 0 when memory.
    pub src_pair: u8,
    /// Request line paired with the destination side, 0 when memory.
    pub dst_pair: u8,
    pub interrupts: ChannelInterrupts,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TransferConfig {
    pub channel: DmacChannel,
    /// Number of beats (bytes for byte-wide transfers).
    pub transfer_size: u32,
    pub src_address: usize,
    pub dst_address: usize,
}

/// Outcome reported by the DMA controller for a channel.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DmacStatus {
    TerminalCount,
    Error,
    Abort,
}

/// Operations a peripheral driver needs from the DMA controller driver.
pub trait Dmac {
    type Error: core::fmt::Debug;

    /// Program the static channel configuration and unmask the requested channel events.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is invalid or busy.
    fn configure_channel(&mut self, config: &ChannelConfig) -> Result<(), Self::Error>;

    /// Program source, destination and size of the next transfer.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer does not fit the channel configuration.
    fn configure_transfer(&mut self, config: &TransferConfig) -> Result<(), Self::Error>;

    /// Start the channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel cannot be enabled.
    fn enable_channel(&mut self, channel: DmacChannel) -> Result<(), Self::Error>;
}

/// Placeholder for boards without a DMA controller; every request is refused.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDma;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DmaUnavailable;

impl Dmac for NoDma {
    type Error = DmaUnavailable;

    fn configure_channel(&mut self, _config: &ChannelConfig) -> Result<(), Self::Error> {
        Err(DmaUnavailable)
    }

    fn configure_transfer(&mut self, _config: &TransferConfig) -> Result<(), Self::Error> {
        Err(DmaUnavailable)
    }

    fn enable_channel(&mut self, _channel: DmacChannel) -> Result<(), Self::Error> {
        Err(DmaUnavailable)
    }
}
