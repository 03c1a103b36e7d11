// Licensed under the Apache-2.0 license

//! Register level driver for the Andes ATCIIC100 I2C controller.
//!
//! The driver owns the state of the one transaction that may be in flight. Task context
//! writes it in [`Atciic100::launch_transaction`]; interrupt context
//! ([`Atciic100::handle_interrupt`], [`Atciic100::dma_callback`]) advances the data cursor
//! and retires it by calling the completion handler. Serialising callers across tasks is
//! left to the layer above (see [`crate::i2c::shared::SharedI2c`]).

use core::fmt::Debug;

use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};

use crate::common::{Logger, NoOpLogger};
use crate::dmac::{
    AddrCtrl, BurstSize, ChannelConfig, ChannelInterrupts, Dmac, DmacChannel, DmacStatus,
    TransferConfig, TransferWidth, DMAC_CHANNEL_I2C, DMAC_REQUEST_I2C,
};
use crate::i2c::common::{
    AddressingMode, Error, HardwareConfig, I2cConfig, I2cDirection, I2cRole, I2cXferMode, IdRev,
    TransactionDescriptor,
};
use crate::i2c::registers::{
    I2cRegistersRef, ADDR, CFG, CMD, CTRL, DATA, IDREV, INTEN, SETUP, STATUS, TPM,
};
use crate::i2c::timing::{TimingParams, TIMING_MULTIPLIER};
use crate::i2c::traits::{CompletionHandler, I2cHardware};
use crate::interrupts::{ExternalInterrupts, IrqSource, EXTERNAL_IRQ_I2C_SOURCE};

/// Priority of the controller interrupt line.
pub const I2C_INTERRUPT_PRIORITY: u8 = 1;

/// Priority of the DMA channel serving the controller.
const DMA_CHANNEL_PRIORITY: u8 = 1;

/// The transaction currently owned by the controller.
struct TransactionState<'a> {
    role: I2cRole,
    direction: I2cDirection,
    addressing_mode: AddressingMode,
    address: u16,
    xfer_mode: I2cXferMode,
    buffer: Option<&'a mut [u8]>,
    cursor: usize,
    remaining: usize,
    callback: Option<&'a dyn CompletionHandler>,
    /// Issued to the controller and not yet retired.
    in_flight: bool,
}

impl TransactionState<'_> {
    const fn idle() -> Self {
        Self {
            role: I2cRole::Slave,
            direction: I2cDirection::Transmit,
            addressing_mode: AddressingMode::SevenBit,
            address: 0,
            xfer_mode: I2cXferMode::FifoMode,
            buffer: None,
            cursor: 0,
            remaining: 0,
            callback: None,
            in_flight: false,
        }
    }
}

pub struct Atciic100<'a, D: Dmac, E: ExternalInterrupts, L: Logger = NoOpLogger> {
    regs: I2cRegistersRef,
    dmac: D,
    interrupts: E,
    logger: L,
    irq: IrqSource,
    dma_channel: DmacChannel,
    hw_config: HardwareConfig,
    xfer: TransactionState<'a>,
    /// Buffer of the last launch that was refused before touching the controller.
    rejected: Option<&'a mut [u8]>,
}

impl<'a, D: Dmac, E: ExternalInterrupts, L: Logger> Atciic100<'a, D, E, L> {
    /// Create the driver and sample the identification and configuration registers.
    ///
    /// Nothing is written to the controller.
    pub fn new(regs: I2cRegistersRef, dmac: D, interrupts: E, logger: L) -> Self {
        let idrev = regs.idrev.extract();
        let hw_config = HardwareConfig {
            id_rev: IdRev {
                id: idrev.read(IDREV::ID),
                // Both fields are 4 bits wide.
                major: idrev.read(IDREV::MAJOR) as u8,
                minor: idrev.read(IDREV::MINOR) as u8,
            },
            fifo_size: 2u8 << regs.cfg.read(CFG::FIFOSIZE),
        };
        Self {
            regs,
            dmac,
            interrupts,
            logger,
            irq: EXTERNAL_IRQ_I2C_SOURCE,
            dma_channel: DMAC_CHANNEL_I2C,
            hw_config,
            xfer: TransactionState::idle(),
            rejected: None,
        }
    }

    /// Use a different interrupt source and DMA channel than the board defaults.
    #[must_use]
    pub fn with_resources(mut self, irq: IrqSource, dma_channel: DmacChannel) -> Self {
        self.irq = irq;
        self.dma_channel = dma_channel;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.regs.setup.is_set(SETUP::IICEN)
    }

    /// Role sampled from the controller by the last launch.
    pub fn transaction_role(&self) -> I2cRole {
        self.xfer.role
    }

    /// `true` from a successful launch until the completion handler has been called.
    pub fn is_busy(&self) -> bool {
        self.xfer.in_flight
    }

    /// Bytes of the current transaction not yet moved through the FIFO.
    pub fn remaining(&self) -> usize {
        self.xfer.remaining
    }

    fn admit(&self, desc: &TransactionDescriptor<'_>) -> Result<(), Error> {
        desc.validate()?;
        if !self.is_enabled() {
            return Err(Error::ControllerNotEnabled);
        }
        if self.regs.cmd.read(CMD::COMMAND) != 0 {
            return Err(Error::CommandPending);
        }
        Ok(())
    }

    fn complete(&mut self, result: Result<(), Error>) {
        self.xfer.in_flight = false;
        if let Some(callback) = self.xfer.callback.take() {
            callback.complete(result);
        }
    }

    /// Push bytes until the FIFO is full or the buffer is exhausted.
    fn fill_fifo(&mut self) {
        while !self.regs.status.is_set(STATUS::FIFOFULL) && self.xfer.remaining > 0 {
            let cursor = self.xfer.cursor;
            let Some(byte) = self
                .xfer
                .buffer
                .as_deref()
                .and_then(|buf| buf.get(cursor))
                .copied()
            else {
                self.xfer.remaining = 0;
                break;
            };
            self.regs.data.write(DATA::BYTE.val(u32::from(byte)));
            self.xfer.cursor += 1;
            self.xfer.remaining -= 1;
        }

        if self.xfer.remaining == 0 {
            self.regs.inten.modify(INTEN::FIFOEMPTY::CLEAR);
        }
    }

    /// Pull bytes until the FIFO is empty or the buffer is full.
    fn drain_fifo(&mut self) {
        while !self.regs.status.is_set(STATUS::FIFOEMPTY) && self.xfer.remaining > 0 {
            let cursor = self.xfer.cursor;
            let Some(slot) = self
                .xfer
                .buffer
                .as_deref_mut()
                .and_then(|buf| buf.get_mut(cursor))
            else {
                self.xfer.remaining = 0;
                break;
            };
            // DATA is 8 bits wide.
            *slot = self.regs.data.read(DATA::BYTE) as u8;
            self.xfer.cursor += 1;
            self.xfer.remaining -= 1;
        }

        if self.xfer.remaining == 0 {
            self.regs.inten.modify(INTEN::FIFOFULL::CLEAR);
        }
    }

    fn setup_data_path(&mut self) -> Result<(), Error> {
        if self.xfer.remaining == 0 {
            self.regs.setup.modify(SETUP::DMAEN::CLEAR);
            self.regs
                .inten
                .modify(INTEN::FIFOEMPTY::CLEAR + INTEN::FIFOFULL::CLEAR);
            return Ok(());
        }

        match self.xfer.xfer_mode {
            I2cXferMode::FifoMode => {
                self.regs.setup.modify(SETUP::DMAEN::CLEAR);
                match self.xfer.direction {
                    I2cDirection::Transmit => {
                        self.regs.inten.modify(INTEN::FIFOEMPTY::SET);
                        self.fill_fifo();
                    }
                    I2cDirection::Receive => self.regs.inten.modify(INTEN::FIFOFULL::SET),
                }
                Ok(())
            }
            I2cXferMode::DmaMode => self.setup_dma(),
        }
    }

    fn setup_dma(&mut self) -> Result<(), Error> {
        let transmit = self.xfer.direction == I2cDirection::Transmit;
        let (memory_ctrl, device_ctrl) = (AddrCtrl::Increment, AddrCtrl::Fixed);

        let channel = ChannelConfig {
            channel: self.dma_channel,
            src_bus_index: 0,
            dst_bus_index: 0,
            priority: DMA_CHANNEL_PRIORITY,
            src_burst_size: BurstSize::Transfers1,
            src_transfer_width: TransferWidth::Byte,
            dst_transfer_width: TransferWidth::Byte,
            src_handshake: !transmit,
            dst_handshake: transmit,
            src_addr_ctrl: if transmit { memory_ctrl } else { device_ctrl },
            dst_addr_ctrl: if transmit { device_ctrl } else { memory_ctrl },
            src_pair: if transmit { 0 } else { DMAC_REQUEST_I2C },
            dst_pair: if transmit { DMAC_REQUEST_I2C } else { 0 },
            interrupts: ChannelInterrupts::ALL,
        };
        dma_step(
            &mut self.logger,
            "channel configuration",
            self.dmac.configure_channel(&channel),
        )?;

        let cursor = self.xfer.cursor;
        let memory = self
            .xfer
            .buffer
            .as_deref_mut()
            .and_then(|buf| buf.get_mut(cursor..))
            .map_or(0, |buf| buf.as_mut_ptr() as usize);
        let device = core::ptr::from_ref(&self.regs.data) as usize;
        let transfer = TransferConfig {
            channel: self.dma_channel,
            // Bounded by the 256 byte transfer limit.
            transfer_size: self.xfer.remaining as u32,
            src_address: if transmit { memory } else { device },
            dst_address: if transmit { device } else { memory },
        };
        dma_step(
            &mut self.logger,
            "transfer configuration",
            self.dmac.configure_transfer(&transfer),
        )?;
        dma_step(
            &mut self.logger,
            "channel enable",
            self.dmac.enable_channel(self.dma_channel),
        )?;

        self.regs
            .inten
            .modify(INTEN::FIFOEMPTY::CLEAR + INTEN::FIFOFULL::CLEAR);
        self.regs.setup.modify(SETUP::DMAEN::SET);
        Ok(())
    }
}

fn dma_step<T, E: Debug>(
    logger: &mut impl Logger,
    step: &str,
    result: Result<T, E>,
) -> Result<T, Error> {
    result.map_err(|err| {
        logger.error(format_args!("I2C DMA {step} failed: {err:?}"));
        Error::DmacError
    })
}

impl<'a, D: Dmac, E: ExternalInterrupts, L: Logger> I2cHardware<'a> for Atciic100<'a, D, E, L> {
    fn config(&self) -> &HardwareConfig {
        &self.hw_config
    }

    fn setup_controller(&mut self, config: &I2cConfig) -> Result<(), Error> {
        let role = match config.role {
            I2cRole::Master => SETUP::MASTER::Master,
            I2cRole::Slave => SETUP::MASTER::Slave,
        };
        let timing = TimingParams::for_speed(config.speed);

        self.regs
            .tpm
            .write(TPM::MULTIPLIER.val(u32::from(TIMING_MULTIPLIER)));
        self.regs
            .setup
            .modify(role + timing.setup_fields() + SETUP::IICEN::SET);

        self.logger.debug(format_args!(
            "I2C enabled: {:?} at {} Hz",
            config.role, config.speed as u32
        ));
        Ok(())
    }

    fn shutdown_controller(&mut self) {
        self.interrupts.disable_interrupt(self.irq);
        self.regs.setup.modify(SETUP::IICEN::CLEAR);
    }

    fn launch_transaction(&mut self, desc: TransactionDescriptor<'a>) -> Result<(), Error> {
        if let Err(err) = self.admit(&desc) {
            self.rejected = desc.data;
            return Err(err);
        }

        let role = if self.regs.setup.is_set(SETUP::MASTER) {
            I2cRole::Master
        } else {
            I2cRole::Slave
        };
        let has_data = desc.data.is_some();
        let data_count = desc.data_count;
        self.xfer = TransactionState {
            role,
            direction: desc.direction,
            addressing_mode: desc.addressing_mode,
            address: desc.address,
            xfer_mode: desc.xfer_mode,
            buffer: desc.data,
            cursor: 0,
            remaining: usize::from(data_count),
            callback: desc.callback,
            in_flight: false,
        };

        self.regs
            .addr
            .write(ADDR::ADDRESS.val(u32::from(self.xfer.address)));
        self.regs.setup.modify(match self.xfer.addressing_mode {
            AddressingMode::SevenBit => SETUP::ADDRESSING::SevenBit,
            AddressingMode::TenBit => SETUP::ADDRESSING::TenBit,
        });

        let phase_data = if has_data {
            CTRL::PHASE_DATA::SET
        } else {
            CTRL::PHASE_DATA::CLEAR
        };
        let dir = match self.xfer.direction {
            I2cDirection::Transmit => CTRL::DIR::Transmit,
            I2cDirection::Receive => CTRL::DIR::Receive,
        };
        // A count of 256 wraps to the zero encoding.
        self.regs.ctrl.write(
            CTRL::PHASE_START::SET
                + CTRL::PHASE_ADDR::SET
                + phase_data
                + CTRL::PHASE_STOP::SET
                + dir
                + CTRL::DATACNT.val(u32::from(data_count) & 0xFF),
        );

        self.setup_data_path()?;

        self.regs.inten.modify(INTEN::CMPL::SET);
        self.regs.cmd.write(CMD::COMMAND::IssueTransaction);
        self.xfer.in_flight = true;
        self.interrupts
            .enable_interrupt(self.irq, I2C_INTERRUPT_PRIORITY);
        Ok(())
    }

    fn handle_interrupt(&mut self) {
        let status = self.regs.status.extract();
        let fifo_path = self.xfer.xfer_mode == I2cXferMode::FifoMode;

        if status.is_set(STATUS::CMPL) {
            let result = if status.is_set(STATUS::ADDRHIT) {
                Ok(())
            } else {
                Err(Error::AddrHitError)
            };
            if result.is_ok() && self.xfer.direction == I2cDirection::Receive && fifo_path {
                self.drain_fifo();
            }
            // Write-one-to-clear.
            self.regs.status.write(STATUS::CMPL::SET);
            if let Err(err) = result {
                self.logger.debug(format_args!(
                    "I2C transaction to {:#x} failed: {err}",
                    self.xfer.address
                ));
            }
            self.complete(result);
        } else if status.is_set(STATUS::FIFOEMPTY)
            && self.xfer.direction == I2cDirection::Transmit
            && fifo_path
        {
            self.fill_fifo();
        } else if status.is_set(STATUS::FIFOFULL)
            && self.xfer.direction == I2cDirection::Receive
            && fifo_path
        {
            self.drain_fifo();
        }
    }

    fn dma_callback(&mut self, status: DmacStatus) {
        if status != DmacStatus::TerminalCount {
            self.logger
                .error(format_args!("I2C DMA channel reported {status:?}"));
            self.complete(Err(Error::DmacError));
        }
    }

    fn take_buffer(&mut self) -> Option<&'a mut [u8]> {
        if let Some(buffer) = self.rejected.take() {
            return Some(buffer);
        }
        if self.xfer.in_flight {
            return None;
        }
        self.xfer.buffer.take()
    }
}
