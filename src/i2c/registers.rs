// Licensed under the Apache-2.0 license

//! Register layout of the ATCIIC100 I2C controller.

use core::ops::Deref;
use core::ptr::NonNull;

use tock_registers::registers::{ReadOnly, ReadWrite};
use tock_registers::{register_bitfields, register_structs};

use crate::i2c::common::Error;

/// Base address of the controller on this board.
pub const I2C_BASE: usize = 0xF0A0_0000;

/// Largest address accepted in 7-bit addressing.
pub const MAX_7BIT_ADDRESS: u16 = 0x7F;
/// Largest address accepted in 10-bit addressing.
pub const MAX_10BIT_ADDRESS: u16 = 0x3FF;

register_structs! {
    pub RegisterBlock {
        (0x00 => pub idrev: ReadOnly<u32, IDREV::Register>),
        (0x04 => _reserved0),
        (0x10 => pub cfg: ReadOnly<u32, CFG::Register>),
        (0x14 => pub inten: ReadWrite<u32, INTEN::Register>),
        (0x18 => pub status: ReadWrite<u32, STATUS::Register>),
        (0x1C => pub addr: ReadWrite<u32, ADDR::Register>),
        (0x20 => pub data: ReadWrite<u32, DATA::Register>),
        (0x24 => pub ctrl: ReadWrite<u32, CTRL::Register>),
        (0x28 => pub cmd: ReadWrite<u32, CMD::Register>),
        (0x2C => pub setup: ReadWrite<u32, SETUP::Register>),
        (0x30 => pub tpm: ReadWrite<u32, TPM::Register>),
        (0x34 => @END),
    }
}

register_bitfields![u32,
    pub IDREV [
        ID OFFSET(8) NUMBITS(24) [],
        MAJOR OFFSET(4) NUMBITS(4) [],
        MINOR OFFSET(0) NUMBITS(4) []
    ],
    pub CFG [
        /// FIFO depth is `2 << FIFOSIZE` bytes.
        FIFOSIZE OFFSET(0) NUMBITS(2) [
            Bytes2 = 0,
            Bytes4 = 1,
            Bytes8 = 2,
            Bytes16 = 3
        ]
    ],
    pub INTEN [
        CMPL OFFSET(9) NUMBITS(1) [],
        BYTERECV OFFSET(8) NUMBITS(1) [],
        BYTETRANS OFFSET(7) NUMBITS(1) [],
        START OFFSET(6) NUMBITS(1) [],
        STOP OFFSET(5) NUMBITS(1) [],
        ARBLOSE OFFSET(4) NUMBITS(1) [],
        ADDRHIT OFFSET(3) NUMBITS(1) [],
        FIFOHALF OFFSET(2) NUMBITS(1) [],
        FIFOFULL OFFSET(1) NUMBITS(1) [],
        FIFOEMPTY OFFSET(0) NUMBITS(1) []
    ],
    /// Event bits are write-one-to-clear; line and bus state bits are read only.
    pub STATUS [
        LINESDA OFFSET(14) NUMBITS(1) [],
        LINESCL OFFSET(13) NUMBITS(1) [],
        GENCALL OFFSET(12) NUMBITS(1) [],
        BUSBUSY OFFSET(11) NUMBITS(1) [],
        ACK OFFSET(10) NUMBITS(1) [],
        CMPL OFFSET(9) NUMBITS(1) [],
        BYTERECV OFFSET(8) NUMBITS(1) [],
        BYTETRANS OFFSET(7) NUMBITS(1) [],
        START OFFSET(6) NUMBITS(1) [],
        STOP OFFSET(5) NUMBITS(1) [],
        ARBLOSE OFFSET(4) NUMBITS(1) [],
        ADDRHIT OFFSET(3) NUMBITS(1) [],
        FIFOHALF OFFSET(2) NUMBITS(1) [],
        FIFOFULL OFFSET(1) NUMBITS(1) [],
        FIFOEMPTY OFFSET(0) NUMBITS(1) []
    ],
    pub ADDR [
        ADDRESS OFFSET(0) NUMBITS(10) []
    ],
    pub DATA [
        BYTE OFFSET(0) NUMBITS(8) []
    ],
    pub CTRL [
        PHASE_START OFFSET(12) NUMBITS(1) [],
        PHASE_ADDR OFFSET(11) NUMBITS(1) [],
        PHASE_DATA OFFSET(10) NUMBITS(1) [],
        PHASE_STOP OFFSET(9) NUMBITS(1) [],
        DIR OFFSET(8) NUMBITS(1) [
            Transmit = 0,
            Receive = 1
        ],
        /// 0 encodes a 256 byte transfer.
        DATACNT OFFSET(0) NUMBITS(8) []
    ],
    pub CMD [
        COMMAND OFFSET(0) NUMBITS(3) [
            NoAction = 0,
            IssueTransaction = 1,
            AckResp = 2,
            NackResp = 3,
            ClearFifo = 4,
            Reset = 5
        ]
    ],
    pub SETUP [
        T_SUDAT OFFSET(24) NUMBITS(5) [],
        T_SP OFFSET(21) NUMBITS(3) [],
        T_HDDAT OFFSET(16) NUMBITS(5) [],
        T_SCLRATIO OFFSET(13) NUMBITS(1) [],
        T_SCLHI OFFSET(4) NUMBITS(9) [],
        DMAEN OFFSET(3) NUMBITS(1) [],
        MASTER OFFSET(2) NUMBITS(1) [
            Slave = 0,
            Master = 1
        ],
        ADDRESSING OFFSET(1) NUMBITS(1) [
            SevenBit = 0,
            TenBit = 1
        ],
        IICEN OFFSET(0) NUMBITS(1) []
    ],
    pub TPM [
        MULTIPLIER OFFSET(0) NUMBITS(5) []
    ]
];

/// Pointer to a live ATCIIC100 register block.
///
/// This is the controller handle: once constructed it is never null.
#[derive(Clone, Copy)]
pub struct I2cRegistersRef {
    ptr: NonNull<RegisterBlock>,
}

impl I2cRegistersRef {
    /// Wrap the register block at `ptr`.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must be aligned, point to an ATCIIC100 register block (or memory laid
    /// out like one) and stay valid for as long as the returned handle is used.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `ptr` is null.
    pub unsafe fn new(ptr: *mut RegisterBlock) -> Result<Self, Error> {
        NonNull::new(ptr).map(|ptr| Self { ptr }).ok_or(Error::InvalidInput)
    }

    /// Handle for the controller at [`I2C_BASE`].
    ///
    /// # Safety
    ///
    /// Only valid on the board that maps the controller at [`I2C_BASE`].
    pub unsafe fn board() -> Result<Self, Error> {
        Self::new(I2C_BASE as *mut RegisterBlock)
    }

    pub fn as_ptr(&self) -> *const RegisterBlock {
        self.ptr.as_ptr()
    }
}

impl Deref for I2cRegistersRef {
    type Target = RegisterBlock;

    fn deref(&self) -> &RegisterBlock {
        // SAFETY: validity of the pointer is promised by the caller of `new`.
        unsafe { self.ptr.as_ref() }
    }
}

// SAFETY: the handle only names MMIO; exclusive use is arbitrated by the driver owning it.
unsafe impl Send for I2cRegistersRef {}
