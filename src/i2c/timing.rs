// Licensed under the Apache-2.0 license

//! Setup-register timing derived from the bus speed.
//!
//! All periods are counted in peripheral clock cycles scaled by the timing parameter
//! multiplier (`TPM + 1`):
//!
//! ```text
//! spike    = T_SP * tpclk * (TPM + 1)
//! setup    = 2 * tpclk + (2 + T_SP + T_SUDAT) * tpclk * (TPM + 1)
//! hold     = 2 * tpclk + (2 + T_SP + T_HDDAT) * tpclk * (TPM + 1)
//! scl_high = 2 * tpclk + (2 + T_SP + T_SCLHI) * tpclk * (TPM + 1)
//! scl_low  = 2 * tpclk + (2 + T_SP + T_SCLHI * (1 + T_SCLRATIO)) * tpclk * (TPM + 1)
//! ```

use fugit::{HertzU32, NanosDurationU32};
use tock_registers::fields::FieldValue;

use crate::i2c::common::I2cSpeed;
use crate::i2c::registers::SETUP;

/// Peripheral clock feeding the controller.
pub const PCLK: HertzU32 = HertzU32::from_raw(50_000_000);

/// Timing parameter multiplier programmed into `TPM`.
pub const TIMING_MULTIPLIER: u8 = 0;

/// Spike suppression width programmed into `T_SP`.
pub const SPIKE_SUPPRESSION: u8 = 2;

/// Per-mode values of the timing fields of the setup register.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TimingParams {
    pub sudat: u8,
    pub hddat: u8,
    pub sclhi: u16,
    pub sclratio: u8,
}

impl TimingParams {
    #[must_use]
    pub const fn for_speed(speed: I2cSpeed) -> Self {
        match speed {
            I2cSpeed::Standard => Self {
                sudat: 7,
                hddat: 9,
                sclhi: 229,
                sclratio: 0,
            },
            I2cSpeed::Fast => Self {
                sudat: 0,
                hddat: 9,
                sclhi: 30,
                sclratio: 1,
            },
            I2cSpeed::FastPlus => Self {
                sudat: 0,
                hddat: 0,
                sclhi: 10,
                sclratio: 1,
            },
        }
    }

    /// Setup register fields for these parameters, spike suppression included.
    #[must_use]
    pub fn setup_fields(&self) -> FieldValue<u32, SETUP::Register> {
        SETUP::T_SUDAT.val(u32::from(self.sudat))
            + SETUP::T_SP.val(u32::from(SPIKE_SUPPRESSION))
            + SETUP::T_HDDAT.val(u32::from(self.hddat))
            + SETUP::T_SCLRATIO.val(u32::from(self.sclratio))
            + SETUP::T_SCLHI.val(u32::from(self.sclhi))
    }

    #[must_use]
    pub fn bus_timing(&self) -> BusTiming {
        let sp = u32::from(SPIKE_SUPPRESSION);
        let scaled = |cycles: u32| cycles * pclk_period_ns() * (u32::from(TIMING_MULTIPLIER) + 1);
        let filtered = |field: u32| {
            NanosDurationU32::from_ticks(2 * pclk_period_ns() + scaled(2 + sp + field))
        };
        let sclhi = u32::from(self.sclhi);
        BusTiming {
            spike: NanosDurationU32::from_ticks(scaled(sp)),
            setup: filtered(u32::from(self.sudat)),
            hold: filtered(u32::from(self.hddat)),
            scl_high: filtered(sclhi),
            scl_low: filtered(sclhi * (1 + u32::from(self.sclratio))),
        }
    }
}

fn pclk_period_ns() -> u32 {
    1_000_000_000 / PCLK.raw()
}

/// Bus periods produced by a set of timing parameters.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BusTiming {
    pub spike: NanosDurationU32,
    pub setup: NanosDurationU32,
    pub hold: NanosDurationU32,
    pub scl_high: NanosDurationU32,
    pub scl_low: NanosDurationU32,
}

impl BusTiming {
    /// Check against the I2C bus specification limits for `speed`.
    #[must_use]
    pub fn meets(&self, speed: I2cSpeed) -> bool {
        let ns = NanosDurationU32::from_ticks;
        let (setup, hold, high, low, max_spike) = match speed {
            I2cSpeed::Standard => (250, 300, 4000, 4700, None),
            I2cSpeed::Fast => (100, 300, 600, 1300, Some(50)),
            I2cSpeed::FastPlus => (50, 0, 260, 500, Some(50)),
        };
        self.setup >= ns(setup)
            && self.hold >= ns(hold)
            && self.scl_high >= ns(high)
            && self.scl_low >= ns(low)
            && max_spike.map_or(true, |max| self.spike <= ns(max))
    }
}
