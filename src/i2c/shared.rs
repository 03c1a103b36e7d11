// Licensed under the Apache-2.0 license

//! Sharing one controller between task context and its interrupt handlers.
//!
//! ```rust,ignore
//! static I2C: SharedI2c<Board> = SharedI2c::new(...);
//!
//! #[interrupt]
//! fn I2C() {
//!     I2C.on_interrupt();
//! }
//! ```

use core::cell::RefCell;
use core::convert::Infallible;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use critical_section::Mutex;

use crate::dmac::DmacStatus;
use crate::i2c::common::Error;
use crate::i2c::traits::{CompletionHandler, I2cHardware};

const SIGNAL_PENDING: u8 = 0;
const SIGNAL_OK: u8 = 0xFF;

/// Single-slot notification raised by a transaction completion.
///
/// Holds the outcome until [`CompletionSignal::reset`] re-arms it.
pub struct CompletionSignal {
    state: AtomicU8,
}

impl CompletionSignal {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(SIGNAL_PENDING),
        }
    }

    pub fn reset(&self) {
        self.state.store(SIGNAL_PENDING, Ordering::Release);
    }

    /// # Errors
    ///
    /// `WouldBlock` until the transaction has completed.
    pub fn poll(&self) -> nb::Result<Result<(), Error>, Infallible> {
        match self.state.load(Ordering::Acquire) {
            SIGNAL_PENDING => Err(nb::Error::WouldBlock),
            SIGNAL_OK => Ok(Ok(())),
            code => Ok(Err(Error::from_code(code).unwrap_or(Error::InvalidInput))),
        }
    }
}

impl Default for CompletionSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionHandler for CompletionSignal {
    fn complete(&self, result: Result<(), Error>) {
        let state = match result {
            Ok(()) => SIGNAL_OK,
            Err(err) => err as u8,
        };
        self.state.store(state, Ordering::Release);
    }
}

/// Controller shared between task code and interrupt handlers.
pub struct SharedI2c<H> {
    hardware: Mutex<RefCell<H>>,
    locked: AtomicBool,
    signal: CompletionSignal,
}

impl<H> SharedI2c<H> {
    pub const fn new(hardware: H) -> Self {
        Self {
            hardware: Mutex::new(RefCell::new(hardware)),
            locked: AtomicBool::new(false),
            signal: CompletionSignal::new(),
        }
    }

    /// Signal used as completion handler by the blocking wrapper.
    pub fn signal(&self) -> &CompletionSignal {
        &self.signal
    }

    /// Run `f` on the controller inside a critical section.
    pub fn with_hardware<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        critical_section::with(|cs| f(&mut self.hardware.borrow_ref_mut(cs)))
    }

    /// Take the bus without waiting. `None` if another user holds it.
    pub fn try_lock(&self) -> Option<BusLock<'_, H>> {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| BusLock { bus: self })
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    /// Entry point for the controller interrupt.
    pub fn on_interrupt<'a>(&self)
    where
        H: I2cHardware<'a>,
    {
        self.with_hardware(|hw| hw.handle_interrupt());
    }

    /// Entry point for events of the DMA channel serving the controller.
    pub fn on_dma_event<'a>(&self, status: DmacStatus)
    where
        H: I2cHardware<'a>,
    {
        self.with_hardware(|hw| hw.dma_callback(status));
    }
}

/// Exclusive use of a [`SharedI2c`]; released on drop.
pub struct BusLock<'b, H> {
    bus: &'b SharedI2c<H>,
}

impl<H> Drop for BusLock<'_, H> {
    fn drop(&mut self) {
        self.bus.locked.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i2c::common::{HardwareConfig, I2cConfig, TransactionDescriptor};

    #[derive(Default)]
    struct CountingHardware {
        config: HardwareConfig,
        interrupts: u32,
        dma_events: Vec<DmacStatus>,
    }

    impl<'a> I2cHardware<'a> for CountingHardware {
        fn config(&self) -> &HardwareConfig {
            &self.config
        }

        fn setup_controller(&mut self, _config: &I2cConfig) -> Result<(), Error> {
            Ok(())
        }

        fn shutdown_controller(&mut self) {}

        fn launch_transaction(&mut self, _desc: TransactionDescriptor<'a>) -> Result<(), Error> {
            Ok(())
        }

        fn handle_interrupt(&mut self) {
            self.interrupts += 1;
        }

        fn dma_callback(&mut self, status: DmacStatus) {
            self.dma_events.push(status);
        }

        fn take_buffer(&mut self) -> Option<&'a mut [u8]> {
            None
        }
    }

    #[test]
    fn test_signal_reports_outcome() {
        let signal = CompletionSignal::new();
        assert!(matches!(signal.poll(), Err(nb::Error::WouldBlock)));

        signal.complete(Ok(()));
        assert!(matches!(signal.poll(), Ok(Ok(()))));
        // The outcome stays until re-armed.
        assert!(matches!(signal.poll(), Ok(Ok(()))));

        signal.reset();
        assert!(matches!(signal.poll(), Err(nb::Error::WouldBlock)));
        signal.complete(Err(Error::AddrHitError));
        assert!(matches!(signal.poll(), Ok(Err(Error::AddrHitError))));
    }

    #[test]
    fn test_bus_lock_is_exclusive() {
        let bus = SharedI2c::new(CountingHardware::default());
        let lock = bus.try_lock();
        assert!(lock.is_some());
        assert!(bus.is_locked());
        assert!(bus.try_lock().is_none());
        drop(lock);
        assert!(!bus.is_locked());
        assert!(bus.try_lock().is_some());
    }

    #[test]
    fn test_interrupt_entry_points_forward() {
        let bus = SharedI2c::new(CountingHardware::default());
        bus.on_interrupt();
        bus.on_interrupt();
        bus.on_dma_event(DmacStatus::Error);
        bus.with_hardware(|hw| {
            assert_eq!(hw.interrupts, 2);
            assert_eq!(hw.dma_events, vec![DmacStatus::Error]);
        });
    }
}
