//! Device drivers subsystem
//!
//! Organized by device class:
//! - `mmio`: Register access
//! - `net`: Network device drivers, MDIO buses and PHYs

pub mod mmio;
pub mod net;

use crate::mm::cache::CacheMaintenance;
use crate::time::Clock;
use mmio::RegisterBus;

/// Everything a polled DMA driver needs from the platform.
pub trait Platform: RegisterBus + CacheMaintenance + Clock {}

impl<T: RegisterBus + CacheMaintenance + Clock> Platform for T {}

/// A [`Platform`] assembled from separate parts.
///
/// ```ignore
/// let board = Board {
///     regs: unsafe { Mmio::new(0x1E66_0000) },
///     cache: DataCache::new(),
///     clock: GenericTimer::new(),
/// };
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Board<R, M, C> {
    pub regs: R,
    pub cache: M,
    pub clock: C,
}

impl<R: RegisterBus, M, C> RegisterBus for Board<R, M, C> {
    fn read32(&self, offset: usize) -> u32 {
        self.regs.read32(offset)
    }

    fn write32(&self, offset: usize, value: u32) {
        self.regs.write32(offset, value)
    }
}

impl<R, M: CacheMaintenance, C> CacheMaintenance for Board<R, M, C> {
    fn line_size(&self) -> usize {
        self.cache.line_size()
    }

    fn clean_lines(&self, start: usize, end: usize) {
        self.cache.clean_lines(start, end)
    }

    fn invalidate_lines(&self, start: usize, end: usize) {
        self.cache.invalidate_lines(start, end)
    }
}

impl<R, M, C: Clock> Clock for Board<R, M, C> {
    fn now_us(&self) -> u64 {
        self.clock.now_us()
    }

    fn delay_us(&self, us: u64) {
        self.clock.delay_us(us)
    }
}
