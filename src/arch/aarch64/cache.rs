//! AArch64 data cache maintenance by virtual address
//!
//! - publish: `DC CVAC` (clean to Point of Coherency), then `DSB SY`
//! - observe: `DSB SY`, `DC IVAC` (invalidate to PoC), then `DSB SY`
//!
//! The leading DSB on invalidate orders any outstanding CPU accesses to the
//! range before the lines are dropped.
//!
//! Reference: ARM ARM D7.5.9 (data cache maintenance instructions)

use crate::mm::cache::CacheMaintenance;
use core::arch::asm;

/// Cache maintenance on the executing core's data cache.
#[derive(Debug, Clone, Copy)]
pub struct DataCache {
    line: usize,
}

impl DataCache {
    /// Read the minimum data cache line size from CTR_EL0.
    pub fn new() -> Self {
        let ctr: u64;
        // SAFETY: CTR_EL0 is readable from EL1 and above and has no side effects.
        unsafe {
            asm!("mrs {}, ctr_el0", out(reg) ctr, options(nomem, nostack));
        }
        // DminLine, bits [19:16]: log2 of the line size in 4-byte words
        let line = 4usize << ((ctr >> 16) & 0xF);
        Self { line }
    }
}

impl Default for DataCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheMaintenance for DataCache {
    fn line_size(&self) -> usize {
        self.line
    }

    fn clean_lines(&self, start: usize, end: usize) {
        // SAFETY: cleaning writes dirty lines back without changing their
        // contents; any mapped address is a valid operand.
        unsafe {
            let mut addr = start;
            while addr < end {
                asm!("dc cvac, {addr}", addr = in(reg) addr, options(nostack));
                addr += self.line;
            }
            asm!("dsb sy", options(nostack));
        }
    }

    fn invalidate_lines(&self, start: usize, end: usize) {
        // SAFETY: callers pass line-aligned ranges covering memory they own
        // exclusively (descriptors and DMA buffers), so discarding lines can
        // only drop stale data the device has since overwritten.
        unsafe {
            asm!("dsb sy", options(nostack));
            let mut addr = start;
            while addr < end {
                asm!("dc ivac, {addr}", addr = in(reg) addr, options(nostack));
                addr += self.line;
            }
            asm!("dsb sy", options(nostack));
        }
    }
}
