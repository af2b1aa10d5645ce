//! ARM Generic Timer as a [`Clock`].
//!
//! Uses the EL1 physical counter (CNTPCT_EL0) scaled by CNTFRQ_EL0, which
//! firmware programs before handing over to the bootloader.

use crate::time::Clock;
use core::arch::asm;

#[derive(Debug, Clone, Copy)]
pub struct GenericTimer {
    freq_hz: u64,
}

impl GenericTimer {
    pub fn new() -> Self {
        let freq_hz: u64;
        // SAFETY: reading CNTFRQ_EL0 is side-effect free.
        unsafe {
            asm!("mrs {}, cntfrq_el0", out(reg) freq_hz, options(nomem, nostack));
        }
        // Some firmware leaves CNTFRQ unprogrammed; assume the common 24 MHz.
        let freq_hz = if freq_hz == 0 { 24_000_000 } else { freq_hz };
        Self { freq_hz }
    }

    #[inline]
    fn ticks() -> u64 {
        let cnt: u64;
        // SAFETY: ISB keeps the counter read from being hoisted; reading
        // CNTPCT_EL0 has no side effects.
        unsafe {
            asm!("isb", "mrs {}, cntpct_el0", out(reg) cnt, options(nomem, nostack));
        }
        cnt
    }
}

impl Default for GenericTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for GenericTimer {
    fn now_us(&self) -> u64 {
        ((Self::ticks() as u128 * 1_000_000) / self.freq_hz as u128) as u64
    }

    fn delay_us(&self, us: u64) {
        let start = self.now_us();
        while self.now_us().wrapping_sub(start) < us {
            core::hint::spin_loop();
        }
    }
}
