//! Time base and bounded polling
//!
//! Every wait in the driver - MAC reset, MDIO transactions, TX completion,
//! PHY autonegotiation - is a "poll until the predicate holds or the bound
//! expires" loop. [`poll_timeout`] is the one implementation of that loop.
//!
//! ## Semantics
//!
//! The probe runs first, then the elapsed time is checked, then the loop
//! sleeps for `interval_us`. A wait that fails has therefore observed the
//! predicate false at or after the deadline: it never gives up early, and
//! it never overruns the bound by more than one interval.

/// Microsecond time source with busy-wait delay.
pub trait Clock {
    /// Monotonic timestamp in microseconds.
    fn now_us(&self) -> u64;

    /// Busy-wait for at least `us` microseconds.
    fn delay_us(&self, us: u64);

    /// Busy-wait for at least `ms` milliseconds.
    #[inline]
    fn delay_ms(&self, ms: u64) {
        self.delay_us(ms.saturating_mul(1000));
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }

    fn delay_us(&self, us: u64) {
        (**self).delay_us(us)
    }
}

/// The bound of a [`poll_timeout`] expired before the probe succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout {
    /// Time spent polling, in microseconds.
    pub elapsed_us: u64,
}

/// Poll `probe` until it yields a value or `timeout_us` elapses.
///
/// The probe is re-run every `interval_us` microseconds.
pub fn poll_timeout<C, T, F>(
    clock: &C,
    timeout_us: u64,
    interval_us: u64,
    mut probe: F,
) -> Result<T, Timeout>
where
    C: Clock + ?Sized,
    F: FnMut() -> Option<T>,
{
    let start = clock.now_us();
    loop {
        if let Some(value) = probe() {
            return Ok(value);
        }

        let elapsed_us = clock.now_us().wrapping_sub(start);
        if elapsed_us >= timeout_us {
            return Err(Timeout { elapsed_us });
        }

        clock.delay_us(interval_us);
    }
}
