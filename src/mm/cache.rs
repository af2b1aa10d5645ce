//! Data cache coherency for DMA
//!
//! The CPU and the MAC's DMA engine do not share a coherent view of memory.
//! Two operations bridge them:
//!
//! - **publish** (clean / flush): write dirty lines back so the device sees
//!   what the CPU just wrote. Used after filling a descriptor or a TX buffer
//!   and before ringing the doorbell.
//! - **observe** (invalidate): drop cached lines so the CPU re-reads what the
//!   device wrote. Used before reading an ownership bit or received data.
//!
//! Both act on whole cache lines: the start of the range is rounded down and
//! the end rounded up, so the effect is never byte-granular. Buffers shared
//! with the device are allocated line-aligned so neighbouring data is never
//! caught in an invalidate.

/// Platform cache maintenance by virtual address.
///
/// Implementors only see line-aligned `[start, end)` ranges.
pub trait CacheMaintenance {
    /// Data cache line size in bytes. Must be a power of two.
    fn line_size(&self) -> usize {
        64
    }

    /// Clean (write back) every line in `[start, end)`.
    fn clean_lines(&self, start: usize, end: usize);

    /// Invalidate every line in `[start, end)`.
    fn invalidate_lines(&self, start: usize, end: usize);

    /// Make the CPU's writes to `[addr, addr + len)` visible to the device.
    fn publish(&self, addr: usize, len: usize) {
        if let Some((start, end)) = line_span(addr, len, self.line_size()) {
            self.clean_lines(start, end);
        }
    }

    /// Make the device's writes to `[addr, addr + len)` visible to the CPU.
    fn observe(&self, addr: usize, len: usize) {
        if let Some((start, end)) = line_span(addr, len, self.line_size()) {
            self.invalidate_lines(start, end);
        }
    }
}

impl<M: CacheMaintenance + ?Sized> CacheMaintenance for &M {
    fn line_size(&self) -> usize {
        (**self).line_size()
    }

    fn clean_lines(&self, start: usize, end: usize) {
        (**self).clean_lines(start, end)
    }

    fn invalidate_lines(&self, start: usize, end: usize) {
        (**self).invalidate_lines(start, end)
    }
}

/// Round `[addr, addr + len)` out to whole cache lines.
///
/// Returns `None` for an empty range.
pub fn line_span(addr: usize, len: usize, line: usize) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    debug_assert!(line.is_power_of_two());

    let start = addr & !(line - 1);
    let end = (addr + len + line - 1) & !(line - 1);
    Some((start, end))
}

/// Round `len` up to a multiple of the line size.
#[inline]
pub const fn round_up(len: usize, line: usize) -> usize {
    (len + line - 1) & !(line - 1)
}

/// Cache maintenance for platforms whose DMA is cache-coherent.
#[derive(Debug, Default, Clone, Copy)]
pub struct Coherent;

impl CacheMaintenance for Coherent {
    fn clean_lines(&self, _start: usize, _end: usize) {
        core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
    }

    fn invalidate_lines(&self, _start: usize, _end: usize) {
        core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;
    use std::vec::Vec;

    #[derive(Default)]
    struct Recorder {
        cleaned: RefCell<Vec<(usize, usize)>>,
        invalidated: RefCell<Vec<(usize, usize)>>,
    }

    impl CacheMaintenance for Recorder {
        fn clean_lines(&self, start: usize, end: usize) {
            self.cleaned.borrow_mut().push((start, end));
        }

        fn invalidate_lines(&self, start: usize, end: usize) {
            self.invalidated.borrow_mut().push((start, end));
        }
    }

    #[test]
    fn test_line_span_rounds_outward() {
        assert_eq!(line_span(0x1004, 10, 64), Some((0x1000, 0x1040)));
        assert_eq!(line_span(0x1000, 64, 64), Some((0x1000, 0x1040)));
        assert_eq!(line_span(0x103F, 2, 64), Some((0x1000, 0x1080)));
        assert_eq!(line_span(0x1000, 0, 64), None);
    }

    #[test]
    fn test_round_up() {
        assert_eq!(round_up(60, 64), 64);
        assert_eq!(round_up(64, 64), 64);
        assert_eq!(round_up(1600, 64), 1600);
        assert_eq!(round_up(1514, 64), 1536);
    }

    #[test]
    fn test_publish_cleans_whole_lines() {
        let cache = Recorder::default();
        cache.publish(0x2010, 16);
        assert_eq!(*cache.cleaned.borrow(), [(0x2000, 0x2040)]);
        assert!(cache.invalidated.borrow().is_empty());
    }

    #[test]
    fn test_observe_invalidates_whole_lines() {
        let cache = Recorder::default();
        cache.observe(0x2000, 100);
        assert_eq!(*cache.invalidated.borrow(), [(0x2000, 0x2080)]);
        assert!(cache.cleaned.borrow().is_empty());
    }

    #[test]
    fn test_empty_range_is_noop() {
        let cache = Recorder::default();
        cache.publish(0x2000, 0);
        cache.observe(0x2000, 0);
        assert!(cache.cleaned.borrow().is_empty());
        assert!(cache.invalidated.borrow().is_empty());
    }
}
