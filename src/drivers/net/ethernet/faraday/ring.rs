//! Fixed-size descriptor ring
//!
//! A ring lives in memory carved from the DMA region, so its bus address
//! never changes after construction. Software walks it with a single index;
//! the hardware keeps its own and wraps on the end-of-ring bit, which is why
//! that bit must always be present on the last slot.

use super::config::EndOfRing;
use super::descriptor::RingDescriptor;
use crate::drivers::net::netdev::NetError;
use crate::mm::cache::CacheMaintenance;
use crate::mm::dma::{DmaAddr, DmaBuf, DmaRegion};
use core::marker::PhantomData;
use core::mem::size_of;

pub struct DescriptorRing<D, const N: usize> {
    mem: DmaBuf,
    index: usize,
    _desc: PhantomData<D>,
}

// SAFETY: the ring memory is exclusively owned by this ring; nothing in it
// refers back to the thread that created it.
unsafe impl<D, const N: usize> Send for DescriptorRing<D, N> {}

impl<D: RingDescriptor, const N: usize> DescriptorRing<D, N> {
    pub const CAPACITY: usize = N;

    /// Ring footprint in bytes
    pub const BYTES: usize = N * size_of::<D>();

    /// Carve ring memory out of `region`, aligned to `align` bytes.
    pub fn carve(region: &mut DmaRegion, align: usize) -> Result<Self, NetError> {
        const { assert!(N.is_power_of_two(), "ring capacity must be a power of two") };

        let mem = region.carve(Self::BYTES, align.max(core::mem::align_of::<D>()))?;
        Ok(Self {
            mem,
            index: 0,
            _desc: PhantomData,
        })
    }

    /// Reset every slot and hand the whole ring to memory.
    ///
    /// `buffer` yields the buffer bound to each slot (receive rings only).
    /// The index returns to 0.
    pub fn initialize<M, F>(&mut self, cache: &M, eor: EndOfRing, mut buffer: F)
    where
        M: CacheMaintenance + ?Sized,
        F: FnMut(usize) -> Option<DmaAddr>,
    {
        for i in 0..N {
            let last = i == N - 1;
            self.slot_mut(i).reset(buffer(i), last, eor);
        }
        self.index = 0;
        cache.publish(self.mem.virt_addr(), Self::BYTES);
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> &D {
        self.slot(self.index)
    }

    pub fn current_mut(&mut self) -> &mut D {
        self.slot_mut(self.index)
    }

    /// CPU address of the current descriptor, for cache maintenance
    pub fn current_addr(&self) -> usize {
        self.mem.virt_addr() + self.index * size_of::<D>()
    }

    pub fn advance(&mut self) {
        self.index = (self.index + 1) % N;
    }

    /// Whether the current slot carries the end-of-ring bit
    pub fn is_end(&self) -> bool {
        self.index == N - 1
    }

    /// Bus address programmed into the ring base register
    pub fn bus_addr(&self) -> DmaAddr {
        self.mem.bus_addr()
    }

    pub fn slot(&self, i: usize) -> &D {
        assert!(i < N);
        // SAFETY: the ring memory holds N properly aligned descriptors and
        // only this ring hands out references into it.
        unsafe { &*(self.mem.as_ptr() as *const D).add(i) }
    }

    fn slot_mut(&mut self, i: usize) -> &mut D {
        assert!(i < N);
        // SAFETY: as in slot(); &mut self guarantees exclusivity.
        unsafe { &mut *(self.mem.as_ptr() as *mut D).add(i) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::net::ethernet::faraday::config::Model;
    use crate::drivers::net::ethernet::faraday::descriptor::{RxDescriptor, TxDescriptor};
    use crate::mm::cache::Coherent;
    use std::boxed::Box;

    #[repr(C, align(64))]
    struct Window([u8; 512]);

    fn region(window: &mut Window) -> DmaRegion {
        unsafe { DmaRegion::new(window.0.as_mut_ptr(), DmaAddr::new(0x8000_0000), 512).unwrap() }
    }

    #[test]
    fn test_initialize_marks_only_last_slot() {
        let eor = Model::Aspeed.end_of_ring();
        let mut window = Box::new(Window([0xAA; 512]));
        let mut region = region(&mut window);
        let mut ring = DescriptorRing::<TxDescriptor, 4>::carve(&mut region, 64).unwrap();

        ring.initialize(&Coherent, eor, |_| None);

        for i in 0..3 {
            assert_eq!(ring.slot(i).status().bits(), 0);
            assert!(!ring.slot(i).owned_by_hardware());
        }
        assert_eq!(ring.slot(3).status().bits(), eor.mask());
        assert_eq!(ring.index(), 0);
    }

    #[test]
    fn test_rx_initialize_binds_buffers() {
        let eor = Model::Faraday.end_of_ring();
        let mut window = Box::new(Window([0; 512]));
        let mut region = region(&mut window);
        let mut ring = DescriptorRing::<RxDescriptor, 4>::carve(&mut region, 64).unwrap();

        ring.initialize(&Coherent, eor, |i| Some(DmaAddr::new(0x9000_0000 + i as u32 * 0x640)));

        assert_eq!(ring.slot(2).buffer(), DmaAddr::new(0x9000_0C80));
        assert!(ring.slot(0).owned_by_hardware());
    }

    #[test]
    fn test_advance_wraps() {
        let mut window = Box::new(Window([0; 512]));
        let mut region = region(&mut window);
        let mut ring = DescriptorRing::<TxDescriptor, 4>::carve(&mut region, 64).unwrap();
        let base = ring.current_addr();

        for _ in 0..3 {
            ring.advance();
        }
        assert!(ring.is_end());
        assert_eq!(ring.current_addr(), base + 48);

        ring.advance();
        assert_eq!(ring.index(), 0);
        assert_eq!(ring.current_addr(), base);
    }

    #[test]
    fn test_carve_fails_when_region_exhausted() {
        let mut window = Box::new(Window([0; 512]));
        let mut region = region(&mut window);
        let result = DescriptorRing::<TxDescriptor, 64>::carve(&mut region, 64);
        assert_eq!(result.err(), Some(NetError::RegionTooSmall));
    }
}
