//! Device-visible memory
//!
//! The MAC addresses memory through 32-bit bus addresses written into
//! descriptors and ring base registers. Those are a different kind of value
//! from CPU pointers even when the platform maps them 1:1, so they get their
//! own type, [`DmaAddr`], and are only produced by translating through a
//! [`DmaRegion`].
//!
//! # Region Layout
//!
//! The caller hands the driver one DMA-capable window (its CPU pointer and
//! the matching bus address, usually from the board's memory map or the
//! device tree). The engine carves it, in order:
//!
//! ```text
//! TX descriptor ring   N_tx x 16 bytes, line aligned
//! RX descriptor ring   N_rx x 16 bytes, line aligned
//! TX bounce buffers    N_tx x 1536 bytes
//! RX buffers           N_rx x 1600 bytes
//! ```

use crate::drivers::net::netdev::NetError;
use crate::mm::cache::round_up;
use core::fmt;
use core::ptr::NonNull;

/// A 32-bit address as seen by the DMA engine.
///
/// Never dereferenced by the CPU.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct DmaAddr(u32);

impl DmaAddr {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw value for a descriptor field or base-address register.
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Address `bytes` past this one.
    pub const fn offset(self, bytes: u32) -> Self {
        Self(self.0.wrapping_add(bytes))
    }
}

impl fmt::Debug for DmaAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DmaAddr({:#010x})", self.0)
    }
}

/// A chunk of a [`DmaRegion`]: CPU pointer plus bus address.
#[derive(Debug, Clone, Copy)]
pub struct DmaBuf {
    virt: NonNull<u8>,
    bus: DmaAddr,
    len: usize,
}

// SAFETY: a DmaBuf only names memory inside a DmaRegion, which is Send.
unsafe impl Send for DmaBuf {}

impl DmaBuf {
    pub fn as_ptr(&self) -> *mut u8 {
        self.virt.as_ptr()
    }

    /// CPU virtual address, for cache maintenance.
    pub fn virt_addr(&self) -> usize {
        self.virt.as_ptr() as usize
    }

    pub fn bus_addr(&self) -> DmaAddr {
        self.bus
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The `index`-th `stride`-byte slot of this buffer.
    pub fn slot(&self, index: usize, stride: usize) -> DmaBuf {
        let offset = index * stride;
        debug_assert!(offset + stride <= self.len);
        DmaBuf {
            // SAFETY: offset is inside the carved chunk (checked above in
            // debug builds, guaranteed by the carving arithmetic otherwise).
            virt: unsafe { NonNull::new_unchecked(self.virt.as_ptr().add(offset)) },
            bus: self.bus.offset(offset as u32),
            len: stride,
        }
    }
}

/// A DMA-capable memory window, carved front to back.
pub struct DmaRegion {
    virt: NonNull<u8>,
    bus: DmaAddr,
    len: usize,
    next: usize,
}

// SAFETY: the region is plain memory exclusively owned by whoever holds the
// DmaRegion (and later by the engine that carved it). Nothing in it is tied
// to the creating thread.
unsafe impl Send for DmaRegion {}

impl DmaRegion {
    /// Wrap a DMA-capable window.
    ///
    /// # Safety
    ///
    /// - `virt` must point to `len` bytes of memory that stays valid and
    ///   unaliased for as long as the region (or any engine built on it)
    ///   lives.
    /// - `bus` must be the address at which the MAC sees `virt`, and the
    ///   whole window must be reachable through 32-bit bus addresses.
    pub unsafe fn new(virt: *mut u8, bus: DmaAddr, len: usize) -> Result<Self, NetError> {
        let virt = NonNull::new(virt).ok_or(NetError::InvalidConfiguration)?;
        if (bus.as_u32() as u64) + (len as u64) > (u32::MAX as u64) + 1 {
            return Err(NetError::InvalidConfiguration);
        }

        Ok(Self {
            virt,
            bus,
            len,
            next: 0,
        })
    }

    /// Wrap a window that the MAC sees at its CPU address.
    ///
    /// # Safety
    ///
    /// Same as [`DmaRegion::new`]; additionally the platform must map DMA
    /// 1:1 onto CPU physical memory with the MMU off or identity mapped.
    pub unsafe fn identity(virt: *mut u8, len: usize) -> Result<Self, NetError> {
        let raw = u32::try_from(virt as usize).map_err(|_| NetError::InvalidConfiguration)?;
        // SAFETY: forwarded from the caller.
        unsafe { Self::new(virt, DmaAddr::new(raw), len) }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes not yet carved.
    pub fn remaining(&self) -> usize {
        self.len - self.next
    }

    /// Carve `len` bytes aligned to `align` (a power of two).
    ///
    /// Alignment is applied to the CPU address; the bus address moves in
    /// lockstep so both stay aligned when the window base is.
    pub fn carve(&mut self, len: usize, align: usize) -> Result<DmaBuf, NetError> {
        let base = self.virt.as_ptr() as usize;
        let start = round_up(base + self.next, align) - base;
        let end = start.checked_add(len).ok_or(NetError::RegionTooSmall)?;
        if end > self.len {
            return Err(NetError::RegionTooSmall);
        }
        self.next = end;

        Ok(DmaBuf {
            // SAFETY: start < self.len, so the pointer stays in the window.
            virt: unsafe { NonNull::new_unchecked(self.virt.as_ptr().add(start)) },
            bus: self.bus.offset(start as u32),
            len,
        })
    }

    /// Translate a CPU address inside the window to its bus address.
    pub fn bus_addr_of(&self, virt: usize) -> Option<DmaAddr> {
        let base = self.virt.as_ptr() as usize;
        let offset = virt.checked_sub(base)?;
        (offset < self.len).then(|| self.bus.offset(offset as u32))
    }

    /// Translate a bus address inside the window to its CPU address.
    pub fn virt_addr_of(&self, bus: DmaAddr) -> Option<usize> {
        let offset = bus.as_u32().checked_sub(self.bus.as_u32())? as usize;
        (offset < self.len).then(|| self.virt.as_ptr() as usize + offset)
    }
}

impl fmt::Debug for DmaRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DmaRegion")
            .field("virt", &self.virt)
            .field("bus", &self.bus)
            .field("len", &self.len)
            .field("next", &self.next)
            .finish()
    }
}
