//! Register access
//!
//! Drivers talk to their register blocks through [`RegisterBus`] so the same
//! driver logic runs on hardware ([`Mmio`]) and against a simulated device.

use volatile::Volatile;

/// 32-bit register access by byte offset from a block's base.
pub trait RegisterBus {
    fn read32(&self, offset: usize) -> u32;

    fn write32(&self, offset: usize, value: u32);

    /// Read-modify-write.
    fn modify32<F: FnOnce(u32) -> u32>(&self, offset: usize, f: F)
    where
        Self: Sized,
    {
        let value = self.read32(offset);
        self.write32(offset, f(value));
    }

    fn set_bits32(&self, offset: usize, bits: u32)
    where
        Self: Sized,
    {
        self.modify32(offset, |v| v | bits);
    }
}

impl<R: RegisterBus + ?Sized> RegisterBus for &R {
    fn read32(&self, offset: usize) -> u32 {
        (**self).read32(offset)
    }

    fn write32(&self, offset: usize, value: u32) {
        (**self).write32(offset, value)
    }
}

/// Memory-mapped register block.
#[derive(Debug, Clone, Copy)]
pub struct Mmio {
    base: usize,
}

impl Mmio {
    /// # Safety
    ///
    /// `base` must be the (identity- or device-mapped) address of a register
    /// block large enough for every offset the driver uses, and nothing else
    /// may treat that range as ordinary memory.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    pub fn base(&self) -> usize {
        self.base
    }
}

impl RegisterBus for Mmio {
    #[inline]
    fn read32(&self, offset: usize) -> u32 {
        // SAFETY: base is a valid register block (see Mmio::new) and all
        // driver offsets are 4-byte aligned.
        unsafe {
            let reg = (self.base + offset) as *const Volatile<u32>;
            (*reg).read()
        }
    }

    #[inline]
    fn write32(&self, offset: usize, value: u32) {
        // Descriptor and buffer writes must reach memory before the device
        // can be told about them through a register.
        core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
        // SAFETY: as in read32.
        unsafe {
            let reg = (self.base + offset) as *mut Volatile<u32>;
            (*reg).write(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::boxed::Box;

    #[test]
    fn test_mmio_reads_and_writes_block() {
        let mut block = Box::new([0u32; 8]);
        let mmio = unsafe { Mmio::new(block.as_mut_ptr() as usize) };

        mmio.write32(0x08, 0xDEAD_BEEF);
        mmio.set_bits32(0x0C, 0x10);
        mmio.modify32(0x08, |v| v & 0xFFFF);

        assert_eq!(mmio.read32(0x08), 0xBEEF);
        assert_eq!(mmio.read32(0x0C), 0x10);
        assert_eq!(block[2], 0xBEEF);
    }
}
