//! DMA descriptors
//!
//! Both directions use 16-byte descriptors of four little-endian words. Word 0
//! carries status, length and the ownership bit; word 3 the buffer's bus
//! address. The ownership bit has opposite polarity per direction:
//!
//! | Ring | bit 31       | set means          |
//! |------|--------------|--------------------|
//! | TX   | `TXDMA_OWN`  | hardware owns slot |
//! | RX   | `RXPKT_RDY`  | software owns slot |
//!
//! Callers only see [`RingDescriptor::owned_by_hardware`].

use super::config::EndOfRing;
use crate::mm::dma::DmaAddr;
use bitflags::bitflags;
use volatile::Volatile;

/// Descriptor size the DMA engine is programmed with
pub const DESCRIPTOR_SIZE: usize = core::mem::size_of::<TxDescriptor>();

const _: () = assert!(core::mem::size_of::<TxDescriptor>() == 16);
const _: () = assert!(core::mem::size_of::<RxDescriptor>() == 16);

bitflags! {
    /// Transmit descriptor word 0
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TxStatus: u32 {
        const TXDMA_OWN = 1 << 31;
        const FTS = 1 << 29;
        const LTS = 1 << 28;
        const CRC_ERR = 1 << 19;

        // End-of-ring and length share the word; keep them on round trips.
        const _ = !0;
    }
}

bitflags! {
    /// Transmit descriptor word 1
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TxControl: u32 {
        const TXIC = 1 << 31;
        const TX2FIC = 1 << 30;
    }
}

bitflags! {
    /// Receive descriptor word 0
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RxStatus: u32 {
        const RXPKT_RDY = 1 << 31;
        const FRS = 1 << 29;
        const LRS = 1 << 28;
        const PAUSE_FRAME = 1 << 25;
        const PAUSE_OPCODE = 1 << 24;
        const FIFO_FULL = 1 << 23;
        const RX_ODD_NB = 1 << 22;
        const RUNT = 1 << 21;
        const FTL = 1 << 20;
        const CRC_ERR = 1 << 19;
        const RX_ERR = 1 << 18;
        const BROADCAST = 1 << 17;
        const MULTICAST = 1 << 16;

        const _ = !0;
    }
}

impl RxStatus {
    /// Conditions that make a delivered frame unusable
    pub const ERRORS: RxStatus = RxStatus::RX_ERR
        .union(RxStatus::CRC_ERR)
        .union(RxStatus::FTL)
        .union(RxStatus::RUNT)
        .union(RxStatus::RX_ODD_NB);

    /// Valid byte count
    pub fn frame_len(self) -> usize {
        (self.bits() & LENGTH_MASK) as usize
    }

    pub fn has_error(self) -> bool {
        self.intersects(Self::ERRORS)
    }
}

/// TXBUF_SIZE / VDBC field
pub const LENGTH_MASK: u32 = 0x3FFF;

/// Common shape of TX and RX descriptors, as used by the ring.
pub trait RingDescriptor {
    /// Return the slot to its post-initialization state: status cleared,
    /// `buffer` bound (receive only), end-of-ring set when `last`.
    fn reset(&mut self, buffer: Option<DmaAddr>, last: bool, eor: EndOfRing);

    fn owned_by_hardware(&self) -> bool;
}

#[repr(C, align(16))]
pub struct TxDescriptor {
    txdes0: Volatile<u32>,
    txdes1: Volatile<u32>,
    txdes2: Volatile<u32>,
    txdes3: Volatile<u32>,
}

impl TxDescriptor {
    pub fn status(&self) -> TxStatus {
        TxStatus::from_bits_retain(self.txdes0.read())
    }

    pub fn control(&self) -> TxControl {
        TxControl::from_bits_retain(self.txdes1.read())
    }

    pub fn buffer(&self) -> DmaAddr {
        DmaAddr::new(self.txdes3.read())
    }

    /// Hand a single-segment frame of `len` bytes at `buffer` to the DMA
    /// engine. Only the end-of-ring bit of the old status survives.
    pub fn arm(&mut self, buffer: DmaAddr, len: usize, eor: EndOfRing) {
        self.txdes3.write(buffer.as_u32());

        let kept = self.txdes0.read() & eor.mask();
        let status = TxStatus::from_bits_retain(kept | (len as u32 & LENGTH_MASK))
            | TxStatus::FTS
            | TxStatus::LTS
            | TxStatus::TXDMA_OWN;
        self.txdes0.write(status.bits());
    }
}

impl RingDescriptor for TxDescriptor {
    fn reset(&mut self, _buffer: Option<DmaAddr>, last: bool, eor: EndOfRing) {
        self.txdes3.write(0);
        self.txdes2.write(0);
        self.txdes1.write(0);
        self.txdes0.write(if last { eor.mask() } else { 0 });
    }

    fn owned_by_hardware(&self) -> bool {
        self.status().contains(TxStatus::TXDMA_OWN)
    }
}

#[repr(C, align(16))]
pub struct RxDescriptor {
    rxdes0: Volatile<u32>,
    rxdes1: Volatile<u32>,
    rxdes2: Volatile<u32>,
    rxdes3: Volatile<u32>,
}

impl RxDescriptor {
    pub fn status(&self) -> RxStatus {
        RxStatus::from_bits_retain(self.rxdes0.read())
    }

    pub fn buffer(&self) -> DmaAddr {
        DmaAddr::new(self.rxdes3.read())
    }

    /// Give a consumed slot back to the DMA engine, end-of-ring intact.
    pub fn recycle(&mut self) {
        self.rxdes0
            .update(|v| *v = (RxStatus::from_bits_retain(*v) - RxStatus::RXPKT_RDY).bits());
    }
}

impl RingDescriptor for RxDescriptor {
    fn reset(&mut self, buffer: Option<DmaAddr>, last: bool, eor: EndOfRing) {
        self.rxdes3.write(buffer.map_or(0, DmaAddr::as_u32));
        self.rxdes2.write(0);
        self.rxdes1.write(0);
        self.rxdes0.write(if last { eor.mask() } else { 0 });
    }

    fn owned_by_hardware(&self) -> bool {
        !self.status().contains(RxStatus::RXPKT_RDY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::config::Model;

    fn zeroed<T>() -> T {
        // SAFETY: descriptors are plain u32 words; all-zero is valid.
        unsafe { core::mem::zeroed() }
    }

    #[test]
    fn test_tx_arm_preserves_only_end_of_ring() {
        let eor = Model::Aspeed.end_of_ring();
        let mut desc: TxDescriptor = zeroed();
        desc.reset(None, true, eor);
        // Stale bits from a previous transmission.
        desc.txdes0.write(desc.txdes0.read() | TxStatus::CRC_ERR.bits() | 0x123);

        desc.arm(DmaAddr::new(0x8000_1000), 60, eor);

        let status = desc.status();
        assert!(status.contains(TxStatus::TXDMA_OWN | TxStatus::FTS | TxStatus::LTS));
        assert!(!status.contains(TxStatus::CRC_ERR));
        assert_eq!(status.bits() & LENGTH_MASK, 60);
        assert_ne!(status.bits() & eor.mask(), 0);
        assert_eq!(desc.buffer(), DmaAddr::new(0x8000_1000));
        assert!(desc.owned_by_hardware());
    }

    #[test]
    fn test_tx_reset_is_software_owned() {
        let eor = Model::Faraday.end_of_ring();
        let mut desc: TxDescriptor = zeroed();
        desc.txdes0.write(u32::MAX);
        desc.reset(None, false, eor);

        assert!(!desc.owned_by_hardware());
        assert_eq!(desc.status().bits(), 0);
        assert!(desc.control().is_empty());
    }

    #[test]
    fn test_rx_ownership_polarity() {
        let eor = Model::Faraday.end_of_ring();
        let mut desc: RxDescriptor = zeroed();
        desc.reset(Some(DmaAddr::new(0x8000_2000)), true, eor);

        assert!(desc.owned_by_hardware());
        assert_eq!(desc.buffer(), DmaAddr::new(0x8000_2000));

        desc.rxdes0
            .write(desc.rxdes0.read() | (RxStatus::RXPKT_RDY | RxStatus::FRS | RxStatus::LRS).bits() | 64);
        assert!(!desc.owned_by_hardware());
        assert_eq!(desc.status().frame_len(), 64);

        desc.recycle();
        assert!(desc.owned_by_hardware());
        assert_eq!(desc.status().bits() & eor.mask(), eor.mask());
    }

    #[test]
    fn test_rx_error_classification() {
        assert!(RxStatus::CRC_ERR.has_error());
        assert!(RxStatus::RX_ODD_NB.has_error());
        assert!(!(RxStatus::BROADCAST | RxStatus::FRS | RxStatus::LRS).has_error());
        assert!(!RxStatus::PAUSE_FRAME.has_error());
    }
}
