//! Descriptor-ring packet engine
//!
//! Owns the TX and RX rings, their buffers and the software indices, and
//! implements the ownership handshake with the DMA engine.
//!
//! # Handshake
//!
//! Descriptor memory is shared with the device through the data cache, so
//! every access to it is bracketed:
//!
//! 1. observe (invalidate) before reading an ownership bit
//! 2. publish (clean) after writing a descriptor or buffer, and before any
//!    register write that lets the device act on it
//!
//! # Transmit
//!
//! One descriptor per frame. The caller's bytes are copied into the slot's
//! bounce buffer, the descriptor is armed and the TX poll-demand register
//! kicked, then `send()` waits (bounded) for the DMA engine to hand the
//! descriptor back. A timed-out descriptor stays armed. When the ring comes
//! back round to a slot the device still owns, `send()` reports the ring
//! as saturated instead of waiting.
//!
//! # Receive
//!
//! The device fills RX slots in order and flips `RXPKT_RDY`. `receive()`
//! peeks at the current slot without consuming it; `release()` gives it back
//! and moves on. Frames the MAC flagged as damaged are given back during
//! `receive()` itself so one bad frame cannot stall the ring.

use super::config::{EndOfRing, Model};
use super::descriptor::{RingDescriptor, RxDescriptor, RxStatus, TxDescriptor, DESCRIPTOR_SIZE};
use super::link::LinkController;
use super::regs::{
    aptc_rxpoll_cnt, dblac_with_descriptor_sizes, rbsr_size, MacCounters, Maccr, APTC, DBLAC,
    IER, MACCR, MAC_LADR, MAC_MADR, RBSR, RBSR_DEFAULT, RXR_BADR, TXPD, TXR_BADR,
};
use super::ring::DescriptorRing;
use crate::drivers::Platform;
use crate::drivers::net::netdev::{NetError, RxFrame, RxHandle};
use crate::drivers::net::phy::{LinkState, PhyNegotiator};
use crate::mm::cache::round_up;
use crate::mm::dma::{DmaBuf, DmaRegion};
use crate::net::ethernet::MacAddress;
use crate::time::poll_timeout;
use core::mem::size_of;
use log::{debug, error, info, warn};

// ============================================================================
// Constants
// ============================================================================

/// Minimum Ethernet frame without FCS
pub const ETH_ZLEN: usize = 60;

/// Transmit bounce buffer per TX slot
pub const TX_BUF_SIZE: usize = 1536;

/// Receive buffer per RX slot, matching RBSR
pub const RX_BUF_SIZE: usize = RBSR_DEFAULT as usize;

pub const TX_TIMEOUT_US: u64 = 1_000_000;
const TX_POLL_INTERVAL_US: u64 = 10;

pub const RESET_TIMEOUT_US: u64 = 100_000;
const RESET_POLL_INTERVAL_US: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Started,
    Stopped,
}

// ============================================================================
// Engine
// ============================================================================

pub struct RingEngine<P, const TX: usize = 4, const RX: usize = 4> {
    platform: P,
    region: DmaRegion,
    tx: DescriptorRing<TxDescriptor, TX>,
    rx: DescriptorRing<RxDescriptor, RX>,
    tx_bufs: DmaBuf,
    rx_bufs: DmaBuf,
    eor: EndOfRing,
    mac: MacAddress,
    state: EngineState,
}

impl<P: Platform, const TX: usize, const RX: usize> RingEngine<P, TX, RX> {
    /// Bytes of DMA memory needed for rings and buffers, for a window whose
    /// base may be misaligned to `line`.
    pub const fn region_len(line: usize) -> usize {
        round_up(TX * DESCRIPTOR_SIZE, line)
            + round_up(RX * DESCRIPTOR_SIZE, line)
            + round_up(TX * TX_BUF_SIZE, line)
            + RX * RX_BUF_SIZE
            + line
    }

    /// Lay rings and buffers out in `region`. Nothing is written to the
    /// device until `start()`.
    pub fn new(
        platform: P,
        mut region: DmaRegion,
        model: Model,
        mac: MacAddress,
    ) -> Result<Self, NetError> {
        let line = platform.line_size().max(DESCRIPTOR_SIZE);

        let tx = DescriptorRing::carve(&mut region, line)?;
        let rx = DescriptorRing::carve(&mut region, line)?;
        let tx_bufs = region.carve(TX * TX_BUF_SIZE, line)?;
        let rx_bufs = region.carve(RX * RX_BUF_SIZE, line)?;

        Ok(Self {
            platform,
            region,
            tx,
            rx,
            tx_bufs,
            rx_bufs,
            eor: model.end_of_ring(),
            mac,
            state: EngineState::Uninitialized,
        })
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn mac_address(&self) -> MacAddress {
        self.mac
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn tx_index(&self) -> usize {
        self.tx.index()
    }

    pub fn rx_index(&self) -> usize {
        self.rx.index()
    }

    pub fn counters(&self) -> MacCounters {
        MacCounters::read(&self.platform)
    }

    /// Give the DMA window back once the engine is no longer needed.
    pub fn into_region(self) -> DmaRegion {
        self.region
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Reset the MAC, hand it fresh rings and enable both directions, then
    /// wait for the PHY and program the negotiated link mode.
    pub fn start<N>(&mut self, phy: &mut N, link: &LinkController) -> Result<LinkState, NetError>
    where
        N: PhyNegotiator + ?Sized,
    {
        debug!("ftgmac100: start");
        self.state = EngineState::Uninitialized;

        self.reset()?;
        self.write_mac(self.mac);

        // Polled operation: all interrupt sources off
        self.platform.write32(IER, 0);

        self.init_rings();

        self.platform.write32(TXR_BADR, self.tx.bus_addr().as_u32());
        self.platform.write32(RXR_BADR, self.rx.bus_addr().as_u32());

        // Poll RX descriptors automatically
        self.platform.write32(APTC, aptc_rxpoll_cnt(1));
        self.platform.write32(RBSR, rbsr_size(RBSR_DEFAULT));

        let dblac = dblac_with_descriptor_sizes(
            self.platform.read32(DBLAC),
            size_of::<TxDescriptor>(),
            size_of::<RxDescriptor>(),
        )
        .inspect_err(|_| error!("ftgmac100: descriptor size must be 16 bytes aligned"))?;
        self.platform.write32(DBLAC, dblac);

        self.platform.write32(MACCR, Maccr::RUN.bits());

        let state = phy
            .startup()
            .inspect_err(|e| error!("ftgmac100: could not start PHY: {}", e))?;
        link.apply(&self.platform, &state)
            .inspect_err(|_| error!("ftgmac100: could not adjust link"))?;

        self.state = EngineState::Started;
        info!(
            "ftgmac100: link up, {} Mbps {}-duplex mac:{}",
            state.speed.mbps(),
            state.duplex,
            self.mac
        );
        Ok(state)
    }

    /// Disable TX and RX. The PHY is powered down unless the link belongs to
    /// a sideband controller.
    pub fn stop<N>(&mut self, phy: &mut N, link: &LinkController)
    where
        N: PhyNegotiator + ?Sized,
    {
        debug!("ftgmac100: stop");
        self.platform.write32(MACCR, 0);

        if !link.is_link_less() {
            if let Err(e) = phy.shutdown() {
                warn!("ftgmac100: PHY shutdown failed: {}", e);
            }
        }
        self.state = EngineState::Stopped;
    }

    fn reset(&self) -> Result<(), NetError> {
        self.platform.set_bits32(MACCR, Maccr::SW_RST.bits());

        poll_timeout(&self.platform, RESET_TIMEOUT_US, RESET_POLL_INTERVAL_US, || {
            (self.platform.read32(MACCR) & Maccr::SW_RST.bits() == 0).then_some(())
        })
        .map_err(|_| {
            error!("ftgmac100: MAC reset did not complete");
            NetError::ResetTimeout
        })
    }

    fn init_rings(&mut self) {
        // No dirty line may be evicted over data the device writes later.
        self.platform
            .observe(self.rx_bufs.virt_addr(), self.rx_bufs.len());

        let rx_bufs = self.rx_bufs;
        self.tx.initialize(&self.platform, self.eor, |_| None);
        self.rx.initialize(&self.platform, self.eor, |i| {
            Some(rx_bufs.slot(i, RX_BUF_SIZE).bus_addr())
        });
    }

    fn write_mac(&self, mac: MacAddress) {
        let m = mac.as_bytes();
        let madr = (m[0] as u32) << 8 | m[1] as u32;
        let ladr = (m[2] as u32) << 24 | (m[3] as u32) << 16 | (m[4] as u32) << 8 | m[5] as u32;

        debug!("ftgmac100: set mac ({:x} {:x})", madr, ladr);
        self.platform.write32(MAC_MADR, madr);
        self.platform.write32(MAC_LADR, ladr);
    }

    /// Program a new station address. Valid in any state; it is also
    /// re-applied on every `start()`.
    pub fn set_mac_address(&mut self, mac: MacAddress) {
        self.mac = mac;
        self.write_mac(mac);
    }

    fn ensure_started(&self) -> Result<(), NetError> {
        if self.state == EngineState::Started {
            Ok(())
        } else {
            Err(NetError::NotStarted)
        }
    }

    // ========================================================================
    // Transmit
    // ========================================================================

    pub fn send(&mut self, frame: &[u8]) -> Result<(), NetError> {
        self.ensure_started()?;
        if frame.len() > TX_BUF_SIZE {
            return Err(NetError::FrameTooLarge);
        }

        let index = self.tx.index();
        let desc_addr = self.tx.current_addr();

        self.platform.observe(desc_addr, DESCRIPTOR_SIZE);
        if self.tx.current().owned_by_hardware() {
            error!("ftgmac100: no TX descriptor available");
            return Err(NetError::NoDescriptorAvailable);
        }

        debug!("ftgmac100: send slot {} len {}", index, frame.len());

        let len = frame.len().max(ETH_ZLEN);
        let slot = self.tx_bufs.slot(index, TX_BUF_SIZE);
        // SAFETY: the slot is TX_BUF_SIZE bytes of DMA memory owned by this
        // engine, and its descriptor is software-owned so the device is not
        // reading it.
        let buf = unsafe { core::slice::from_raw_parts_mut(slot.as_ptr(), TX_BUF_SIZE) };
        buf[..frame.len()].copy_from_slice(frame);
        buf[frame.len()..len].fill(0);
        self.platform.publish(slot.virt_addr(), len);

        self.tx.current_mut().arm(slot.bus_addr(), len, self.eor);
        self.platform.publish(desc_addr, DESCRIPTOR_SIZE);

        self.platform.write32(TXPD, 1);

        let tx = &self.tx;
        let platform = &self.platform;
        let done = poll_timeout(platform, TX_TIMEOUT_US, TX_POLL_INTERVAL_US, || {
            platform.observe(desc_addr, DESCRIPTOR_SIZE);
            (!tx.current().owned_by_hardware()).then_some(())
        });

        // Advance on timeout too. The device has already moved its own TX
        // pointer past this slot, and the descriptor stays armed, so staying
        // here would put the next send on a slot the device will not look at
        // until it wraps. Advancing keeps both indices equal; a stalled slot
        // then shows up as NoDescriptorAvailable once the ring comes round.
        self.tx.advance();

        match done {
            Ok(()) => {
                debug!("ftgmac100: packet sent");
                Ok(())
            }
            Err(t) => {
                error!("ftgmac100: TX timeout after {} us (slot {})", t.elapsed_us, index);
                Err(NetError::TransmitTimeout)
            }
        }
    }

    // ========================================================================
    // Receive
    // ========================================================================

    /// Peek at the current RX slot.
    ///
    /// Returns the same frame until it is released.
    pub fn receive(&mut self) -> Result<RxFrame<'_>, NetError> {
        self.ensure_started()?;

        let index = self.rx.index();
        self.platform.observe(self.rx.current_addr(), DESCRIPTOR_SIZE);

        let status = self.rx.current().status();
        if !status.contains(RxStatus::RXPKT_RDY) {
            return Err(NetError::NoFrameAvailable);
        }

        let len = status.frame_len();
        if status.has_error() || len == 0 || len > RX_BUF_SIZE {
            debug!(
                "ftgmac100: dropping RX frame in slot {} (status {:#010x})",
                index,
                status.bits()
            );
            self.recycle_current();
            return Err(NetError::NoFrameAvailable);
        }

        debug!("ftgmac100: RX buffer {}, {:x} received", index, len);

        let slot = self.rx_bufs.slot(index, RX_BUF_SIZE);
        self.platform.observe(slot.virt_addr(), len);
        // SAFETY: len <= RX_BUF_SIZE and the slot is software-owned until
        // released, which needs &mut self and so ends this borrow first.
        let data = unsafe { core::slice::from_raw_parts(slot.as_ptr(), len) };

        Ok(RxFrame::new(RxHandle::new(index, len), data))
    }

    /// Hand the current RX slot back to the device.
    pub fn release(&mut self, handle: RxHandle) -> Result<(), NetError> {
        self.ensure_started()?;
        if handle.index() != self.rx.index() {
            return Err(NetError::InvalidHandle);
        }

        self.recycle_current();
        Ok(())
    }

    fn recycle_current(&mut self) {
        self.rx.current_mut().recycle();
        self.platform.publish(self.rx.current_addr(), DESCRIPTOR_SIZE);
        self.rx.advance();
    }
}
