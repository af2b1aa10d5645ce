//! Host-side FTGMAC100 model for tests
//!
//! Implements the platform seams over a register file, a DMA arena and a
//! clause 22 PHY. The DMA engine acts synchronously: a TXPD write drains the
//! TX ring on the spot, and [`Sim::deliver`] plays the part of a frame
//! arriving on the wire. Time only moves when the driver delays.

use crate::drivers::mmio::RegisterBus;
use crate::drivers::net::ethernet::faraday::Model;
use crate::drivers::net::ethernet::faraday::regs::{
    Maccr, MACCR, PHYCR, PHYCR_MIIRD, PHYCR_MIIWR, PHYDATA, RXR_BADR, TXPD, TXR_BADR,
};
use crate::mm::cache::CacheMaintenance;
use crate::mm::dma::{DmaAddr, DmaRegion};
use crate::time::Clock;
use spin::Mutex;
use std::boxed::Box;
use std::sync::Arc;
use std::vec::Vec;

pub const ARENA_LEN: usize = 32 * 1024;

/// Bus address of the first arena byte
pub const BUS_BASE: u32 = 0x8000_0000;

const OWN: u32 = 1 << 31;
const RX_FIRST_LAST: u32 = (1 << 29) | (1 << 28);
const LENGTH_MASK: u32 = 0x3FFF;

#[repr(C, align(64))]
struct Arena([u8; ARENA_LEN]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Write(usize, u32),
    Clean(usize, usize),
    Invalidate(usize, usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMode {
    /// Descriptors complete as soon as the doorbell rings.
    Complete,
    /// The DMA engine never picks anything up.
    Stall,
}

// ============================================================================
// PHY
// ============================================================================

pub struct SimPhy {
    regs: [u16; 32],
    cable: bool,
    aneg_stuck: bool,
}

impl SimPhy {
    pub const ADDR: u8 = 1;
    pub const ID: u32 = 0x001C_C916;

    fn new() -> Self {
        let mut regs = [0u16; 32];
        regs[0x00] = 0x1140;
        regs[0x01] = 0x7949;
        regs[0x02] = (Self::ID >> 16) as u16;
        regs[0x03] = Self::ID as u16;
        regs[0x04] = 0x01E1;
        regs[0x05] = 0x45E1;
        regs[0x09] = 0x0300;
        regs[0x0A] = 0x0800;
        regs[0x0F] = 0x3000;
        Self {
            regs,
            cable: true,
            aneg_stuck: false,
        }
    }

    fn read(&self, addr: u8, reg: u8) -> u16 {
        if addr != Self::ADDR {
            return 0xFFFF;
        }
        self.regs[reg as usize & 0x1F]
    }

    fn write(&mut self, addr: u8, reg: u8, value: u16) {
        if addr != Self::ADDR {
            return;
        }
        match reg & 0x1F {
            0x00 => self.write_bmcr(value),
            // Status, identifier and partner registers are read-only.
            0x01 | 0x02 | 0x03 | 0x05 | 0x0A | 0x0F => {}
            r => self.regs[r as usize] = value,
        }
    }

    fn write_bmcr(&mut self, value: u16) {
        const RESET: u16 = 0x8000;
        const ANRESTART: u16 = 0x0200;
        const PDOWN: u16 = 0x0800;
        const LINK_BITS: u16 = 0x0020 | 0x0004;

        let mut value = value & !RESET;
        if value & PDOWN != 0 {
            self.regs[0x01] &= !LINK_BITS;
        } else if value & ANRESTART != 0 {
            value &= !ANRESTART;
            self.regs[0x01] &= !LINK_BITS;
            if !self.aneg_stuck {
                self.regs[0x01] |= 0x0020;
                if self.cable {
                    self.regs[0x01] |= 0x0004;
                }
            }
        }
        self.regs[0x00] = value;
    }
}

// ============================================================================
// Device
// ============================================================================

struct SimState {
    model: Model,
    regs: [u32; 64],
    arena: *mut Arena,
    phy: SimPhy,
    tx_mode: TxMode,
    tx_hw: usize,
    rx_hw: usize,
    sent: Vec<Vec<u8>>,
    events: Vec<Event>,
    now: u64,
    reset_stuck: bool,
    mdio_stuck: bool,
}

// SAFETY: the arena is owned by the state and only touched under the lock
// (or by the engine that the test hands a region over it).
unsafe impl Send for SimState {}

impl Drop for SimState {
    fn drop(&mut self) {
        // SAFETY: allocated by Box::into_raw in Sim::new and freed only here.
        drop(unsafe { Box::from_raw(self.arena) });
    }
}

impl SimState {
    fn reg(&self, offset: usize) -> u32 {
        self.regs.get(offset / 4).copied().unwrap_or(0)
    }

    fn set(&mut self, offset: usize, value: u32) {
        if let Some(r) = self.regs.get_mut(offset / 4) {
            *r = value;
        }
    }

    fn base(&self) -> usize {
        self.arena as usize
    }

    fn virt(&self, bus: u32) -> usize {
        let offset = bus.wrapping_sub(BUS_BASE) as usize;
        assert!(offset < ARENA_LEN, "bus address {bus:#x} outside the arena");
        self.base() + offset
    }

    fn word(&self, bus: u32) -> u32 {
        // SAFETY: virt() keeps the address inside the arena; descriptors are
        // 16-byte aligned.
        unsafe { core::ptr::read_volatile(self.virt(bus) as *const u32) }
    }

    fn set_word(&mut self, bus: u32, value: u32) {
        // SAFETY: as in word().
        unsafe { core::ptr::write_volatile(self.virt(bus) as *mut u32, value) }
    }

    fn eor(&self) -> u32 {
        self.model.end_of_ring().mask()
    }

    fn write_maccr(&mut self, value: u32) {
        let rst = Maccr::SW_RST.bits();
        if value & rst != 0 && !self.reset_stuck {
            self.tx_hw = 0;
            self.rx_hw = 0;
            self.set(MACCR, value & !rst);
        } else {
            self.set(MACCR, value);
        }
    }

    fn mdio(&mut self, value: u32) {
        if self.mdio_stuck {
            self.set(PHYCR, value);
            return;
        }

        let phy = ((value >> 16) & 0x1F) as u8;
        let reg = ((value >> 21) & 0x1F) as u8;
        if value & PHYCR_MIIRD != 0 {
            let data = self.phy.read(phy, reg) as u32;
            let phydata = (data << 16) | (self.reg(PHYDATA) & 0xFFFF);
            self.set(PHYDATA, phydata);
        } else if value & PHYCR_MIIWR != 0 {
            let data = self.reg(PHYDATA) as u16;
            self.phy.write(phy, reg, data);
        }
        self.set(PHYCR, value & !(PHYCR_MIIRD | PHYCR_MIIWR));
    }

    fn kick_tx(&mut self) {
        if self.tx_mode == TxMode::Stall || self.reg(MACCR) & Maccr::TXDMA_EN.bits() == 0 {
            return;
        }

        loop {
            let desc = self.reg(TXR_BADR) + (self.tx_hw as u32) * 16;
            let des0 = self.word(desc);
            if des0 & OWN == 0 {
                break;
            }

            let len = (des0 & LENGTH_MASK) as usize;
            let buf = self.virt(self.word(desc + 12));
            // SAFETY: the frame sits in the arena at the address the driver
            // programmed; virt() bounds-checked its start.
            let frame = unsafe { core::slice::from_raw_parts(buf as *const u8, len) }.to_vec();
            self.sent.push(frame);

            self.set_word(desc, des0 & !OWN);
            self.tx_hw = if des0 & self.eor() != 0 { 0 } else { self.tx_hw + 1 };
        }
    }

    fn deliver(&mut self, frame: &[u8], flags: u32) -> bool {
        if self.reg(MACCR) & Maccr::RXDMA_EN.bits() == 0 {
            return false;
        }

        let desc = self.reg(RXR_BADR) + (self.rx_hw as u32) * 16;
        let des0 = self.word(desc);
        if des0 & OWN != 0 {
            return false;
        }

        let buf = self.virt(self.word(desc + 12));
        // SAFETY: the buffer was bound by the driver inside the arena.
        unsafe { core::ptr::copy_nonoverlapping(frame.as_ptr(), buf as *mut u8, frame.len()) };

        let eor = des0 & self.eor();
        self.set_word(desc, eor | OWN | RX_FIRST_LAST | flags | frame.len() as u32);
        self.rx_hw = if eor != 0 { 0 } else { self.rx_hw + 1 };
        true
    }
}

/// Shared handle to one simulated MAC.
#[derive(Clone)]
pub struct Sim {
    state: Arc<Mutex<SimState>>,
}

impl Sim {
    pub fn new(model: Model) -> Self {
        let arena = Box::into_raw(Box::new(Arena([0; ARENA_LEN])));
        Self {
            state: Arc::new(Mutex::new(SimState {
                model,
                regs: [0; 64],
                arena,
                phy: SimPhy::new(),
                tx_mode: TxMode::Complete,
                tx_hw: 0,
                rx_hw: 0,
                sent: Vec::new(),
                events: Vec::new(),
                now: 0,
                reset_stuck: false,
                mdio_stuck: false,
            })),
        }
    }

    pub fn model(&self) -> Model {
        self.state.lock().model
    }

    /// The whole DMA arena
    pub fn region(&self) -> DmaRegion {
        let base = self.state.lock().base();
        unsafe { DmaRegion::new(base as *mut u8, DmaAddr::new(BUS_BASE), ARENA_LEN).unwrap() }
    }

    pub fn virt_of(&self, bus: u32) -> usize {
        self.state.lock().virt(bus)
    }

    pub fn read_desc(&self, bus: u32) -> [u32; 4] {
        let s = self.state.lock();
        [s.word(bus), s.word(bus + 4), s.word(bus + 8), s.word(bus + 12)]
    }

    pub fn reg(&self, offset: usize) -> u32 {
        self.state.lock().reg(offset)
    }

    pub fn set_reg(&self, offset: usize, value: u32) {
        self.state.lock().set(offset, value)
    }

    pub fn now(&self) -> u64 {
        self.state.lock().now
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.lock().events.clear()
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.state.lock().sent.clone()
    }

    pub fn set_tx_mode(&self, mode: TxMode) {
        self.state.lock().tx_mode = mode;
    }

    /// Let the DMA engine walk the TX ring as if TXPD had been written.
    pub fn kick_tx(&self) {
        self.state.lock().kick_tx()
    }

    /// Put a frame into the next RX slot. False when the device has no
    /// free slot (or RX DMA is off).
    pub fn deliver(&self, frame: &[u8], flags: u32) -> bool {
        self.state.lock().deliver(frame, flags)
    }

    pub fn set_reset_stuck(&self, stuck: bool) {
        self.state.lock().reset_stuck = stuck;
    }

    pub fn set_mdio_stuck(&self, stuck: bool) {
        self.state.lock().mdio_stuck = stuck;
    }

    pub fn phy_reg(&self, reg: u8) -> u16 {
        self.state.lock().phy.regs[reg as usize & 0x1F]
    }

    pub fn set_partner(&self, lpa: u16, stat1000: u16) {
        let mut s = self.state.lock();
        s.phy.regs[0x05] = lpa;
        s.phy.regs[0x0A] = stat1000;
    }

    pub fn set_cable(&self, plugged: bool) {
        self.state.lock().phy.cable = plugged;
    }

    pub fn set_aneg_stuck(&self, stuck: bool) {
        self.state.lock().phy.aneg_stuck = stuck;
    }
}

impl RegisterBus for Sim {
    fn read32(&self, offset: usize) -> u32 {
        self.state.lock().reg(offset)
    }

    fn write32(&self, offset: usize, value: u32) {
        let mut s = self.state.lock();
        s.events.push(Event::Write(offset, value));
        match offset {
            MACCR => s.write_maccr(value),
            TXR_BADR => {
                s.set(offset, value);
                s.tx_hw = 0;
            }
            RXR_BADR => {
                s.set(offset, value);
                s.rx_hw = 0;
            }
            TXPD => s.kick_tx(),
            PHYCR => s.mdio(value),
            _ => s.set(offset, value),
        }
    }
}

impl CacheMaintenance for Sim {
    fn clean_lines(&self, start: usize, end: usize) {
        self.state.lock().events.push(Event::Clean(start, end));
    }

    fn invalidate_lines(&self, start: usize, end: usize) {
        self.state.lock().events.push(Event::Invalidate(start, end));
    }
}

impl Clock for Sim {
    fn now_us(&self) -> u64 {
        self.state.lock().now
    }

    fn delay_us(&self, us: u64) {
        self.state.lock().now += us;
    }
}
