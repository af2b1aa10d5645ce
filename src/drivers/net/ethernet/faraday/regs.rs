//! FTGMAC100 register map
//!
//! Offsets are bytes from the MAC's register base. Only the registers the
//! polled driver touches are listed.

use crate::drivers::mmio::RegisterBus;
use crate::drivers::net::netdev::NetError;
use bitflags::bitflags;

// ============================================================================
// Register Offsets
// ============================================================================

pub const ISR: usize = 0x00;
pub const IER: usize = 0x04;
pub const MAC_MADR: usize = 0x08;
pub const MAC_LADR: usize = 0x0C;
pub const MAHT0: usize = 0x10;
pub const MAHT1: usize = 0x14;
/// TX poll demand (doorbell)
pub const TXPD: usize = 0x18;
/// RX poll demand
pub const RXPD: usize = 0x1C;
pub const TXR_BADR: usize = 0x20;
pub const RXR_BADR: usize = 0x24;
pub const ITC: usize = 0x30;
pub const APTC: usize = 0x34;
pub const DBLAC: usize = 0x38;
pub const REVR: usize = 0x40;
pub const RBSR: usize = 0x4C;
pub const MACCR: usize = 0x50;
pub const MACSR: usize = 0x54;
pub const PHYCR: usize = 0x60;
pub const PHYDATA: usize = 0x64;

// MIB counters
pub const TX_CNT: usize = 0xA0;
pub const RX_CNT: usize = 0xB0;
pub const RX_BC_CNT: usize = 0xB4;
pub const RX_MC_CNT: usize = 0xB8;
pub const RX_RUNT_CNT: usize = 0xC0;
/// CRC errors in bits 15:0, frame-too-long in bits 31:16
pub const RX_CRCER_FTL_CNT: usize = 0xC4;

// ============================================================================
// MAC Control Register
// ============================================================================

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Maccr: u32 {
        const TXDMA_EN = 1 << 0;
        const RXDMA_EN = 1 << 1;
        const TXMAC_EN = 1 << 2;
        const RXMAC_EN = 1 << 3;
        const RM_VLAN = 1 << 4;
        const HPTXR_EN = 1 << 5;
        const LOOP_EN = 1 << 6;
        const FULLDUP = 1 << 8;
        const GIGA_MODE = 1 << 9;
        const CRC_APD = 1 << 10;
        const RX_RUNT = 1 << 12;
        const JUMBO_LF = 1 << 13;
        const RX_ALL = 1 << 14;
        const HT_MULTI_EN = 1 << 15;
        const RX_MULTIPKT = 1 << 16;
        const RX_BROADPKT = 1 << 17;
        const DISCARD_CRCERR = 1 << 18;
        const FAST_MODE = 1 << 19;
        const SW_RST = 1 << 31;
    }
}

impl Maccr {
    /// Operating mode written at start: both engines on, FCS appended by
    /// hardware, runts and broadcasts accepted.
    pub const RUN: Maccr = Maccr::TXMAC_EN
        .union(Maccr::RXMAC_EN)
        .union(Maccr::TXDMA_EN)
        .union(Maccr::RXDMA_EN)
        .union(Maccr::CRC_APD)
        .union(Maccr::FULLDUP)
        .union(Maccr::RX_RUNT)
        .union(Maccr::RX_BROADPKT);

    /// Bits owned by the link controller.
    pub const LINK_MODE: Maccr = Maccr::GIGA_MODE
        .union(Maccr::FAST_MODE)
        .union(Maccr::FULLDUP);
}

// ============================================================================
// PHY Control / Data (MAC-integrated MDIO)
// ============================================================================

/// MDC clock cycle threshold: (1 / 2.5 MHz) * 0x34 stays under the poll bound
pub const MDC_CYCTHR: u32 = 0x34;

pub const PHYCR_MIIRD: u32 = 1 << 26;
pub const PHYCR_MIIWR: u32 = 1 << 27;

pub const fn phycr_mdc_cycthr(x: u32) -> u32 {
    x & 0x3F
}

pub const fn phycr_phyad(x: u32) -> u32 {
    (x & 0x1F) << 16
}

pub const fn phycr_regad(x: u32) -> u32 {
    (x & 0x1F) << 21
}

pub const fn phydata_miiwdata(x: u32) -> u32 {
    x & 0xFFFF
}

pub const fn phydata_miirdata(phydata: u32) -> u32 {
    (phydata >> 16) & 0xFFFF
}

// ============================================================================
// DMA Configuration
// ============================================================================

/// Hardware default receive buffer size
pub const RBSR_DEFAULT: u32 = 0x640;

pub const fn aptc_rxpoll_cnt(x: u32) -> u32 {
    x & 0xF
}

pub const fn rbsr_size(x: u32) -> u32 {
    x & 0x3FFF
}

/// Fold descriptor sizes into DBLAC.
///
/// Sizes are programmed in units of 8 bytes into bits 19:16 (TX) and 15:12
/// (RX); the DMA engine requires 16-byte multiples.
pub fn dblac_with_descriptor_sizes(dblac: u32, tx_size: usize, rx_size: usize) -> Result<u32, NetError> {
    if tx_size & 0xF != 0 || rx_size & 0xF != 0 {
        return Err(NetError::BadDescriptorAlignment);
    }

    let mut value = dblac & !(0xFF << 12);
    value |= ((tx_size as u32) >> 3) << 16;
    value |= ((rx_size as u32) >> 3) << 12;
    Ok(value)
}

// ============================================================================
// Statistics
// ============================================================================

/// Snapshot of the MAC's MIB counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MacCounters {
    pub tx_packets: u32,
    pub rx_packets: u32,
    pub rx_broadcast: u32,
    pub rx_multicast: u32,
    pub rx_runt: u32,
    pub rx_crc_errors: u16,
    pub rx_too_long: u16,
}

impl MacCounters {
    pub fn read<R: RegisterBus>(bus: &R) -> Self {
        let crc_ftl = bus.read32(RX_CRCER_FTL_CNT);
        Self {
            tx_packets: bus.read32(TX_CNT),
            rx_packets: bus.read32(RX_CNT),
            rx_broadcast: bus.read32(RX_BC_CNT),
            rx_multicast: bus.read32(RX_MC_CNT),
            rx_runt: bus.read32(RX_RUNT_CNT),
            rx_crc_errors: (crc_ftl & 0xFFFF) as u16,
            rx_too_long: (crc_ftl >> 16) as u16,
        }
    }
}
