//! PHY management
//!
//! The MAC needs one thing from the PHY layer: a negotiated
//! [`LinkState`]. [`PhyNegotiator`] supplies it. Two backends exist:
//!
//! - [`GenericPhy`] - IEEE 802.3 clause 22 PHY driven over an [`MdioBus`]
//! - [`SidebandLink`] - NC-SI, where a management controller owns the link
//!
//! # Register Reference
//!
//! Only the standard clause 22 registers are used, so any compliant PHY
//! works without a vendor driver.

use crate::drivers::net::mdio::MdioBus;
use crate::drivers::net::netdev::NetError;
use crate::time::{poll_timeout, Clock};
use bitflags::bitflags;
use core::fmt;
use log::{debug, warn};

// ============================================================================
// Clause 22 Registers
// ============================================================================

const MII_BMCR: u8 = 0x00;
const MII_BMSR: u8 = 0x01;
const MII_PHYSID1: u8 = 0x02;
const MII_PHYSID2: u8 = 0x03;
const MII_ADVERTISE: u8 = 0x04;
const MII_LPA: u8 = 0x05;
const MII_CTRL1000: u8 = 0x09;
const MII_STAT1000: u8 = 0x0A;
const MII_ESTATUS: u8 = 0x0F;

// BMCR bits
const BMCR_ANRESTART: u16 = 0x0200;
const BMCR_ISOLATE: u16 = 0x0400;
const BMCR_PDOWN: u16 = 0x0800;
const BMCR_ANENABLE: u16 = 0x1000;

// BMSR bits
const BMSR_LSTATUS: u16 = 0x0004;
const BMSR_ANEGCOMPLETE: u16 = 0x0020;
const BMSR_ESTATEN: u16 = 0x0100;
const BMSR_10HALF: u16 = 0x0800;
const BMSR_10FULL: u16 = 0x1000;
const BMSR_100HALF: u16 = 0x2000;
const BMSR_100FULL: u16 = 0x4000;

// ADVERTISE / LPA bits
const ADVERTISE_CSMA: u16 = 0x0001;
const ADVERTISE_10HALF: u16 = 0x0020;
const ADVERTISE_10FULL: u16 = 0x0040;
const ADVERTISE_100HALF: u16 = 0x0080;
const ADVERTISE_100FULL: u16 = 0x0100;
const ADVERTISE_ALL: u16 = ADVERTISE_10HALF | ADVERTISE_10FULL | ADVERTISE_100HALF | ADVERTISE_100FULL;

// CTRL1000 / STAT1000 bits (STAT1000 reports partner abilities 2 bits higher)
const ADVERTISE_1000HALF: u16 = 0x0100;
const ADVERTISE_1000FULL: u16 = 0x0200;

// ESTATUS bits
const ESTATUS_1000_THALF: u16 = 0x1000;
const ESTATUS_1000_TFULL: u16 = 0x2000;

/// Autonegotiation bound
pub const ANEG_TIMEOUT_US: u64 = 4_000_000;

const ANEG_POLL_INTERVAL_US: u64 = 1_000;

// ============================================================================
// Link State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speed {
    Speed10,
    Speed100,
    Speed1000,
}

impl Speed {
    pub const fn mbps(self) -> u32 {
        match self {
            Speed::Speed10 => 10,
            Speed::Speed100 => 100,
            Speed::Speed1000 => 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Duplex {
    Half,
    Full,
}

impl fmt::Display for Duplex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Duplex::Half => write!(f, "half"),
            Duplex::Full => write!(f, "full"),
        }
    }
}

/// Negotiation result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkState {
    pub speed: Speed,
    pub duplex: Duplex,
    pub up: bool,
}

impl LinkState {
    pub const fn up(speed: Speed, duplex: Duplex) -> Self {
        Self {
            speed,
            duplex,
            up: true,
        }
    }

    pub const fn down() -> Self {
        Self {
            speed: Speed::Speed10,
            duplex: Duplex::Half,
            up: false,
        }
    }
}

/// MAC-to-PHY interface (`phy-mode`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhyInterface {
    Mii,
    Gmii,
    Sgmii,
    Rmii,
    Rgmii,
    RgmiiId,
    RgmiiRxid,
    RgmiiTxid,
    Ncsi,
}

impl PhyInterface {
    pub fn from_name(name: &str) -> Option<Self> {
        let interface = match name {
            "mii" => PhyInterface::Mii,
            "gmii" => PhyInterface::Gmii,
            "sgmii" => PhyInterface::Sgmii,
            "rmii" => PhyInterface::Rmii,
            "rgmii" => PhyInterface::Rgmii,
            "rgmii-id" => PhyInterface::RgmiiId,
            "rgmii-rxid" => PhyInterface::RgmiiRxid,
            "rgmii-txid" => PhyInterface::RgmiiTxid,
            "NC-SI" => PhyInterface::Ncsi,
            _ => return None,
        };
        Some(interface)
    }

    /// RGMII in any of its delay variants
    pub const fn is_rgmii(self) -> bool {
        matches!(
            self,
            PhyInterface::Rgmii
                | PhyInterface::RgmiiId
                | PhyInterface::RgmiiRxid
                | PhyInterface::RgmiiTxid
        )
    }
}

// ============================================================================
// Negotiator Interface
// ============================================================================

/// Source of link state for the MAC
pub trait PhyNegotiator {
    /// Restrict and advertise link modes. `max_speed` is in Mbps, 0 for no
    /// limit.
    fn configure(&mut self, max_speed: u32) -> Result<(), NetError>;

    /// Wait for negotiation and report the result.
    ///
    /// A negotiation that does not finish in time is reported as link down,
    /// not as an error.
    fn startup(&mut self) -> Result<LinkState, NetError>;

    /// Result of the last `startup()`
    fn link_state(&self) -> Option<LinkState>;

    fn shutdown(&mut self) -> Result<(), NetError>;
}

impl<N: PhyNegotiator + ?Sized> PhyNegotiator for alloc::boxed::Box<N> {
    fn configure(&mut self, max_speed: u32) -> Result<(), NetError> {
        (**self).configure(max_speed)
    }

    fn startup(&mut self) -> Result<LinkState, NetError> {
        (**self).startup()
    }

    fn link_state(&self) -> Option<LinkState> {
        (**self).link_state()
    }

    fn shutdown(&mut self) -> Result<(), NetError> {
        (**self).shutdown()
    }
}

bitflags! {
    /// Link modes a PHY supports or advertises
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LinkModes: u8 {
        const HALF_10 = 1 << 0;
        const FULL_10 = 1 << 1;
        const HALF_100 = 1 << 2;
        const FULL_100 = 1 << 3;
        const HALF_1000 = 1 << 4;
        const FULL_1000 = 1 << 5;
    }
}

impl LinkModes {
    pub const GIGA: LinkModes = LinkModes::HALF_1000.union(LinkModes::FULL_1000);
    pub const FAST: LinkModes = LinkModes::HALF_100.union(LinkModes::FULL_100);

    /// Drop modes faster than `max_speed` Mbps (0 = no limit).
    pub fn limit(self, max_speed: u32) -> Result<Self, NetError> {
        match max_speed {
            0 | 1000 => Ok(self),
            100 => Ok(self - Self::GIGA),
            10 => Ok(self - Self::GIGA - Self::FAST),
            _ => Err(NetError::InvalidConfiguration),
        }
    }
}

// ============================================================================
// Generic Clause 22 PHY
// ============================================================================

pub struct GenericPhy<B, C> {
    bus: B,
    clock: C,
    addr: u8,
    id: u32,
    supported: LinkModes,
    advertising: LinkModes,
    gigabit: bool,
    link: Option<LinkState>,
}

impl<B: MdioBus, C: Clock> GenericPhy<B, C> {
    /// Identify the PHY at `addr` and read its abilities.
    pub fn probe(bus: B, clock: C, addr: u8) -> Result<Self, NetError> {
        let id1 = bus.read(addr, MII_PHYSID1)? as u32;
        let id2 = bus.read(addr, MII_PHYSID2)? as u32;
        let id = (id1 << 16) | id2;
        if id == 0 || id == 0xFFFF_FFFF {
            return Err(NetError::PhyNotFound);
        }

        let bmsr = bus.read(addr, MII_BMSR)?;
        let mut supported = LinkModes::empty();
        supported.set(LinkModes::HALF_10, bmsr & BMSR_10HALF != 0);
        supported.set(LinkModes::FULL_10, bmsr & BMSR_10FULL != 0);
        supported.set(LinkModes::HALF_100, bmsr & BMSR_100HALF != 0);
        supported.set(LinkModes::FULL_100, bmsr & BMSR_100FULL != 0);

        let gigabit = bmsr & BMSR_ESTATEN != 0;
        if gigabit {
            let estatus = bus.read(addr, MII_ESTATUS)?;
            supported.set(LinkModes::HALF_1000, estatus & ESTATUS_1000_THALF != 0);
            supported.set(LinkModes::FULL_1000, estatus & ESTATUS_1000_TFULL != 0);
        }

        debug!("phy@{}: id {:#010x} modes {:?}", addr, id, supported);

        Ok(Self {
            bus,
            clock,
            addr,
            id,
            supported,
            advertising: supported,
            gigabit,
            link: None,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn addr(&self) -> u8 {
        self.addr
    }

    pub fn supported(&self) -> LinkModes {
        self.supported
    }

    pub fn advertising(&self) -> LinkModes {
        self.advertising
    }

    fn read(&self, reg: u8) -> Result<u16, NetError> {
        self.bus.read(self.addr, reg)
    }

    fn write(&self, reg: u8, value: u16) -> Result<(), NetError> {
        self.bus.write(self.addr, reg, value)
    }

    fn write_advertisement(&self) -> Result<(), NetError> {
        let mut adv = self.read(MII_ADVERTISE)? & !ADVERTISE_ALL;
        adv |= ADVERTISE_CSMA;
        if self.advertising.contains(LinkModes::HALF_10) {
            adv |= ADVERTISE_10HALF;
        }
        if self.advertising.contains(LinkModes::FULL_10) {
            adv |= ADVERTISE_10FULL;
        }
        if self.advertising.contains(LinkModes::HALF_100) {
            adv |= ADVERTISE_100HALF;
        }
        if self.advertising.contains(LinkModes::FULL_100) {
            adv |= ADVERTISE_100FULL;
        }
        self.write(MII_ADVERTISE, adv)?;

        if self.gigabit {
            let mut ctrl1000 = self.read(MII_CTRL1000)? & !(ADVERTISE_1000HALF | ADVERTISE_1000FULL);
            if self.advertising.contains(LinkModes::HALF_1000) {
                ctrl1000 |= ADVERTISE_1000HALF;
            }
            if self.advertising.contains(LinkModes::FULL_1000) {
                ctrl1000 |= ADVERTISE_1000FULL;
            }
            self.write(MII_CTRL1000, ctrl1000)?;
        }
        Ok(())
    }

    fn restart_aneg(&self) -> Result<(), NetError> {
        let bmcr = self.read(MII_BMCR)?;
        let bmcr = (bmcr | BMCR_ANENABLE | BMCR_ANRESTART) & !(BMCR_ISOLATE | BMCR_PDOWN);
        self.write(MII_BMCR, bmcr)
    }

    /// Speed and duplex common to both ends, best first.
    fn resolve(&self) -> Result<LinkState, NetError> {
        if self.gigabit {
            let stat1000 = self.read(MII_STAT1000)?;
            let ctrl1000 = self.read(MII_CTRL1000)?;
            let common = (stat1000 >> 2) & ctrl1000;
            if common & ADVERTISE_1000FULL != 0 {
                return Ok(LinkState::up(Speed::Speed1000, Duplex::Full));
            }
            if common & ADVERTISE_1000HALF != 0 {
                return Ok(LinkState::up(Speed::Speed1000, Duplex::Half));
            }
        }

        let common = self.read(MII_LPA)? & self.read(MII_ADVERTISE)?;
        let link = if common & ADVERTISE_100FULL != 0 {
            LinkState::up(Speed::Speed100, Duplex::Full)
        } else if common & ADVERTISE_100HALF != 0 {
            LinkState::up(Speed::Speed100, Duplex::Half)
        } else if common & ADVERTISE_10FULL != 0 {
            LinkState::up(Speed::Speed10, Duplex::Full)
        } else {
            LinkState::up(Speed::Speed10, Duplex::Half)
        };
        Ok(link)
    }
}

impl<B: MdioBus, C: Clock> PhyNegotiator for GenericPhy<B, C> {
    fn configure(&mut self, max_speed: u32) -> Result<(), NetError> {
        self.advertising = self.supported.limit(max_speed)?;

        self.write_advertisement()?;
        self.restart_aneg()
    }

    fn startup(&mut self) -> Result<LinkState, NetError> {
        // Coming back from shutdown(): power up and renegotiate.
        if self.read(MII_BMCR)? & BMCR_PDOWN != 0 {
            self.restart_aneg()?;
        }

        let bus = &self.bus;
        let addr = self.addr;
        let negotiated = poll_timeout(&self.clock, ANEG_TIMEOUT_US, ANEG_POLL_INTERVAL_US, || {
            match bus.read(addr, MII_BMSR) {
                Ok(bmsr) if bmsr & BMSR_ANEGCOMPLETE == 0 => None,
                other => Some(other),
            }
        });

        let link = match negotiated {
            Err(_) => {
                warn!("phy@{}: autonegotiation timed out", self.addr);
                LinkState::down()
            }
            Ok(result) => {
                result?;
                // Link status is latched low: the first read clears a past drop.
                self.read(MII_BMSR)?;
                if self.read(MII_BMSR)? & BMSR_LSTATUS == 0 {
                    LinkState::down()
                } else {
                    self.resolve()?
                }
            }
        };

        self.link = Some(link);
        Ok(link)
    }

    fn link_state(&self) -> Option<LinkState> {
        self.link
    }

    fn shutdown(&mut self) -> Result<(), NetError> {
        let bmcr = self.read(MII_BMCR)?;
        self.write(MII_BMCR, bmcr | BMCR_PDOWN)?;
        self.link = None;
        Ok(())
    }
}

// ============================================================================
// NC-SI Sideband
// ============================================================================

/// Link owned by a management controller over NC-SI
///
/// The MAC talks to the BMC's RMII port at a fixed rate; there is no PHY to
/// negotiate with or power down.
#[derive(Debug, Default)]
pub struct SidebandLink {
    link: Option<LinkState>,
}

impl SidebandLink {
    pub const LINK: LinkState = LinkState::up(Speed::Speed100, Duplex::Full);

    pub fn new() -> Self {
        Self { link: None }
    }
}

impl PhyNegotiator for SidebandLink {
    fn configure(&mut self, _max_speed: u32) -> Result<(), NetError> {
        Ok(())
    }

    fn startup(&mut self) -> Result<LinkState, NetError> {
        self.link = Some(Self::LINK);
        Ok(Self::LINK)
    }

    fn link_state(&self) -> Option<LinkState> {
        self.link
    }

    fn shutdown(&mut self) -> Result<(), NetError> {
        Ok(())
    }
}
