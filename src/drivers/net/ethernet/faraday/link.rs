//! Link state to MAC operating mode
//!
//! The MAC has to be told the speed and duplex the PHY settled on. Only
//! three MACCR bits are involved and everything else in the register is left
//! as found, so applying the same state twice is harmless.

use super::regs::{Maccr, MACCR};
use crate::drivers::mmio::RegisterBus;
use crate::drivers::net::netdev::NetError;
use crate::drivers::net::phy::{Duplex, LinkState, PhyInterface, Speed};
use log::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkController {
    interface: PhyInterface,
    link_less: bool,
}

impl LinkController {
    /// `link_less` devices (NC-SI) run without a PHY-reported link.
    pub const fn new(interface: PhyInterface, link_less: bool) -> Self {
        Self {
            interface,
            link_less,
        }
    }

    pub const fn interface(&self) -> PhyInterface {
        self.interface
    }

    pub const fn is_link_less(&self) -> bool {
        self.link_less
    }

    /// MACCR with the link-mode bits recomputed for `link`.
    pub fn mode_bits(&self, maccr: Maccr, link: &LinkState) -> Maccr {
        let mut maccr = maccr - Maccr::LINK_MODE;

        // GIGA_MODE selects the RGMII gigabit datapath only.
        if self.interface.is_rgmii() && link.speed == Speed::Speed1000 {
            maccr |= Maccr::GIGA_MODE;
        }
        if link.speed == Speed::Speed100 {
            maccr |= Maccr::FAST_MODE;
        }
        if link.duplex == Duplex::Full {
            maccr |= Maccr::FULLDUP;
        }
        maccr
    }

    /// Program MACCR for `link`.
    ///
    /// With no link (and a PHY that should provide one) the register is left
    /// untouched and `NoLink` returned.
    pub fn apply<R: RegisterBus>(&self, regs: &R, link: &LinkState) -> Result<(), NetError> {
        if !link.up && !self.link_less {
            error!("ftgmac100: No link");
            return Err(NetError::NoLink);
        }

        let maccr = Maccr::from_bits_retain(regs.read32(MACCR));
        regs.write32(MACCR, self.mode_bits(maccr, link).bits());
        Ok(())
    }
}
