//! MAC-integrated MDIO (PHYCR / PHYDATA)
//!
//! Used by the Faraday IP and the AST2400/AST2500. Each transaction writes a
//! command into PHYCR and waits for the hardware to clear the command bit.

use super::regs::{
    phycr_mdc_cycthr, phycr_phyad, phycr_regad, phydata_miirdata, phydata_miiwdata, MDC_CYCTHR,
    PHYCR, PHYCR_MIIRD, PHYCR_MIIWR, PHYDATA,
};
use crate::drivers::mmio::RegisterBus;
use crate::drivers::net::mdio::{wait_mdio, MdioBus};
use crate::drivers::net::netdev::NetError;
use crate::time::Clock;

pub struct FaradayMdio<P> {
    mac: P,
}

impl<P: RegisterBus + Clock> FaradayMdio<P> {
    /// `mac` is the MAC's own register block.
    pub fn new(mac: P) -> Self {
        Self { mac }
    }

    fn command(phy: u8, reg: u8, op: u32) -> u32 {
        phycr_mdc_cycthr(MDC_CYCTHR) | phycr_phyad(phy as u32) | phycr_regad(reg as u32) | op
    }
}

impl<P: RegisterBus + Clock> MdioBus for FaradayMdio<P> {
    fn read(&self, phy: u8, reg: u8) -> Result<u16, NetError> {
        self.mac.write32(PHYCR, Self::command(phy, reg, PHYCR_MIIRD));
        wait_mdio(&self.mac, "read", phy, reg, || {
            self.mac.read32(PHYCR) & PHYCR_MIIRD == 0
        })?;

        Ok(phydata_miirdata(self.mac.read32(PHYDATA)) as u16)
    }

    fn write(&self, phy: u8, reg: u8, value: u16) -> Result<(), NetError> {
        self.mac.write32(PHYDATA, phydata_miiwdata(value as u32));
        self.mac.write32(PHYCR, Self::command(phy, reg, PHYCR_MIIWR));
        wait_mdio(&self.mac, "write", phy, reg, || {
            self.mac.read32(PHYCR) & PHYCR_MIIWR == 0
        })
    }
}
