//! ASPEED AST2600 MDIO controller
//!
//! The AST2600 moves PHY management out of the MAC into a small standalone
//! block (the MAC node's second `reg` window):
//!
//! ```text
//! 0x0 CTRL  [31] FIRE  [28] ST (1 = clause 22)  [27:26] OP
//!           [25:21] PHYAD  [20:16] REGAD  [15:0] write data
//! 0x4 DATA  [16] IDLE  [15:0] read data
//! ```

use super::{wait_mdio, MdioBus};
use crate::drivers::mmio::RegisterBus;
use crate::drivers::net::netdev::NetError;
use crate::time::Clock;

const CTRL: usize = 0x0;
const DATA: usize = 0x4;

const CTRL_FIRE: u32 = 1 << 31;
const CTRL_ST_C22: u32 = 1 << 28;
const CTRL_OP_WRITE: u32 = 0b01 << 26;
const CTRL_OP_READ: u32 = 0b10 << 26;

const DATA_IDLE: u32 = 1 << 16;

const fn ctrl_phyad(phy: u8) -> u32 {
    (phy as u32 & 0x1F) << 21
}

const fn ctrl_regad(reg: u8) -> u32 {
    (reg as u32 & 0x1F) << 16
}

pub struct AspeedMdio<R, C> {
    regs: R,
    clock: C,
}

impl<R: RegisterBus, C: Clock> AspeedMdio<R, C> {
    pub fn new(regs: R, clock: C) -> Self {
        Self { regs, clock }
    }

    fn fire(&self, op: &str, phy: u8, reg: u8, ctrl: u32) -> Result<(), NetError> {
        self.regs.write32(CTRL, ctrl);
        wait_mdio(&self.clock, op, phy, reg, || self.regs.read32(CTRL) & CTRL_FIRE == 0)
    }
}

impl<R: RegisterBus, C: Clock> MdioBus for AspeedMdio<R, C> {
    fn read(&self, phy: u8, reg: u8) -> Result<u16, NetError> {
        let ctrl = CTRL_FIRE | CTRL_ST_C22 | CTRL_OP_READ | ctrl_phyad(phy) | ctrl_regad(reg);
        self.fire("read", phy, reg, ctrl)?;

        wait_mdio(&self.clock, "read", phy, reg, || {
            self.regs.read32(DATA) & DATA_IDLE != 0
        })?;
        Ok((self.regs.read32(DATA) & 0xFFFF) as u16)
    }

    fn write(&self, phy: u8, reg: u8, value: u16) -> Result<(), NetError> {
        let ctrl = CTRL_FIRE
            | CTRL_ST_C22
            | CTRL_OP_WRITE
            | ctrl_phyad(phy)
            | ctrl_regad(reg)
            | value as u32;
        self.fire("write", phy, reg, ctrl)
    }
}
