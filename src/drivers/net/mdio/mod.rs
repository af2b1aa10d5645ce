//! MII management (MDIO) bus
//!
//! Clause 22 register access to PHYs. Implementations:
//!
//! - `ethernet::faraday::FaradayMdio` - PHYCR/PHYDATA inside the MAC
//! - [`aspeed::AspeedMdio`] - standalone controller on the AST2600

pub mod aspeed;

use crate::drivers::net::netdev::NetError;
use crate::time::{poll_timeout, Clock};
use alloc::boxed::Box;
use log::error;

/// Bound on a single MDIO transaction
pub const MDIO_TIMEOUT_US: u64 = 10_000;

const MDIO_POLL_INTERVAL_US: u64 = 10;

/// Clause 22 MDIO access
///
/// Failures are reported once and never retried.
pub trait MdioBus {
    fn read(&self, phy: u8, reg: u8) -> Result<u16, NetError>;

    fn write(&self, phy: u8, reg: u8, value: u16) -> Result<(), NetError>;
}

impl<B: MdioBus + ?Sized> MdioBus for Box<B> {
    fn read(&self, phy: u8, reg: u8) -> Result<u16, NetError> {
        (**self).read(phy, reg)
    }

    fn write(&self, phy: u8, reg: u8, value: u16) -> Result<(), NetError> {
        (**self).write(phy, reg, value)
    }
}

/// Wait for `done` within the MDIO bound, logging on expiry.
pub(crate) fn wait_mdio<C, F>(clock: &C, op: &str, phy: u8, reg: u8, mut done: F) -> Result<(), NetError>
where
    C: Clock + ?Sized,
    F: FnMut() -> bool,
{
    poll_timeout(clock, MDIO_TIMEOUT_US, MDIO_POLL_INTERVAL_US, || done().then_some(())).map_err(
        |_| {
            error!("mdio {} failed (phy:{} reg:{:x})", op, phy, reg);
            NetError::MdioTimeout { phy, reg }
        },
    )
}
