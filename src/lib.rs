//! FTGMAC100 Ethernet packet engine for pre-OS boot environments
//!
//! Drives the Faraday FTGMAC100 MAC (and the ASPEED AST2400/AST2500/AST2600
//! derivatives) over polled DMA descriptor rings. There is no interrupt
//! handler: every transmit, receive and PHY transaction runs to completion
//! (or to a bounded timeout) on the caller's thread.
//!
//! The crate is `no_std` + `alloc`. Everything that touches the platform goes
//! through three seams so the same engine runs on real hardware and against
//! the in-crate simulator used by the tests:
//!
//! - [`drivers::mmio::RegisterBus`] - 32-bit register access
//! - [`mm::cache::CacheMaintenance`] - data cache clean/invalidate
//! - [`time::Clock`] - microsecond time base and busy-wait delay

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod arch;
pub mod drivers;
pub mod dt;
pub mod mm;
pub mod net;
pub mod time;

#[cfg(test)]
mod sim;

pub use drivers::net::ethernet::faraday::{
    DeviceConfig, Ftgmac100, LinkController, Model, RingEngine,
};
pub use drivers::net::netdev::{NetError, NetworkDevice, RxFrame, RxHandle};
pub use drivers::net::phy::{LinkState, PhyInterface};
pub use drivers::{Board, Platform};
pub use mm::dma::{DmaAddr, DmaRegion};
pub use net::ethernet::MacAddress;
