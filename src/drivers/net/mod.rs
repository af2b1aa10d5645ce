//! Network device drivers and abstractions
//!
//! - [`netdev`]: the packet interface every driver implements
//! - [`ethernet`]: MAC drivers
//! - [`mdio`] and [`phy`]: PHY management
//! - [`registry`]: probed devices, by index
//! - [`iface`]: smoltcp adapter

pub mod ethernet;
pub mod iface;
pub mod mdio;
pub mod netdev;
pub mod phy;
pub mod registry;

pub use netdev::*;
