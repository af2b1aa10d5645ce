//! Per-device configuration
//!
//! Plain data, normally filled from the device tree (see
//! [`DeviceConfig::from_fdt`](crate::dt)) but constructible directly for
//! boards that hard-code their Ethernet wiring.

use crate::drivers::net::phy::PhyInterface;

/// Device tree compatible strings handled by this driver
pub const COMPATIBLES: [(&str, Model); 4] = [
    ("faraday,ftgmac100", Model::Faraday),
    ("aspeed,ast2400-mac", Model::Aspeed),
    ("aspeed,ast2500-mac", Model::Aspeed),
    ("aspeed,ast2600-mac", Model::NewAspeed),
];

/// MAC variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model {
    /// Original Faraday IP
    Faraday,
    /// ASPEED AST2400 / AST2500
    Aspeed,
    /// ASPEED AST2600: moved end-of-ring bit, MDIO in a separate block
    NewAspeed,
}

impl Model {
    pub fn from_compatible(compatible: &str) -> Option<Self> {
        COMPATIBLES
            .iter()
            .find(|(name, _)| *name == compatible)
            .map(|&(_, model)| model)
    }

    pub const fn end_of_ring(self) -> EndOfRing {
        match self {
            Model::Faraday => EndOfRing(1 << 15),
            Model::Aspeed | Model::NewAspeed => EndOfRing(1 << 30),
        }
    }

    /// Whether PHY management goes through the standalone MDIO block
    pub const fn has_standalone_mdio(self) -> bool {
        matches!(self, Model::NewAspeed)
    }
}

/// Descriptor word 0 bit marking the last slot of a ring (EDOTR / EDORR).
///
/// Same position in both directions for a given model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndOfRing(u32);

impl EndOfRing {
    pub const fn mask(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    pub model: Model,
    /// MAC register block
    pub base: usize,
    pub interface: PhyInterface,
    pub phy_addr: u8,
    /// Mbps; 0 means no limit below the MAC's own
    pub max_speed: u32,
    /// Link managed over NC-SI: no MDIO, no PHY power control
    pub sideband: bool,
    /// Standalone MDIO block (AST2600)
    pub mdio_base: Option<usize>,
}

impl DeviceConfig {
    pub fn new(model: Model, base: usize, interface: PhyInterface) -> Self {
        Self {
            model,
            base,
            interface,
            phy_addr: 0,
            max_speed: 0,
            sideband: interface == PhyInterface::Ncsi,
            mdio_base: None,
        }
    }

    pub fn end_of_ring(&self) -> EndOfRing {
        self.model.end_of_ring()
    }
}
