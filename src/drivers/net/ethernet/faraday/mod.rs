//! Faraday FTGMAC100 Ethernet Controller Driver
//!
//! Gigabit MAC found on ASPEED BMC SoCs (AST2400, AST2500, AST2600) and in
//! Faraday's own IP core. Polled operation only: four TX and four RX
//! descriptors by default, one frame per descriptor.
//!
//! # Layout
//!
//! - [`regs`]: register map and MIB counters
//! - [`descriptor`]: TX/RX descriptor formats
//! - [`ring`]: descriptor ring with the software index
//! - [`engine`]: [`RingEngine`], the DMA ownership handshake
//! - [`link`]: negotiated link state to MACCR mode bits
//! - [`mdio`]: PHY management through PHYCR/PHYDATA
//! - [`config`]: model variants and per-device settings
//!
//! # References
//!
//! - U-Boot: drivers/net/ftgmac100.c
//! - Linux: drivers/net/ethernet/faraday/ftgmac100.c

pub mod config;
pub mod descriptor;
pub mod engine;
pub mod link;
pub mod mdio;
pub mod regs;
pub mod ring;

pub use config::{DeviceConfig, EndOfRing, Model, COMPATIBLES};
pub use engine::{EngineState, RingEngine};
pub use link::LinkController;
pub use mdio::FaradayMdio;
pub use regs::MacCounters;

pub use crate::drivers::net::phy::{LinkState, PhyInterface};

use crate::drivers::Platform;
use crate::drivers::mmio::Mmio;
use crate::drivers::net::mdio::aspeed::AspeedMdio;
use crate::drivers::net::netdev::{NetError, NetworkDevice, RxFrame, RxHandle};
use crate::drivers::net::phy::{GenericPhy, PhyNegotiator, SidebandLink};
use crate::mm::dma::DmaRegion;
use crate::net::ethernet::MacAddress;
use alloc::boxed::Box;
use log::{error, info};

/// One FTGMAC100 instance: ring engine, PHY backend and link controller.
pub struct Ftgmac100<P, const TX: usize = 4, const RX: usize = 4> {
    config: DeviceConfig,
    engine: RingEngine<P, TX, RX>,
    link: LinkController,
    phy: Box<dyn PhyNegotiator + Send>,
    link_state: Option<LinkState>,
}

impl<P, const TX: usize, const RX: usize> Ftgmac100<P, TX, RX>
where
    P: Platform + Clone + Send + 'static,
{
    /// Set up the device described by `config`, picking the PHY backend:
    /// NC-SI sideband, external PHY over the AST2600 MDIO block, or external
    /// PHY over the MAC's own PHYCR.
    ///
    /// `platform` must address the MAC's register block at `config.base`.
    ///
    /// # Safety
    ///
    /// `config.mdio_base`, when set, must be the mapped MDIO register block.
    pub unsafe fn probe(
        config: DeviceConfig,
        platform: P,
        region: DmaRegion,
        mac: MacAddress,
    ) -> Result<Self, NetError> {
        info!("ftgmac100: {:?} at {:#x}", config.model, config.base);

        let phy: Box<dyn PhyNegotiator + Send> = if config.sideband {
            info!("ftgmac100: NCSI detected");
            Box::new(SidebandLink::new())
        } else if config.model.has_standalone_mdio() {
            let base = config.mdio_base.ok_or_else(|| {
                error!("ftgmac100: missing MDIO block");
                NetError::InvalidConfiguration
            })?;
            // SAFETY: forwarded from the caller.
            let regs = unsafe { Mmio::new(base) };
            let bus = AspeedMdio::new(regs, platform.clone());
            Box::new(GenericPhy::probe(bus, platform.clone(), config.phy_addr)?)
        } else {
            let bus = FaradayMdio::new(platform.clone());
            Box::new(GenericPhy::probe(bus, platform.clone(), config.phy_addr)?)
        };

        Self::with_phy(config, platform, region, mac, phy)
    }

    /// Set up the device with an already probed PHY backend.
    pub fn with_phy(
        config: DeviceConfig,
        platform: P,
        region: DmaRegion,
        mac: MacAddress,
        mut phy: Box<dyn PhyNegotiator + Send>,
    ) -> Result<Self, NetError> {
        phy.configure(config.max_speed)
            .inspect_err(|e| error!("ftgmac100: failed to initialize PHY: {}", e))?;

        let engine = RingEngine::new(platform, region, config.model, mac)?;
        let link = LinkController::new(config.interface, config.sideband);

        Ok(Self {
            config,
            engine,
            link,
            phy,
            link_state: None,
        })
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn engine(&self) -> &RingEngine<P, TX, RX> {
        &self.engine
    }

    pub fn counters(&self) -> MacCounters {
        self.engine.counters()
    }

    /// Stop the device and hand back its DMA window.
    pub fn remove(mut self) -> DmaRegion {
        if self.engine.state() == EngineState::Started {
            self.stop();
        }
        self.engine.into_region()
    }
}

impl<P, const TX: usize, const RX: usize> NetworkDevice for Ftgmac100<P, TX, RX>
where
    P: Platform + Clone + Send + 'static,
{
    fn start(&mut self) -> Result<(), NetError> {
        self.link_state = None;
        let state = self.engine.start(&mut self.phy, &self.link)?;
        self.link_state = Some(state);
        Ok(())
    }

    fn stop(&mut self) {
        self.engine.stop(&mut self.phy, &self.link);
        self.link_state = None;
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), NetError> {
        self.engine.send(frame)
    }

    fn receive(&mut self) -> Result<RxFrame<'_>, NetError> {
        self.engine.receive()
    }

    fn release(&mut self, handle: RxHandle) -> Result<(), NetError> {
        self.engine.release(handle)
    }

    fn set_mac_address(&mut self, mac: MacAddress) -> Result<(), NetError> {
        self.engine.set_mac_address(mac);
        Ok(())
    }

    fn mac_address(&self) -> MacAddress {
        self.engine.mac_address()
    }

    fn link_state(&self) -> Option<LinkState> {
        self.link_state
    }
}
