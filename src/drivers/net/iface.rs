//! smoltcp glue
//!
//! [`SmolDevice`] exposes any started [`NetworkDevice`] as a
//! `smoltcp::phy::Device`, so a boot loader can run DHCP or TFTP straight on
//! top of the ring engine. Received frames are copied out of the DMA buffer
//! and the slot released before smoltcp sees them.

use super::netdev::{NetError, NetworkDevice};
use alloc::vec;
use alloc::vec::Vec;
use log::warn;
use smoltcp::phy::{self, DeviceCapabilities, Medium};
use smoltcp::time::Instant;

/// Largest frame smoltcp may hand us: 1500 byte payload plus the header.
pub const ETHERNET_MTU: usize = 1514;

pub struct SmolDevice<D> {
    dev: D,
}

impl<D: NetworkDevice> SmolDevice<D> {
    pub fn new(dev: D) -> Self {
        Self { dev }
    }

    pub fn inner(&self) -> &D {
        &self.dev
    }

    pub fn inner_mut(&mut self) -> &mut D {
        &mut self.dev
    }

    pub fn into_inner(self) -> D {
        self.dev
    }

    fn take_frame(&mut self) -> Option<Vec<u8>> {
        let (frame, handle) = match self.dev.receive() {
            Ok(rx) => (rx.data().to_vec(), rx.handle()),
            Err(NetError::NoFrameAvailable) => return None,
            Err(e) => {
                warn!("smoltcp: receive failed: {}", e);
                return None;
            }
        };

        if let Err(e) = self.dev.release(handle) {
            warn!("smoltcp: release failed: {}", e);
        }
        Some(frame)
    }
}

impl<D: NetworkDevice> phy::Device for SmolDevice<D> {
    type RxToken<'a>
        = RxToken
    where
        Self: 'a;

    type TxToken<'a>
        = TxToken<'a, D>
    where
        Self: 'a;

    fn receive(&mut self, _timestamp: Instant) -> Option<(Self::RxToken<'_>, Self::TxToken<'_>)> {
        let frame = self.take_frame()?;
        Some((RxToken(frame), TxToken(&mut self.dev)))
    }

    fn transmit(&mut self, _timestamp: Instant) -> Option<Self::TxToken<'_>> {
        self.dev.link_up().then(|| TxToken(&mut self.dev))
    }

    fn capabilities(&self) -> DeviceCapabilities {
        let mut caps = DeviceCapabilities::default();
        caps.medium = Medium::Ethernet;
        caps.max_transmission_unit = ETHERNET_MTU;
        // One TX descriptor is in flight at a time.
        caps.max_burst_size = Some(1);
        caps
    }
}

pub struct RxToken(Vec<u8>);

impl phy::RxToken for RxToken {
    fn consume<R, F>(mut self, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        f(&mut self.0)
    }
}

pub struct TxToken<'a, D>(&'a mut D);

impl<D: NetworkDevice> phy::TxToken for TxToken<'_, D> {
    fn consume<R, F>(self, len: usize, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        let mut frame = vec![0; len];
        let result = f(&mut frame);
        if let Err(e) = self.0.send(&frame) {
            warn!("smoltcp: transmit failed: {}", e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::net::ethernet::faraday::{DeviceConfig, Ftgmac100, Model, PhyInterface};
    use crate::net::ethernet::MacAddress;
    use crate::sim::Sim;
    use smoltcp::phy::{Device, RxToken as _, TxToken as _};

    fn device(sim: &Sim) -> SmolDevice<Ftgmac100<Sim>> {
        let config = DeviceConfig::new(Model::Aspeed, 0x1E66_0000, PhyInterface::Ncsi);
        let mac = MacAddress::new([0x02, 0, 0, 0, 0, 1]);
        SmolDevice::new(unsafe { Ftgmac100::probe(config, sim.clone(), sim.region(), mac) }.unwrap())
    }

    #[test]
    fn test_capabilities() {
        let sim = Sim::new(Model::Aspeed);
        let caps = device(&sim).capabilities();

        assert_eq!(caps.medium, Medium::Ethernet);
        assert_eq!(caps.max_transmission_unit, 1514);
        assert_eq!(caps.max_burst_size, Some(1));
    }

    #[test]
    fn test_no_tokens_before_start() {
        let sim = Sim::new(Model::Aspeed);
        let mut dev = device(&sim);

        assert!(dev.transmit(Instant::from_millis(0)).is_none());
        assert!(dev.receive(Instant::from_millis(0)).is_none());
    }

    #[test]
    fn test_receive_copies_and_releases() {
        let sim = Sim::new(Model::Aspeed);
        let mut dev = device(&sim);
        dev.inner_mut().start().unwrap();
        sim.deliver(&[0x11; 64], 0);

        let len = {
            let (rx, _) = dev.receive(Instant::from_millis(0)).unwrap();
            rx.consume(|frame| {
                assert!(frame.iter().all(|&b| b == 0x11));
                frame.len()
            })
        };

        assert_eq!(len, 64);
        assert_eq!(dev.inner().engine().rx_index(), 1);
        assert!(dev.receive(Instant::from_millis(0)).is_none());
    }

    #[test]
    fn test_transmit_sends_filled_frame() {
        let sim = Sim::new(Model::Aspeed);
        let mut dev = device(&sim);
        dev.inner_mut().start().unwrap();

        let tx = dev.transmit(Instant::from_millis(0)).unwrap();
        tx.consume(100, |frame| frame.fill(0x77));

        let sent = sim.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], vec![0x77; 100]);
    }
}
