//! Probed network devices
//!
//! Boot code probes each Ethernet node once, registers the device here and
//! refers to it by index afterwards. Indices stay stable for the lifetime of
//! a registration; a removed device leaves its slot empty.

use super::netdev::NetworkDevice;
use alloc::boxed::Box;
use alloc::vec::Vec;
use lazy_static::lazy_static;
use log::info;
use spin::Mutex;

pub type BoxedDevice = Box<dyn NetworkDevice + Send>;

#[derive(Default)]
pub struct DeviceRegistry {
    slots: Vec<Option<BoxedDevice>>,
}

impl DeviceRegistry {
    pub const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Add a device, returning its index.
    pub fn register(&mut self, dev: BoxedDevice) -> usize {
        let index = match self.slots.iter().position(Option::is_none) {
            Some(free) => {
                self.slots[free] = Some(dev);
                free
            }
            None => {
                self.slots.push(Some(dev));
                self.slots.len() - 1
            }
        };
        info!("eth{}: registered", index);
        index
    }

    /// Take a device out of the registry. The caller decides whether to stop
    /// it first.
    pub fn unregister(&mut self, index: usize) -> Option<BoxedDevice> {
        self.slots.get_mut(index)?.take()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut (dyn NetworkDevice + Send + '_)> {
        match self.slots.get_mut(index)? {
            Some(dev) => Some(&mut **dev),
            None => None,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop every device, e.g. before handing the machine to an OS.
    pub fn stop_all(&mut self) {
        for dev in self.slots.iter_mut().flatten() {
            dev.stop();
        }
    }
}

lazy_static! {
    /// Devices registered by board setup code
    pub static ref NETDEVS: Mutex<DeviceRegistry> = Mutex::new(DeviceRegistry::new());
}

pub fn register(dev: BoxedDevice) -> usize {
    NETDEVS.lock().register(dev)
}

pub fn unregister(index: usize) -> Option<BoxedDevice> {
    NETDEVS.lock().unregister(index)
}

/// Run `f` on the device at `index` with the registry locked.
pub fn with_device<R>(index: usize, f: impl FnOnce(&mut (dyn NetworkDevice + Send)) -> R) -> Option<R> {
    let mut netdevs = NETDEVS.lock();
    netdevs.get_mut(index).map(f)
}

pub fn count() -> usize {
    NETDEVS.lock().len()
}

pub fn stop_all() {
    NETDEVS.lock().stop_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::net::ethernet::faraday::{DeviceConfig, Ftgmac100, Model, PhyInterface};
    use crate::net::ethernet::MacAddress;
    use crate::sim::Sim;

    fn device(sim: &Sim) -> BoxedDevice {
        let config = DeviceConfig::new(Model::Aspeed, 0x1E66_0000, PhyInterface::Ncsi);
        let mac = MacAddress::new([0x02, 0, 0, 0, 0, 1]);
        Box::new(unsafe { Ftgmac100::<Sim>::probe(config, sim.clone(), sim.region(), mac) }.unwrap())
    }

    #[test]
    fn test_register_and_lookup() {
        let sim = Sim::new(Model::Aspeed);
        let mut registry = DeviceRegistry::new();

        let index = registry.register(device(&sim));

        assert_eq!(index, 0);
        assert_eq!(registry.len(), 1);
        let dev = registry.get_mut(index).unwrap();
        dev.start().unwrap();
        assert!(dev.link_up());
        assert!(registry.get_mut(1).is_none());
    }

    #[test]
    fn test_unregister_frees_slot() {
        let (a, b) = (Sim::new(Model::Aspeed), Sim::new(Model::Aspeed));
        let mut registry = DeviceRegistry::new();
        registry.register(device(&a));
        registry.register(device(&b));

        assert!(registry.unregister(0).is_some());
        assert!(registry.unregister(0).is_none());
        assert_eq!(registry.len(), 1);

        // Index 1 is untouched; the free slot is reused.
        assert!(registry.get_mut(1).is_some());
        assert_eq!(registry.register(device(&a)), 0);
    }

    #[test]
    fn test_global_registry_runs_closure_on_device() {
        let sim = Sim::new(Model::Aspeed);
        let index = register(device(&sim));

        assert_eq!(with_device(index, |dev| dev.start()), Some(Ok(())));
        assert_eq!(with_device(index, |dev| dev.link_up()), Some(true));

        let dev = unregister(index).unwrap();
        assert!(dev.link_up());
        assert_eq!(with_device(index, |dev| dev.link_up()), None);
    }

    #[test]
    fn test_stop_all() {
        let sim = Sim::new(Model::Aspeed);
        let mut registry = DeviceRegistry::new();
        let index = registry.register(device(&sim));
        registry.get_mut(index).unwrap().start().unwrap();

        registry.stop_all();

        assert!(!registry.get_mut(index).unwrap().link_up());
        assert_eq!(sim.reg(crate::drivers::net::ethernet::faraday::regs::MACCR), 0);
    }
}
