//! Device Tree Discovery
//!
//! Finds FTGMAC100 nodes in a flattened device tree (FDT/DTB) and turns
//! their properties into a [`DeviceConfig`].
//!
//! # Properties
//!
//! | Property            | Meaning                                          |
//! |---------------------|--------------------------------------------------|
//! | `compatible`        | selects the [`Model`]                            |
//! | `reg`               | MAC window; second window is the AST2600 MDIO    |
//! | `phy-mode`          | required; `"NC-SI"` selects sideband operation   |
//! | `use-ncsi`          | sideband operation regardless of `phy-mode`      |
//! | `phy-handle`        | PHY node whose `reg` is the MDIO address         |
//! | `max-speed`         | cap on the advertised speed, Mbps                |
//! | `local-mac-address` | station address, `mac-address` as fallback       |
//! | `status`            | nodes other than `"okay"` are skipped            |
//!
//! ASPEED SoCs place the MACs under a bus with `#address-cells = <1>` and
//! `#size-cells = <1>`, which is what `reg` decoding assumes.
//!
//! # Usage Pattern
//!
//! ```ignore
//! let node = unsafe { dt::find_ethernet(dtb, 0)? };
//! let mac = node.mac.unwrap_or(DEFAULT_MAC);
//! let dev = unsafe { Ftgmac100::probe(node.config, board, region, mac)? };
//! ```
//!
//! # References
//!
//! - [Devicetree Specification](https://devicetree-specification.readthedocs.io/)
//! - Linux: Documentation/devicetree/bindings/net/faraday,ftgmac100.yaml

use crate::drivers::net::ethernet::faraday::{DeviceConfig, Model};
use crate::drivers::net::phy::PhyInterface;
use crate::net::ethernet::MacAddress;
use core::fmt;
use fdt_rs::base::{DevTree, DevTreeNode, DevTreeProp};
use fdt_rs::prelude::*;
use log::{debug, error};

const ADDRESS_CELLS: usize = 1;
const SIZE_CELLS: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtError {
    /// Not a parsable device tree blob
    BadBlob,
    /// No enabled FTGMAC100 node with that index
    NotFound,
    MissingProperty(&'static str),
    /// `phy-mode` names no known interface
    BadPhyMode,
    /// `phy-handle` points at no node, or one without `reg`
    BadPhyHandle,
}

impl fmt::Display for DtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DtError::BadBlob => write!(f, "invalid device tree blob"),
            DtError::NotFound => write!(f, "no ftgmac100 node"),
            DtError::MissingProperty(name) => write!(f, "missing property '{}'", name),
            DtError::BadPhyMode => write!(f, "invalid PHY interface"),
            DtError::BadPhyHandle => write!(f, "invalid phy-handle"),
        }
    }
}

/// An FTGMAC100 node as described by the device tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetNode {
    pub config: DeviceConfig,
    /// Station address, if the tree carries a valid one
    pub mac: Option<MacAddress>,
}

/// Find the `n`-th enabled FTGMAC100 node.
///
/// # Safety
///
/// `dtb` must hold a complete device tree blob.
pub unsafe fn find_ethernet(dtb: &[u8], n: usize) -> Result<EthernetNode, DtError> {
    // SAFETY: forwarded from the caller.
    let dt = unsafe { DevTree::new(dtb) }.map_err(|_| DtError::BadBlob)?;

    let mut found = 0;
    let mut nodes = dt.nodes();
    while let Ok(Some(node)) = nodes.next() {
        let Some(model) = node_model(&node) else {
            continue;
        };
        let status = find_property(&node, "status").and_then(|p| p.str().ok());
        if !is_enabled(status) {
            continue;
        }

        if found == n {
            return ethernet_node(&dt, &node, model);
        }
        found += 1;
    }
    Err(DtError::NotFound)
}

impl DeviceConfig {
    /// Configuration of the first enabled FTGMAC100 node.
    ///
    /// # Safety
    ///
    /// `dtb` must hold a complete device tree blob.
    pub unsafe fn from_fdt(dtb: &[u8]) -> Result<Self, DtError> {
        // SAFETY: forwarded from the caller.
        unsafe { find_ethernet(dtb, 0) }.map(|node| node.config)
    }
}

fn ethernet_node(dt: &DevTree, node: &DevTreeNode, model: Model) -> Result<EthernetNode, DtError> {
    let name = node.name().unwrap_or("ethernet");

    let reg = find_property(node, "reg").ok_or(DtError::MissingProperty("reg"))?;
    let base = reg_address(|i| reg.u32(i).ok(), 0).ok_or(DtError::MissingProperty("reg"))?;

    let phy_mode = find_property(node, "phy-mode").and_then(|p| p.str().ok());
    let use_ncsi = find_property(node, "use-ncsi").is_some();
    let interface = interface_of(phy_mode, use_ncsi).inspect_err(|_| {
        error!("{}: Invalid PHY interface '{}'", name, phy_mode.unwrap_or(""));
    })?;

    let mut config = DeviceConfig::new(model, base, interface);
    config.sideband = use_ncsi || interface == PhyInterface::Ncsi;

    if let Some(handle) = find_property(node, "phy-handle") {
        let phandle = handle.u32(0).map_err(|_| DtError::BadPhyHandle)?;
        config.phy_addr = phy_address(dt, phandle)?;
    }

    config.max_speed = find_property(node, "max-speed")
        .and_then(|p| p.u32(0).ok())
        .unwrap_or(0);

    if model.has_standalone_mdio() {
        config.mdio_base = reg_address(|i| reg.u32(i).ok(), 1);
        debug!("{}: mdio at {:x?}", name, config.mdio_base);
    }

    let mac = find_property(node, "local-mac-address")
        .or_else(|| find_property(node, "mac-address"))
        .and_then(|p| mac_from_bytes(p.raw()));

    debug!("{}: {:?}", name, config);
    Ok(EthernetNode { config, mac })
}

/// `reg` of the node whose `phandle` is `phandle`
fn phy_address(dt: &DevTree, phandle: u32) -> Result<u8, DtError> {
    let mut nodes = dt.nodes();
    while let Ok(Some(node)) = nodes.next() {
        let matches = find_property(&node, "phandle")
            .and_then(|p| p.u32(0).ok())
            .is_some_and(|value| value == phandle);
        if matches {
            let addr = find_property(&node, "reg")
                .and_then(|p| p.u32(0).ok())
                .ok_or(DtError::BadPhyHandle)?;
            return u8::try_from(addr).map_err(|_| DtError::BadPhyHandle);
        }
    }
    Err(DtError::BadPhyHandle)
}

/// Find a property by name in a node
fn find_property<'a, 'b, 'dt>(
    node: &'a DevTreeNode<'b, 'dt>,
    name: &str,
) -> Option<DevTreeProp<'a, 'dt>> {
    let mut props = node.props();
    while let Ok(Some(prop)) = props.next() {
        if prop.name() == Ok(name) {
            return Some(prop);
        }
    }
    None
}

fn node_model(node: &DevTreeNode) -> Option<Model> {
    let prop = find_property(node, "compatible")?;
    let mut names = prop.iter_str();
    while let Ok(Some(name)) = names.next() {
        if let Some(model) = Model::from_compatible(name) {
            return Some(model);
        }
    }
    None
}

// ============================================================================
// Property Decoding
// ============================================================================

fn is_enabled(status: Option<&str>) -> bool {
    matches!(status, None | Some("okay") | Some("ok"))
}

fn interface_of(phy_mode: Option<&str>, use_ncsi: bool) -> Result<PhyInterface, DtError> {
    match phy_mode.map(PhyInterface::from_name) {
        Some(Some(interface)) => Ok(interface),
        // NC-SI boards often leave phy-mode out and set use-ncsi instead.
        None if use_ncsi => Ok(PhyInterface::Ncsi),
        _ => Err(DtError::BadPhyMode),
    }
}

/// Address of the `index`-th `reg` window, reading cells through `cell`.
fn reg_address(cell: impl Fn(usize) -> Option<u32>, index: usize) -> Option<usize> {
    let first = index * (ADDRESS_CELLS + SIZE_CELLS);
    let mut addr = 0u64;
    for i in 0..ADDRESS_CELLS {
        addr = (addr << 32) | cell(first + i)? as u64;
    }
    usize::try_from(addr).ok()
}

fn mac_from_bytes(bytes: &[u8]) -> Option<MacAddress> {
    let bytes: [u8; 6] = bytes.try_into().ok()?;
    let mac = MacAddress::new(bytes);
    mac.is_valid().then_some(mac)
}
