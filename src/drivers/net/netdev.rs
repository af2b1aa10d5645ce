//! Network Device Abstraction
//!
//! This module provides the trait every Ethernet driver in the crate
//! implements, together with the error type they share.
//!
//! ## Design Philosophy
//!
//! The `NetworkDevice` trait is the bootloader-facing packet interface:
//! start the device, move single-frame packets in and out, stop it again.
//! There are no queues or callbacks. A frame returned by `receive()` stays in
//! the driver's DMA buffer until the caller hands it back with `release()`,
//! so nothing is copied on the receive path unless the caller wants a copy.
//!
//! ## Example Usage
//!
//! ```ignore
//! use ftgmac100::{NetError, NetworkDevice};
//!
//! netdev.start()?;
//! netdev.send(&frame)?;
//!
//! match netdev.receive() {
//!     Ok(rx) => {
//!         let handle = rx.handle();
//!         process(rx.data());
//!         netdev.release(handle)?;
//!     }
//!     Err(NetError::NoFrameAvailable) => {}
//!     Err(e) => return Err(e),
//! }
//! ```

use crate::drivers::net::phy::LinkState;
use crate::net::ethernet::MacAddress;
use core::fmt;

/// Errors that can occur during network device operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetError {
    /// The current TX descriptor is still owned by the DMA engine
    NoDescriptorAvailable,

    /// The DMA engine did not hand the TX descriptor back in time
    TransmitTimeout,

    /// No received frame is ready (not an error condition for pollers)
    NoFrameAvailable,

    /// The PHY reported link down and the device is not link-less
    NoLink,

    /// Descriptor size is not a multiple of 16 bytes
    BadDescriptorAlignment,

    /// An MDIO transaction did not complete within its bound
    MdioTimeout { phy: u8, reg: u8 },

    /// The device has not been started (or has been stopped)
    NotStarted,

    /// Frame does not fit in one transmit buffer
    FrameTooLarge,

    /// Release handle does not name the current receive slot
    InvalidHandle,

    /// MAC software reset did not self-clear
    ResetTimeout,

    /// No PHY answered at the configured address
    PhyNotFound,

    /// Invalid configuration or parameter
    InvalidConfiguration,

    /// DMA region is too small for rings and buffers
    RegionTooSmall,
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetError::NoDescriptorAvailable => write!(f, "No TX descriptor available"),
            NetError::TransmitTimeout => write!(f, "Transmit timeout"),
            NetError::NoFrameAvailable => write!(f, "No frame available"),
            NetError::NoLink => write!(f, "No link"),
            NetError::BadDescriptorAlignment => {
                write!(f, "Descriptor size must be 16 bytes aligned")
            }
            NetError::MdioTimeout { phy, reg } => {
                write!(f, "MDIO timeout (phy:{} reg:{:#x})", phy, reg)
            }
            NetError::NotStarted => write!(f, "Device not started"),
            NetError::FrameTooLarge => write!(f, "Frame too large"),
            NetError::InvalidHandle => write!(f, "Invalid receive handle"),
            NetError::ResetTimeout => write!(f, "MAC reset timeout"),
            NetError::PhyNotFound => write!(f, "PHY not found"),
            NetError::InvalidConfiguration => write!(f, "Invalid configuration"),
            NetError::RegionTooSmall => write!(f, "DMA region too small"),
        }
    }
}

/// Token naming a received frame that is still held by software.
///
/// Only the driver that produced it can create one. It is `Copy` so it can
/// outlive the borrow of the frame data and be passed back to `release()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxHandle {
    index: usize,
    len: usize,
}

impl RxHandle {
    pub(crate) const fn new(index: usize, len: usize) -> Self {
        Self { index, len }
    }

    /// Receive ring slot holding the frame.
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Frame length in bytes.
    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A received frame, borrowed from the driver's receive buffer.
#[derive(Debug)]
pub struct RxFrame<'a> {
    handle: RxHandle,
    data: &'a [u8],
}

impl<'a> RxFrame<'a> {
    pub(crate) fn new(handle: RxHandle, data: &'a [u8]) -> Self {
        Self { handle, data }
    }

    pub fn handle(&self) -> RxHandle {
        self.handle
    }

    /// Frame bytes as delivered by the MAC (no FCS).
    pub fn data(&self) -> &'a [u8] {
        self.data
    }
}

/// Network device abstraction trait
///
/// This trait defines the minimal interface for Ethernet network devices.
/// Implementations provide hardware-specific details for frame TX/RX.
///
/// # Design Decisions
///
/// - **Blocking transmit**: `send()` returns once the MAC has taken the frame
/// - **Non-blocking receive**: `receive()` never waits for a frame
/// - **Single-frame API**: one frame per call, one descriptor per frame
///
/// # Thread Safety
///
/// Implementations are not required to be thread-safe at the trait level.
/// Synchronization must be handled by the caller (e.g., wrapping in `Mutex`).
pub trait NetworkDevice {
    /// Bring the device up
    ///
    /// Resets the MAC, programs the station address, hands fresh descriptor
    /// rings to the DMA engine, enables TX/RX and waits for the PHY to
    /// negotiate a link.
    ///
    /// # Errors
    ///
    /// - `ResetTimeout` - MAC reset did not complete
    /// - `BadDescriptorAlignment` - descriptor layout unusable by the DMA engine
    /// - `NoLink` - PHY reports link down
    /// - `MdioTimeout` - PHY management transaction timed out
    #[must_use = "start() failure must be handled - device may not be operational"]
    fn start(&mut self) -> Result<(), NetError>;

    /// Disable the MAC (and power down the PHY where the driver owns it)
    fn stop(&mut self);

    /// Transmit an Ethernet frame
    ///
    /// Sends a complete Ethernet frame (header + payload, no FCS). Frames
    /// shorter than 60 bytes are zero-padded. Blocks until the DMA engine
    /// has consumed the descriptor.
    ///
    /// # Errors
    ///
    /// - `NotStarted` - must call `start()` first
    /// - `FrameTooLarge` - frame does not fit in one TX buffer
    /// - `NoDescriptorAvailable` - hardware still owns the next descriptor
    /// - `TransmitTimeout` - hardware never handed the descriptor back
    #[must_use = "send() failure must be handled - frame may not have been sent"]
    fn send(&mut self, frame: &[u8]) -> Result<(), NetError>;

    /// Receive an Ethernet frame (non-blocking)
    ///
    /// Returns `Err(NoFrameAvailable)` immediately when nothing is pending.
    /// The same frame is returned again until it is released.
    fn receive(&mut self) -> Result<RxFrame<'_>, NetError>;

    /// Return a received frame's buffer to the hardware
    fn release(&mut self, handle: RxHandle) -> Result<(), NetError>;

    /// Program a new station address into the MAC
    fn set_mac_address(&mut self, mac: MacAddress) -> Result<(), NetError>;

    /// Get the device's MAC address
    fn mac_address(&self) -> MacAddress;

    /// Link state from the last negotiation, if the device has been started
    fn link_state(&self) -> Option<LinkState>;

    /// Get link status
    ///
    /// # Default Implementation
    ///
    /// Derived from `link_state()`; link down when unknown.
    fn link_up(&self) -> bool {
        self.link_state().is_some_and(|link| link.up)
    }
}
