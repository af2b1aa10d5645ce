//! Memory shared with the DMA engine
//!
//! Provides device-visible address handling and data cache maintenance.

pub mod cache;
pub mod dma;

pub use cache::{CacheMaintenance, Coherent};
pub use dma::{DmaAddr, DmaBuf, DmaRegion};
