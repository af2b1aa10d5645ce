//! AArch64-specific architecture code
//!
//! Data cache maintenance and the generic timer, the two CPU services the
//! packet engine needs on a non-coherent Cortex-A core.

pub mod cache;
pub mod timer;

pub use cache::DataCache;
pub use timer::GenericTimer;
