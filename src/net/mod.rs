//! Link-layer types shared by the drivers

pub mod ethernet;

pub use ethernet::{MacAddress, ParseMacError};
