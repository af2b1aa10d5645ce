//! Ethernet MAC drivers

pub mod faraday;
