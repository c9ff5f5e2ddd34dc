//! # Sensor Link Library
//!
//! Two-node LoRa telemetry link for remote environmental sensor nodes.
//!
//! A sender node samples onboard analog signals (board temperature proxy,
//! battery voltage, supply voltage, charge state) and encodes them into a
//! compact fixed-layout binary frame; a receiver node reconstructs that frame
//! from bytes delivered by the radio and recovers the original measurements.

pub mod config;
pub mod error;
pub mod packet;
pub mod sampler;
pub mod radio;
pub mod node;
pub mod telemetry;
