//! # Telemetry Packet Module
//!
//! Implementation of the fixed-layout binary telemetry wire format.
//!
//! This module handles:
//! - Sender payload encoding (17 bytes, big-endian, no padding)
//! - Receiver frame decoding (25 bytes: radio header + payload + checksum)
//! - Additive single-byte checksum calculation
//! - Opt-in frame checksum validation

pub mod protocol;
pub mod encoder;
pub mod decoder;
pub mod checksum;
