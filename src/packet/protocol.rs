//! # Wire Format Constants and Types
//!
//! Core definitions for the telemetry link wire format.
//!
//! The sender emits a bare 17-byte payload; the radio module consumes the
//! leading addressing fields, prepends an 11-byte transport header and
//! appends a single checksum byte before delivering a 25-byte frame to the
//! receiver. The two structures describe the same logical measurement set
//! but are not byte-compatible.

/// Encoded sender payload size in bytes (no header, no padding)
pub const TX_PAYLOAD_SIZE: usize = 17;

/// Radio transport header size prepended on the receive side
pub const RX_HEADER_SIZE: usize = 11;

/// Measurement region of a received frame (charge state through vin)
pub const RX_PAYLOAD_SIZE: usize = 13;

/// Expected receive frame size: header + measurement payload + checksum byte
pub const RX_FRAME_SIZE: usize = RX_HEADER_SIZE + RX_PAYLOAD_SIZE + 1;

/// Destination address meaning "deliver to all listeners"
pub const BROADCAST_ADDRESS: u16 = 0xFFFF;

/// Sender-side telemetry payload
///
/// Assembled fresh once per sampling cycle from the voltage sampler outputs
/// and the charge controller status code. Encoded size is exactly
/// [`TX_PAYLOAD_SIZE`] bytes in declaration order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryPacket {
    /// Link options bitfield, currently always zero
    pub options: u16,

    /// Destination address, 0xFFFF for broadcast
    pub dest: u16,

    /// Charge controller status code, opaque pass-through
    pub charge_state: u8,

    /// Derived board temperature in Celsius
    pub mcu_temp: f32,

    /// Battery-side voltage in volts
    pub vbat: f32,

    /// Supply-side voltage in volts
    pub vin: f32,
}

/// Receiver-side view of one inbound radio frame
///
/// Carries the transport header the radio prepends (length, options, a
/// reserved byte, RSSI, source and destination addresses), the mirrored
/// sender measurements, and the trailing checksum byte. Nothing here is
/// cross-checked during decode; see [`crate::packet::decoder::verify_frame`]
/// for the opt-in checksum validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReceivedFrame {
    /// Transport-reported payload length (untrusted)
    pub length: u16,

    /// Transport-level options bitfield
    pub options: u16,

    /// Undocumented header byte, preserved verbatim and never interpreted
    pub reserved: u8,

    /// Received signal strength indicator in dBm
    pub rssi: i16,

    /// Source address
    pub src: u16,

    /// Destination address, 0xFFFF for broadcast
    pub dst: u16,

    /// Charge controller status code
    pub charge_state: u8,

    /// Derived board temperature in Celsius
    pub mcu_temp: f32,

    /// Battery-side voltage in volts
    pub vbat: f32,

    /// Supply-side voltage in volts
    pub vin: f32,

    /// Trailing checksum byte as delivered, not validated during decode
    pub checksum: u8,
}

impl ReceivedFrame {
    /// Whether this frame was addressed to all listeners
    pub fn is_broadcast(&self) -> bool {
        self.dst == BROADCAST_ADDRESS
    }
}
