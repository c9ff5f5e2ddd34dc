//! # Telemetry Payload Encoder
//!
//! Encodes a [`TelemetryPacket`] into the fixed-layout wire payload.

use bytes::BufMut;

use super::protocol::{TelemetryPacket, TX_PAYLOAD_SIZE};

/// Encode a telemetry packet into its wire payload
///
/// Writes every field most-significant-byte first in declaration order:
/// options, dest, charge_state, mcu_temp, vbat, vin. Floats are transferred
/// as their raw IEEE-754 bit pattern, so sender and receiver must share the
/// same float representation; this is a deliberate non-portability.
///
/// # Arguments
///
/// * `packet` - Telemetry packet assembled for the current cycle
///
/// # Returns
///
/// * `Vec<u8>` - Exactly 17 bytes, no padding
///
/// # Examples
///
/// ```
/// use sensor_link::packet::encoder::encode_telemetry_payload;
/// use sensor_link::packet::protocol::{TelemetryPacket, BROADCAST_ADDRESS};
///
/// let packet = TelemetryPacket {
///     options: 0,
///     dest: BROADCAST_ADDRESS,
///     charge_state: 2,
///     mcu_temp: 24.5,
///     vbat: 4.01,
///     vin: 5.12,
/// };
/// let payload = encode_telemetry_payload(&packet);
/// assert_eq!(payload.len(), 17);
/// ```
pub fn encode_telemetry_payload(packet: &TelemetryPacket) -> Vec<u8> {
    let mut payload = Vec::with_capacity(TX_PAYLOAD_SIZE);

    payload.put_u16(packet.options);
    payload.put_u16(packet.dest);
    payload.put_u8(packet.charge_state);
    // put_f32 writes the big-endian IEEE-754 bit pattern, exactly the raw
    // bit transfer the receiver inverts
    payload.put_f32(packet.mcu_temp);
    payload.put_f32(packet.vbat);
    payload.put_f32(packet.vin);

    debug_assert_eq!(payload.len(), TX_PAYLOAD_SIZE);
    payload
}
