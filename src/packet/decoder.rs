//! # Frame Decoder
//!
//! Decodes raw radio buffers into [`ReceivedFrame`] values.
//!
//! Decoding consumes exactly [`RX_FRAME_SIZE`] bytes from the front of the
//! buffer and ignores anything beyond that. No structural validation happens
//! here: the length field, options and checksum are extracted as-is. Callers
//! that want checksum rejection opt in through [`verify_frame`].

use bytes::Buf;

use super::checksum::checksum_matches;
use super::protocol::{ReceivedFrame, RX_FRAME_SIZE};
use crate::error::{Result, SensorLinkError};

/// Decode one received frame from a raw buffer
///
/// # Arguments
///
/// * `buf` - Raw bytes as delivered by the radio; may be longer than one
///   frame, in which case the excess is ignored
///
/// # Returns
///
/// * `Result<ReceivedFrame>` - Decoded frame
///
/// # Errors
///
/// Returns [`SensorLinkError::IncompleteFrame`] when fewer than
/// [`RX_FRAME_SIZE`] bytes are available. Fixed-offset extraction never
/// reads past the delivered length.
pub fn decode_frame(buf: &[u8]) -> Result<ReceivedFrame> {
    if buf.len() < RX_FRAME_SIZE {
        return Err(SensorLinkError::IncompleteFrame {
            expected: RX_FRAME_SIZE,
            got: buf.len(),
        });
    }

    // Cursor over exactly one frame; each get_* advances by the field width
    // and applies the inverse of the big-endian encoding rules.
    let mut cur = &buf[..RX_FRAME_SIZE];

    Ok(ReceivedFrame {
        length: cur.get_u16(),
        options: cur.get_u16(),
        // Undocumented transport byte, carried through untouched
        reserved: cur.get_u8(),
        rssi: cur.get_i16(),
        src: cur.get_u16(),
        dst: cur.get_u16(),
        charge_state: cur.get_u8(),
        mcu_temp: cur.get_f32(),
        vbat: cur.get_f32(),
        vin: cur.get_f32(),
        checksum: cur.get_u8(),
    })
}

/// Validate the trailing checksum of a raw frame buffer
///
/// Recomputes the additive checksum over the first [`RX_FRAME_SIZE`] bytes
/// and compares it against the trailing checksum byte. This is the opt-in
/// counterpart to the diagnostic-only default: [`decode_frame`] never
/// rejects a frame on checksum grounds.
///
/// # Arguments
///
/// * `buf` - Raw bytes as delivered by the radio
///
/// # Returns
///
/// * `Result<bool>` - true if the checksum byte matches
///
/// # Errors
///
/// Returns [`SensorLinkError::IncompleteFrame`] when fewer than
/// [`RX_FRAME_SIZE`] bytes are available.
pub fn verify_frame(buf: &[u8]) -> Result<bool> {
    if buf.len() < RX_FRAME_SIZE {
        return Err(SensorLinkError::IncompleteFrame {
            expected: RX_FRAME_SIZE,
            got: buf.len(),
        });
    }

    Ok(checksum_matches(&buf[..RX_FRAME_SIZE]))
}
