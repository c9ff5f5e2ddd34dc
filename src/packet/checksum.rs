//! # Frame Checksum
//!
//! Single-byte additive checksum used by the radio transport: the low 8 bits
//! of the unsigned sum of every byte in the frame except the final one (the
//! final byte carries the checksum itself).
//!
//! Not a cryptographic digest, and not enforced anywhere by default. The
//! reference transport computes it for diagnostics only; callers that want
//! rejection must opt in via [`crate::packet::decoder::verify_frame`].

/// Calculate the additive checksum over a frame
///
/// Sums every byte except the last and returns the low 8 bits. Empty and
/// single-byte inputs have nothing to sum and yield 0.
///
/// # Arguments
///
/// * `frame` - Complete frame bytes including the trailing checksum byte
///
/// # Returns
///
/// * `u8` - Low byte of the sum of all bytes except the final byte
pub fn frame_checksum(frame: &[u8]) -> u8 {
    let body = match frame.len() {
        0 | 1 => return 0,
        n => &frame[..n - 1],
    };

    let sum: u32 = body.iter().map(|&b| u32::from(b)).sum();
    (sum & 0xFF) as u8
}

/// Check whether a frame's trailing byte matches its computed checksum
///
/// # Arguments
///
/// * `frame` - Complete frame bytes including the trailing checksum byte
///
/// # Returns
///
/// * `bool` - true if the trailing byte equals the computed checksum
pub fn checksum_matches(frame: &[u8]) -> bool {
    match frame.last() {
        Some(&trailing) => frame_checksum(frame) == trailing,
        None => false,
    }
}
