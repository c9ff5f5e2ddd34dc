//! # Error Types
//!
//! Custom error types for Sensor Link using `thiserror`.

use thiserror::Error;

/// Main error type for Sensor Link
#[derive(Debug, Error)]
pub enum SensorLinkError {
    /// Telemetry wire protocol errors
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Transport delivered fewer bytes than one full frame
    #[error("incomplete frame: expected {expected} bytes, got {got}")]
    IncompleteFrame { expected: usize, got: usize },

    /// Analog sampling errors
    #[error("sampling error: {0}")]
    Sampling(String),

    /// Radio transport errors
    #[error("radio error: {0}")]
    Radio(String),

    /// No usable serial device found
    #[error("serial port not found, tried: {0}")]
    SerialPortNotFound(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Sensor Link
pub type Result<T> = std::result::Result<T, SensorLinkError>;
