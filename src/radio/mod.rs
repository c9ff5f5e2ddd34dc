//! # Radio Transport Module
//!
//! Handles serial communication with the UART-attached LoRa radio module.
//!
//! This module handles:
//! - Opening the serial port to the radio module
//! - Transmitting encoded telemetry payloads
//! - Polling and draining the module's receive queue
//!
//! Radio network configuration (channel, power, addresses, start/stop) is
//! the module's own command sequencing and stays outside this crate; only
//! raw byte transport crosses this boundary.

pub mod link_trait;

pub use link_trait::RadioLink;

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::error::{Result, SensorLinkError};

/// UART baud rate of the radio module
pub const RADIO_BAUD_RATE: u32 = 115_200;

/// Default radio device paths to try (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyACM0", // USB CDC devices
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// Read chunk size when draining the module's receive queue
const DRAIN_CHUNK_SIZE: usize = 256;

/// Serial-attached LoRa radio module
pub struct RadioSerial {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/ttyACM0)
    device_path: String,
    /// Bytes read during the last successful poll, pending drain
    pending: Vec<u8>,
}

impl std::fmt::Debug for RadioSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadioSerial")
            .field("device_path", &self.device_path)
            .field("pending_bytes", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl RadioSerial {
    /// Open connection to the radio module
    ///
    /// Auto-detects the device by trying common paths.
    ///
    /// # Errors
    ///
    /// Returns error if no radio device is found or the connection fails
    pub fn open() -> Result<Self> {
        Self::open_with_paths(DEFAULT_DEVICE_PATHS)
    }

    /// Open connection to the radio module with custom device paths
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyACM0"])
    pub fn open_with_paths(paths: &[&str]) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path) {
                Ok(port) => {
                    info!("Successfully opened radio module at {}", path);
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                        pending: Vec::new(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(SensorLinkError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with the radio module's settings
    fn open_port(path: &str) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, RADIO_BAUD_RATE)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| SensorLinkError::Radio(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

#[async_trait]
impl RadioLink for RadioSerial {
    async fn transmit(&mut self, data: &[u8]) -> Result<()> {
        self.port
            .write_all(data)
            .await
            .map_err(|e| SensorLinkError::Radio(format!("Failed to write payload: {}", e)))?;

        self.port
            .flush()
            .await
            .map_err(|e| SensorLinkError::Radio(format!("Failed to flush serial port: {}", e)))?;

        debug!("Transmitted payload ({} bytes)", data.len());
        Ok(())
    }

    async fn poll_receive(&mut self, timeout: Duration) -> Result<bool> {
        if !self.pending.is_empty() {
            return Ok(true);
        }

        let mut chunk = vec![0u8; DRAIN_CHUNK_SIZE];
        match tokio::time::timeout(timeout, self.port.read(&mut chunk)).await {
            Ok(Ok(0)) => Ok(false),
            Ok(Ok(n)) => {
                chunk.truncate(n);
                self.pending = chunk;
                Ok(true)
            }
            Ok(Err(e)) => Err(SensorLinkError::Radio(format!(
                "Failed to read from radio: {}",
                e
            ))),
            // No data arrived within the poll window
            Err(_) => Ok(false),
        }
    }

    async fn drain(&mut self) -> Result<Vec<u8>> {
        Ok(std::mem::take(&mut self.pending))
    }
}
