//! # Sensor Link
//!
//! Two-node LoRa telemetry link for remote environmental sensor nodes.
//!
//! One binary serves both ends of the link: the configured role decides
//! whether this process samples and transmits telemetry or receives and
//! records it.

use anyhow::Result;
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};
use tracing_subscriber;

mod config;
mod error;
mod packet;
mod sampler;
mod radio;
mod node;
mod telemetry;

use config::{Config, NodeRole};
use node::{receive_cycle, send_cycle, ChargeMonitor};
use radio::{RadioLink, RadioSerial};
use sampler::{AdcSource, VoltageSampler};
use telemetry::{RecordWriter, TelemetryRecord};

/// Default configuration file path
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Stand-in ADC until a hardware front end is wired in
///
/// Serves a plausible constant count per channel so the full sample, encode
/// and transmit path runs end to end on a bench with no sensors attached.
struct BenchAdc;

impl AdcSource for BenchAdc {
    fn read_samples(&mut self, channel: u8, count: usize) -> error::Result<Vec<u16>> {
        // Mid-range counts per channel: temp sensor near 0.7 V, the sense
        // dividers near 1.5 V
        let level = match channel {
            4 => 876,
            _ => 1861,
        };
        Ok(vec![level; count])
    }
}

/// Stand-in charge monitor until the charge controller is queried
struct BenchCharge;

impl ChargeMonitor for BenchCharge {
    fn status_code(&self) -> u8 {
        0
    }
    fn is_charging(&self) -> bool {
        false
    }
    fn is_fully_charged(&self) -> bool {
        false
    }
    fn has_recoverable_fault(&self) -> bool {
        false
    }
    fn has_nonrecoverable_fault(&self) -> bool {
        false
    }
}

/// Main entry point for the Sensor Link node
///
/// Loads configuration, opens the radio module, then runs the sender or
/// receiver loop until Ctrl+C.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Sensor Link v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => {
            info!("Loaded configuration from {}", config_path);
            config
        }
        Err(e) => {
            warn!("Could not load {} ({}), using defaults", config_path, e);
            Config::default()
        }
    };

    let paths: Vec<&str> = config.serial.device_paths.iter().map(String::as_str).collect();
    let mut radio = RadioSerial::open_with_paths(&paths)?;
    info!("Radio module opened at: {}", radio.device_path());

    match config.node.role {
        NodeRole::Sender => run_sender(&config, &mut radio).await,
        NodeRole::Receiver => run_receiver(&config, &mut radio).await,
    }
}

/// Sender loop: sample, encode and transmit once per interval
async fn run_sender(config: &Config, link: &mut dyn RadioLink) -> Result<()> {
    let sampler = VoltageSampler::new(
        config.sampling.sample_count,
        config.sampling.reference_voltage,
        config.sampling.resolution_bits,
    );
    let mut adc = BenchAdc;
    let charge = BenchCharge;

    let mut cycle_interval = interval(Duration::from_millis(config.link.send_interval_ms));
    let mut sent: u64 = 0;

    info!(
        "Starting sender loop, one packet every {} ms",
        config.link.send_interval_ms
    );
    info!("Press Ctrl+C to exit");

    loop {
        tokio::select! {
            _ = cycle_interval.tick() => {
                match send_cycle(config, &sampler, &mut adc, &charge, link).await {
                    Ok(_) => sent += 1,
                    // Transmission failures skip the cycle, never abort the loop
                    Err(e) => warn!("send cycle failed: {}", e),
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                info!("Total packets sent: {}", sent);
                break;
            }
        }
    }

    Ok(())
}

/// Receiver loop: poll, drain, decode and record once per interval
async fn run_receiver(config: &Config, link: &mut dyn RadioLink) -> Result<()> {
    let mut writer = if config.records.enabled {
        Some(RecordWriter::new(&config.records)?)
    } else {
        None
    };

    let drain_timeout = Duration::from_millis(config.link.drain_timeout_ms);
    let mut cycle_interval = interval(Duration::from_millis(config.link.receive_interval_ms));
    let mut received: u64 = 0;

    info!(
        "Starting receiver loop, polling every {} ms",
        config.link.receive_interval_ms
    );
    info!("Press Ctrl+C to exit");

    loop {
        tokio::select! {
            _ = cycle_interval.tick() => {
                match receive_cycle(link, drain_timeout).await {
                    Ok(Some(reception)) => {
                        received += 1;
                        if let Some(writer) = writer.as_mut() {
                            let record = TelemetryRecord::from_frame(
                                &reception.frame,
                                reception.delivered_bytes,
                                reception.checksum_ok,
                            );
                            if let Err(e) = writer.append(&record) {
                                warn!("failed to write telemetry record: {}", e);
                            }
                        }
                    }
                    Ok(None) => {}
                    // Short frames and radio hiccups skip the cycle
                    Err(e) => warn!("receive cycle failed: {}", e),
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                info!("Total frames received: {}", received);
                break;
            }
        }
    }

    Ok(())
}
