//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Which half of the link this process runs
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Sender,
    Receiver,
}

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub dividers: DividerConfig,
    #[serde(default)]
    pub records: RecordConfig,
}

/// Node role configuration
#[derive(Debug, Deserialize, Clone)]
pub struct NodeConfig {
    #[serde(default = "default_role")]
    pub role: NodeRole,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_device_paths")]
    pub device_paths: Vec<String>,
}

/// Link timing and addressing configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    /// Destination address for outgoing payloads, 0xFFFF for broadcast
    #[serde(default = "default_dest_address")]
    pub dest_address: u16,

    /// Delay between sender cycles
    #[serde(default = "default_send_interval_ms")]
    pub send_interval_ms: u64,

    /// Delay between receiver cycles
    #[serde(default = "default_receive_interval_ms")]
    pub receive_interval_ms: u64,

    /// Poll window while draining the radio receive queue
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,
}

/// Analog sampling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SamplingConfig {
    #[serde(default = "default_sample_count")]
    pub sample_count: usize,

    #[serde(default = "default_reference_voltage")]
    pub reference_voltage: f32,

    #[serde(default = "default_resolution_bits")]
    pub resolution_bits: u8,

    /// ADC channel of the internal temperature sensor
    #[serde(default = "default_temp_channel")]
    pub temp_channel: u8,

    /// ADC channel of the battery voltage sense divider
    #[serde(default = "default_vbat_channel")]
    pub vbat_channel: u8,

    /// ADC channel of the supply voltage sense divider
    #[serde(default = "default_vin_channel")]
    pub vin_channel: u8,
}

/// Resistor divider calibration, measured values in ohms
#[derive(Debug, Deserialize, Clone)]
pub struct DividerConfig {
    #[serde(default = "default_vbat_top")]
    pub vbat_top: f32,

    #[serde(default = "default_vbat_bottom")]
    pub vbat_bottom: f32,

    #[serde(default = "default_vin_top")]
    pub vin_top: f32,

    #[serde(default = "default_vin_bottom")]
    pub vin_bottom: f32,
}

/// Decoded-frame record output configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RecordConfig {
    #[serde(default = "default_records_enabled")]
    pub enabled: bool,

    #[serde(default = "default_record_dir")]
    pub dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

// Default value functions
fn default_role() -> NodeRole { NodeRole::Sender }

fn default_device_paths() -> Vec<String> {
    vec!["/dev/ttyACM0".to_string(), "/dev/ttyUSB0".to_string()]
}

fn default_dest_address() -> u16 { 0xFFFF }
fn default_send_interval_ms() -> u64 { 5000 }
fn default_receive_interval_ms() -> u64 { 1000 }
fn default_drain_timeout_ms() -> u64 { 500 }

fn default_sample_count() -> usize { 16 }
fn default_reference_voltage() -> f32 { 3.3 }
fn default_resolution_bits() -> u8 { 12 }
fn default_temp_channel() -> u8 { 4 }
fn default_vbat_channel() -> u8 { 0 }
fn default_vin_channel() -> u8 { 1 }

fn default_vbat_top() -> f32 { 98_600.0 }
fn default_vbat_bottom() -> f32 { 149_100.0 }
fn default_vin_top() -> f32 { 98_600.0 }
fn default_vin_bottom() -> f32 { 14_890.0 }

fn default_records_enabled() -> bool { true }
fn default_record_dir() -> String { "./records".to_string() }
fn default_max_records_per_file() -> usize { 10_000 }
fn default_max_files_to_keep() -> usize { 10 }

impl Default for NodeConfig {
    fn default() -> Self {
        Self { role: default_role() }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self { device_paths: default_device_paths() }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            dest_address: default_dest_address(),
            send_interval_ms: default_send_interval_ms(),
            receive_interval_ms: default_receive_interval_ms(),
            drain_timeout_ms: default_drain_timeout_ms(),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            sample_count: default_sample_count(),
            reference_voltage: default_reference_voltage(),
            resolution_bits: default_resolution_bits(),
            temp_channel: default_temp_channel(),
            vbat_channel: default_vbat_channel(),
            vin_channel: default_vin_channel(),
        }
    }
}

impl Default for DividerConfig {
    fn default() -> Self {
        Self {
            vbat_top: default_vbat_top(),
            vbat_bottom: default_vbat_bottom(),
            vin_top: default_vin_top(),
            vin_bottom: default_vin_bottom(),
        }
    }
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            enabled: default_records_enabled(),
            dir: default_record_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node: NodeConfig::default(),
            serial: SerialConfig::default(),
            link: LinkConfig::default(),
            sampling: SamplingConfig::default(),
            dividers: DividerConfig::default(),
            records: RecordConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.device_paths.is_empty() {
            return Err(crate::error::SensorLinkError::Config(
                toml::de::Error::custom("serial device_paths cannot be empty"),
            ));
        }

        if self.sampling.sample_count == 0 {
            return Err(crate::error::SensorLinkError::Config(
                toml::de::Error::custom("sampling sample_count must be at least 1"),
            ));
        }

        if self.sampling.resolution_bits == 0 || self.sampling.resolution_bits > 16 {
            return Err(crate::error::SensorLinkError::Config(
                toml::de::Error::custom("sampling resolution_bits must be 1..=16"),
            ));
        }

        if self.sampling.reference_voltage <= 0.0 {
            return Err(crate::error::SensorLinkError::Config(
                toml::de::Error::custom("sampling reference_voltage must be positive"),
            ));
        }

        if self.dividers.vbat_bottom <= 0.0 || self.dividers.vin_bottom <= 0.0 {
            return Err(crate::error::SensorLinkError::Config(
                toml::de::Error::custom("divider bottom legs must be positive"),
            ));
        }

        if self.records.enabled && self.records.dir.is_empty() {
            return Err(crate::error::SensorLinkError::Config(
                toml::de::Error::custom("records dir cannot be empty when enabled"),
            ));
        }

        Ok(())
    }
}
