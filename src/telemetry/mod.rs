//! # Telemetry Records Module
//!
//! Handles decoded-frame record logging to JSONL files with rotation.
//!
//! This module handles:
//! - Formatting decoded frames as JSONL (JSON Lines)
//! - Writing to rotating record files
//! - Managing file rotation (max N records per file)
//! - Retaining only the last M files

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

use crate::config::RecordConfig;
use crate::error::Result;
use crate::packet::protocol::ReceivedFrame;

/// Record file name prefix
const RECORD_FILE_PREFIX: &str = "telemetry-";

/// Record file name extension
const RECORD_FILE_EXT: &str = "jsonl";

/// One decoded frame, timestamped for downstream consumers
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryRecord {
    pub timestamp: DateTime<Utc>,
    pub rssi_dbm: i16,
    pub src: u16,
    pub dst: u16,
    pub broadcast: bool,
    pub charge_state: u8,
    pub mcu_temp_c: f32,
    pub vbat_v: f32,
    pub vin_v: f32,
    /// Total bytes the transport delivered for this frame, including any
    /// truncated excess
    pub delivered_bytes: usize,
    /// Whether the trailing checksum byte matched the recomputed value
    pub checksum_ok: bool,
}

impl TelemetryRecord {
    /// Build a record from a decoded frame and its receive diagnostics
    pub fn from_frame(frame: &ReceivedFrame, delivered_bytes: usize, checksum_ok: bool) -> Self {
        Self {
            timestamp: Utc::now(),
            rssi_dbm: frame.rssi,
            src: frame.src,
            dst: frame.dst,
            broadcast: frame.is_broadcast(),
            charge_state: frame.charge_state,
            mcu_temp_c: frame.mcu_temp,
            vbat_v: frame.vbat,
            vin_v: frame.vin,
            delivered_bytes,
            checksum_ok,
        }
    }
}

/// Rotating JSONL writer for telemetry records
pub struct RecordWriter {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    current: Option<File>,
    records_in_current: usize,
    file_seq: u64,
}

impl RecordWriter {
    /// Create a writer rooted at the configured record directory
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    pub fn new(config: &RecordConfig) -> Result<Self> {
        let dir = PathBuf::from(&config.dir);
        fs::create_dir_all(&dir)?;

        Ok(Self {
            dir,
            max_records_per_file: config.max_records_per_file.max(1),
            max_files_to_keep: config.max_files_to_keep.max(1),
            current: None,
            records_in_current: 0,
            file_seq: 0,
        })
    }

    /// Append one record, rotating files as needed
    ///
    /// # Errors
    ///
    /// Returns error on serialization or file I/O failure.
    pub fn append(&mut self, record: &TelemetryRecord) -> Result<()> {
        if self.current.is_none() || self.records_in_current >= self.max_records_per_file {
            self.rotate()?;
        }

        let line = serde_json::to_string(record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        // rotate() above guarantees a current file
        let file = self.current.as_mut().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "record file unavailable")
        })?;
        writeln!(file, "{}", line)?;
        self.records_in_current += 1;
        Ok(())
    }

    /// Open a fresh record file and prune old ones
    fn rotate(&mut self) -> Result<()> {
        // The sequence number keeps names unique when rotations land inside
        // the same timestamp tick
        let name = format!(
            "{}{}-{:04}.{}",
            RECORD_FILE_PREFIX,
            Utc::now().format("%Y%m%d-%H%M%S"),
            self.file_seq,
            RECORD_FILE_EXT
        );
        self.file_seq += 1;
        let path = self.dir.join(name);
        debug!(path = %path.display(), "rotating record file");

        self.current = Some(File::create(&path)?);
        self.records_in_current = 0;
        self.prune()?;
        Ok(())
    }

    /// Delete record files beyond the retention limit, oldest first
    ///
    /// File names embed the creation timestamp, so lexical order is
    /// chronological order.
    fn prune(&self) -> Result<()> {
        let mut names: Vec<String> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| {
                name.starts_with(RECORD_FILE_PREFIX) && name.ends_with(RECORD_FILE_EXT)
            })
            .collect();

        if names.len() <= self.max_files_to_keep {
            return Ok(());
        }

        names.sort();
        let excess = names.len() - self.max_files_to_keep;
        for name in names.into_iter().take(excess) {
            let path = self.dir.join(&name);
            debug!(path = %path.display(), "pruning old record file");
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_frame() -> ReceivedFrame {
        ReceivedFrame {
            length: 17,
            options: 0,
            reserved: 0x5A,
            rssi: -88,
            src: 0x1234,
            dst: 0xFFFF,
            charge_state: 2,
            mcu_temp: 22.3,
            vbat: 4.01,
            vin: 5.09,
            checksum: 0x42,
        }
    }

    fn test_config(dir: &std::path::Path, per_file: usize, keep: usize) -> RecordConfig {
        RecordConfig {
            enabled: true,
            dir: dir.to_string_lossy().into_owned(),
            max_records_per_file: per_file,
            max_files_to_keep: keep,
        }
    }

    fn record_files(dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_record_from_frame() {
        let record = TelemetryRecord::from_frame(&test_frame(), 30, true);
        assert_eq!(record.rssi_dbm, -88);
        assert!(record.broadcast);
        assert_eq!(record.delivered_bytes, 30);
        assert!(record.checksum_ok);
    }

    #[test]
    fn test_record_serializes_as_one_json_line() {
        let record = TelemetryRecord::from_frame(&test_frame(), 25, false);
        let line = serde_json::to_string(&record).unwrap();
        assert!(!line.contains('\n'));
        assert!(line.contains("\"rssi_dbm\":-88"));
        assert!(line.contains("\"checksum_ok\":false"));
    }

    #[test]
    fn test_append_writes_jsonl() {
        let dir = tempdir().unwrap();
        let mut writer = RecordWriter::new(&test_config(dir.path(), 100, 5)).unwrap();

        let record = TelemetryRecord::from_frame(&test_frame(), 25, true);
        writer.append(&record).unwrap();
        writer.append(&record).unwrap();

        let files = record_files(dir.path());
        assert_eq!(files.len(), 1);

        let contents = fs::read_to_string(dir.path().join(&files[0])).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        // Every line is standalone JSON
        for line in lines {
            let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(parsed["src"], 0x1234);
        }
    }

    #[test]
    fn test_rotation_after_max_records() {
        let dir = tempdir().unwrap();
        let mut writer = RecordWriter::new(&test_config(dir.path(), 2, 10)).unwrap();

        let record = TelemetryRecord::from_frame(&test_frame(), 25, true);
        for _ in 0..5 {
            writer.append(&record).unwrap();
        }

        // 5 records at 2 per file: three files (2 + 2 + 1)
        assert_eq!(record_files(dir.path()).len(), 3);
    }

    #[test]
    fn test_prune_keeps_newest_files() {
        let dir = tempdir().unwrap();
        let mut writer = RecordWriter::new(&test_config(dir.path(), 1, 2)).unwrap();

        let record = TelemetryRecord::from_frame(&test_frame(), 25, true);
        for _ in 0..5 {
            writer.append(&record).unwrap();
        }

        let files = record_files(dir.path());
        assert_eq!(files.len(), 2);
    }
}
