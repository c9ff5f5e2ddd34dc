//! # Voltage Sampler Module
//!
//! Converts batches of raw ADC counts into filtered voltage readings.
//!
//! This module handles:
//! - Blocking acquisition of N raw samples from an ADC channel
//! - Outlier rejection against a sum-of-squared-deviations threshold
//! - Conversion of the filtered mean to volts
//! - Board temperature and resistor divider unit conversions

use tracing::warn;

use crate::error::{Result, SensorLinkError};

/// Default number of raw samples acquired per reading
pub const DEFAULT_SAMPLE_COUNT: usize = 16;

/// ADC reference voltage on the reference platform
pub const DEFAULT_REFERENCE_VOLTAGE: f32 = 3.3;

/// ADC resolution in bits on the reference platform (4096 codes)
pub const DEFAULT_RESOLUTION_BITS: u8 = 12;

/// Source of raw analog samples
///
/// Blocking, no retry; one call returns one batch of raw counts from the
/// selected channel. Implemented by the hardware front end in production and
/// by synthetic sequences in tests.
pub trait AdcSource {
    /// Read `count` raw samples sequentially from `channel`
    fn read_samples(&mut self, channel: u8, count: usize) -> Result<Vec<u16>>;
}

/// Filtered voltage reader over an [`AdcSource`]
///
/// Pure function of the sample sequence plus fixed calibration constants;
/// the only side effect is the analog read itself.
#[derive(Debug, Clone, Copy)]
pub struct VoltageSampler {
    /// Samples acquired per reading
    pub sample_count: usize,

    /// Analog front end reference voltage in volts
    pub reference_voltage: f32,

    /// ADC resolution in bits
    pub resolution_bits: u8,
}

impl Default for VoltageSampler {
    fn default() -> Self {
        Self {
            sample_count: DEFAULT_SAMPLE_COUNT,
            reference_voltage: DEFAULT_REFERENCE_VOLTAGE,
            resolution_bits: DEFAULT_RESOLUTION_BITS,
        }
    }
}

impl VoltageSampler {
    /// Create a sampler with explicit calibration constants
    pub fn new(sample_count: usize, reference_voltage: f32, resolution_bits: u8) -> Self {
        Self {
            sample_count,
            reference_voltage,
            resolution_bits,
        }
    }

    /// Read one filtered voltage from an ADC channel
    ///
    /// Acquires a batch of raw counts, rejects outliers and converts the
    /// surviving mean to volts.
    ///
    /// # Arguments
    ///
    /// * `adc` - Raw sample source
    /// * `channel` - ADC channel selector
    ///
    /// # Returns
    ///
    /// * `Result<f32>` - Filtered voltage in volts
    ///
    /// # Errors
    ///
    /// Returns error if the ADC read fails or returns an empty batch.
    pub fn read_voltage(&self, adc: &mut dyn AdcSource, channel: u8) -> Result<f32> {
        let samples = adc.read_samples(channel, self.sample_count)?;
        if samples.is_empty() {
            return Err(SensorLinkError::Sampling(format!(
                "ADC channel {} returned no samples",
                channel
            )));
        }

        let mean = self.filtered_mean(&samples);
        Ok(self.counts_to_volts(mean))
    }

    /// Mean of a raw sample batch after outlier rejection
    pub fn filtered_mean(&self, samples: &[u16]) -> f32 {
        let values: Vec<f32> = samples.iter().map(|&s| f32::from(s)).collect();
        Self::filter_values(&values)
    }

    /// Outlier-filtered mean of a batch of values
    ///
    /// The dispersion statistic is the raw sum of squared deviations from
    /// the mean. It is intentionally NOT normalized into a variance or
    /// square-rooted into a standard deviation: the 3x rejection threshold
    /// is calibrated against this exact quantity, and "fixing" the formula
    /// would change which samples get rejected. In practice the threshold is
    /// very permissive and passes everything but the most degenerate
    /// batches.
    fn filter_values(values: &[f32]) -> f32 {
        let n = values.len() as f32;
        let mean: f32 = values.iter().sum::<f32>() / n;

        let dispersion: f32 = values.iter().map(|&v| (v - mean).powi(2)).sum();

        // Identical samples need no filtering
        if dispersion == 0.0 {
            return mean;
        }

        let threshold = 3.0 * dispersion;
        let mut kept_sum = 0.0f32;
        let mut kept_count = 0usize;
        for &value in values {
            if (value - mean).abs() < threshold {
                kept_sum += value;
                kept_count += 1;
            } else {
                warn!("rejected sample: {}", value);
            }
        }

        if kept_count == 0 {
            // Every sample rejected; fall back to the unfiltered mean rather
            // than divide by zero
            warn!("all samples rejected, falling back to unfiltered mean");
            return mean;
        }

        kept_sum / kept_count as f32
    }

    /// Convert a mean raw count to volts
    ///
    /// `volts = mean x (reference_voltage / 2^resolution_bits)`
    pub fn counts_to_volts(&self, mean_count: f32) -> f32 {
        mean_count * (self.reference_voltage / (1u32 << self.resolution_bits) as f32)
    }
}

/// Convert the internal temperature sensor voltage to degrees Celsius
///
/// Sensor law from the RP2350 datasheet: 27 C at 0.706 V with a slope of
/// -1.721 mV per degree.
pub fn mcu_temp_celsius(volts: f32) -> f32 {
    27.0 - ((volts - 0.706) / 0.001721)
}

/// Scale a pin voltage back up through a resistor divider
///
/// # Arguments
///
/// * `volts` - Voltage measured at the divider tap
/// * `r_top` - Top leg resistance in ohms
/// * `r_bottom` - Bottom leg resistance in ohms
pub fn scale_divider(volts: f32, r_top: f32, r_bottom: f32) -> f32 {
    volts * (r_top + r_bottom) / r_bottom
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Synthetic ADC serving canned sample batches
    struct FakeAdc {
        samples: Vec<u16>,
    }

    impl AdcSource for FakeAdc {
        fn read_samples(&mut self, _channel: u8, count: usize) -> Result<Vec<u16>> {
            Ok(self.samples.iter().copied().take(count).collect())
        }
    }

    #[test]
    fn test_identical_samples_pass_unfiltered() {
        let sampler = VoltageSampler::default();
        let samples = vec![2048u16; 16];

        // Dispersion is exactly zero, so the filter is the identity
        assert_eq!(sampler.filtered_mean(&samples), 2048.0);
    }

    #[test]
    fn test_threshold_is_permissive_for_raw_counts() {
        let sampler = VoltageSampler::default();
        // Even an absurd spike survives: the sum-of-squares dispersion grows
        // with the square of the deviation, so the 3x threshold always
        // dwarfs the deviation itself for integer counts
        let mut samples = vec![100u16; 15];
        samples.push(50_000);

        let filtered = sampler.filtered_mean(&samples);
        let unfiltered: f32 =
            samples.iter().map(|&s| f32::from(s)).sum::<f32>() / samples.len() as f32;
        assert!((filtered - unfiltered).abs() < 1.0);
    }

    #[test]
    fn test_outlier_beyond_threshold_is_rejected() {
        // Sub-unit deviations keep the dispersion small enough for the
        // threshold to bite: devs are 0.1, 0.1, 0.2; dispersion 0.06;
        // threshold 0.18; only the 0.3 sample crosses it
        let values = [0.0f32, 0.0, 0.3];
        let filtered = VoltageSampler::filter_values(&values);
        assert_eq!(filtered, 0.0);
    }

    #[test]
    fn test_all_rejected_falls_back_to_unfiltered_mean() {
        // Both devs are 0.05 against a threshold of 3 x 0.005 = 0.015, so
        // both samples are rejected and the unfiltered mean comes back
        let values = [0.0f32, 0.1];
        let filtered = VoltageSampler::filter_values(&values);
        assert!((filtered - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_counts_to_volts_reference_calibration() {
        let sampler = VoltageSampler::default();
        // Full-scale code maps to the reference voltage
        let full_scale = sampler.counts_to_volts(4096.0);
        assert!((full_scale - 3.3).abs() < 1e-6);
        assert_eq!(sampler.counts_to_volts(0.0), 0.0);
    }

    #[test]
    fn test_voltage_is_linear_in_mean_count() {
        let sampler = VoltageSampler::default();
        let v1 = sampler.counts_to_volts(512.0);
        let v2 = sampler.counts_to_volts(1024.0);
        assert!((v2 - 2.0 * v1).abs() < 1e-6);
    }

    #[test]
    fn test_read_voltage_end_to_end() {
        let sampler = VoltageSampler::default();
        let mut adc = FakeAdc {
            samples: vec![1024u16; 16],
        };

        let volts = sampler.read_voltage(&mut adc, 0).unwrap();
        // 1024 / 4096 x 3.3 = 0.825
        assert!((volts - 0.825).abs() < 1e-6);
    }

    #[test]
    fn test_read_voltage_empty_batch_is_error() {
        let sampler = VoltageSampler::default();
        let mut adc = FakeAdc { samples: vec![] };

        let result = sampler.read_voltage(&mut adc, 0);
        assert!(matches!(result, Err(SensorLinkError::Sampling(_))));
    }

    #[test]
    fn test_mcu_temp_celsius() {
        // 0.706 V is the 27 C calibration point
        assert!((mcu_temp_celsius(0.706) - 27.0).abs() < 1e-4);
        // Higher voltage means lower temperature
        assert!(mcu_temp_celsius(0.8) < 27.0);
        assert!(mcu_temp_celsius(0.6) > 27.0);
    }

    #[test]
    fn test_scale_divider() {
        // Equal legs halve the voltage at the tap, so scaling doubles it
        assert!((scale_divider(1.65, 10_000.0, 10_000.0) - 3.3).abs() < 1e-6);
        // Reference platform battery divider
        let vbat = scale_divider(2.5, 98_600.0, 149_100.0);
        assert!((vbat - 2.5 * (98_600.0 + 149_100.0) / 149_100.0).abs() < 1e-6);
    }
}
