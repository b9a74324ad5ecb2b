use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{BeatTimelineError, Result};

const MIN_TRANSFORM_SIZE: usize = 32;
const MAX_TRANSFORM_SIZE: usize = 32_768;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl AppConfig {
    /// Parses a JSON document and validates the analysis section.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.analysis.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

/// Tuning for the beat detector, the spectrum analyser and the envelope.
///
/// The defaults reproduce the reference behaviour: a 256 point transform,
/// mean of the lowest 10 bins against a threshold of 200 on the 0-255 byte
/// scale, and a 300 ms refractory window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub low_band_bin_count: usize,
    pub energy_threshold: f32,
    pub refractory_period_seconds: f64,
    pub transform_size: usize,
    pub envelope_column_count: usize,
    pub smoothing_time_constant: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
    pub tick_rate_hz: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            low_band_bin_count: 10,
            energy_threshold: 200.0,
            refractory_period_seconds: 0.3,
            transform_size: 256,
            envelope_column_count: 600,
            smoothing_time_constant: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
            tick_rate_hz: 60.0,
        }
    }
}

impl AnalysisConfig {
    /// Number of magnitude bins produced per frame.
    pub fn frequency_bin_count(&self) -> usize {
        self.transform_size / 2
    }

    /// Seconds between two scheduler ticks.
    pub fn tick_interval_seconds(&self) -> f64 {
        1.0 / self.tick_rate_hz
    }

    pub fn validate(&self) -> Result<()> {
        if !self.transform_size.is_power_of_two()
            || !(MIN_TRANSFORM_SIZE..=MAX_TRANSFORM_SIZE).contains(&self.transform_size)
        {
            return Err(BeatTimelineError::config(format!(
                "transform_size must be a power of two in [{MIN_TRANSFORM_SIZE}, {MAX_TRANSFORM_SIZE}], got {}",
                self.transform_size
            )));
        }

        if self.low_band_bin_count == 0 || self.low_band_bin_count > self.frequency_bin_count() {
            return Err(BeatTimelineError::config(format!(
                "low_band_bin_count must be in [1, {}], got {}",
                self.frequency_bin_count(),
                self.low_band_bin_count
            )));
        }

        if self.envelope_column_count == 0 {
            return Err(BeatTimelineError::config(
                "envelope_column_count must be greater than zero",
            ));
        }

        if !self.energy_threshold.is_finite() {
            return Err(BeatTimelineError::config("energy_threshold must be finite"));
        }

        if !self.refractory_period_seconds.is_finite() || self.refractory_period_seconds < 0.0 {
            return Err(BeatTimelineError::config(format!(
                "refractory_period_seconds must be a non-negative number, got {}",
                self.refractory_period_seconds
            )));
        }

        if !(0.0..=1.0).contains(&self.smoothing_time_constant) {
            return Err(BeatTimelineError::config(format!(
                "smoothing_time_constant must be in [0, 1], got {}",
                self.smoothing_time_constant
            )));
        }

        if self.min_decibels.is_nan()
            || self.max_decibels.is_nan()
            || self.min_decibels >= self.max_decibels
        {
            return Err(BeatTimelineError::config(format!(
                "min_decibels ({}) must be below max_decibels ({})",
                self.min_decibels, self.max_decibels
            )));
        }

        if !(self.tick_rate_hz.is_finite() && self.tick_rate_hz > 0.0) {
            return Err(BeatTimelineError::config(format!(
                "tick_rate_hz must be positive, got {}",
                self.tick_rate_hz
            )));
        }

        Ok(())
    }
}
