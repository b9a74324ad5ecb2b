mod spectrum;

use serde::{Deserialize, Serialize};

use crate::AnalysisConfig;

pub use spectrum::SpectrumAnalyser;

/// Slack for float rounding when comparing an elapsed time against the
/// refractory period: `(t + 0.3) - t` is not exactly `0.3` for most `t`.
const REFRACTORY_EPSILON: f64 = 1e-9;

/// One snapshot of byte-scaled magnitudes, one value per frequency bin.
///
/// Frames are ephemeral: the [`SpectrumAnalyser`] overwrites the same buffer
/// on every tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyFrame {
    bins: Vec<u8>,
}

impl FrequencyFrame {
    pub fn new(bin_count: usize) -> Self {
        Self {
            bins: vec![0; bin_count],
        }
    }

    pub fn bins(&self) -> &[u8] {
        &self.bins
    }

    pub fn bins_mut(&mut self) -> &mut [u8] {
        &mut self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Mean magnitude over the first `bin_count` bins. Short frames are read
    /// up to their length; an empty read yields zero.
    pub fn mean_of_low_bins(&self, bin_count: usize) -> f32 {
        let low = &self.bins[..bin_count.min(self.bins.len())];
        if low.is_empty() {
            return 0.0;
        }

        let sum: u32 = low.iter().map(|&bin| u32::from(bin)).sum();
        sum as f32 / low.len() as f32
    }
}

impl From<Vec<u8>> for FrequencyFrame {
    fn from(bins: Vec<u8>) -> Self {
        Self { bins }
    }
}

/// A detected beat. `sequence_number` starts at 1 for every source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatEvent {
    pub timestamp_seconds: f64,
    pub sequence_number: u64,
}

/// Mutable state of a [`BeatDetector`]; only touched when a beat fires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorState {
    pub last_beat_timestamp: f64,
    pub total_beats_emitted: u64,
}

impl Default for DetectorState {
    fn default() -> Self {
        Self {
            last_beat_timestamp: f64::NEG_INFINITY,
            total_beats_emitted: 0,
        }
    }
}

/// Bass-energy beat detector with a refractory window.
///
/// Each frame is classified by the mean of its lowest bins. A beat fires when
/// that mean is strictly above the energy threshold and strictly more than the
/// refractory period has passed since the previous beat. The caller supplies
/// the clock and must keep it non-decreasing for a given detector.
#[derive(Debug, Clone)]
pub struct BeatDetector {
    low_band_bin_count: usize,
    energy_threshold: f32,
    refractory_period_seconds: f64,
    state: DetectorState,
}

impl BeatDetector {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            low_band_bin_count: config.low_band_bin_count,
            energy_threshold: config.energy_threshold,
            refractory_period_seconds: config.refractory_period_seconds,
            state: DetectorState::default(),
        }
    }

    pub fn state(&self) -> &DetectorState {
        &self.state
    }

    /// Classifies one frame and returns the beat it triggered, if any.
    pub fn analyze_frame(
        &mut self,
        frame: &FrequencyFrame,
        current_time_seconds: f64,
    ) -> Option<BeatEvent> {
        let bass_energy = frame.mean_of_low_bins(self.low_band_bin_count);
        if bass_energy <= self.energy_threshold {
            return None;
        }

        let elapsed = current_time_seconds - self.state.last_beat_timestamp;
        if elapsed <= self.refractory_period_seconds + REFRACTORY_EPSILON {
            return None;
        }

        self.state.last_beat_timestamp = current_time_seconds;
        self.state.total_beats_emitted += 1;

        let event = BeatEvent {
            timestamp_seconds: current_time_seconds,
            sequence_number: self.state.total_beats_emitted,
        };
        tracing::trace!(
            sequence = event.sequence_number,
            at = event.timestamp_seconds,
            bass_energy,
            "beat"
        );
        Some(event)
    }

    /// Forgets every previous beat so a new source starts from scratch.
    pub fn reset(&mut self) {
        self.state = DetectorState::default();
    }
}
