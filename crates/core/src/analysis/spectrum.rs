use std::{f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use super::FrequencyFrame;
use crate::{AnalysisConfig, Result};

/// Turns the most recent block of PCM into a byte-scaled [`FrequencyFrame`].
///
/// Magnitudes are Blackman windowed, normalised by the transform size,
/// smoothed over time and mapped from `[min_decibels, max_decibels]` onto
/// `0..=255`.
pub struct SpectrumAnalyser {
    transform_size: usize,
    smoothing_time_constant: f32,
    min_decibels: f32,
    max_decibels: f32,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    frame: FrequencyFrame,
    fft: FftResources,
}

impl SpectrumAnalyser {
    pub fn new(config: &AnalysisConfig) -> Self {
        let transform_size = config.transform_size;
        let bin_count = config.frequency_bin_count();
        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(transform_size);

        Self {
            transform_size,
            smoothing_time_constant: config.smoothing_time_constant,
            min_decibels: config.min_decibels,
            max_decibels: config.max_decibels,
            window: blackman_window(transform_size),
            smoothed: vec![0.0; bin_count],
            frame: FrequencyFrame::new(bin_count),
            fft: FftResources {
                scratch: plan.make_scratch_vec(),
                spectrum: plan.make_output_vec(),
                input: plan.make_input_vec(),
                plan,
            },
        }
    }

    pub fn transform_size(&self) -> usize {
        self.transform_size
    }

    /// Most recently produced frame.
    pub fn frame(&self) -> &FrequencyFrame {
        &self.frame
    }

    /// Drops the smoothing history accumulated for the previous source.
    pub fn reset(&mut self) {
        self.smoothed.fill(0.0);
        self.frame.bins_mut().fill(0);
    }

    /// Analyses the trailing `transform_size` samples of `samples`. Shorter
    /// input is zero padded at the front.
    pub fn analyse(&mut self, samples: &[f32]) -> Result<&FrequencyFrame> {
        let size = self.transform_size;
        let tail = &samples[samples.len().saturating_sub(size)..];
        let pad = size - tail.len();

        let input = &mut self.fft.input;
        input[..pad].fill(0.0);
        for (index, sample) in tail.iter().enumerate() {
            input[pad + index] = sample * self.window[pad + index];
        }

        self.fft.plan.process_with_scratch(
            &mut self.fft.input,
            &mut self.fft.spectrum,
            &mut self.fft.scratch,
        )?;

        let tau = self.smoothing_time_constant;
        let db_range = self.max_decibels - self.min_decibels;
        let scale = 1.0 / size as f32;

        for ((smoothed, bin), out) in self
            .smoothed
            .iter_mut()
            .zip(self.fft.spectrum.iter())
            .zip(self.frame.bins_mut().iter_mut())
        {
            let magnitude = bin.norm() * scale;
            *smoothed = tau * *smoothed + (1.0 - tau) * magnitude;
            *out = to_byte(*smoothed, self.min_decibels, db_range);
        }

        Ok(&self.frame)
    }
}

struct FftResources {
    plan: Arc<dyn RealToComplex<f32>>,
    scratch: Vec<Complex32>,
    spectrum: Vec<Complex32>,
    input: Vec<f32>,
}

impl fmt::Debug for SpectrumAnalyser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumAnalyser")
            .field("transform_size", &self.transform_size)
            .field("smoothing_time_constant", &self.smoothing_time_constant)
            .field("min_decibels", &self.min_decibels)
            .field("max_decibels", &self.max_decibels)
            .finish()
    }
}

fn to_byte(magnitude: f32, min_decibels: f32, db_range: f32) -> u8 {
    if magnitude <= 0.0 {
        return 0;
    }

    let db = 20.0 * magnitude.log10();
    let scaled = (255.0 / db_range * (db - min_decibels)).floor();
    scaled.clamp(0.0, 255.0) as u8
}

fn blackman_window(len: usize) -> Vec<f32> {
    const A0: f32 = 0.42;
    const A1: f32 = 0.5;
    const A2: f32 = 0.08;

    (0..len)
        .map(|i| {
            let phase = 2.0 * PI * i as f32 / len as f32;
            A0 - A1 * phase.cos() + A2 * (2.0 * phase).cos()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BIN_3_HZ: f32 = 3.0 * 44_100.0 / 256.0;

    fn sine(freq: f32, sample_rate: f32, len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn silence_maps_to_zero_bins() {
        let mut analyser = SpectrumAnalyser::new(&AnalysisConfig::default());
        let frame = analyser.analyse(&[0.0; 256]).unwrap();
        assert_eq!(frame.len(), 128);
        assert!(frame.bins().iter().all(|&bin| bin == 0));
    }

    #[test]
    fn low_tone_lights_up_low_bins() {
        let config = AnalysisConfig {
            smoothing_time_constant: 0.0,
            ..Default::default()
        };
        let mut analyser = SpectrumAnalyser::new(&config);
        // Centred on bin 3 of a 256 point transform at 44.1 kHz.
        let tone = sine(BIN_3_HZ, 44_100.0, 256, 0.1);
        let frame = analyser.analyse(&tone).unwrap();

        let peak = frame
            .bins()
            .iter()
            .enumerate()
            .max_by_key(|(_, &bin)| bin)
            .map(|(index, _)| index)
            .unwrap();
        assert_eq!(peak, 3);
        assert!(frame.bins()[3] > 200);
        assert!(frame.bins()[2] < frame.bins()[3]);
        assert!(frame.bins()[100] < frame.bins()[3]);
    }

    #[test]
    fn smoothing_rises_gradually() {
        let mut analyser = SpectrumAnalyser::new(&AnalysisConfig::default());
        let tone = sine(BIN_3_HZ, 44_100.0, 256, 0.1);

        let first = analyser.analyse(&tone).unwrap().bins()[3];
        let second = analyser.analyse(&tone).unwrap().bins()[3];
        assert!(second > first);

        analyser.reset();
        let after_reset = analyser.analyse(&tone).unwrap().bins()[3];
        assert_eq!(after_reset, first);
    }

    #[test]
    fn short_windows_are_padded() {
        let mut analyser = SpectrumAnalyser::new(&AnalysisConfig::default());
        let frame = analyser.analyse(&[0.5; 16]).unwrap();
        assert_eq!(frame.len(), 128);

        let empty = analyser.analyse(&[]).unwrap();
        assert_eq!(empty.len(), 128);
    }

    #[test]
    fn window_is_symmetric_and_bounded() {
        let window = blackman_window(256);
        assert!(window[0].abs() < 1e-6);
        assert!((window[128] - 1.0).abs() < 1e-4);
        assert!((window[1] - window[255]).abs() < 1e-5);
    }
}
