use std::{fmt, path::Path, sync::Arc};

use symphonia::core::{
    audio::SampleBuffer,
    codecs::{DecoderOptions, CODEC_TYPE_NULL},
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};

use crate::{BeatTimelineError, Result};

/// Fully decoded first channel of an audio file.
///
/// Samples are shared behind an [`Arc`] so the envelope worker can read them
/// while playback keeps slicing analysis windows from the same buffer.
#[derive(Clone)]
pub struct AudioSource {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl AudioSource {
    pub fn from_samples(samples: impl Into<Arc<[f32]>>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    /// Decodes `path`, keeping only channel 0.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| BeatTimelineError::msg("no audio track found"))?;

        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| BeatTimelineError::msg("audio track has no sample rate"))?;
        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())?;

        let mut samples = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(e.into()),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(reason)) => {
                    tracing::debug!(reason, "skipping undecodable packet");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let spec = *decoded.spec();
            let channels = spec.channels.count().max(1);
            let mut buffer = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
            buffer.copy_interleaved_ref(decoded);
            samples.extend(buffer.samples().iter().step_by(channels).copied());
        }

        tracing::debug!(
            path = %path.display(),
            samples = samples.len(),
            sample_rate,
            "decoded audio source"
        );

        Ok(Self::from_samples(samples, sample_rate))
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub(crate) fn shared_samples(&self) -> Arc<[f32]> {
        Arc::clone(&self.samples)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length of the track, or zero when the sample rate is unknown.
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }

    /// Up to `len` samples immediately preceding the playhead at `seconds`.
    pub fn window_ending_at(&self, seconds: f64, len: usize) -> &[f32] {
        let position = (seconds.max(0.0) * f64::from(self.sample_rate)).round() as usize;
        let end = position.min(self.samples.len());
        &self.samples[end.saturating_sub(len)..end]
    }
}

impl fmt::Debug for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioSource")
            .field("samples", &self.samples.len())
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, channels: u16, frames: &[[i16; 2]]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for frame in frames {
            for sample in &frame[..channels as usize] {
                writer.write_sample(*sample).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn decodes_first_channel_of_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let frames: Vec<[i16; 2]> = (0..8_000)
            .map(|i| if i % 2 == 0 { [16_384, -32_768] } else { [-16_384, 0] })
            .collect();
        write_wav(&path, 2, &frames);

        let source = AudioSource::open(&path).unwrap();
        assert_eq!(source.sample_rate(), 8_000);
        assert_eq!(source.samples().len(), 8_000);
        assert!((source.duration_seconds() - 1.0).abs() < 1e-9);
        assert!((source.samples()[0] - 0.5).abs() < 1e-3);
        assert!((source.samples()[1] + 0.5).abs() < 1e-3);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AudioSource::open(dir.path().join("absent.wav")).unwrap_err();
        assert!(matches!(err, BeatTimelineError::Io(_)));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.wav");
        std::fs::write(&path, b"definitely not a riff header").unwrap();
        let err = AudioSource::open(&path).unwrap_err();
        assert!(matches!(err, BeatTimelineError::Decode(_)));
    }

    #[test]
    fn windows_stop_at_the_playhead() {
        let source = AudioSource::from_samples((0..100).map(|i| i as f32).collect::<Vec<_>>(), 10);
        assert_eq!(source.duration_seconds(), 10.0);

        let window = source.window_ending_at(5.0, 4);
        assert_eq!(window, &[46.0, 47.0, 48.0, 49.0]);

        assert!(source.window_ending_at(0.0, 4).is_empty());
        assert_eq!(source.window_ending_at(0.2, 4), &[0.0, 1.0]);
        assert_eq!(source.window_ending_at(60.0, 2), &[98.0, 99.0]);
    }

    #[test]
    fn zero_sample_rate_has_unknown_duration() {
        let source = AudioSource::from_samples(vec![0.0; 16], 0);
        assert_eq!(source.duration_seconds(), 0.0);
    }
}
