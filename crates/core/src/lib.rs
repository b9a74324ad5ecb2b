//! Core library for the Beat Timeline application.
//!
//! The crate hosts the streaming audio-analysis engine. Each module owns a
//! distinct concern: decoding a source into PCM and byte-scaled spectra,
//! beat detection over successive spectrum frames, min/max envelope
//! reduction for waveform display, and the playback timeline. The
//! [`AudioEngine`] ties them to the lifetime of one loaded source.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod timeline;
pub mod waveform;

pub use analysis::{BeatDetector, BeatEvent, DetectorState, FrequencyFrame, SpectrumAnalyser};
pub use audio::{AudioEngine, AudioSource, EnvelopeStatus, SourceId};
pub use config::{AnalysisConfig, AppConfig};
pub use error::{BeatTimelineError, Result};
pub use timeline::{format_clock, PlaybackState, PlaybackTimeline, TimelinePosition};
pub use waveform::{reduce, Envelope, EnvelopeColumn};
