mod decode;

use std::{
    sync::{Arc, Mutex, MutexGuard},
    thread::JoinHandle,
};

use crate::{
    reduce, AnalysisConfig, BeatDetector, BeatEvent, BeatTimelineError, Envelope,
    FrequencyFrame, PlaybackState, PlaybackTimeline, Result, SpectrumAnalyser, TimelinePosition,
};

pub use decode::AudioSource;

/// Identity of one loaded source. Frames and position reports carry it so
/// that anything produced for a replaced source can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(u64);

/// Availability of the waveform envelope for the current source.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopeStatus {
    /// No source is loaded.
    Unloaded,
    /// The background reduction has not finished yet.
    Pending,
    Ready(Arc<Envelope>),
}

/// Owns everything tied to the lifetime of one loaded source: the beat
/// detector, the playback timeline, the spectrum smoothing history and the
/// envelope worker.
///
/// Loading a new source swaps all of it under a single lock, so a frame is
/// either analysed against the source it was produced for or dropped.
#[derive(Debug)]
pub struct AudioEngine {
    config: AnalysisConfig,
    shared: Arc<Mutex<Session>>,
}

#[derive(Debug)]
struct Session {
    next_id: u64,
    active: Option<ActiveSource>,
    timeline: PlaybackTimeline,
    worker: Option<JoinHandle<()>>,
}

#[derive(Debug)]
struct ActiveSource {
    id: SourceId,
    source: AudioSource,
    detector: BeatDetector,
    analyser: SpectrumAnalyser,
    envelope: Option<Arc<Envelope>>,
}

impl AudioEngine {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            shared: Arc::new(Mutex::new(Session {
                next_id: 0,
                active: None,
                timeline: PlaybackTimeline::new(),
                worker: None,
            })),
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Retires the current source and makes `source` current with fresh
    /// detector, timeline and analyser state. The envelope is reduced on a
    /// background thread.
    pub fn load_source(&self, source: &AudioSource) -> Result<SourceId> {
        let (id, retired_worker) = {
            let mut session = self.lock()?;
            session.next_id += 1;
            let id = SourceId(session.next_id);

            session.timeline.unload();
            session.timeline.source_loaded(source.duration_seconds());
            session.active = Some(ActiveSource {
                id,
                source: source.clone(),
                detector: BeatDetector::new(&self.config),
                analyser: SpectrumAnalyser::new(&self.config),
                envelope: None,
            });

            let worker = self.spawn_envelope_worker(id, source);
            (id, session.worker.replace(worker))
        };

        tracing::debug!(
            ?id,
            duration = source.duration_seconds(),
            samples = source.samples().len(),
            "loaded audio source"
        );

        // The retired worker discards its result once it sees a newer id.
        if let Some(worker) = retired_worker {
            worker
                .join()
                .map_err(|_| BeatTimelineError::msg("envelope worker panicked"))?;
        }
        Ok(id)
    }

    /// Releases the current source and returns the timeline to `Idle`.
    pub fn unload(&self) -> Result<()> {
        let mut session = self.lock()?;
        session.active = None;
        session.timeline.unload();
        Ok(())
    }

    pub fn current_source(&self) -> Result<Option<SourceId>> {
        let session = self.lock()?;
        Ok(session.active.as_ref().map(|active| active.id))
    }

    /// Runs the beat detector on a frame produced for `id`. Frames for any
    /// other source are dropped.
    pub fn analyze_frame(
        &self,
        id: SourceId,
        frame: &FrequencyFrame,
        current_time_seconds: f64,
    ) -> Result<Option<BeatEvent>> {
        let mut session = self.lock()?;
        match session.active.as_mut() {
            Some(active) if active.id == id => {
                Ok(active.detector.analyze_frame(frame, current_time_seconds))
            }
            _ => {
                tracing::trace!(?id, "dropping frame from a retired source");
                Ok(None)
            }
        }
    }

    /// Analyses the source window that ends at `current_time_seconds` and
    /// feeds the resulting frame to the beat detector.
    pub fn analyze_window(
        &self,
        id: SourceId,
        current_time_seconds: f64,
    ) -> Result<Option<BeatEvent>> {
        let mut session = self.lock()?;
        let active = match session.active.as_mut() {
            Some(active) if active.id == id => active,
            _ => {
                tracing::trace!(?id, "dropping tick from a retired source");
                return Ok(None);
            }
        };

        let window = active
            .source
            .window_ending_at(current_time_seconds, active.analyser.transform_size());
        let frame = active.analyser.analyse(window)?;
        Ok(active.detector.analyze_frame(frame, current_time_seconds))
    }

    pub fn total_beats(&self) -> Result<u64> {
        let session = self.lock()?;
        Ok(session
            .active
            .as_ref()
            .map(|active| active.detector.state().total_beats_emitted)
            .unwrap_or(0))
    }

    pub fn play(&self) -> Result<bool> {
        Ok(self.lock()?.timeline.play())
    }

    pub fn pause(&self) -> Result<bool> {
        Ok(self.lock()?.timeline.pause())
    }

    pub fn seek(&self, target_seconds: f64) -> Result<bool> {
        Ok(self.lock()?.timeline.seek(target_seconds))
    }

    /// Position report from the playing source.
    pub fn tick(&self, id: SourceId, current_seconds: f64) -> Result<bool> {
        let mut session = self.lock()?;
        if !session.is_current(id) {
            return Ok(false);
        }
        Ok(session.timeline.tick(current_seconds))
    }

    pub fn end_of_media(&self, id: SourceId) -> Result<bool> {
        let mut session = self.lock()?;
        if !session.is_current(id) {
            return Ok(false);
        }
        Ok(session.timeline.end_of_media())
    }

    pub fn position(&self) -> Result<TimelinePosition> {
        Ok(self.lock()?.timeline.position())
    }

    pub fn state(&self) -> Result<PlaybackState> {
        Ok(self.lock()?.timeline.state())
    }

    pub fn envelope(&self) -> Result<EnvelopeStatus> {
        let session = self.lock()?;
        Ok(match session.active.as_ref() {
            None => EnvelopeStatus::Unloaded,
            Some(ActiveSource {
                envelope: Some(envelope),
                ..
            }) => EnvelopeStatus::Ready(Arc::clone(envelope)),
            Some(_) => EnvelopeStatus::Pending,
        })
    }

    /// Blocks until the envelope worker has finished, then reports the status.
    pub fn wait_for_envelope(&self) -> Result<EnvelopeStatus> {
        let worker = self.lock()?.worker.take();
        if let Some(worker) = worker {
            worker
                .join()
                .map_err(|_| BeatTimelineError::msg("envelope worker panicked"))?;
        }
        self.envelope()
    }

    fn spawn_envelope_worker(&self, id: SourceId, source: &AudioSource) -> JoinHandle<()> {
        let samples = source.shared_samples();
        let column_count = self.config.envelope_column_count;
        let shared = Arc::clone(&self.shared);

        std::thread::spawn(move || {
            let envelope = Arc::new(reduce(&samples, column_count));
            let Ok(mut session) = shared.lock() else {
                return;
            };
            match session.active.as_mut() {
                Some(active) if active.id == id => {
                    tracing::debug!(columns = envelope.len(), "envelope ready");
                    active.envelope = Some(envelope);
                }
                _ => tracing::trace!(?id, "discarding envelope of a retired source"),
            }
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Session>> {
        self.shared
            .lock()
            .map_err(|_| BeatTimelineError::msg("audio session has been poisoned"))
    }
}

impl Session {
    fn is_current(&self, id: SourceId) -> bool {
        self.active.as_ref().is_some_and(|active| active.id == id)
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        let worker = match self.shared.lock() {
            Ok(mut session) => session.worker.take(),
            Err(poisoned) => poisoned.into_inner().worker.take(),
        };
        if let Some(worker) = worker {
            let _ = worker.join();
        }
    }
}
