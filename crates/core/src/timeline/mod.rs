use serde::{Deserialize, Serialize};

/// Transport state of the loaded source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    /// No source loaded.
    #[default]
    Idle,
    /// Source loaded with a known duration, not yet started.
    Ready,
    Playing,
    Paused,
    Ended,
}

/// Snapshot of where playback is. A `duration_seconds` of zero means the
/// duration is not known yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelinePosition {
    pub current_seconds: f64,
    pub duration_seconds: f64,
}

impl TimelinePosition {
    pub fn is_duration_known(&self) -> bool {
        self.duration_seconds > 0.0
    }

    /// Playhead ratio in `[0, 1]`, or `None` while the duration is unknown.
    pub fn progress(&self) -> Option<f64> {
        if self.is_duration_known() {
            Some(self.current_seconds / self.duration_seconds)
        } else {
            None
        }
    }

    fn clamp(&self, seconds: f64) -> f64 {
        if seconds.is_nan() {
            return 0.0;
        }
        seconds.clamp(0.0, self.duration_seconds)
    }
}

/// Reconciles play, pause, seek, position ticks and end-of-media into a
/// single position. Transitions that do not apply in the current state are
/// ignored and reported through the returned `bool`.
#[derive(Debug, Clone, Default)]
pub struct PlaybackTimeline {
    state: PlaybackState,
    position: TimelinePosition,
}

impl PlaybackTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn position(&self) -> TimelinePosition {
        self.position
    }

    pub fn progress(&self) -> Option<f64> {
        self.position.progress()
    }

    /// Source metadata resolved. Only a finite, positive duration moves the
    /// timeline out of `Idle`.
    pub fn source_loaded(&mut self, duration_seconds: f64) -> bool {
        if self.state != PlaybackState::Idle
            || !duration_seconds.is_finite()
            || duration_seconds <= 0.0
        {
            return false;
        }

        self.position = TimelinePosition {
            current_seconds: 0.0,
            duration_seconds,
        };
        self.state = PlaybackState::Ready;
        true
    }

    /// Starting from `Ended` rewinds to the beginning first.
    pub fn play(&mut self) -> bool {
        match self.state {
            PlaybackState::Ready | PlaybackState::Paused => {}
            PlaybackState::Ended => self.position.current_seconds = 0.0,
            PlaybackState::Idle | PlaybackState::Playing => return false,
        }
        self.state = PlaybackState::Playing;
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.state != PlaybackState::Playing {
            return false;
        }
        self.state = PlaybackState::Paused;
        true
    }

    /// Moves the playhead to `target_seconds`, clamped to the track. Seeking
    /// keeps `Playing` and `Paused` as they are; seeking after the end parks
    /// the timeline in `Paused`.
    pub fn seek(&mut self, target_seconds: f64) -> bool {
        if self.state == PlaybackState::Idle {
            return false;
        }

        self.position.current_seconds = self.position.clamp(target_seconds);
        if self.state == PlaybackState::Ended {
            self.state = PlaybackState::Paused;
        }
        true
    }

    /// Periodic position report from the audio source. Reports arriving
    /// after end-of-media are ignored so the playhead stays on the duration.
    pub fn tick(&mut self, current_seconds: f64) -> bool {
        if matches!(self.state, PlaybackState::Idle | PlaybackState::Ended) {
            return false;
        }
        self.position.current_seconds = self.position.clamp(current_seconds);
        true
    }

    /// Natural end of media: the playhead snaps to the duration.
    pub fn end_of_media(&mut self) -> bool {
        if self.state != PlaybackState::Playing {
            return false;
        }
        self.position.current_seconds = self.position.duration_seconds;
        self.state = PlaybackState::Ended;
        true
    }

    /// Back to `Idle` with an unknown duration.
    pub fn unload(&mut self) {
        *self = Self::default();
    }
}

/// Formats seconds as `m:ss`, flooring both parts.
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready(duration: f64) -> PlaybackTimeline {
        let mut timeline = PlaybackTimeline::new();
        assert!(timeline.source_loaded(duration));
        timeline
    }

    #[test]
    fn starts_idle_with_unknown_duration() {
        let timeline = PlaybackTimeline::new();
        assert_eq!(timeline.state(), PlaybackState::Idle);
        assert_eq!(timeline.position().duration_seconds, 0.0);
        assert_eq!(timeline.progress(), None);
    }

    #[test]
    fn unknown_duration_keeps_idle() {
        let mut timeline = PlaybackTimeline::new();
        assert!(!timeline.source_loaded(0.0));
        assert!(!timeline.source_loaded(f64::NAN));
        assert!(!timeline.play());
        assert!(!timeline.seek(10.0));
        assert_eq!(timeline.state(), PlaybackState::Idle);
    }

    #[test]
    fn seek_clamps_into_track() {
        let mut timeline = ready(120.0);
        timeline.seek(-5.0);
        assert_eq!(timeline.position().current_seconds, 0.0);
        timeline.seek(500.0);
        assert_eq!(timeline.position().current_seconds, 120.0);
        timeline.seek(42.5);
        assert_eq!(timeline.position().current_seconds, 42.5);
        assert_eq!(timeline.state(), PlaybackState::Ready);
    }

    #[test]
    fn play_pause_cycle() {
        let mut timeline = ready(60.0);
        assert!(timeline.play());
        assert!(!timeline.play());
        assert_eq!(timeline.state(), PlaybackState::Playing);

        assert!(timeline.tick(12.0));
        assert!(timeline.pause());
        assert_eq!(timeline.state(), PlaybackState::Paused);
        assert_eq!(timeline.position().current_seconds, 12.0);

        assert!(timeline.play());
        assert_eq!(timeline.state(), PlaybackState::Playing);
    }

    #[test]
    fn seek_while_playing_keeps_playing() {
        let mut timeline = ready(60.0);
        timeline.play();
        assert!(timeline.seek(30.0));
        assert_eq!(timeline.state(), PlaybackState::Playing);
        assert_eq!(timeline.position().current_seconds, 30.0);
    }

    #[test]
    fn end_of_media_snaps_to_duration() {
        let mut timeline = ready(90.0);
        timeline.play();
        timeline.tick(89.97);
        assert!(timeline.end_of_media());
        assert_eq!(timeline.state(), PlaybackState::Ended);
        assert_eq!(timeline.position().current_seconds, 90.0);
        assert_eq!(timeline.progress(), Some(1.0));
    }

    #[test]
    fn late_ticks_do_not_move_ended_playhead() {
        let mut timeline = ready(90.0);
        timeline.play();
        timeline.end_of_media();

        assert!(!timeline.tick(89.97));
        assert_eq!(timeline.state(), PlaybackState::Ended);
        assert_eq!(timeline.position().current_seconds, 90.0);
    }

    #[test]
    fn seek_after_end_parks_in_paused() {
        let mut timeline = ready(90.0);
        timeline.play();
        timeline.end_of_media();

        assert!(timeline.seek(15.0));
        assert_eq!(timeline.state(), PlaybackState::Paused);
        assert_eq!(timeline.position().current_seconds, 15.0);
    }

    #[test]
    fn play_after_end_rewinds() {
        let mut timeline = ready(10.0);
        timeline.play();
        timeline.end_of_media();
        assert!(timeline.play());
        assert_eq!(timeline.position().current_seconds, 0.0);
    }

    #[test]
    fn ticks_are_clamped() {
        let mut timeline = ready(5.0);
        timeline.play();
        timeline.tick(7.0);
        assert_eq!(timeline.position().current_seconds, 5.0);
        timeline.tick(f64::NAN);
        assert_eq!(timeline.position().current_seconds, 0.0);
    }

    #[test]
    fn unload_returns_to_idle() {
        let mut timeline = ready(5.0);
        timeline.play();
        timeline.unload();
        assert_eq!(timeline.state(), PlaybackState::Idle);
        assert_eq!(timeline.position(), TimelinePosition::default());
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_clock(0.0), "0:00");
        assert_eq!(format_clock(9.9), "0:09");
        assert_eq!(format_clock(125.4), "2:05");
        assert_eq!(format_clock(-3.0), "0:00");
    }
}
