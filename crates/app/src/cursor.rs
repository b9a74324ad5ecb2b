use beat_timeline_core::BeatEvent;

/// How long a beat keeps the viewer highlighted.
const FLASH_SECONDS: f64 = 0.1;

/// Presentation policy for beat events: each beat moves the highlight to the
/// next thumbnail slot and lights the beat indicator for a short while.
#[derive(Debug, Clone)]
pub struct BeatCursor {
    slot_count: usize,
    slot: usize,
    beats_seen: u64,
    flash_until: Option<f64>,
}

impl BeatCursor {
    pub fn new(slot_count: usize) -> Self {
        Self {
            slot_count: slot_count.max(1),
            slot: 0,
            beats_seen: 0,
            flash_until: None,
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn beats_seen(&self) -> u64 {
        self.beats_seen
    }

    pub fn advance(&mut self, event: &BeatEvent) {
        self.slot = (self.slot + 1) % self.slot_count;
        self.beats_seen += 1;
        self.flash_until = Some(event.timestamp_seconds + FLASH_SECONDS);
    }

    pub fn is_flashing(&self, now_seconds: f64) -> bool {
        self.flash_until.is_some_and(|until| now_seconds < until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beat(at: f64, sequence_number: u64) -> BeatEvent {
        BeatEvent {
            timestamp_seconds: at,
            sequence_number,
        }
    }

    #[test]
    fn cycles_through_slots() {
        let mut cursor = BeatCursor::new(5);
        for n in 1..=6 {
            cursor.advance(&beat(n as f64, n));
        }
        assert_eq!(cursor.slot(), 1);
        assert_eq!(cursor.beats_seen(), 6);
    }

    #[test]
    fn flash_expires() {
        let mut cursor = BeatCursor::new(5);
        assert!(!cursor.is_flashing(0.0));
        cursor.advance(&beat(2.0, 1));
        assert!(cursor.is_flashing(2.05));
        assert!(!cursor.is_flashing(2.2));
    }
}
