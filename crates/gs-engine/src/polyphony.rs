//! Held-note polyphony per cursor (spec §3 C8, §4.9): an ordered multiset of
//! semitone offsets with round-robin consumption, capped so one cursor can
//! never spawn grains on an unbounded number of simultaneous notes.
//!
//! Grounded on the teacher's `rf-engine::preview::PreviewEngine` fixed
//! `[PreviewVoice; MAX_VOICES]` array (a capped voice list with oldest-steal
//! allocation) — generalized here to a held-note multiset consumed
//! round-robin within a single grain-cursor rather than discrete synth
//! voices.

pub const MAX_HELD_NOTES: usize = 16;

/// Tolerance used to treat two semitone offsets as "the same note" (handles
/// float round-trip through MIDI note number -> offset conversion).
const NOTE_MATCH_TOLERANCE: f64 = 1e-6;

/// Insertion-ordered semitone offsets currently held down for one cursor.
#[derive(Debug, Clone, Default)]
pub struct HeldNotes {
    offsets: Vec<f64>,
    next: usize,
}

impl HeldNotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Adds a held note. A duplicate of an already-held offset is a no-op
    /// (spec §4.5). Beyond `MAX_HELD_NOTES` the oldest note is evicted to
    /// make room, matching the teacher's "steal oldest" allocator policy.
    pub fn note_on(&mut self, semitone_offset: f64) {
        if self
            .offsets
            .iter()
            .any(|&o| (o - semitone_offset).abs() <= NOTE_MATCH_TOLERANCE)
        {
            return;
        }
        if self.offsets.len() >= MAX_HELD_NOTES {
            self.offsets.remove(0);
            if self.next > 0 {
                self.next -= 1;
            }
        }
        self.offsets.push(semitone_offset);
    }

    /// Removes the first held note within `tolerance` semitones of
    /// `semitone_offset` (handles float round-trip through MIDI note
    /// number -> offset conversion).
    pub fn note_off(&mut self, semitone_offset: f64, tolerance: f64) {
        if let Some(idx) = self
            .offsets
            .iter()
            .position(|&o| (o - semitone_offset).abs() <= tolerance)
        {
            self.offsets.remove(idx);
            if self.next > idx {
                self.next -= 1;
            }
        }
    }

    pub fn clear(&mut self) {
        self.offsets.clear();
        self.next = 0;
    }

    /// Round-robin: returns the next offset to spawn a grain against and
    /// advances the cursor. `None` if nothing is held.
    pub fn next_offset(&mut self) -> Option<f64> {
        if self.offsets.is_empty() {
            return None;
        }
        let idx = self.next % self.offsets.len();
        self.next = (self.next + 1) % self.offsets.len();
        Some(self.offsets[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_robins_across_held_notes() {
        let mut held = HeldNotes::new();
        held.note_on(0.0);
        held.note_on(7.0);
        held.note_on(12.0);
        let seq: Vec<f64> = (0..6).map(|_| held.next_offset().unwrap()).collect();
        assert_eq!(seq, vec![0.0, 7.0, 12.0, 0.0, 7.0, 12.0]);
    }

    #[test]
    fn note_off_removes_matching_offset() {
        let mut held = HeldNotes::new();
        held.note_on(0.0);
        held.note_on(7.0);
        held.note_off(7.0, 1e-6);
        assert_eq!(held.len(), 1);
        assert_eq!(held.next_offset(), Some(0.0));
    }

    #[test]
    fn duplicate_note_on_is_a_no_op() {
        let mut held = HeldNotes::new();
        held.note_on(7.0);
        held.note_on(7.0);
        held.note_on(7.0);
        assert_eq!(held.len(), 1);
    }

    #[test]
    fn caps_at_max_held_notes() {
        let mut held = HeldNotes::new();
        for i in 0..(MAX_HELD_NOTES + 4) {
            held.note_on(i as f64);
        }
        assert_eq!(held.len(), MAX_HELD_NOTES);
    }

    #[test]
    fn empty_returns_none() {
        let mut held = HeldNotes::new();
        assert_eq!(held.next_offset(), None);
    }
}
