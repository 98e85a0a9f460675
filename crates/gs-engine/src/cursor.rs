//! Per-cursor runtime state and the `Idle`/`AutoPlaying`/`NoteHeld`/
//! `SoftKilling` state machine (spec §3, §4.9).
//!
//! Grounded on the teacher's `rf-engine::preview::PreviewVoice` fixed-array
//! voice state (an `active`/fading struct whose transitions are applied as
//! discrete methods rather than recomputed from scratch every block) and
//! reusing `gs_dsp::smoothing::OnePole` for the per-cursor gain ramp instead
//! of hand-rolling a second one-pole.

use crate::polyphony::HeldNotes;
use gs_dsp::smoothing::OnePole;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorPhase {
    Idle,
    AutoPlaying,
    NoteHeld,
    SoftKilling,
}

/// Everything about one cursor that persists block-to-block on the audio
/// thread (as opposed to `CursorParams`, which is refreshed from the
/// parameter plane every block).
pub struct CursorRuntime {
    pub position: f64,
    pub lfo_phase: f64,
    /// Frames remaining until the scheduler's next spawn draw.
    pub countdown: f64,
    pub held: HeldNotes,
    pub gain_smooth: OnePole,
    pub phase: CursorPhase,
    pending_kill_request: bool,
}

impl CursorRuntime {
    pub fn new() -> Self {
        Self {
            position: 0.0,
            lfo_phase: 0.0,
            countdown: 0.0,
            held: HeldNotes::new(),
            gain_smooth: OnePole::new(0.0),
            phase: CursorPhase::Idle,
            pending_kill_request: false,
        }
    }

    pub fn scheduling_active(&self) -> bool {
        matches!(self.phase, CursorPhase::AutoPlaying | CursorPhase::NoteHeld)
    }

    pub fn apply_set_playing(&mut self, playing: bool, live_grains: usize) {
        if matches!(self.phase, CursorPhase::SoftKilling) {
            return;
        }
        if playing {
            if matches!(self.phase, CursorPhase::Idle) {
                self.phase = CursorPhase::AutoPlaying;
            }
        } else if self.held.is_empty() && live_grains == 0 {
            self.phase = CursorPhase::Idle;
        }
    }

    pub fn note_on(&mut self, semitone_offset: f64) {
        self.held.note_on(semitone_offset);
        if !matches!(self.phase, CursorPhase::SoftKilling) {
            self.phase = CursorPhase::NoteHeld;
        }
    }

    pub fn note_off(&mut self, semitone_offset: f64, tolerance: f64, global_playing: bool) {
        self.held.note_off(semitone_offset, tolerance);
        self.resolve_after_note_change(global_playing);
    }

    pub fn clear_kb_notes(&mut self, global_playing: bool) {
        self.held.clear();
        self.resolve_after_note_change(global_playing);
    }

    fn resolve_after_note_change(&mut self, global_playing: bool) {
        if matches!(self.phase, CursorPhase::SoftKilling) {
            return;
        }
        self.phase = if !self.held.is_empty() {
            CursorPhase::NoteHeld
        } else if global_playing {
            CursorPhase::AutoPlaying
        } else {
            CursorPhase::Idle
        };
    }

    /// `kill_cursor_grains`: enter `SoftKilling` from any state.
    pub fn request_kill(&mut self) {
        self.phase = CursorPhase::SoftKilling;
        self.pending_kill_request = true;
    }

    /// One-shot edge trigger consumed by the render step, which truncates
    /// every live grain of this cursor to a short tail the first block
    /// after a kill request.
    pub fn take_pending_kill(&mut self) -> bool {
        std::mem::replace(&mut self.pending_kill_request, false)
    }

    /// Called once per block after grain render: leaves `SoftKilling` once
    /// this cursor has no grains left.
    pub fn resolve_after_render(&mut self, live_grains: usize, global_playing: bool) {
        if matches!(self.phase, CursorPhase::SoftKilling) && live_grains == 0 {
            self.phase = if !self.held.is_empty() {
                CursorPhase::NoteHeld
            } else if global_playing {
                CursorPhase::AutoPlaying
            } else {
                CursorPhase::Idle
            };
        }
    }

    /// Round-robin draw from the held-note set, or `0` semitones if empty.
    pub fn next_semitone(&mut self) -> f64 {
        self.held.next_offset().unwrap_or(0.0)
    }

    pub fn advance_position(&mut self, scan_speed: f64, block_frames: usize, sr: f64) {
        if sr <= 0.0 {
            return;
        }
        let delta = scan_speed * (block_frames as f64 / sr);
        self.position = (self.position + delta).rem_euclid(1.0);
    }

    pub fn advance_lfo(&mut self, lfo_freq: f64, block_frames: usize, sr: f64) {
        if sr <= 0.0 {
            return;
        }
        self.lfo_phase += std::f64::consts::TAU * lfo_freq * (block_frames as f64 / sr);
        self.lfo_phase %= std::f64::consts::TAU;
    }
}

impl Default for CursorRuntime {
    fn default() -> Self {
        Self::new()
    }
}
