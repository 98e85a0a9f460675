//! Struct-of-arrays grain pool (spec §3 C6, §4.6): up to `MAX_GRAINS` live
//! grains, O(1) allocation by push and O(1) deallocation by swap-remove.
//!
//! Grounded on the teacher's `rf-dsp::timestretch::granular::GranularProcessor`
//! (a flat `Vec<Grain>` with swap-remove deallocation) but reshaped from
//! array-of-structs to struct-of-arrays per the per-field layout spec.md §3
//! calls for, and generalized from one playhead to three cursors sharing one
//! pool, each grain tagged with `cursor_id`.

use gs_core::StereoBuffer;
use gs_dsp::hann::HannTable;

use crate::source::SourceBuffer;

/// Struct-of-arrays grain pool. All vectors are kept in lock-step and sized
/// to `capacity` at construction; no vector grows past that after that.
pub struct GrainPool {
    cursor_id: Vec<u8>,
    phase: Vec<f64>,
    inc: Vec<f32>,
    env_pos: Vec<u32>,
    env_len: Vec<u32>,
    pan_l: Vec<f32>,
    pan_r: Vec<f32>,
    gain_comp: Vec<f32>,
    capacity: usize,
}

impl GrainPool {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            cursor_id: Vec::with_capacity(capacity),
            phase: Vec::with_capacity(capacity),
            inc: Vec::with_capacity(capacity),
            env_pos: Vec::with_capacity(capacity),
            env_len: Vec::with_capacity(capacity),
            pan_l: Vec::with_capacity(capacity),
            pan_r: Vec::with_capacity(capacity),
            gain_comp: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.cursor_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursor_id.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    pub fn count_for_cursor(&self, cursor_id: u8) -> usize {
        self.cursor_id.iter().filter(|&&c| c == cursor_id).count()
    }

    /// Spawns one grain at `env_pos = 0`. Returns `false` (spawn silently
    /// dropped, spec §4.10 `Capacity`) if the pool is full.
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        &mut self,
        cursor_id: u8,
        phase: f64,
        inc: f32,
        env_len: u32,
        pan_l: f32,
        pan_r: f32,
        gain_comp: f32,
    ) -> bool {
        if self.is_full() || env_len == 0 {
            return false;
        }
        self.cursor_id.push(cursor_id);
        self.phase.push(phase);
        self.inc.push(inc.max(f32::MIN_POSITIVE));
        self.env_pos.push(0);
        self.env_len.push(env_len);
        self.pan_l.push(pan_l);
        self.pan_r.push(pan_r);
        self.gain_comp.push(gain_comp);
        true
    }

    fn swap_remove(&mut self, idx: usize) {
        self.cursor_id.swap_remove(idx);
        self.phase.swap_remove(idx);
        self.inc.swap_remove(idx);
        self.env_pos.swap_remove(idx);
        self.env_len.swap_remove(idx);
        self.pan_l.swap_remove(idx);
        self.pan_r.swap_remove(idx);
        self.gain_comp.swap_remove(idx);
    }

    /// Soft-kill (spec §4.6): truncate every live grain of `cursor_id` so it
    /// finishes within `tail` frames of its current position.
    pub fn truncate_tail_for_cursor(&mut self, cursor_id: u8, tail: u32) {
        for i in 0..self.len() {
            if self.cursor_id[i] == cursor_id {
                self.env_len[i] = self.env_len[i].min(self.env_pos[i] + tail);
            }
        }
    }

    /// Renders up to `block_frames` for every live grain into the owning
    /// cursor's bus, advancing phase/envelope position and freeing grains
    /// that complete this block. `cursor_gain` is the per-cursor smoothed
    /// gain (spec §4.6 "per-cursor gain smoothing").
    pub fn render_block(
        &mut self,
        source: &SourceBuffer,
        hann: &HannTable,
        cursor_gain: [f32; 3],
        block_frames: usize,
        buses: &mut [StereoBuffer; 3],
    ) {
        let mut i = 0;
        while i < self.len() {
            let frames_left = (self.env_len[i] - self.env_pos[i]) as usize;
            let n = frames_left.min(block_frames);
            let cursor = self.cursor_id[i] as usize;
            let bus = &mut buses[cursor.min(2)];
            let gain = self.gain_comp[i] * cursor_gain[cursor.min(2)];

            let mut phase = self.phase[i];
            let inc = self.inc[i] as f64;
            let mut env_pos = self.env_pos[i];
            let env_len = self.env_len[i];
            let pan_l = self.pan_l[i];
            let pan_r = self.pan_r[i];

            for k in 0..n {
                let env = hann.lookup(env_pos, env_len);
                let sl = source.sample_at(true, phase);
                let sr = source.sample_at(false, phase);
                let weight = env * gain;
                bus.left_mut()[k] += sl * weight * pan_l;
                bus.right_mut()[k] += sr * weight * pan_r;
                phase += inc;
                env_pos += 1;
            }

            self.phase[i] = phase;
            self.env_pos[i] = env_pos;

            if env_pos >= env_len {
                self.swap_remove(i);
            } else {
                i += 1;
            }
        }
    }
}
