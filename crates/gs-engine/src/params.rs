//! Parameter plane (spec §3, §5 C7): a wait-free snapshot of `3×K` floats
//! shared between the control thread (writer) and the audio thread
//! (reader).
//!
//! Grounded on the teacher's `rf-core::params::AtomicParam` /
//! `rf-dsp::smoothing::SmoothedParam` (an `AtomicU64` storing
//! `f64::to_bits`, individual relaxed stores from the writer). The
//! novelty here is just that there are `3 × K` of them and the reader
//! keeps a private "last good" shadow per field (spec §9) instead of
//! clamping at write time.

use std::sync::atomic::{AtomicU64, Ordering};

pub const NUM_CURSORS: usize = 3;
pub const NUM_PARAM_FIELDS: usize = 15;

/// Per-cursor parameter record (spec §3 table). All fields are plain `f64`;
/// validity (finiteness) is enforced on read by `ParamPlane::snapshot`, not
/// on construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorParams {
    pub attack: f64,
    pub release: f64,
    pub grain_size: f64,
    pub density: f64,
    pub spread: f64,
    pub pan: f64,
    pub pitch: f64,
    pub cutoff: f64,
    pub q: f64,
    pub drive: f64,
    /// 12 or 24 (dB/oct); anything else behaves as 12 downstream.
    pub slope: f64,
    pub lfo_freq: f64,
    pub lfo_depth: f64,
    pub scan_speed: f64,
    pub gain: f64,
}

impl Default for CursorParams {
    fn default() -> Self {
        Self {
            attack: 0.01,
            release: 0.05,
            grain_size: 1.0,
            density: 10.0,
            spread: 0.0,
            pan: 0.0,
            pitch: 1.0,
            cutoff: 8_000.0,
            q: 0.2,
            drive: 0.0,
            slope: 12.0,
            lfo_freq: 0.0,
            lfo_depth: 0.0,
            scan_speed: 0.0,
            gain: 1.0,
        }
    }
}

impl CursorParams {
    pub fn as_array(&self) -> [f64; NUM_PARAM_FIELDS] {
        [
            self.attack,
            self.release,
            self.grain_size,
            self.density,
            self.spread,
            self.pan,
            self.pitch,
            self.cutoff,
            self.q,
            self.drive,
            self.slope,
            self.lfo_freq,
            self.lfo_depth,
            self.scan_speed,
            self.gain,
        ]
    }

    pub fn from_array(a: [f64; NUM_PARAM_FIELDS]) -> Self {
        Self {
            attack: a[0],
            release: a[1],
            grain_size: a[2],
            density: a[3],
            spread: a[4],
            pan: a[5],
            pitch: a[6],
            cutoff: a[7],
            q: a[8],
            drive: a[9],
            slope: a[10],
            lfo_freq: a[11],
            lfo_depth: a[12],
            scan_speed: a[13],
            gain: a[14],
        }
    }
}

/// `3 × K` atomic cells, one `CursorParams` per cursor.
pub struct ParamPlane {
    cells: [[AtomicU64; NUM_PARAM_FIELDS]; NUM_CURSORS],
}

impl ParamPlane {
    pub fn new(defaults: [CursorParams; NUM_CURSORS]) -> Self {
        let cells = std::array::from_fn(|c| {
            let arr = defaults[c].as_array();
            std::array::from_fn(|f| AtomicU64::new(arr[f].to_bits()))
        });
        Self { cells }
    }

    /// Control-thread API: update one field of one cursor.
    pub fn set_field(&self, cursor: usize, field: usize, value: f64) {
        if cursor < NUM_CURSORS && field < NUM_PARAM_FIELDS {
            self.cells[cursor][field].store(value.to_bits(), Ordering::Relaxed);
        }
    }

    /// Control-thread API: overwrite an entire cursor's record.
    pub fn set_cursor(&self, cursor: usize, params: &CursorParams) {
        if cursor >= NUM_CURSORS {
            return;
        }
        let arr = params.as_array();
        for (field, value) in arr.iter().enumerate() {
            self.cells[cursor][field].store(value.to_bits(), Ordering::Relaxed);
        }
    }

    pub fn set_all(&self, params: &[CursorParams; NUM_CURSORS]) {
        for (cursor, p) in params.iter().enumerate() {
            self.set_cursor(cursor, p);
        }
    }

    /// Audio-thread API: take a per-block snapshot, substituting the
    /// caller's `shadow` value for any field that reads as non-finite, then
    /// updating `shadow` to the accepted values (spec §4.10, §9).
    pub fn snapshot(&self, cursor: usize, shadow: &mut CursorParams) -> CursorParams {
        let mut arr = shadow.as_array();
        for (field, slot) in arr.iter_mut().enumerate() {
            let bits = self.cells[cursor][field].load(Ordering::Relaxed);
            let v = f64::from_bits(bits);
            if v.is_finite() {
                *slot = v;
            }
        }
        let result = CursorParams::from_array(arr);
        *shadow = result;
        result
    }
}
