//! Per-window RMS loudness map (spec §3 C5), used by the grain spawner for
//! gain compensation (spec §4.5).

#[derive(Debug, Clone)]
pub struct LoudnessMap {
    rms: Vec<f32>,
    win: usize,
    sr: f64,
}

impl LoudnessMap {
    pub fn new(rms: Vec<f32>, win: usize, sr: f64) -> Self {
        debug_assert!(rms.iter().all(|&v| v >= 0.0));
        Self { rms, win: win.max(1), sr }
    }

    pub fn num_windows(&self) -> usize {
        self.rms.len()
    }

    /// Nearest-window RMS lookup for a source-time position in seconds.
    pub fn rms_at(&self, t_secs: f64) -> f32 {
        if self.rms.is_empty() || self.sr <= 0.0 {
            return 0.0;
        }
        let idx = ((t_secs * self.sr) / self.win as f64).floor().max(0.0) as usize;
        self.rms[idx.min(self.rms.len() - 1)]
    }
}

/// Gain compensation target/exponent (spec §4.5).
pub const COMP_TARGET: f32 = 0.12;
pub const COMP_GAMMA: f32 = 0.6;
pub const COMP_EPSILON: f32 = 1e-4;

/// `g_comp = (target / max(ε, rms_at(t0)))^γ`, or `1.0` with no map.
pub fn gain_compensation(map: Option<&LoudnessMap>, t0_secs: f64) -> f32 {
    match map {
        Some(m) => {
            let rms = m.rms_at(t0_secs).max(COMP_EPSILON);
            (COMP_TARGET / rms).powf(COMP_GAMMA)
        }
        None => 1.0,
    }
}
