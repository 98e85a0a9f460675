//! RBJ TDF-II biquad lowpass and the per-cursor filter channel (spec §4.3).
//!
//! Grounded on the teacher's `rf-dsp::biquad` (RBJ coefficient formulas,
//! TDF-II state update) and `rf-dsp::smoothing` / `rf-engine::param_smoother`
//! for the per-block one-pole coefficient smoothing. The teacher's
//! `std::simd`-gated lanes are dropped — this crate targets stable Rust and
//! a stereo pair per call is cheap enough scalar.

use crate::{Processor, StereoProcessor};
use gs_core::Sample;

/// Denormal flush offset summed into every input sample (spec §4.3).
const DC_FLUSH: f64 = 1e-24;

/// RBJ biquad coefficients (Direct Form, normalized by `a0`).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    pub fn lowpass(fc: f64, q: f64, sr: f64) -> Self {
        let omega = 2.0 * std::f64::consts::PI * fc / sr;
        let sin_omega = omega.sin();
        let cos_omega = omega.cos();
        let alpha = sin_omega / (2.0 * q);

        let b0 = (1.0 - cos_omega) / 2.0;
        let b1 = 1.0 - cos_omega;
        let b2 = (1.0 - cos_omega) / 2.0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_omega;
        let a2 = 1.0 - alpha;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

/// A single Transposed Direct-Form II biquad with independent L/R state.
#[derive(Debug, Clone, Default)]
pub struct BiquadLp {
    coeffs: BiquadCoeffs,
    z1_l: f64,
    z2_l: f64,
    z1_r: f64,
    z2_r: f64,
}

impl BiquadLp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_coeffs(&mut self, coeffs: BiquadCoeffs) {
        self.coeffs = coeffs;
    }

    #[inline]
    pub fn process(&mut self, left: f64, right: f64) -> (f64, f64) {
        let c = &self.coeffs;

        let yl = c.b0 * left + self.z1_l;
        self.z1_l = c.b1 * left - c.a1 * yl + self.z2_l;
        self.z2_l = c.b2 * left - c.a2 * yl;

        let yr = c.b0 * right + self.z1_r;
        self.z1_r = c.b1 * right - c.a1 * yr + self.z2_r;
        self.z2_r = c.b2 * right - c.a2 * yr;

        (yl, yr)
    }

    pub fn reset(&mut self) {
        self.z1_l = 0.0;
        self.z2_l = 0.0;
        self.z1_r = 0.0;
        self.z2_r = 0.0;
    }
}

/// Cascade of one or two `BiquadLp` stages (12 or 24 dB/oct), with
/// per-block smoothing of `fc`/`q` and a pre-filter `tanh` drive stage
/// (spec §4.3).
#[derive(Debug, Clone)]
pub struct FilterChannel {
    stages: Vec<BiquadLp>,
    sr: f64,
    tau_ms: f64,
    smoothed_fc: f64,
    smoothed_q: f64,
    drive: f32,
}

impl FilterChannel {
    pub fn new(sr: f64, tau_ms: f64, initial_fc: f64, initial_q: f64) -> Self {
        let fc = initial_fc.clamp(15.0, 0.45 * sr);
        let q = initial_q.max(0.25);
        let mut stage = BiquadLp::new();
        stage.set_coeffs(BiquadCoeffs::lowpass(fc, q, sr));
        Self {
            stages: vec![stage],
            sr,
            tau_ms: tau_ms.max(0.1),
            smoothed_fc: fc,
            smoothed_q: q,
            drive: 1.0,
        }
    }

    /// `slope` is 12 (one stage) or 24 (two cascaded stages) dB/oct; any
    /// other value falls back to 12.
    pub fn set_slope(&mut self, slope: u16) {
        let wanted = if slope >= 24 { 2 } else { 1 };
        while self.stages.len() < wanted {
            let mut stage = BiquadLp::new();
            stage.set_coeffs(BiquadCoeffs::lowpass(self.smoothed_fc, self.smoothed_q, self.sr));
            self.stages.push(stage);
        }
        self.stages.truncate(wanted.max(1));
    }

    /// Advance the smoother by one block and recompute coefficients. Called
    /// once per block (spec §4.3: "parameters change no more than once per
    /// block").
    pub fn update_block(&mut self, target_fc: f64, target_q: f64, drive: f32, block_frames: usize) {
        let fc = target_fc.clamp(15.0, 0.45 * self.sr);
        let q = target_q.max(0.25);

        let block_secs = block_frames as f64 / self.sr;
        let k = 1.0 - (-block_secs / (self.tau_ms / 1000.0)).exp();
        self.smoothed_fc += (fc - self.smoothed_fc) * k;
        self.smoothed_q += (q - self.smoothed_q) * k;
        self.drive = drive.max(1.0);

        let coeffs = BiquadCoeffs::lowpass(self.smoothed_fc, self.smoothed_q, self.sr);
        for stage in &mut self.stages {
            stage.set_coeffs(coeffs);
        }
    }

    #[inline]
    pub fn process_stereo(&mut self, left: Sample, right: Sample) -> (Sample, Sample) {
        let mut l = left as f64 + DC_FLUSH;
        let mut r = right as f64 + DC_FLUSH;

        if self.drive > 1.0 {
            l = (l * self.drive as f64).tanh();
            r = (r * self.drive as f64).tanh();
        }

        for stage in &mut self.stages {
            (l, r) = stage.process(l, r);
        }

        (l as Sample, r as Sample)
    }
}

impl Processor for FilterChannel {
    fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }

    fn latency(&self) -> usize {
        0
    }
}

impl StereoProcessor for FilterChannel {
    fn process_sample(&mut self, left: Sample, right: Sample) -> (Sample, Sample) {
        self.process_stereo(left, right)
    }
}
