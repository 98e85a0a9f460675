//! Construction config (spec §6) and the fatal-vs-recoverable validation
//! split from spec §4.10 / §7.
//!
//! Mirrors the teacher's `AudioConfig`/`RecordingConfig` style: a plain
//! struct with `serde` derives and defaulted fields, validated once at
//! construction rather than per block.

use gs_core::{EngineError, EngineResult};
use gs_dsp::limiter::LimiterConfig as DspLimiterConfig;
use serde::{Deserialize, Serialize};

fn default_max_grains() -> usize {
    1024
}
fn default_env_table() -> usize {
    1024
}
fn default_filter_tau_ms() -> f64 {
    25.0
}
fn default_kill_tail_ms() -> f64 {
    28.0
}
fn default_gain_tau_ms() -> f64 {
    20.0
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterConfig {
    pub lookahead_ms: f64,
    pub ceiling: f32,
    pub release_ms: f64,
    pub master_trim: f32,
    pub extra: usize,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        let d = DspLimiterConfig::default();
        Self {
            lookahead_ms: d.lookahead_ms,
            ceiling: d.ceiling,
            release_ms: d.release_ms,
            master_trim: d.master_trim,
            extra: d.extra,
        }
    }
}

impl From<LimiterConfig> for DspLimiterConfig {
    fn from(c: LimiterConfig) -> Self {
        DspLimiterConfig {
            lookahead_ms: c.lookahead_ms,
            ceiling: c.ceiling,
            release_ms: c.release_ms,
            master_trim: c.master_trim,
            extra: c.extra,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sr: f64,
    #[serde(default = "default_max_grains")]
    pub max_grains: usize,
    #[serde(default = "default_env_table")]
    pub env_table: usize,
    #[serde(default = "default_filter_tau_ms")]
    pub filter_tau_ms: f64,
    pub limiter: LimiterConfig,
    #[serde(default = "default_kill_tail_ms")]
    pub kill_tail_ms: f64,
    #[serde(default = "default_gain_tau_ms")]
    pub gain_tau_ms: f64,
    /// `None` means "auto": `max(24, 32 * sr / 48000)` (spec §4.4).
    pub max_spawn_per_block: Option<u32>,
    /// Largest block size the caller expects, used to size the limiter
    /// ring and mixing buses up front so growth on the audio thread is rare
    /// (spec §5 allocation rules).
    pub max_block_hint: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sr: 48_000.0,
            max_grains: default_max_grains(),
            env_table: default_env_table(),
            filter_tau_ms: default_filter_tau_ms(),
            limiter: LimiterConfig::default(),
            kill_tail_ms: default_kill_tail_ms(),
            gain_tau_ms: default_gain_tau_ms(),
            max_spawn_per_block: None,
            max_block_hint: 2048,
        }
    }
}

impl EngineConfig {
    pub fn new(sr: f64) -> Self {
        Self {
            sr,
            ..Default::default()
        }
    }

    /// Fatal validation (spec §4.10): sample rate must be positive, the
    /// grain pool must hold at least one grain.
    pub fn validate(&self) -> EngineResult<()> {
        if !(self.sr > 0.0) || !self.sr.is_finite() {
            return Err(EngineError::InvalidSampleRate(self.sr));
        }
        if self.max_grains < 1 {
            return Err(EngineError::InvalidGrainCapacity(self.max_grains));
        }
        Ok(())
    }

    /// `S_max = max(24, 32 * sr / 48000)` unless overridden (spec §4.4).
    pub fn max_spawn_per_block(&self) -> u32 {
        self.max_spawn_per_block.unwrap_or_else(|| {
            let auto = (32.0 * self.sr / 48_000.0).ceil() as u32;
            auto.max(24)
        })
    }
}
