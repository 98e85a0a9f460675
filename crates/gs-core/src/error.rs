//! Error taxonomy for the granular engine (spec §7).
//!
//! Only `Config` is ever returned as an `Err` from the realtime path —
//! `Input`, `Capacity`, `State` and `RingResize` are recovered locally by
//! the audio thread and surfaced, if at all, through telemetry counters.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid construction config: {0}")]
    Config(String),

    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(f64),

    #[error("max_grains must be >= 1, got {0}")]
    InvalidGrainCapacity(usize),
}

pub type EngineResult<T> = Result<T, EngineError>;
