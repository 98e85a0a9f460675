//! gs-engine: the realtime granular render core.
//!
//! Owns the grain pool, Poisson scheduler, per-cursor filter bank, limiter,
//! parameter plane, and the inbox/outbox message queues, and drives them all
//! from one `GranularEngine::process_block` call per realtime callback.
//! Nothing in this crate allocates, blocks, or panics once
//! `GranularEngine::new` has returned (spec §1, §5).
//!
//! ## Modules
//! - `config` — construction config (spec §6)
//! - `source` — stereo source buffer storage (spec §3 C1)
//! - `loudness` — per-window RMS map and grain gain compensation (spec §3 C5, §4.5)
//! - `params` — wait-free parameter plane (spec §3 C7, §5)
//! - `polyphony` — per-cursor held-note set (spec §3 C8)
//! - `cursor` — per-cursor runtime state and state machine (spec §3, §4.9)
//! - `grain` — struct-of-arrays grain pool and renderer (spec §3 C6, §4.6)
//! - `scheduler` — Poisson scheduler with backpressure (spec §3 C4, §4.4)
//! - `inbox` — message inbox (spec §3 C11, §6)
//! - `outbox` — telemetry outbox (spec §3 C12, §6)
//! - `collaborators` — out-of-scope collaborator trait seams (spec §6)
//! - `engine` — render core orchestration (spec §2 C9)

pub mod collaborators;
pub mod config;
pub mod cursor;
pub mod engine;
pub mod grain;
pub mod inbox;
pub mod loudness;
pub mod outbox;
pub mod params;
pub mod polyphony;
pub mod scheduler;
pub mod source;

pub use config::EngineConfig;
pub use cursor::{CursorPhase, CursorRuntime};
pub use engine::{EngineHandles, GranularEngine};
pub use grain::GrainPool;
pub use inbox::Message;
pub use loudness::LoudnessMap;
pub use outbox::Event;
pub use params::{CursorParams, ParamPlane};
pub use polyphony::HeldNotes;
pub use source::SourceBuffer;
