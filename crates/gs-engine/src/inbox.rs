//! Message inbox (spec §3 C11, §6): a single-producer/single-consumer queue
//! of tagged messages applied at block boundaries.
//!
//! Grounded on the teacher's `rf-audio::stream` UI-to-audio wiring, which
//! uses `rtrb::RingBuffer` for exactly this kind of control message passing
//! because it is wait-free in both directions and never allocates on push
//! or pop.

use std::sync::Arc;

use crate::loudness::LoudnessMap;
use crate::params::CursorParams;
use crate::source::SourceBuffer;

/// Tagged union of every inbox variant (spec §6 table). Dynamic-typed
/// dispatch in the original becomes this exhaustively-matched enum (spec
/// §9).
///
/// Both `SetBuffer` and `SetLoudnessMap` carry their payload as an `Arc`
/// (built by the control thread) rather than raw fields, so applying either
/// at block start is a pointer-width assignment with no allocation on the
/// audio thread — the same reasoning as the buffer swap slot in spec §5.
#[derive(Debug, Clone)]
pub enum Message {
    SetBuffer(Arc<SourceBuffer>),
    SetLoudnessMap(Arc<LoudnessMap>),
    SetParamsAll([CursorParams; 3]),
    SetParamsFor { cursor: u8, params: CursorParams },
    /// `pos[i]` is `None` when that index wasn't provided; all provided
    /// indices apply, capped at 3 (spec §9 generalization of `set_positions`).
    SetPositions([Option<f64>; 3]),
    SetPlaying(bool),
    NoteOn { cursor: u8, semis: f64 },
    NoteOff { cursor: u8, semis: f64 },
    NoteOnAll(f64),
    NoteOffAll(f64),
    ClearKbNotes(u8),
    /// `cursor == None` means "all cursors" (spec table's `-1` sentinel).
    KillCursorGrains(Option<u8>),
    Ping,
}

/// Producer-side handle, used by the control thread.
pub struct InboxProducer {
    inner: rtrb::Producer<Message>,
}

impl InboxProducer {
    /// Pushes a message. Returns `false` if the queue is full — per spec
    /// §4.10 the newest inbox message is dropped rather than blocking.
    pub fn push(&mut self, msg: Message) -> bool {
        self.inner.push(msg).is_ok()
    }
}

/// Consumer-side handle, owned by the audio context and drained once at the
/// top of every block.
pub struct InboxConsumer {
    inner: rtrb::Consumer<Message>,
}

impl InboxConsumer {
    pub fn drain(&mut self) -> impl Iterator<Item = Message> + '_ {
        std::iter::from_fn(move || self.inner.pop().ok())
    }

    /// Pops a single message without allocating, for use on the audio thread
    /// where `drain()`'s iterator adapter is fine off the realtime path but a
    /// `collect()` into a `Vec` is not.
    pub fn pop(&mut self) -> Option<Message> {
        self.inner.pop().ok()
    }
}

/// Builds a connected producer/consumer pair sized to `capacity` messages.
pub fn channel(capacity: usize) -> (InboxProducer, InboxConsumer) {
    let (producer, consumer) = rtrb::RingBuffer::new(capacity.max(1));
    (InboxProducer { inner: producer }, InboxConsumer { inner: consumer })
}
