//! Typed, uninstantiated boundary for the out-of-scope collaborators named
//! in spec §1/§6. These document the contract the core expects without
//! implementing the excluded features (UI, file decode, mic capture, MIDI).
//!
//! Grounded on the teacher's `rf-plugin`/`rf-file` crates, which expose thin
//! trait seams for out-of-process collaborators (plugin hosts, file
//! importers) rather than inlining that glue into the DSP crates.

use crate::source::SourceBuffer;

/// Delivers a decoded stereo PCM buffer plus its native sample rate.
/// Implemented by the file-decoding front-end; not part of this core.
pub trait SourceDecoder {
    fn decode(&self) -> Option<SourceBuffer>;
}

/// Delivers a mono or stereo PCM buffer accumulated over a capture window.
/// Implemented by the microphone-capture front-end; not part of this core.
pub trait MicCapture {
    fn take_capture(&mut self) -> Option<SourceBuffer>;
}

/// Receives the mixed output as per-block chunks for export or pass-through
/// recording. Implemented by the host application; not part of this core.
pub trait OutputRecorder {
    fn record_chunk(&mut self, left: &[f32], right: &[f32]);
}

/// Issues note on/off, clear, and kill messages and selects the UI-focused
/// cursor. Implemented by the MIDI device layer / keyboard mapping front
/// end; not part of this core.
pub trait MidiKeyboardFront {
    fn active_cursor(&self) -> u8;
}
