//! Source buffer storage (spec §1 C1, §3).
//!
//! A swap is delivered as the payload of `Message::SetBuffer` (see
//! `inbox.rs`) rather than through a separate locked slot — riding the same
//! wait-free SPSC queue as every other message keeps the "no block
//! straddles two buffers" invariant trivial: the engine only ever replaces
//! its `Arc<SourceBuffer>` while applying messages at the top of
//! `process_block`, never mid-block.

use gs_core::Sample;

/// Immutable (from the engine's view) stereo PCM buffer. Mono sources have
/// their single channel mirrored into both `left` and `right` at
/// construction so the grain renderer always reads two channels.
#[derive(Debug, Clone)]
pub struct SourceBuffer {
    channels: u8,
    sample_rate: f64,
    left: Vec<Sample>,
    right: Vec<Sample>,
}

impl SourceBuffer {
    /// `left`/`right` must already be the same length; pass the same slice
    /// twice for a mono source.
    pub fn new(channels: u8, sample_rate: f64, left: Vec<Sample>, right: Vec<Sample>) -> Self {
        debug_assert_eq!(left.len(), right.len());
        Self {
            channels: channels.clamp(1, 2),
            sample_rate,
            left,
            right,
        }
    }

    pub fn mono(sample_rate: f64, samples: Vec<Sample>) -> Self {
        let right = samples.clone();
        Self::new(1, sample_rate, samples, right)
    }

    pub fn empty(sample_rate: f64) -> Self {
        Self::new(1, sample_rate, Vec::new(), Vec::new())
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate > 0.0 {
            self.len() as f64 / self.sample_rate
        } else {
            0.0
        }
    }

    /// Linear-interpolated read at a fractional frame position, wrapping
    /// on buffer length (spec §4.6).
    #[inline]
    pub fn sample_at(&self, left_channel: bool, frac_frame: f64) -> Sample {
        let len = self.len();
        if len == 0 {
            return 0.0;
        }
        let wrapped = frac_frame.rem_euclid(len as f64);
        let i0 = wrapped.floor() as usize % len;
        let i1 = (i0 + 1) % len;
        let frac = wrapped - wrapped.floor();
        let buf = if left_channel { &self.left } else { &self.right };
        let a = buf[i0] as f64;
        let b = buf[i1] as f64;
        (a + (b - a) * frac) as Sample
    }

    /// RMS of channel 0 over `[start, start+win)` frames, used to seed a
    /// `LoudnessMap` (spec §4.5 `rms_at`).
    pub fn rms_window(&self, start: usize, win: usize) -> f32 {
        let len = self.len();
        if len == 0 || win == 0 {
            return 0.0;
        }
        let end = (start + win).min(len);
        if end <= start {
            return 0.0;
        }
        let sum_sq: f64 = self.left[start..end].iter().map(|&s| (s as f64).powi(2)).sum();
        ((sum_sq / (end - start) as f64).sqrt()) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_on_channel_length() {
        let buf = SourceBuffer::mono(48_000.0, vec![0.0, 1.0, 0.0, -1.0]);
        assert_eq!(buf.sample_at(true, 4.0), buf.sample_at(true, 0.0));
    }

    #[test]
    fn empty_buffer_reads_zero() {
        let buf = SourceBuffer::empty(48_000.0);
        assert_eq!(buf.sample_at(true, 0.5), 0.0);
        assert_eq!(buf.duration_secs(), 0.0);
    }

    #[test]
    fn interpolates_between_samples() {
        let buf = SourceBuffer::mono(48_000.0, vec![0.0, 2.0, 0.0, -2.0]);
        assert!((buf.sample_at(true, 0.5) - 1.0).abs() < 1e-6);
    }
}
