//! Render core (spec §3/§2 C9): per-block orchestration tying every other
//! module together — inbox, parameter snapshot, cursor advance, scheduler,
//! grain render, per-cursor filter, sum, limiter, telemetry.
//!
//! Grounded on the teacher's `rf-audio::engine` (the struct that owns every
//! per-block-allocated buffer and drives one `process_block`-shaped method
//! from the `cpal` callback) — generalized from one mix bus to three
//! per-cursor buses feeding a shared limiter.

use std::sync::Arc;

use gs_core::{EngineResult, Sample, StereoBuffer};
use gs_dsp::biquad::FilterChannel;
use gs_dsp::hann::{equal_power_pan, HannTable};
use gs_dsp::limiter::Limiter;
use gs_dsp::smoothing::OnePole;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::EngineConfig;
use crate::cursor::CursorRuntime;
use crate::grain::GrainPool;
use crate::inbox::{self, InboxConsumer, InboxProducer, Message};
use crate::loudness::{gain_compensation, LoudnessMap};
use crate::outbox::{self, Event, OutboxConsumer, OutboxProducer};
use crate::params::{CursorParams, ParamPlane};
use crate::scheduler;
use crate::source::SourceBuffer;

/// Control-thread handles returned alongside a freshly constructed engine:
/// the parameter plane (for direct per-field writes), the inbox producer,
/// and the outbox consumer.
pub struct EngineHandles {
    pub param_plane: Arc<ParamPlane>,
    pub inbox: InboxProducer,
    pub outbox: OutboxConsumer,
}

pub struct GranularEngine {
    sr: f64,
    config: EngineConfig,
    param_plane: Arc<ParamPlane>,
    shadows: [CursorParams; 3],
    cursors: [CursorRuntime; 3],
    filters: [FilterChannel; 3],
    grains: GrainPool,
    buffer: Arc<SourceBuffer>,
    loudness: Option<Arc<LoudnessMap>>,
    limiter: Limiter,
    cursor_buses: [StereoBuffer; 3],
    master: StereoBuffer,
    global_playing: bool,
    spawn_drop_count: u64,
    rng: StdRng,
    hann: HannTable,
    inbox: InboxConsumer,
    outbox: OutboxProducer,
}

impl GranularEngine {
    pub fn new(config: EngineConfig) -> EngineResult<(Self, EngineHandles)> {
        config.validate()?;
        let sr = config.sr;

        let param_plane = Arc::new(ParamPlane::new([CursorParams::default(); 3]));
        let (inbox_tx, inbox_rx) = inbox::channel(256);
        let (outbox_tx, outbox_rx) = outbox::channel(64, sr);
        let limiter = Limiter::new(sr, config.limiter.into(), config.max_block_hint);
        let hann = HannTable::new(config.env_table);
        let filters = std::array::from_fn(|_| FilterChannel::new(sr, config.filter_tau_ms, 8_000.0, 0.707));
        let cursor_buses = std::array::from_fn(|_| StereoBuffer::new(config.max_block_hint));

        let engine = Self {
            sr,
            config: config.clone(),
            param_plane: param_plane.clone(),
            shadows: [CursorParams::default(); 3],
            cursors: std::array::from_fn(|_| CursorRuntime::new()),
            filters,
            grains: GrainPool::new(config.max_grains),
            buffer: Arc::new(SourceBuffer::empty(sr)),
            loudness: None,
            limiter,
            cursor_buses,
            master: StereoBuffer::new(config.max_block_hint),
            global_playing: false,
            spawn_drop_count: 0,
            rng: StdRng::from_entropy(),
            hann,
            inbox: inbox_rx,
            outbox: outbox_tx,
        };

        Ok((
            engine,
            EngineHandles {
                param_plane,
                inbox: inbox_tx,
                outbox: outbox_rx,
            },
        ))
    }

    /// Count of grain spawns dropped so far because the pool was full
    /// (spec §7 `Capacity`), exposed for optional telemetry.
    pub fn spawn_drop_count(&self) -> u64 {
        self.spawn_drop_count
    }

    pub fn live_grain_count(&self) -> usize {
        self.grains.len()
    }

    pub fn live_grain_count_for_cursor(&self, cursor: usize) -> usize {
        self.grains.count_for_cursor(cursor as u8)
    }

    /// Renders one block. `out_left`/`out_right` must each be at least
    /// `block_frames` long; only the first `block_frames` samples are
    /// written.
    pub fn process_block(&mut self, block_frames: usize, out_left: &mut [Sample], out_right: &mut [Sample]) {
        debug_assert!(out_left.len() >= block_frames);
        debug_assert!(out_right.len() >= block_frames);
        if block_frames == 0 {
            return;
        }

        self.apply_inbox_messages();

        self.master.ensure_capacity(block_frames);
        self.master.clear(block_frames);
        for bus in &mut self.cursor_buses {
            bus.ensure_capacity(block_frames);
            bus.clear(block_frames);
        }

        let snaps: [CursorParams; 3] =
            std::array::from_fn(|c| self.param_plane.snapshot(c, &mut self.shadows[c]));

        for c in 0..3 {
            self.cursors[c].advance_position(snaps[c].scan_speed, block_frames, self.sr);
            self.cursors[c].advance_lfo(snaps[c].lfo_freq, block_frames, self.sr);

            let coeff = OnePole::block_coeff(self.config.gain_tau_ms, self.sr, block_frames);
            self.cursors[c].gain_smooth.advance(snaps[c].gain as f32, coeff);
        }

        // Spec §4.10: a missing/empty source buffer means zero output for
        // the block — short-circuit before the filter bank touches the
        // (already-zeroed) buses, since the filter's denormal-flush offset
        // would otherwise leave a non-exact-zero residue.
        if !self.buffer.is_empty() {
            self.spawn_and_render(block_frames, &snaps);
        }

        for c in 0..3 {
            let live = self.grains.count_for_cursor(c as u8);
            self.cursors[c].resolve_after_render(live, self.global_playing);
        }

        let (ml, mr) = self.master.channels_mut();
        let telemetry = self.limiter.process_block(&mut ml[..block_frames], &mut mr[..block_frames]);
        if self.limiter.did_resize() {
            log::warn!("limiter ring grew to accommodate a larger block");
        }

        out_left[..block_frames].copy_from_slice(&ml[..block_frames]);
        out_right[..block_frames].copy_from_slice(&mr[..block_frames]);

        let positions = [
            self.cursors[0].position as f32,
            self.cursors[1].position as f32,
            self.cursors[2].position as f32,
        ];
        self.outbox.push_throttled(Event::Positions { pos: positions }, block_frames);
        self.outbox.push_throttled(
            Event::Telemetry {
                tp_db: telemetry.tp_db,
                gr_db: telemetry.gr_db,
            },
            block_frames,
        );
    }

    fn spawn_and_render(&mut self, block_frames: usize, snaps: &[CursorParams; 3]) {
        let max_spawn = self.config.max_spawn_per_block();
        for c in 0..3 {
            if !self.cursors[c].scheduling_active() {
                continue;
            }
            let active = self.grains.count_for_cursor(c as u8);
            let spawns = scheduler::advance(
                &mut self.rng,
                &mut self.cursors[c].countdown,
                self.sr,
                snaps[c].density,
                active,
                self.config.max_grains,
                block_frames,
                max_spawn,
            );
            for _ in 0..spawns {
                self.spawn_grain(c, &snaps[c]);
            }
        }

        for c in 0..3 {
            if self.cursors[c].take_pending_kill() {
                let tail = ((self.config.kill_tail_ms / 1000.0) * self.sr).ceil().max(1.0) as u32;
                self.grains.truncate_tail_for_cursor(c as u8, tail);
            }
        }

        let cursor_gain: [f32; 3] = std::array::from_fn(|c| self.cursors[c].gain_smooth.value());
        self.grains
            .render_block(self.buffer.as_ref(), &self.hann, cursor_gain, block_frames, &mut self.cursor_buses);

        for c in 0..3 {
            let base_cutoff = snaps[c].cutoff.max(0.0);
            let lfo_mod = 1.0 + snaps[c].lfo_depth * self.cursors[c].lfo_phase.sin();
            let target_fc = (base_cutoff * lfo_mod).clamp(20.0, 0.45 * self.sr);
            let target_q = map_q(snaps[c].q);
            let drive = map_drive(snaps[c].drive);
            let slope = if snaps[c].slope >= 18.0 { 24 } else { 12 };

            self.filters[c].set_slope(slope);
            self.filters[c].update_block(target_fc, target_q, drive, block_frames);

            let (bl, br) = self.cursor_buses[c].channels_mut();
            for i in 0..block_frames {
                let (fl, fr) = self.filters[c].process_stereo(bl[i], br[i]);
                bl[i] = fl;
                br[i] = fr;
            }
        }

        let (ml, mr) = self.master.channels_mut();
        for bus in &self.cursor_buses {
            for i in 0..block_frames {
                ml[i] += bus.left()[i];
                mr[i] += bus.right()[i];
            }
        }
    }

    /// Grain spawn procedure (spec §4.5).
    fn spawn_grain(&mut self, cursor: usize, params: &CursorParams) {
        let dur = ((params.attack.max(0.0) + params.release.max(0.0)) * params.grain_size.max(0.0)).max(0.002);
        let env_len = (dur * self.sr).round().max(1.0) as u32;

        let src_duration = self.buffer.duration_secs();
        let spread = params.spread.max(0.0);
        let jitter = if spread > 0.0 { self.rng.gen_range(-spread..=spread) } else { 0.0 };
        let max_t0 = (src_duration - dur).max(0.0);
        let t0 = (self.cursors[cursor].position * src_duration + jitter).clamp(0.0, max_t0);

        let semis = self.cursors[cursor].next_semitone();
        let inc = params.pitch.max(0.0) * 2f64.powf(semis / 12.0) * (self.buffer.sample_rate() / self.sr);
        let inc = (inc as f32).max(f32::MIN_POSITIVE);

        let (pan_l, pan_r) = equal_power_pan(params.pan as f32);
        let gain_comp = gain_compensation(self.loudness.as_deref(), t0);
        let phase0 = t0 * self.buffer.sample_rate();

        let spawned = self
            .grains
            .spawn(cursor as u8, phase0, inc, env_len, pan_l, pan_r, gain_comp);
        if !spawned {
            self.spawn_drop_count = self.spawn_drop_count.saturating_add(1);
        }
    }

    fn apply_inbox_messages(&mut self) {
        while let Some(msg) = self.inbox.pop() {
            self.apply_one(msg);
        }
    }

    fn apply_one(&mut self, msg: Message) {
        match msg {
            Message::SetBuffer(buf) => self.buffer = buf,
            Message::SetLoudnessMap(map) => self.loudness = Some(map),
            Message::SetParamsAll(all) => self.param_plane.set_all(&all),
            Message::SetParamsFor { cursor, params } => {
                self.param_plane.set_cursor(cursor as usize, &params)
            }
            Message::SetPositions(positions) => {
                for (i, p) in positions.iter().enumerate().take(3) {
                    if let Some(v) = p {
                        self.cursors[i].position = v.rem_euclid(1.0);
                    }
                }
            }
            Message::SetPlaying(playing) => {
                self.global_playing = playing;
                for c in 0..3 {
                    let live = self.grains.count_for_cursor(c as u8);
                    self.cursors[c].apply_set_playing(playing, live);
                }
            }
            Message::NoteOn { cursor, semis } => {
                if let Some(c) = self.cursors.get_mut(cursor as usize) {
                    c.note_on(semis);
                }
            }
            Message::NoteOff { cursor, semis } => {
                let playing = self.global_playing;
                if let Some(c) = self.cursors.get_mut(cursor as usize) {
                    c.note_off(semis, 1e-6, playing);
                }
            }
            Message::NoteOnAll(semis) => {
                for c in &mut self.cursors {
                    c.note_on(semis);
                }
            }
            Message::NoteOffAll(semis) => {
                let playing = self.global_playing;
                for c in &mut self.cursors {
                    c.note_off(semis, 1e-6, playing);
                }
            }
            Message::ClearKbNotes(cursor) => {
                let playing = self.global_playing;
                if let Some(c) = self.cursors.get_mut(cursor as usize) {
                    c.clear_kb_notes(playing);
                }
            }
            Message::KillCursorGrains(target) => match target {
                Some(c) => {
                    if let Some(cur) = self.cursors.get_mut(c as usize) {
                        cur.request_kill();
                    }
                }
                None => {
                    for cur in &mut self.cursors {
                        cur.request_kill();
                    }
                }
            },
            Message::Ping => self.outbox.push_now(Event::Ready),
        }
    }
}

/// `q` is normalized `[0,1]`, log-mapped to `[0.3, 12]` (spec §3 table).
fn map_q(q_norm: f64) -> f64 {
    let q = q_norm.clamp(0.0, 1.0);
    0.3 * (12.0_f64 / 0.3).powf(q)
}

/// `drive` is normalized `[0,1]`, mapped to `[1, 10]` (spec §3 table).
fn map_drive(drive_norm: f64) -> f32 {
    (1.0 + drive_norm.clamp(0.0, 1.0) * 9.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_with_no_buffer_is_exact() {
        let (mut engine, mut handles) = GranularEngine::new(EngineConfig::new(48_000.0)).unwrap();
        handles.inbox.push(Message::SetPlaying(true));
        let mut l = vec![1.0f32; 128];
        let mut r = vec![1.0f32; 128];
        for _ in 0..10 {
            engine.process_block(128, &mut l, &mut r);
            assert!(l.iter().all(|&x| x == 0.0));
            assert!(r.iter().all(|&x| x == 0.0));
        }
    }

    #[test]
    fn q_and_drive_mappings_stay_in_range() {
        assert!((map_q(0.0) - 0.3).abs() < 1e-9);
        assert!((map_q(1.0) - 12.0).abs() < 1e-6);
        assert_eq!(map_drive(0.0), 1.0);
        assert_eq!(map_drive(1.0), 10.0);
    }

    #[test]
    fn spawn_grain_respects_capacity_and_counts_drops() {
        let mut config = EngineConfig::new(48_000.0);
        config.max_grains = 1;
        let (mut engine, mut handles) = GranularEngine::new(config).unwrap();
        let buf = Arc::new(SourceBuffer::mono(48_000.0, vec![0.5; 48_000]));
        handles.inbox.push(Message::SetBuffer(buf));
        handles.inbox.push(Message::SetPlaying(true));
        handles.inbox.push(Message::SetParamsAll([
            {
                let mut p = CursorParams::default();
                p.density = 10_000.0;
                p
            },
            CursorParams::default(),
            CursorParams::default(),
        ]));
        let mut l = vec![0.0f32; 128];
        let mut r = vec![0.0f32; 128];
        for _ in 0..5 {
            engine.process_block(128, &mut l, &mut r);
        }
        assert!(engine.live_grain_count() <= 1);
    }
}
