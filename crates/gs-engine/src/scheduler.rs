//! Per-cursor Poisson grain scheduler with backpressure (spec §3 C4, §4.4).
//!
//! Grounded on the teacher's `rf-dsp::timestretch::granular` spawn-timer loop
//! (a frame countdown redrawn from an exponential distribution) plus
//! `rand_distr`-free manual exponential sampling via `-ln(1-u)/rate`, since
//! the workspace pulls in plain `rand` (the stack `rubyswolf-freqlab`
//! contributes for this kind of offline/online random draw) rather than the
//! heavier `rand_distr`.

use rand::Rng;

/// Backpressure factor from active-grain count `n` against capacity `m`
/// (spec §4.4 step 1).
pub fn backpressure_factor(active: usize, capacity: usize) -> f64 {
    if capacity == 0 {
        return 0.0;
    }
    let ratio = active as f64 / capacity as f64;
    if ratio < 0.5 {
        1.0
    } else if ratio < 0.7 {
        0.65
    } else if ratio < 0.85 {
        0.4
    } else if ratio < 0.95 {
        0.2
    } else {
        0.0
    }
}

/// One exponential inter-arrival draw in frames, rounded up to at least one
/// frame (spec §4.4 step 3: `D ~ Exp(sr / max(0.1, d_eff))`, i.e. a mean
/// inter-arrival of `sr / d_eff` frames).
pub fn draw_interval_frames<R: Rng + ?Sized>(rng: &mut R, sr: f64, d_eff: f64) -> f64 {
    let mean_frames = sr / d_eff.max(0.1);
    let u: f64 = rng.gen_range(f64::EPSILON..1.0);
    (-u.ln() * mean_frames).max(1.0)
}

/// Drives one cursor's `countdown` field forward by `block_frames`, yielding
/// the number of spawns that should occur this block (spec §4.4 steps 2-5).
/// `countdown` is owned by the caller (the cursor runtime) so this function
/// is pure apart from the RNG. Returns only a count, not the sub-block
/// offsets, since the audio thread must not allocate (spec §5) and the
/// caller only ever needs the count (grains are spawned at `env_pos = 0`
/// regardless of where in the block they land).
pub fn advance<R: Rng + ?Sized>(
    rng: &mut R,
    countdown: &mut f64,
    sr: f64,
    density: f64,
    active_grains: usize,
    capacity: usize,
    block_frames: usize,
    max_spawn_per_block: u32,
) -> u32 {
    let n = block_frames as f64;
    let b = backpressure_factor(active_grains, capacity);
    let d_eff = density.max(0.0) * b;

    if d_eff <= 0.0 {
        *countdown = (*countdown - n).max(0.0);
        return 0;
    }

    if *countdown <= 0.0 {
        *countdown = draw_interval_frames(rng, sr, d_eff);
    }

    let mut spawn_count = 0u32;
    while *countdown <= n && spawn_count < max_spawn_per_block {
        spawn_count += 1;
        *countdown += draw_interval_frames(rng, sr, d_eff);
    }
    *countdown -= n;
    spawn_count
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn backpressure_steps_match_thresholds() {
        assert_eq!(backpressure_factor(100, 1000), 1.0);
        assert_eq!(backpressure_factor(600, 1000), 0.65);
        assert_eq!(backpressure_factor(800, 1000), 0.4);
        assert_eq!(backpressure_factor(900, 1000), 0.2);
        assert_eq!(backpressure_factor(960, 1000), 0.0);
    }

    #[test]
    fn zero_effective_density_only_decrements_countdown() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut countdown = 500.0;
        let spawns = advance(&mut rng, &mut countdown, 48_000.0, 0.0, 0, 1000, 128, 24);
        assert_eq!(spawns, 0);
        assert_eq!(countdown, 372.0);
    }

    #[test]
    fn spawn_count_is_bounded_by_s_max() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut countdown = 0.0;
        let spawns = advance(&mut rng, &mut countdown, 48_000.0, 100_000.0, 0, 1000, 128, 24);
        assert!(spawns <= 24);
    }

    #[test]
    fn empirical_rate_converges_to_density_under_backpressure() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut countdown = 0.0;
        let sr = 48_000.0;
        let density = 20.0;
        let mut total_spawns = 0u64;
        let block = 128usize;
        let seconds = 20.0;
        let blocks = ((sr * seconds) / block as f64) as u64;
        for _ in 0..blocks {
            let spawns = advance(&mut rng, &mut countdown, sr, density, 0, 10_000, block, 1_000);
            total_spawns += spawns as u64;
        }
        let expected = density * seconds;
        let sigma = expected.sqrt();
        assert!((total_spawns as f64 - expected).abs() < 5.0 * sigma.max(1.0));
    }
}
