//! Envelope timing and curve tables.
//!
//! Built once at startup with floating-point math, then read-only for the
//! life of the engine. The tick handler never touches a float.

/// Envelope phase lives in a 24-bit space; bit 24 going high ends a stage.
pub const PHASE_SPAN: u32 = 1 << 24;

/// Shortest timed stage, seconds.
const MIN_STAGE_SECONDS: f64 = 0.002;
/// Longest timed stage, seconds.
const MAX_STAGE_SECONDS: f64 = 10.0;

// Curve steepness constants, chosen to land the tables within a couple of
// LSBs of full scale at the top entry.
const ATTACK_K: f64 = 3.0;
const DECAY_K: f64 = 5.0;

/// Immutable lookup tables shared by every envelope instance.
pub struct EnvTables {
    /// 8-bit time control -> per-tick phase increment (~2 ms .. ~10 s).
    pub timing: [u32; 256],
    /// Exponential rise, non-decreasing, 0 .. full scale.
    pub attack: [u16; 256],
    /// Complement-domain exponential fall: `MAX - decay[i]` is the output
    /// curve, so this table is also non-decreasing.
    pub decay: [u16; 256],
}

impl EnvTables {
    /// Compute all tables for a given tick rate. One-time initialization;
    /// nothing here runs per tick.
    pub fn new(tick_hz: u32) -> Self {
        let tick_hz = tick_hz.max(1) as f64;
        let ratio = MAX_STAGE_SECONDS / MIN_STAGE_SECONDS;

        let mut timing = [0u32; 256];
        for (i, inc) in timing.iter_mut().enumerate() {
            let seconds = MIN_STAGE_SECONDS * ratio.powf(i as f64 / 255.0);
            let ticks = (seconds * tick_hz).max(1.0);
            *inc = ((f64::from(PHASE_SPAN) / ticks) as u32).max(1);
        }

        let mut attack = [0u16; 256];
        let attack_span = 1.0 - (-ATTACK_K).exp();
        for (i, e) in attack.iter_mut().enumerate() {
            let x = i as f64 / 255.0;
            let y = (1.0 - (-ATTACK_K * x).exp()) / attack_span;
            *e = (y * f64::from(u16::MAX)).round() as u16;
        }

        let mut decay = [0u16; 256];
        let decay_span = 1.0 - (-DECAY_K).exp();
        for (i, e) in decay.iter_mut().enumerate() {
            let x = i as f64 / 255.0;
            let fall = ((-DECAY_K * x).exp() - (-DECAY_K).exp()) / decay_span;
            *e = ((1.0 - fall) * f64::from(u16::MAX)).round() as u16;
        }

        Self {
            timing,
            attack,
            decay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_slows_with_the_control() {
        let t = EnvTables::new(2_000);
        // higher time control -> smaller per-tick increment
        assert!(t.timing[0] > t.timing[128]);
        assert!(t.timing[128] > t.timing[255]);
        assert!(t.timing[255] >= 1);
    }

    #[test]
    fn timing_covers_the_advertised_range() {
        let hz = 2_000u32;
        let t = EnvTables::new(hz);
        let fastest_ticks = f64::from(PHASE_SPAN) / f64::from(t.timing[0]);
        let slowest_ticks = f64::from(PHASE_SPAN) / f64::from(t.timing[255]);
        let fastest = fastest_ticks / f64::from(hz);
        let slowest = slowest_ticks / f64::from(hz);
        assert!(fastest < 0.005, "fastest stage was {fastest}s");
        assert!(slowest > 8.0, "slowest stage was {slowest}s");
    }

    #[test]
    fn curves_are_monotone_and_full_range() {
        let t = EnvTables::new(2_000);
        for w in t.attack.windows(2) {
            assert!(w[1] >= w[0]);
        }
        for w in t.decay.windows(2) {
            assert!(w[1] >= w[0]);
        }
        assert_eq!(t.attack[0], 0);
        assert_eq!(t.attack[255], u16::MAX);
        assert_eq!(t.decay[0], 0);
        assert_eq!(t.decay[255], u16::MAX);
    }
}
