use crate::dsp::fixed::{compute_shape, scale_u16};
use crate::dsp::tables::EnvTables;

/*
Fixed-Point ADSR Envelope
=========================

One instance per voice per role (amplitude, filter). The generator is a
phase-accumulator state machine: each tick adds a cached per-stage increment
to a 24-bit phase, and the carry out of bit 23 ends the timed stage. That
makes stage completion a single compare, with no data-dependent loops, so the
cost of a tick is the same whether the envelope is 2 ms or 10 s long.

Vocabulary
----------

  phase        24-bit stage position. Reset to 0 on every stage entry.
  increment    Per-tick phase step, cached from the timing table whenever a
               time CV, or the speed shift, changes.
  stage_level  Raw output captured at the most recent gate edge; attack and
               release ramp from here so edges never click.
  raw          This tick's stage output before the level gain.
  output       The externally visible CV: the *previous* tick's raw value
               scaled by the level CV. The one-tick lag is inherited from the
               hardware this replaces and is relied upon downstream; tests
               pin it. Do not "fix" it by scaling the fresh value.

Stage outputs are an affine map of a curve sample:

  raw = scale(curve, stage_mul) + stage_add

with (mul, add) chosen per stage so attack ramps stage_level -> full, decay
ramps full -> sustain, and release ramps stage_level -> 0. The exponential
shape reads the lookup tables (complemented for the falling stages); the
linear shape uses the phase itself.
*/

/// Envelope state machine stage. Sustain has no timer; it is only left by a
/// gate-off edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvStage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// The five control values an envelope is programmed with. Time CVs index
/// the timing table through their high byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvParams {
    pub attack: u16,
    pub decay: u16,
    pub sustain: u16,
    pub release: u16,
    pub level: u16,
}

impl Default for EnvParams {
    fn default() -> Self {
        Self {
            attack: 0,
            decay: 0,
            sustain: u16::MAX,
            release: 0,
            level: u16::MAX,
        }
    }
}

pub struct Envelope {
    stage: EnvStage,
    phase: u32,
    stage_level: u16,
    raw: u16,
    output: u16,

    // affine map + increment for the current stage
    stage_add: u16,
    stage_mul: u16,
    stage_increment: u32,

    // cached per-stage increments, refreshed when params or speed change
    attack_increment: u32,
    decay_increment: u32,
    release_increment: u32,

    params: EnvParams,
    exponential: bool,
    speed_shift: u8,
}

impl Envelope {
    /// A fresh envelope is Idle with the default CVs already programmed, so
    /// its stage increments are live from the first gate edge.
    pub fn new(tables: &EnvTables) -> Self {
        let mut env = Self {
            stage: EnvStage::Idle,
            phase: 0,
            stage_level: 0,
            raw: 0,
            output: 0,
            stage_add: 0,
            stage_mul: 0,
            stage_increment: 0,
            attack_increment: 0,
            decay_increment: 0,
            release_increment: 0,
            params: EnvParams::default(),
            exponential: false,
            speed_shift: 0,
        };
        env.update_increments(tables);
        env
    }

    /// Program the envelope CVs. Increments are only recomputed when a value
    /// actually changed, so calling this every control pass is cheap.
    pub fn set_cvs(&mut self, params: &EnvParams, tables: &EnvTables) {
        if self.params == *params {
            return;
        }
        self.params = *params;
        self.update_increments(tables);
    }

    /// Select the exponential or linear curve family. Takes effect on the
    /// next output computation.
    pub fn set_shape(&mut self, exponential: bool) {
        self.exponential = exponential;
    }

    /// Stretch every timed stage by `2^shift` (the front-panel "slow" mode).
    pub fn set_speed_shift(&mut self, shift: u8, tables: &EnvTables) {
        self.speed_shift = shift.min(4);
        self.update_increments(tables);
    }

    /// Gate edge from the assigner. Rising enters Attack, falling enters
    /// Release, both ramping from the level the envelope was at.
    pub fn gate(&mut self, on: bool) {
        self.stage_level = self.raw;
        self.phase = 0;
        self.stage = if on { EnvStage::Attack } else { EnvStage::Release };
        self.update_stage_vars(self.stage);
    }

    /// Force the envelope silent immediately, e.g. when the voice mask
    /// disables this voice mid-note.
    pub fn reset(&mut self) {
        self.stage = EnvStage::Idle;
        self.phase = 0;
        self.stage_level = 0;
        self.raw = 0;
        self.output = 0;
        self.update_stage_vars(EnvStage::Idle);
    }

    /// Advance one tick. Constant-time: one overflow check, one table read,
    /// one multiply.
    pub fn update(&mut self, tables: &EnvTables) {
        if self.stage == EnvStage::Idle {
            self.raw = 0;
            self.output = 0;
            return;
        }

        // publish last tick's raw value through the level gain first
        self.output = scale_u16(self.raw, self.params.level);

        // carry out of the 24-bit phase ends the timed stage; handling it
        // before the add bounds transitions to exactly one per tick
        if self.phase >> 24 != 0 {
            self.overflow();
            if self.stage == EnvStage::Idle {
                return;
            }
        }

        let curve = match self.stage {
            EnvStage::Attack => {
                if self.exponential {
                    compute_shape(self.phase, &tables.attack)
                } else {
                    (self.phase >> 8) as u16
                }
            }
            EnvStage::Decay | EnvStage::Release => {
                if self.exponential {
                    u16::MAX - compute_shape(self.phase, &tables.decay)
                } else {
                    u16::MAX - (self.phase >> 8) as u16
                }
            }
            // sustain and idle are held by the affine map alone
            EnvStage::Sustain | EnvStage::Idle => 0,
        };

        self.raw = scale_u16(curve, self.stage_mul).saturating_add(self.stage_add);
        self.phase = self.phase.wrapping_add(self.stage_increment);
    }

    /// Externally visible CV (level-scaled, one tick behind `raw`).
    #[inline]
    pub fn output(&self) -> u16 {
        self.output
    }

    /// Stage output before the level gain, current as of the last update.
    #[inline]
    pub fn raw_output(&self) -> u16 {
        self.raw
    }

    #[inline]
    pub fn stage(&self) -> EnvStage {
        self.stage
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.stage == EnvStage::Idle
    }

    fn overflow(&mut self) {
        self.phase = 0;
        self.stage_increment = 0;
        self.stage = match self.stage {
            EnvStage::Attack => {
                // pin the peak so decay always starts from full scale
                self.raw = u16::MAX;
                EnvStage::Decay
            }
            EnvStage::Decay => EnvStage::Sustain,
            EnvStage::Release | EnvStage::Idle | EnvStage::Sustain => {
                self.raw = 0;
                self.output = 0;
                EnvStage::Idle
            }
        };
        self.update_stage_vars(self.stage);
    }

    fn update_increments(&mut self, tables: &EnvTables) {
        let shift = self.speed_shift;
        let inc = |cv: u16| (tables.timing[(cv >> 8) as usize] >> shift).max(1);
        self.attack_increment = inc(self.params.attack);
        self.decay_increment = inc(self.params.decay);
        self.release_increment = inc(self.params.release);
        self.update_stage_vars(self.stage);
    }

    fn update_stage_vars(&mut self, stage: EnvStage) {
        match stage {
            EnvStage::Attack => {
                self.stage_add = self.stage_level;
                self.stage_mul = u16::MAX - self.stage_level;
                self.stage_increment = self.attack_increment;
            }
            EnvStage::Decay => {
                self.stage_add = self.params.sustain;
                self.stage_mul = u16::MAX - self.params.sustain;
                self.stage_increment = self.decay_increment;
            }
            EnvStage::Sustain => {
                self.stage_add = self.params.sustain;
                self.stage_mul = 0;
                self.stage_increment = 0;
            }
            EnvStage::Release => {
                self.stage_add = 0;
                self.stage_mul = self.stage_level;
                self.stage_increment = self.release_increment;
            }
            EnvStage::Idle => {
                self.stage_add = 0;
                self.stage_mul = 0;
                self.stage_increment = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK_HZ: u32 = 2_000;

    fn env_with(params: EnvParams, tables: &EnvTables) -> Envelope {
        let mut env = Envelope::new(tables);
        env.set_cvs(&params, tables);
        env
    }

    fn run(env: &mut Envelope, tables: &EnvTables, ticks: usize) {
        for _ in 0..ticks {
            env.update(tables);
        }
    }

    #[test]
    fn fresh_envelope_runs_on_default_params() {
        // no set_cvs call at all: the constructor must leave the default
        // increments live, or every stage stalls at phase zero forever
        let tables = EnvTables::new(TICK_HZ);
        let mut env = Envelope::new(&tables);
        assert!(env.attack_increment > 0);

        env.gate(true);
        run(&mut env, &tables, 64);
        assert_eq!(env.stage(), EnvStage::Sustain);

        env.gate(false);
        run(&mut env, &tables, 64);
        assert!(env.is_idle());
        assert_eq!(env.output(), 0);
    }

    #[test]
    fn attack_is_monotone_until_decay() {
        let tables = EnvTables::new(TICK_HZ);
        let mut env = env_with(
            EnvParams {
                attack: 0x4000,
                decay: 0x4000,
                sustain: 0x8000,
                ..Default::default()
            },
            &tables,
        );
        env.gate(true);

        let mut last = 0u16;
        for _ in 0..100_000 {
            env.update(&tables);
            if env.stage() != EnvStage::Attack {
                break;
            }
            assert!(env.raw_output() >= last, "attack must not dip");
            last = env.raw_output();
        }
        assert_eq!(env.stage(), EnvStage::Decay);
    }

    #[test]
    fn decay_is_monotone_down_to_sustain() {
        let tables = EnvTables::new(TICK_HZ);
        let sustain = 0x6000;
        let mut env = env_with(
            EnvParams {
                attack: 0,
                decay: 0x4000,
                sustain,
                ..Default::default()
            },
            &tables,
        );
        env.gate(true);

        // push through the (near instant) attack
        while env.stage() != EnvStage::Decay {
            env.update(&tables);
        }
        let mut last = env.raw_output();
        while env.stage() == EnvStage::Decay {
            env.update(&tables);
            assert!(env.raw_output() <= last, "decay must not rise");
            last = env.raw_output();
        }
        assert_eq!(env.stage(), EnvStage::Sustain);
        run(&mut env, &tables, 4);
        assert_eq!(env.raw_output(), sustain);
    }

    #[test]
    fn pathological_increment_completes_in_one_transition() {
        // 10 Hz tick rate makes even the fastest stage a single-tick span
        let tables = EnvTables::new(10);
        let mut env = env_with(EnvParams::default(), &tables);
        env.gate(true);

        env.update(&tables); // phase overflows after this add
        assert_eq!(env.stage(), EnvStage::Attack);
        env.update(&tables); // exactly one transition resolves it
        assert_eq!(env.stage(), EnvStage::Decay);
    }

    #[test]
    fn release_from_any_stage_reaches_idle() {
        let tables = EnvTables::new(TICK_HZ);
        let mut env = env_with(
            EnvParams {
                attack: 0x8000,
                release: 0x2000,
                ..Default::default()
            },
            &tables,
        );
        env.gate(true);
        run(&mut env, &tables, 50); // still mid-attack

        env.gate(false);
        assert_eq!(env.stage(), EnvStage::Release);
        let mut last = env.raw_output();
        while !env.is_idle() {
            env.update(&tables);
            assert!(env.raw_output() <= last, "release must not rise");
            last = env.raw_output();
        }
        assert_eq!(env.output(), 0);
    }

    #[test]
    fn output_lags_raw_by_one_tick() {
        let tables = EnvTables::new(TICK_HZ);
        let mut env = env_with(
            EnvParams {
                attack: 0x8000,
                ..Default::default()
            },
            &tables,
        );
        env.gate(true);

        env.update(&tables); // phase 0 samples the curve origin; raw stays 0
        env.update(&tables);
        let raw = env.raw_output();
        assert!(raw > 0);
        // visible output still reflects the previous tick's zero raw value
        assert_eq!(env.output(), 0);

        env.update(&tables);
        // now the visible output is last tick's raw through a full-scale gain
        assert_eq!(env.output(), scale_u16(raw, u16::MAX));
    }

    #[test]
    fn level_cv_scales_the_output() {
        let tables = EnvTables::new(TICK_HZ);
        let mut env = env_with(
            EnvParams {
                attack: 0,
                level: 0x8000,
                ..Default::default()
            },
            &tables,
        );
        env.gate(true);
        run(&mut env, &tables, 100); // well into sustain
        assert!(env.output() <= 0x8000);
        assert!(env.output() > 0x7000);
    }

    #[test]
    fn reset_silences_immediately() {
        let tables = EnvTables::new(TICK_HZ);
        let mut env = env_with(EnvParams::default(), &tables);
        env.gate(true);
        run(&mut env, &tables, 20);
        env.reset();
        assert!(env.is_idle());
        assert_eq!(env.output(), 0);
        run(&mut env, &tables, 3);
        assert_eq!(env.output(), 0);
    }

    #[test]
    fn speed_shift_stretches_stages() {
        let tables = EnvTables::new(TICK_HZ);
        let params = EnvParams {
            attack: 0x4000,
            ..Default::default()
        };

        let ticks_to_decay = |shift: u8| {
            let mut env = env_with(params, &tables);
            env.set_speed_shift(shift, &tables);
            env.gate(true);
            let mut n = 0u32;
            while env.stage() != EnvStage::Decay {
                env.update(&tables);
                n += 1;
            }
            n
        };

        let normal = ticks_to_decay(0);
        let slow = ticks_to_decay(1);
        assert!(slow >= normal * 2 - 2, "shift 1 should double the stage");
    }
}
