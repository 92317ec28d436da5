//! Real-time tick scheduler and CV mixdown.
//!
//! `Engine::tick` is the body of the fixed-rate timer interrupt. Every tick
//! it advances all envelopes and rewrites all CVs in fixed voice order, so
//! the worst case and the common case cost the same. Slower concerns (voice
//! reclamation, the control-message queue) are spread across distinct tick
//! slots by testing the low bits of the tick counter, keeping any single
//! tick inside the budget.
//!
//! Concurrency model: the engine is owned by the tick context. The main
//! loop never touches it directly; it pushes `EngineMessage`s through a
//! wait-free SPSC queue, which the tick drains a bounded number of at a
//! time. That replaces the interrupt-masking critical sections of the
//! original hardware with a handoff the tick can never block on.

use crate::dsp::envelope::{EnvParams, Envelope};
use crate::dsp::fixed::{sat_add_u16, sat_add_u16_s32, scale_u16};
use crate::dsp::tables::EnvTables;
use crate::io::bus::{CvBus, CvRole};
use crate::io::tuning::Tuning;
use crate::synth::assigner::VoiceAssigner;
use crate::synth::event::VoiceEvents;
use crate::synth::message::{EngineMessage, MessageReceiver};
use crate::VOICE_COUNT;

/// Shared modulation values computed outside this core (bend wheel, LFO).
/// Applied to every voice identically during the CV mixdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModInputs {
    pub pitch_bend: i16,
    pub lfo_pitch: i16,
    pub lfo_filter: i16,
}

/// Which envelope bank a setting addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvRole {
    Amplitude,
    Filter,
}

// Tick-counter slots for the low-frequency concerns. Distinct residues keep
// the slow work off each other's ticks.
const MESSAGE_MASK: u64 = 0x03;
const MESSAGE_SLOT: u64 = 0x01;
const VOICE_DONE_MASK: u64 = 0x07;
const VOICE_DONE_SLOT: u64 = 0x04;
const MAX_MESSAGES_PER_SLOT: usize = 8;

pub struct Engine<T: Tuning> {
    assigner: VoiceAssigner,
    amp_env: [Envelope; VOICE_COUNT],
    filter_env: [Envelope; VOICE_COUNT],
    tables: EnvTables,
    tuning: T,

    // per-voice base CVs, reprogrammed on each activation event
    base_pitch_a: [u16; VOICE_COUNT],
    base_pitch_b: [u16; VOICE_COUNT],
    key_track: [u16; VOICE_COUNT],
    velocity_level: [u16; VOICE_COUNT],

    // patch-level filter and velocity settings
    cutoff: u16,
    track_amount: u16,
    filter_env_amount: u16,
    velocity_sensitivity: u16,

    mods: ModInputs,
    tick: u64,
}

impl<T: Tuning> Engine<T> {
    pub fn new(tick_hz: u32, tuning: T) -> Self {
        let tables = EnvTables::new(tick_hz);
        let amp_env: [Envelope; VOICE_COUNT] = core::array::from_fn(|_| Envelope::new(&tables));
        let filter_env: [Envelope; VOICE_COUNT] =
            core::array::from_fn(|_| Envelope::new(&tables));

        Self {
            assigner: VoiceAssigner::new(),
            amp_env,
            filter_env,
            tables,
            tuning,
            base_pitch_a: [0; VOICE_COUNT],
            base_pitch_b: [0; VOICE_COUNT],
            key_track: [0; VOICE_COUNT],
            velocity_level: [u16::MAX; VOICE_COUNT],
            cutoff: u16::MAX / 2,
            track_amount: 0,
            filter_env_amount: u16::MAX,
            velocity_sensitivity: 0,
            mods: ModInputs::default(),
            tick: 0,
        }
    }

    /// One audio-control tick. Unconditional full pass over every voice,
    /// then the cadence-gated slow work.
    pub fn tick(&mut self, rx: &mut impl MessageReceiver, bus: &mut impl CvBus) {
        for v in 0..VOICE_COUNT {
            self.filter_env[v].update(&self.tables);
            self.amp_env[v].update(&self.tables);
            self.refresh_voice_cvs(v, bus);
        }

        // envelope completion is not latency-critical; scan at 1/8 rate
        if self.tick & VOICE_DONE_MASK == VOICE_DONE_SLOT {
            for v in 0..VOICE_COUNT {
                if self.amp_env[v].is_idle() && self.assigner.voice(v).is_assigned() {
                    self.assigner.voice_done(v);
                }
            }
        }

        if self.tick & MESSAGE_MASK == MESSAGE_SLOT {
            for _ in 0..MAX_MESSAGES_PER_SLOT {
                match rx.pop() {
                    Some(message) => self.handle(message, bus),
                    None => break,
                }
            }
        }

        self.tick = self.tick.wrapping_add(1);
    }

    /// Apply one control message. Exposed for offline use and tests; in the
    /// real system everything arrives through the queue.
    pub fn handle(&mut self, message: EngineMessage, bus: &mut impl CvBus) {
        match message {
            EngineMessage::NoteOn {
                note,
                velocity,
                internal,
            } => {
                let events = self.assigner.note_on(note, velocity, internal);
                self.apply_events(&events, bus);
            }
            EngineMessage::NoteOff { note } => {
                let events = self.assigner.note_off(note);
                self.apply_events(&events, bus);
            }
            EngineMessage::Hold(on) => {
                let events = self.assigner.hold(on);
                self.apply_events(&events, bus);
            }
            EngineMessage::AllNotesOff => {
                let events = self.assigner.release_all();
                self.apply_events(&events, bus);
            }
            EngineMessage::SetPriority(priority) => self.assigner.set_priority(priority),
            EngineMessage::SetVoiceMask(mask) => self.set_voice_mask(mask, bus),
            EngineMessage::SetPattern(pattern) => self.assigner.set_pattern(pattern),
            EngineMessage::SetPoly(poly) => {
                let events = self.assigner.set_poly(poly);
                self.apply_events(&events, bus);
            }
            EngineMessage::SetModulation(mods) => self.mods = mods,
        }
    }

    /// Mask change with the force-silence side effect: a voice disabled
    /// mid-note gets its envelopes hard-reset, not released.
    pub fn set_voice_mask(&mut self, mask: u8, bus: &mut impl CvBus) {
        let events = self.assigner.set_voice_mask(mask);
        self.apply_events(&events, bus);
        for event in &events {
            if !event.gate {
                self.amp_env[event.voice].reset();
                self.filter_env[event.voice].reset();
            }
        }
    }

    pub fn set_env_cvs(&mut self, role: EnvRole, params: &EnvParams) {
        let tables = &self.tables;
        match role {
            EnvRole::Amplitude => {
                for env in self.amp_env.iter_mut() {
                    env.set_cvs(params, tables);
                }
            }
            EnvRole::Filter => {
                for env in self.filter_env.iter_mut() {
                    env.set_cvs(params, tables);
                }
            }
        }
    }

    pub fn set_env_shape(&mut self, role: EnvRole, exponential: bool) {
        for env in self.env_bank(role) {
            env.set_shape(exponential);
        }
    }

    pub fn set_env_speed_shift(&mut self, role: EnvRole, shift: u8) {
        let tables = &self.tables;
        match role {
            EnvRole::Amplitude => {
                for env in self.amp_env.iter_mut() {
                    env.set_speed_shift(shift, tables);
                }
            }
            EnvRole::Filter => {
                for env in self.filter_env.iter_mut() {
                    env.set_speed_shift(shift, tables);
                }
            }
        }
    }

    pub fn set_prefer_lru(&mut self, prefer_lru: bool) {
        self.assigner.set_prefer_lru(prefer_lru);
    }

    pub fn set_cutoff(&mut self, cutoff: u16) {
        self.cutoff = cutoff;
    }

    pub fn set_track_amount(&mut self, amount: u16) {
        self.track_amount = amount;
    }

    pub fn set_filter_env_amount(&mut self, amount: u16) {
        self.filter_env_amount = amount;
    }

    pub fn set_velocity_sensitivity(&mut self, sensitivity: u16) {
        self.velocity_sensitivity = sensitivity;
    }

    pub fn set_modulation(&mut self, mods: ModInputs) {
        self.mods = mods;
    }

    pub fn assigner(&self) -> &VoiceAssigner {
        &self.assigner
    }

    pub fn amp_stage(&self, voice: usize) -> crate::dsp::EnvStage {
        self.amp_env[voice.min(VOICE_COUNT - 1)].stage()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    // ---- internals ----------------------------------------------------

    fn apply_events(&mut self, events: &VoiceEvents, bus: &mut impl CvBus) {
        for event in events {
            let v = event.voice;
            if v >= VOICE_COUNT {
                continue;
            }
            if event.gate {
                self.base_pitch_a[v] = self.tuning.cv_for_note(event.note, CvRole::PitchA);
                self.base_pitch_b[v] = self.tuning.cv_for_note(event.note, CvRole::PitchB);
                self.key_track[v] = self.tuning.cv_for_note(event.note, CvRole::Cutoff);
                if !event.legato {
                    self.velocity_level[v] =
                        velocity_blend(event.velocity, self.velocity_sensitivity);
                    self.amp_env[v].gate(true);
                    self.filter_env[v].gate(true);
                    bus.write_gate(v, true);
                }
            } else {
                self.amp_env[v].gate(false);
                self.filter_env[v].gate(false);
                bus.write_gate(v, false);
            }
        }
    }

    fn refresh_voice_cvs(&mut self, v: usize, bus: &mut impl CvBus) {
        let pitch_mod = i32::from(self.mods.pitch_bend) + i32::from(self.mods.lfo_pitch);
        bus.write_cv(
            v,
            CvRole::PitchA,
            sat_add_u16_s32(self.base_pitch_a[v], pitch_mod),
        );
        bus.write_cv(
            v,
            CvRole::PitchB,
            sat_add_u16_s32(self.base_pitch_b[v], pitch_mod),
        );

        let keyed = scale_u16(self.key_track[v], self.track_amount);
        let sweep = scale_u16(self.filter_env[v].output(), self.filter_env_amount);
        let cutoff = sat_add_u16_s32(
            sat_add_u16(sat_add_u16(self.cutoff, keyed), sweep),
            i32::from(self.mods.lfo_filter),
        );
        bus.write_cv(v, CvRole::Cutoff, cutoff);

        bus.write_cv(
            v,
            CvRole::Amplitude,
            scale_u16(self.amp_env[v].output(), self.velocity_level[v]),
        );
    }

    fn env_bank(&mut self, role: EnvRole) -> core::slice::IterMut<'_, Envelope> {
        match role {
            EnvRole::Amplitude => self.amp_env.iter_mut(),
            EnvRole::Filter => self.filter_env.iter_mut(),
        }
    }
}

/// Fade the amplitude gain from full scale toward the struck velocity as
/// sensitivity rises. Zero sensitivity plays every note at full level.
#[inline]
fn velocity_blend(velocity: u16, sensitivity: u16) -> u16 {
    u16::MAX - scale_u16(u16::MAX - velocity, sensitivity)
}
