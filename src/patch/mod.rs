//! Serializable patch descriptors.
//!
//! These mirror what the preset layer stores and the panel edits. They are
//! plain data: `apply_to` pushes them into a live engine from the
//! configuration context, clamping anything out of range rather than
//! failing. Persistence formats and migration live outside this core.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::envelope::EnvParams;
use crate::engine::{Engine, EnvRole};
use crate::io::bus::CvBus;
use crate::io::tuning::Tuning;
use crate::synth::assigner::Priority;
use crate::synth::message::EngineMessage;
use crate::synth::pattern::ChordPattern;
use crate::VOICE_COUNT;

const MAX_SPEED_SHIFT: u8 = 4;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct Settings {
    pub name: String,
    pub assigner: AssignerSettings,
    pub amp_env: EnvelopeSettings,
    pub filter_env: EnvelopeSettings,
    pub filter: FilterSettings,
    pub velocity_sensitivity: u16,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct AssignerSettings {
    pub priority: Priority,
    pub voice_mask: u8,
    /// Semitone offsets; first entry is forced to zero on apply.
    pub pattern: Vec<i8>,
    pub poly: bool,
    pub prefer_lru: bool,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct EnvelopeSettings {
    pub attack: u16,
    pub decay: u16,
    pub sustain: u16,
    pub release: u16,
    pub level: u16,
    pub exponential: bool,
    pub speed_shift: u8,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct FilterSettings {
    pub cutoff: u16,
    pub tracking: u16,
    pub env_amount: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: "Init".to_owned(),
            assigner: AssignerSettings {
                priority: Priority::Last,
                voice_mask: (1 << VOICE_COUNT) - 1,
                pattern: vec![0],
                poly: true,
                prefer_lru: false,
            },
            amp_env: EnvelopeSettings {
                attack: 0x1000,
                decay: 0x4000,
                sustain: 0xa000,
                release: 0x3000,
                level: u16::MAX,
                exponential: true,
                speed_shift: 0,
            },
            filter_env: EnvelopeSettings {
                attack: 0x0800,
                decay: 0x6000,
                sustain: 0x4000,
                release: 0x3000,
                level: u16::MAX,
                exponential: true,
                speed_shift: 0,
            },
            filter: FilterSettings {
                cutoff: 0x8000,
                tracking: 0x8000,
                env_amount: 0x8000,
            },
            velocity_sensitivity: 0x8000,
        }
    }
}

impl EnvelopeSettings {
    fn params(&self) -> EnvParams {
        EnvParams {
            attack: self.attack,
            decay: self.decay,
            sustain: self.sustain,
            release: self.release,
            level: self.level,
        }
    }
}

impl Settings {
    /// Push this patch into a live engine. Runs in the configuration
    /// context; note traffic keeps flowing through the message queue. Values
    /// the hardware cannot express are clamped and logged, never rejected.
    pub fn apply_to<T: Tuning>(&self, engine: &mut Engine<T>, bus: &mut impl CvBus) {
        if self.assigner.pattern.len() > VOICE_COUNT {
            log::warn!(
                "patch '{}': pattern has {} offsets, truncating to {}",
                self.name,
                self.assigner.pattern.len(),
                VOICE_COUNT
            );
        }
        engine.handle(EngineMessage::SetPoly(self.assigner.poly), bus);
        engine.handle(
            EngineMessage::SetPriority(self.assigner.priority),
            bus,
        );
        engine.handle(
            EngineMessage::SetPattern(ChordPattern::new(&self.assigner.pattern)),
            bus,
        );
        engine.set_voice_mask(self.assigner.voice_mask, bus);
        engine.set_prefer_lru(self.assigner.prefer_lru);

        for (role, env) in [
            (EnvRole::Amplitude, &self.amp_env),
            (EnvRole::Filter, &self.filter_env),
        ] {
            engine.set_env_cvs(role, &env.params());
            engine.set_env_shape(role, env.exponential);
            if env.speed_shift > MAX_SPEED_SHIFT {
                log::warn!(
                    "patch '{}': speed shift {} clamped to {}",
                    self.name,
                    env.speed_shift,
                    MAX_SPEED_SHIFT
                );
            }
            engine.set_env_speed_shift(role, env.speed_shift.min(MAX_SPEED_SHIFT));
        }

        engine.set_cutoff(self.filter.cutoff);
        engine.set_track_amount(self.filter.tracking);
        engine.set_filter_env_amount(self.filter.env_amount);
        engine.set_velocity_sensitivity(self.velocity_sensitivity);
    }
}
