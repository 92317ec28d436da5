use crate::dsp::fixed::sat_add_u16_s32;
use crate::io::bus::CvRole;

/// Pure note -> CV conversion, owned by the calibration subsystem. The core
/// only ever asks; it never caches across calibration changes beyond the
/// per-voice base CVs reprogrammed on each activation.
pub trait Tuning {
    fn cv_for_note(&self, note: u8, role: CvRole) -> u16;
}

/// Uncalibrated linear tuning: a fixed CV step per semitone above a base
/// offset. Good enough for tests and bring-up before the tuner has run.
#[derive(Debug, Clone, Copy)]
pub struct EqualTuning {
    pub cv_per_semitone: u16,
    pub base: u16,
}

impl Default for EqualTuning {
    fn default() -> Self {
        Self {
            cv_per_semitone: 512, // full span across the 128-note range
            base: 0,
        }
    }
}

impl Tuning for EqualTuning {
    fn cv_for_note(&self, note: u8, _role: CvRole) -> u16 {
        sat_add_u16_s32(self.base, i32::from(note) * i32::from(self.cv_per_semitone))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_and_saturating() {
        let t = EqualTuning::default();
        assert_eq!(t.cv_for_note(0, CvRole::PitchA), 0);
        assert_eq!(t.cv_for_note(60, CvRole::PitchA), 60 * 512);
        assert_eq!(t.cv_for_note(127, CvRole::PitchA), 127 * 512);

        let high_base = EqualTuning {
            base: 60_000,
            ..Default::default()
        };
        assert_eq!(high_base.cv_for_note(127, CvRole::PitchA), u16::MAX);
    }
}
