use crate::VOICE_COUNT;

/// The control signals computed for each voice every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CvRole {
    PitchA,
    PitchB,
    Cutoff,
    Amplitude,
}

pub const CV_ROLES: usize = 4;

impl CvRole {
    #[inline]
    pub fn index(self) -> usize {
        match self {
            CvRole::PitchA => 0,
            CvRole::PitchB => 1,
            CvRole::Cutoff => 2,
            CvRole::Amplitude => 3,
        }
    }
}

/// Sink for per-voice CV and gate-line writes. Implementations drive the
/// sample-and-hold / DAC hardware; every call must be non-blocking and
/// bounded, as it runs inside the tick handler.
pub trait CvBus {
    fn write_cv(&mut self, voice: usize, role: CvRole, value: u16);
    fn write_gate(&mut self, voice: usize, on: bool);
}

/// Records the latest value on every line. For tests and offline runs.
#[derive(Debug, Clone, Copy)]
pub struct RecordingBus {
    pub cvs: [[u16; CV_ROLES]; VOICE_COUNT],
    pub gates: [bool; VOICE_COUNT],
}

impl Default for RecordingBus {
    fn default() -> Self {
        Self {
            cvs: [[0; CV_ROLES]; VOICE_COUNT],
            gates: [false; VOICE_COUNT],
        }
    }
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn cv(&self, voice: usize, role: CvRole) -> u16 {
        self.cvs[voice][role.index()]
    }
}

impl CvBus for RecordingBus {
    fn write_cv(&mut self, voice: usize, role: CvRole, value: u16) {
        if voice < VOICE_COUNT {
            self.cvs[voice][role.index()] = value;
        }
    }

    fn write_gate(&mut self, voice: usize, on: bool) {
        if voice < VOICE_COUNT {
            self.gates[voice] = on;
        }
    }
}
