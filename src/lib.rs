pub mod dsp;
pub mod engine; // Tick scheduler and CV mixdown
pub mod io;
pub mod patch; // Serializable settings descriptors
pub mod synth; // Voice assignment and cross-context messages

/// Number of physical voice circuits driven by this core.
pub const VOICE_COUNT: usize = 6;
/// MIDI-style note identity space.
pub const NOTE_COUNT: usize = 128;
/// Sentinel for "no note" in voice bookkeeping.
pub(crate) const NO_NOTE: u8 = 0xff;
