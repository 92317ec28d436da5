//! Fixed-point control primitives used by the engine layer.
//!
//! Everything here is allocation-free and branch-bounded, making it safe to
//! run inside the audio-control tick. These modules stay focused on the
//! numeric work; voice orchestration lives under `synth` and `engine`.

/// Attack/decay/sustain/release envelope generator.
pub mod envelope;
/// Saturating and scaled 16-bit arithmetic.
pub mod fixed;
/// One-time-initialized timing and curve lookup tables.
pub mod tables;

pub use envelope::EnvStage;
