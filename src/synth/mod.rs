//! Voice assignment, held-note bookkeeping, and cross-context messages.
//!
//! This layer decides which voice sounds which note; the engine layer
//! drives the envelopes and CVs from its decisions.

pub mod assigner;
pub mod event;
pub mod message;
pub mod noteset;
pub mod pattern;
pub mod voice;

pub use assigner::{Priority, VoiceAssigner};
pub use event::{VoiceEvent, VoiceEvents};
pub use pattern::ChordPattern;
