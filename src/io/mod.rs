//! Hardware-facing seams: CV/gate output and tuning input.

pub mod bus;
pub mod tuning;

pub use bus::{CvBus, CvRole, RecordingBus};
pub use tuning::{EqualTuning, Tuning};
