#[cfg(feature = "rtrb")]
use rtrb::Consumer;

use crate::engine::ModInputs;
use crate::synth::assigner::Priority;
use crate::synth::pattern::ChordPattern;

/// Control traffic from the main loop into the tick context. Everything is
/// `Copy` so the queue never owns heap data.
#[derive(Debug, Clone, Copy)]
pub enum EngineMessage {
    NoteOn { note: u8, velocity: u16, internal: bool },
    NoteOff { note: u8 },
    Hold(bool),
    AllNotesOff,
    SetPriority(Priority),
    SetVoiceMask(u8),
    SetPattern(ChordPattern),
    SetPoly(bool),
    SetModulation(ModInputs),
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<EngineMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<EngineMessage> {
    fn pop(&mut self) -> Option<EngineMessage> {
        Consumer::pop(self).ok()
    }
}

/// Offline/testing receiver.
impl MessageReceiver for std::collections::VecDeque<EngineMessage> {
    fn pop(&mut self) -> Option<EngineMessage> {
        self.pop_front()
    }
}
