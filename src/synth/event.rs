use crate::VOICE_COUNT;

/// One voice (de)activation, reported by the assigner for every transition.
/// The consumer programs base CVs and arms envelope gates from these; a
/// legato activation retunes without re-gating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoiceEvent {
    pub voice: usize,
    pub note: u8,
    pub gate: bool,
    pub velocity: u16,
    pub legato: bool,
}

// A note-off can gate off a full pattern and then restore a stolen note onto
// another full pattern, so twice the pool bounds any single call.
pub const MAX_EVENTS: usize = VOICE_COUNT * 2;

/// Bounded, copyable activation list. No allocation, drop-on-overflow; the
/// capacity is sized so overflow cannot happen for well-formed calls.
#[derive(Debug, Clone, Copy)]
pub struct VoiceEvents {
    items: [VoiceEvent; MAX_EVENTS],
    len: usize,
}

impl Default for VoiceEvents {
    fn default() -> Self {
        Self {
            items: [VoiceEvent::default(); MAX_EVENTS],
            len: 0,
        }
    }
}

impl VoiceEvents {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn push(&mut self, event: VoiceEvent) {
        if self.len < MAX_EVENTS {
            self.items[self.len] = event;
            self.len += 1;
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn as_slice(&self) -> &[VoiceEvent] {
        &self.items[..self.len]
    }

    pub fn iter(&self) -> core::slice::Iter<'_, VoiceEvent> {
        self.as_slice().iter()
    }
}

impl<'a> IntoIterator for &'a VoiceEvents {
    type Item = &'a VoiceEvent;
    type IntoIter = core::slice::Iter<'a, VoiceEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_iterate_in_order() {
        let mut events = VoiceEvents::new();
        for v in 0..3 {
            events.push(VoiceEvent {
                voice: v,
                note: 60 + v as u8,
                gate: true,
                velocity: 100,
                legato: false,
            });
        }
        assert_eq!(events.len(), 3);
        let voices: Vec<usize> = events.iter().map(|e| e.voice).collect();
        assert_eq!(voices, vec![0, 1, 2]);
    }

    #[test]
    fn overflow_drops_silently() {
        let mut events = VoiceEvents::new();
        for _ in 0..MAX_EVENTS + 4 {
            events.push(VoiceEvent::default());
        }
        assert_eq!(events.len(), MAX_EVENTS);
    }
}
