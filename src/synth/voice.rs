use crate::NO_NOTE;

/// Bookkeeping for one physical voice circuit.
///
/// `assigned` outlives `gated`: a released voice keeps its slot until the
/// scheduler reports its amplitude envelope idle, so a dying release tail is
/// never cut short by bookkeeping alone.
#[derive(Debug, Clone, Copy)]
pub struct VoiceSlot {
    pub(crate) assigned: bool,
    pub(crate) gated: bool,
    pub(crate) key_pressed: bool,
    pub(crate) internal_source: bool,
    pub(crate) root_note: u8,
    pub(crate) sounding_note: u8,
    pub(crate) velocity: u16,
    pub(crate) timestamp: u64,
}

impl Default for VoiceSlot {
    fn default() -> Self {
        Self {
            assigned: false,
            gated: false,
            key_pressed: false,
            internal_source: false,
            root_note: NO_NOTE,
            sounding_note: NO_NOTE,
            velocity: 0,
            timestamp: 0,
        }
    }
}

impl VoiceSlot {
    pub(crate) fn free(&mut self) {
        let timestamp = self.timestamp; // age survives for LRU selection
        *self = Self::default();
        self.timestamp = timestamp;
    }

    #[inline]
    pub fn is_assigned(&self) -> bool {
        self.assigned
    }

    #[inline]
    pub fn is_gated(&self) -> bool {
        self.gated
    }

    #[inline]
    pub fn key_pressed(&self) -> bool {
        self.key_pressed
    }

    #[inline]
    pub fn is_internal_source(&self) -> bool {
        self.internal_source
    }

    /// The note that triggered the assignment.
    #[inline]
    pub fn root_note(&self) -> u8 {
        self.root_note
    }

    /// Root plus pattern offset, the note actually sent downstream.
    #[inline]
    pub fn sounding_note(&self) -> u8 {
        self.sounding_note
    }

    #[inline]
    pub fn velocity(&self) -> u16 {
        self.velocity
    }

    /// Monotonic assignment counter used for age comparisons.
    #[inline]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }
}
