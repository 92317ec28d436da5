use crate::VOICE_COUNT;

/// Unison/chord pattern: up to one semitone offset per voice, applied from
/// the root note of an assignment. The first offset is always zero so the
/// played key is always among the sounding notes. A default pattern (single
/// zero offset) means plain poly or mono; anything longer turns one key into
/// a chord across several voices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChordPattern {
    offsets: [i8; VOICE_COUNT],
    len: usize,
}

impl Default for ChordPattern {
    fn default() -> Self {
        Self {
            offsets: [0; VOICE_COUNT],
            len: 1,
        }
    }
}

impl ChordPattern {
    /// Build from a list of semitone offsets, truncated to the voice pool.
    /// The first slot is forced to zero; an empty list yields the default.
    pub fn new(offsets: &[i8]) -> Self {
        let mut pattern = Self::default();
        for (i, &off) in offsets.iter().take(VOICE_COUNT).enumerate() {
            pattern.offsets[i] = if i == 0 { 0 } else { off };
            pattern.len = i + 1;
        }
        pattern
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        false // always at least the zero offset
    }

    #[inline]
    pub fn offset(&self, slot: usize) -> i8 {
        if slot < self.len {
            self.offsets[slot]
        } else {
            0
        }
    }

    /// True when one key drives more than one voice.
    #[inline]
    pub fn is_unison(&self) -> bool {
        self.len > 1
    }

    /// Apply an offset to a root note, clamped to the note range.
    #[inline]
    pub fn sounding_note(root: u8, offset: i8) -> u8 {
        (i16::from(root) + i16::from(offset)).clamp(0, 127) as u8
    }
}
