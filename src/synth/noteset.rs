use crate::NOTE_COUNT;

/// Fixed 128-bit set of note identities.
///
/// Tracks which keys are physically or logically down, independent of voice
/// occupancy: a note can be held here while its voice has been stolen, which
/// is exactly the state the assigner's restoration pass looks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoteSet {
    bits: [u64; 2],
}

impl NoteSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn set(&mut self, note: u8) {
        if (note as usize) < NOTE_COUNT {
            self.bits[(note >> 6) as usize] |= 1 << (note & 63);
        }
    }

    #[inline]
    pub fn clear(&mut self, note: u8) {
        if (note as usize) < NOTE_COUNT {
            self.bits[(note >> 6) as usize] &= !(1 << (note & 63));
        }
    }

    #[inline]
    pub fn test(&self, note: u8) -> bool {
        (note as usize) < NOTE_COUNT && self.bits[(note >> 6) as usize] & (1 << (note & 63)) != 0
    }

    #[inline]
    pub fn any(&self) -> bool {
        self.bits[0] != 0 || self.bits[1] != 0
    }

    pub fn clear_all(&mut self) {
        self.bits = [0; 2];
    }

    /// Member notes from 0 upward. Bounded scan, no allocation.
    pub fn ascending(&self) -> impl Iterator<Item = u8> + '_ {
        (0..NOTE_COUNT as u8).filter(move |&n| self.test(n))
    }

    /// Member notes from 127 downward.
    pub fn descending(&self) -> impl Iterator<Item = u8> + '_ {
        (0..NOTE_COUNT as u8).rev().filter(move |&n| self.test(n))
    }
}
