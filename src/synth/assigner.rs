use crate::synth::event::{VoiceEvent, VoiceEvents};
use crate::synth::noteset::NoteSet;
use crate::synth::pattern::ChordPattern;
use crate::synth::voice::VoiceSlot;
use crate::{NOTE_COUNT, VOICE_COUNT};

/*
Voice Assignment Engine
=======================

Maps note events onto the fixed pool of voice circuits. The hard cases are
all about scarcity: more keys than voices means stealing, and a stolen key
that is still held must pop back in the moment a voice frees up.

Rules of the house:

  - Capacity exhaustion is not an error. A note that cannot get a voice is
    dropped silently, exactly like the instrument this replaces.
  - A voice stays `assigned` after its gate drops, until the scheduler
    reports its amplitude envelope idle (`voice_done`). Stealing may take
    such a voice early; nothing else does.
  - Every mutation is a bounded pass over the fixed pool. No queues, no
    recursion: the restoration path re-enters the gate-on logic at most once
    per call, because a restored note cannot itself have been stolen in the
    same pass.
*/

/// Which sounding voice is sacrificed when stealing is required, and which
/// note wins in mono mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Priority {
    /// Newest note wins; the oldest voice is stolen.
    #[default]
    Last,
    /// Low notes persist; the highest sounding note is stolen.
    Low,
    /// High notes persist; the lowest sounding note is stolen.
    High,
}

const ALL_VOICES: u8 = (1 << VOICE_COUNT) - 1;

pub struct VoiceAssigner {
    voices: [VoiceSlot; VOICE_COUNT],
    held: NoteSet,
    internal_notes: NoteSet,
    velocity_cache: [u16; NOTE_COUNT],
    priority: Priority,
    voice_mask: u8,
    pattern: ChordPattern,
    poly: bool,
    prefer_lru: bool,
    hold: bool,
    next_timestamp: u64,
}

impl VoiceAssigner {
    pub fn new() -> Self {
        Self {
            voices: [VoiceSlot::default(); VOICE_COUNT],
            held: NoteSet::new(),
            internal_notes: NoteSet::new(),
            velocity_cache: [0; NOTE_COUNT],
            priority: Priority::Last,
            voice_mask: ALL_VOICES,
            pattern: ChordPattern::default(),
            poly: true,
            prefer_lru: false,
            hold: false,
            next_timestamp: 1,
        }
    }

    /// Gate-on entry point for every upstream producer (keyboard scan, MIDI,
    /// sequencer, arpeggiator). Returns the resulting activations.
    pub fn note_on(&mut self, note: u8, velocity: u16, internal: bool) -> VoiceEvents {
        let mut events = VoiceEvents::new();
        if note as usize >= NOTE_COUNT {
            return events;
        }
        self.held.set(note);
        if internal {
            self.internal_notes.set(note);
        } else {
            self.internal_notes.clear(note);
        }
        self.velocity_cache[note as usize] = velocity;
        self.gate_on(note, velocity, internal, &mut events);
        events
    }

    /// Gate-off entry point. May restore a stolen-but-still-held note onto
    /// the freed capacity instead of silencing anything.
    pub fn note_off(&mut self, note: u8) -> VoiceEvents {
        let mut events = VoiceEvents::new();
        if note as usize >= NOTE_COUNT {
            return events;
        }
        self.held.clear(note);

        // A held note with no voice rooted at it was stolen earlier; it gets
        // first claim on the capacity this release frees. High priority
        // prefers the top of the keyboard, everything else the bottom.
        let restore = match self.priority {
            Priority::High => self.held.descending().find(|&n| !self.has_voice_for(n)),
            _ => self.held.ascending().find(|&n| !self.has_voice_for(n)),
        };
        if let Some(n) = restore {
            let velocity = self.velocity_cache[n as usize];
            let internal = self.internal_notes.test(n);
            self.gate_on(n, velocity, internal, &mut events);
            return events;
        }

        for v in 0..VOICE_COUNT {
            let slot = &mut self.voices[v];
            if slot.assigned && slot.root_note == note {
                slot.key_pressed = false;
                // hold defers the gate drop in poly mode; mono relies on
                // restoration-driven legato instead
                if !(self.hold && self.poly) {
                    slot.gated = false;
                    events.push(VoiceEvent {
                        voice: v,
                        note: slot.sounding_note,
                        gate: false,
                        velocity: slot.velocity,
                        legato: false,
                    });
                }
            }
        }
        events
    }

    /// Sustain-pedal semantics: while on, released keys keep their gates;
    /// on release, every gated voice whose key is up drops at once.
    pub fn hold(&mut self, on: bool) -> VoiceEvents {
        let mut events = VoiceEvents::new();
        if on == self.hold {
            return events;
        }
        self.hold = on;
        if !on {
            for v in 0..VOICE_COUNT {
                let slot = &mut self.voices[v];
                if slot.assigned && slot.gated && !slot.key_pressed {
                    slot.gated = false;
                    events.push(VoiceEvent {
                        voice: v,
                        note: slot.sounding_note,
                        gate: false,
                        velocity: slot.velocity,
                        legato: false,
                    });
                }
            }
        }
        events
    }

    /// Scheduler callback: the voice's amplitude envelope has gone idle, so
    /// the slot becomes eligible for reuse.
    pub fn voice_done(&mut self, voice: usize) {
        if voice >= VOICE_COUNT {
            return;
        }
        if self.voices[voice].assigned {
            self.voices[voice].free();
        }
    }

    /// Drop everything: held bookkeeping cleared, every gated voice released.
    pub fn release_all(&mut self) -> VoiceEvents {
        let mut events = VoiceEvents::new();
        self.held.clear_all();
        self.internal_notes.clear_all();
        for v in 0..VOICE_COUNT {
            let slot = &mut self.voices[v];
            slot.key_pressed = false;
            if slot.assigned && slot.gated {
                slot.gated = false;
                events.push(VoiceEvent {
                    voice: v,
                    note: slot.sounding_note,
                    gate: false,
                    velocity: slot.velocity,
                    legato: false,
                });
            }
        }
        events
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    /// Free-voice selection: `true` picks the least-recently-used free
    /// voice, `false` the first free voice in index order.
    pub fn set_prefer_lru(&mut self, prefer_lru: bool) {
        self.prefer_lru = prefer_lru;
    }

    /// Enable/disable voices. Masking off an active voice force-kills it:
    /// a gate-off event is emitted and the caller must hard-reset its
    /// envelopes. Re-applying the current mask is a no-op.
    pub fn set_voice_mask(&mut self, mask: u8) -> VoiceEvents {
        let mut events = VoiceEvents::new();
        let mask = mask & ALL_VOICES;
        if mask == self.voice_mask {
            return events;
        }
        self.voice_mask = mask;
        for v in 0..VOICE_COUNT {
            if mask & (1 << v) == 0 && self.voices[v].assigned {
                let note = self.voices[v].sounding_note;
                let velocity = self.voices[v].velocity;
                self.voices[v].free();
                events.push(VoiceEvent {
                    voice: v,
                    note,
                    gate: false,
                    velocity,
                    legato: false,
                });
            }
        }
        events
    }

    /// Swap the unison/chord pattern. Takes effect on the next assignment;
    /// held-note bookkeeping is untouched so a switch mid-chord loses
    /// nothing. Re-applying the current pattern is a no-op.
    pub fn set_pattern(&mut self, pattern: ChordPattern) {
        if pattern == self.pattern {
            return;
        }
        self.pattern = pattern;
    }

    /// Cross the mono/poly boundary. Only an actual crossing clears the
    /// held-note bookkeeping; repeated calls with the same mode are no-ops
    /// so switch debounce cannot drop notes.
    pub fn set_poly(&mut self, poly: bool) -> VoiceEvents {
        let mut events = VoiceEvents::new();
        if poly == self.poly {
            return events;
        }
        self.poly = poly;
        self.held.clear_all();
        self.internal_notes.clear_all();
        for v in 0..VOICE_COUNT {
            let slot = &mut self.voices[v];
            if slot.assigned && slot.gated {
                events.push(VoiceEvent {
                    voice: v,
                    note: slot.sounding_note,
                    gate: false,
                    velocity: slot.velocity,
                    legato: false,
                });
            }
            if slot.assigned {
                slot.gated = false;
                slot.key_pressed = false;
            }
        }
        events
    }

    #[inline]
    pub fn voice(&self, voice: usize) -> &VoiceSlot {
        &self.voices[voice.min(VOICE_COUNT - 1)]
    }

    pub fn voices(&self) -> &[VoiceSlot; VOICE_COUNT] {
        &self.voices
    }

    #[inline]
    pub fn priority(&self) -> Priority {
        self.priority
    }

    #[inline]
    pub fn voice_mask(&self) -> u8 {
        self.voice_mask
    }

    #[inline]
    pub fn pattern(&self) -> &ChordPattern {
        &self.pattern
    }

    #[inline]
    pub fn is_poly(&self) -> bool {
        self.poly
    }

    #[inline]
    pub fn hold_active(&self) -> bool {
        self.hold
    }

    /// True while the note is held on the keyboard/pedal, whether or not it
    /// currently occupies a voice.
    #[inline]
    pub fn is_note_held(&self, note: u8) -> bool {
        self.held.test(note)
    }

    // ---- internals ----------------------------------------------------

    fn gate_on(&mut self, note: u8, velocity: u16, internal: bool, events: &mut VoiceEvents) {
        if !self.poly {
            // mono: voice 0 carries the sound; precedence by priority, and a
            // sounding voice retunes legato instead of re-triggering
            let blocked = match self.priority {
                Priority::Low => self.held.ascending().any(|n| n < note),
                Priority::High => self.held.descending().any(|n| n > note),
                Priority::Last => false,
            };
            if blocked {
                return;
            }
            let legato = self.voices[0].assigned && self.voices[0].gated;
            self.start_pattern(0, note, velocity, internal, legato, events);
            return;
        }

        let Some(start) = self.find_poly_voice(note) else {
            return; // no capacity anywhere: the note is dropped by design
        };
        self.start_pattern(start, note, velocity, internal, false, events);
    }

    fn find_poly_voice(&self, note: u8) -> Option<usize> {
        // a voice already sounding this root retriggers in place
        if let Some(v) = self
            .enabled_assigned()
            .filter(|&v| self.voices[v].root_note == note)
            .min_by_key(|&v| self.voices[v].timestamp)
        {
            return Some(v);
        }

        // free voice: index order, or least recently used
        let free = if self.prefer_lru {
            self.enabled_free().min_by_key(|&v| self.voices[v].timestamp)
        } else {
            self.enabled_free().next()
        };
        if free.is_some() {
            return free;
        }

        // steal pass 1: the oldest voice whose key is already up, even if
        // its release tail is still audible
        if let Some(v) = self
            .enabled_assigned()
            .filter(|&v| !self.held.test(self.voices[v].root_note))
            .min_by_key(|&v| self.voices[v].timestamp)
        {
            return Some(v);
        }

        // steal pass 2: priority decides which sounding note dies
        match self.priority {
            Priority::Last => self.enabled_assigned().min_by_key(|&v| self.voices[v].timestamp),
            Priority::Low => self.enabled_assigned().max_by_key(|&v| self.voices[v].root_note),
            Priority::High => self.enabled_assigned().min_by_key(|&v| self.voices[v].root_note),
        }
    }

    /// Walk the pattern from `start`, assigning each offset to the next
    /// enabled voice (wrapping, skipping masked voices). Every activation of
    /// the batch carries the same timestamp.
    fn start_pattern(
        &mut self,
        start: usize,
        root: u8,
        velocity: u16,
        internal: bool,
        legato: bool,
        events: &mut VoiceEvents,
    ) {
        let timestamp = self.next_timestamp;
        let mut advanced = false;
        let mut v = start;

        for slot_index in 0..self.pattern.len() {
            let mut scanned = 0;
            while self.voice_mask & (1 << v) == 0 {
                v = (v + 1) % VOICE_COUNT;
                scanned += 1;
                if scanned == VOICE_COUNT {
                    return; // every voice masked off
                }
            }

            let sounding = ChordPattern::sounding_note(root, self.pattern.offset(slot_index));
            let slot = &mut self.voices[v];
            slot.assigned = true;
            slot.gated = true;
            slot.key_pressed = self.held.test(root);
            slot.internal_source = internal;
            slot.root_note = root;
            slot.sounding_note = sounding;
            if !legato {
                slot.velocity = velocity;
            }
            slot.timestamp = timestamp;
            advanced = true;

            events.push(VoiceEvent {
                voice: v,
                note: sounding,
                gate: true,
                velocity: slot.velocity,
                legato,
            });
            v = (v + 1) % VOICE_COUNT;
        }

        if advanced {
            self.next_timestamp += 1;
        }
    }

    fn has_voice_for(&self, note: u8) -> bool {
        self.voices.iter().any(|s| s.assigned && s.root_note == note)
    }

    fn enabled_assigned(&self) -> impl Iterator<Item = usize> + '_ {
        (0..VOICE_COUNT)
            .filter(move |&v| self.voice_mask & (1 << v) != 0 && self.voices[v].assigned)
    }

    fn enabled_free(&self) -> impl Iterator<Item = usize> + '_ {
        (0..VOICE_COUNT)
            .filter(move |&v| self.voice_mask & (1 << v) != 0 && !self.voices[v].assigned)
    }
}

impl Default for VoiceAssigner {
    fn default() -> Self {
        Self::new()
    }
}
