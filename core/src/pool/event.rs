/// Note level events understood by the voice pool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoteEvent {
    /// Starts a new voice with a velocity between 0 and 1
    NoteOn { key: u8, vel: f32 },
    /// Releases the voices playing a key
    NoteOff { key: u8 },
    /// Releases all voices
    AllNotesOff,
    /// Silences all voices without a release tail
    AllNotesKilled,
    /// Pedal down (true) holds released keys until the pedal goes up
    SustainPedal(bool),
}

impl NoteEvent {
    /// A note on with a MIDI velocity (0-127). Velocity 0 is a note off, as
    /// in the MIDI 1.0 running status convention.
    pub fn note_on_midi(key: u8, vel: u8) -> NoteEvent {
        if vel == 0 {
            NoteEvent::NoteOff { key }
        } else {
            NoteEvent::NoteOn {
                key,
                vel: vel.min(127) as f32 / 127.0,
            }
        }
    }

    /// Decodes a raw MIDI 1.0 channel message. The channel is ignored.
    ///
    /// Returns `None` for messages the sampler doesn't react to.
    pub fn from_midi(bytes: &[u8]) -> Option<NoteEvent> {
        let (&status, data) = bytes.split_first()?;
        if data.iter().take(2).any(|b| *b > 0x7F) {
            return None;
        }

        match (status & 0xF0, data) {
            (0x90, [key, vel, ..]) => Some(NoteEvent::note_on_midi(*key, *vel)),
            (0x80, [key, _, ..]) => Some(NoteEvent::NoteOff { key: *key }),
            (0xB0, [controller, value, ..]) => match controller {
                0x40 => Some(NoteEvent::SustainPedal(*value >= 64)),
                0x78 => Some(NoteEvent::AllNotesKilled),
                0x7B => Some(NoteEvent::AllNotesOff),
                _ => None,
            },
            _ => None,
        }
    }
}

/// A note event at a frame offset inside a render block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerEvent {
    /// Frame offset from the start of the block
    pub time: u32,
    pub event: NoteEvent,
}

impl SamplerEvent {
    pub fn new(time: u32, event: NoteEvent) -> Self {
        SamplerEvent { time, event }
    }

    /// An event that applies from the first frame of the block.
    pub fn at_start(event: NoteEvent) -> Self {
        Self::new(0, event)
    }
}
