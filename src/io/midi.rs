//! MIDI event model shared by the parser, scheduler and synth.

/// Channel-voice messages. `channel` is always 0-15.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOff { channel: u8, key: u8, velocity: u8 },
    NoteOn { channel: u8, key: u8, velocity: u8 },
    PolyAftertouch { channel: u8, key: u8, pressure: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    ChannelAftertouch { channel: u8, pressure: u8 },
    /// -8192..=8191, 0 is centre.
    PitchBend { channel: u8, value: i16 },
}

impl MidiEvent {
    /// Number of data bytes that follow a channel-voice status byte.
    pub fn data_len(status: u8) -> usize {
        match status & 0xF0 {
            0xC0 | 0xD0 => 1,
            _ => 2,
        }
    }

    /// Decode a channel-voice message. Data bytes are masked to 7 bits.
    pub fn from_status(status: u8, data1: u8, data2: u8) -> Option<Self> {
        let channel = status & 0x0F;
        let d1 = data1 & 0x7F;
        let d2 = data2 & 0x7F;

        let event = match status & 0xF0 {
            0x80 => MidiEvent::NoteOff {
                channel,
                key: d1,
                velocity: d2,
            },
            0x90 => MidiEvent::NoteOn {
                channel,
                key: d1,
                velocity: d2,
            },
            0xA0 => MidiEvent::PolyAftertouch {
                channel,
                key: d1,
                pressure: d2,
            },
            0xB0 => MidiEvent::ControlChange {
                channel,
                controller: d1,
                value: d2,
            },
            0xC0 => MidiEvent::ProgramChange {
                channel,
                program: d1,
            },
            0xD0 => MidiEvent::ChannelAftertouch {
                channel,
                pressure: d1,
            },
            0xE0 => MidiEvent::PitchBend {
                channel,
                value: (((d2 as i16) << 7) | d1 as i16) - 8192,
            },
            _ => return None,
        };

        Some(event)
    }

    pub fn channel(&self) -> u8 {
        match *self {
            MidiEvent::NoteOff { channel, .. }
            | MidiEvent::NoteOn { channel, .. }
            | MidiEvent::PolyAftertouch { channel, .. }
            | MidiEvent::ControlChange { channel, .. }
            | MidiEvent::ProgramChange { channel, .. }
            | MidiEvent::ChannelAftertouch { channel, .. }
            | MidiEvent::PitchBend { channel, .. } => channel,
        }
    }

    /// Note-on and note-off (including note-on with velocity 0).
    pub fn is_note(&self) -> bool {
        matches!(self, MidiEvent::NoteOn { .. } | MidiEvent::NoteOff { .. })
    }

    /// Fold "note-on, velocity 0" into an explicit note-off.
    pub fn normalized(self) -> Self {
        match self {
            MidiEvent::NoteOn {
                channel,
                key,
                velocity: 0,
            } => MidiEvent::NoteOff {
                channel,
                key,
                velocity: 64,
            },
            other => other,
        }
    }
}

/// Meta event types. Unknown numbers are kept, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaKind {
    SequenceNumber,
    Text,
    Copyright,
    TrackName,
    InstrumentName,
    Lyric,
    Marker,
    CuePoint,
    ProgramName,
    DeviceName,
    ChannelPrefix,
    Port,
    EndOfTrack,
    SetTempo,
    SmpteOffset,
    TimeSignature,
    KeySignature,
    SequencerSpecific,
    Unknown(u8),
}

impl From<u8> for MetaKind {
    fn from(value: u8) -> Self {
        match value {
            0x00 => MetaKind::SequenceNumber,
            0x01 => MetaKind::Text,
            0x02 => MetaKind::Copyright,
            0x03 => MetaKind::TrackName,
            0x04 => MetaKind::InstrumentName,
            0x05 => MetaKind::Lyric,
            0x06 => MetaKind::Marker,
            0x07 => MetaKind::CuePoint,
            0x08 => MetaKind::ProgramName,
            0x09 => MetaKind::DeviceName,
            0x20 => MetaKind::ChannelPrefix,
            0x21 => MetaKind::Port,
            0x2F => MetaKind::EndOfTrack,
            0x51 => MetaKind::SetTempo,
            0x54 => MetaKind::SmpteOffset,
            0x58 => MetaKind::TimeSignature,
            0x59 => MetaKind::KeySignature,
            0x7F => MetaKind::SequencerSpecific,
            other => MetaKind::Unknown(other),
        }
    }
}

impl MetaKind {
    /// Meta events whose payload is text.
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            MetaKind::Text
                | MetaKind::Copyright
                | MetaKind::TrackName
                | MetaKind::InstrumentName
                | MetaKind::Lyric
                | MetaKind::Marker
                | MetaKind::CuePoint
                | MetaKind::ProgramName
                | MetaKind::DeviceName
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Meta { kind: MetaKind, data: Vec<u8> },
    /// Payload starts with `F0` (or `F7` for escape events).
    SysEx { data: Vec<u8> },
    Channel(MidiEvent),
}

/// One parsed event, stamped in ticks and (after tempo resolution) in ms.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub delta_ticks: u32,
    pub absolute_ticks: u64,
    pub absolute_time_ms: f64,
    /// Index of the track the event came from.
    pub track: u16,
    pub kind: EventKind,
}

impl Event {
    pub fn channel(&self) -> Option<u8> {
        match &self.kind {
            EventKind::Channel(midi) => Some(midi.channel()),
            _ => None,
        }
    }

    pub fn midi(&self) -> Option<&MidiEvent> {
        match &self.kind {
            EventKind::Channel(midi) => Some(midi),
            _ => None,
        }
    }

    pub fn meta_kind(&self) -> Option<MetaKind> {
        match &self.kind {
            EventKind::Meta { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Text payload for text-like meta events.
    pub fn text(&self) -> Option<String> {
        match &self.kind {
            EventKind::Meta { kind, data } if kind.is_text() => {
                Some(String::from_utf8_lossy(data).into_owned())
            }
            _ => None,
        }
    }
}
