use crate::io::midi::MidiEvent;

/// Equal-tempered frequency, A4 (note 69) = 440 Hz.
pub fn midi_note_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

/// Semitone offset as a frequency ratio.
pub fn semitones_to_ratio(semitones: f32) -> f32 {
    2.0_f32.powf(semitones / 12.0)
}

/// Encode a channel-voice message as wire bytes. Returns the buffer and the
/// number of bytes used (2 or 3).
pub fn midi_to_bytes(midi: MidiEvent) -> ([u8; 3], usize) {
    match midi {
        MidiEvent::NoteOff {
            channel,
            key,
            velocity,
        } => ([0x80 | channel & 0x0F, key & 0x7F, velocity & 0x7F], 3),
        MidiEvent::NoteOn {
            channel,
            key,
            velocity,
        } => ([0x90 | channel & 0x0F, key & 0x7F, velocity & 0x7F], 3),
        MidiEvent::PolyAftertouch {
            channel,
            key,
            pressure,
        } => ([0xA0 | channel & 0x0F, key & 0x7F, pressure & 0x7F], 3),
        MidiEvent::ControlChange {
            channel,
            controller,
            value,
        } => ([0xB0 | channel & 0x0F, controller & 0x7F, value & 0x7F], 3),
        MidiEvent::ProgramChange { channel, program } => {
            ([0xC0 | channel & 0x0F, program & 0x7F, 0], 2)
        }
        MidiEvent::ChannelAftertouch { channel, pressure } => {
            ([0xD0 | channel & 0x0F, pressure & 0x7F, 0], 2)
        }
        MidiEvent::PitchBend { channel, value } => {
            let raw = (value.clamp(-8192, 8191) + 8192) as u16;
            (
                [0xE0 | channel & 0x0F, (raw & 0x7F) as u8, (raw >> 7) as u8],
                3,
            )
        }
    }
}
