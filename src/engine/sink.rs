use crate::io::{converter::midi_to_bytes, midi::MidiEvent};
use crate::synth::channel::cc;
use crate::CHANNEL_COUNT;

/// Where the transport delivers due events.
///
/// The built-in synth ([`SynthController`](crate::synth::controller::SynthController))
/// and raw MIDI output ([`RawMidiOut`]) both implement this.
pub trait EventSink {
    fn channel_event(&mut self, event: MidiEvent);

    /// Device-reset and other SysEx payloads, starting with `F0`.
    fn system_exclusive(&mut self, _payload: &[u8]) {}

    /// Release every sounding note, honouring release envelopes.
    fn all_notes_off(&mut self);

    /// Hard stop with no release (pause, stop, seek).
    fn silence(&mut self);

    /// Forget all channel state before a new file.
    fn reset(&mut self) {
        self.silence();
    }

    /// Overall output level, `0.0..=1.0`.
    fn master_volume(&mut self, _gain: f32) {}
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn channel_event(&mut self, event: MidiEvent) {
        (**self).channel_event(event)
    }

    fn system_exclusive(&mut self, payload: &[u8]) {
        (**self).system_exclusive(payload)
    }

    fn all_notes_off(&mut self) {
        (**self).all_notes_off()
    }

    fn silence(&mut self) {
        (**self).silence()
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn master_volume(&mut self, gain: f32) {
        (**self).master_volume(gain)
    }
}

/// Encodes events as wire bytes for an external MIDI port.
///
/// The callback receives one complete message per call.
pub struct RawMidiOut<F: FnMut(&[u8])> {
    send: F,
}

impl<F: FnMut(&[u8])> RawMidiOut<F> {
    pub fn new(send: F) -> Self {
        Self { send }
    }

    fn controller_on_all(&mut self, controller: u8, value: u8) {
        for channel in 0..CHANNEL_COUNT as u8 {
            self.channel_event(MidiEvent::ControlChange {
                channel,
                controller,
                value,
            });
        }
    }
}

impl<F: FnMut(&[u8])> EventSink for RawMidiOut<F> {
    fn channel_event(&mut self, event: MidiEvent) {
        let (bytes, len) = midi_to_bytes(event);
        (self.send)(&bytes[..len]);
    }

    fn system_exclusive(&mut self, payload: &[u8]) {
        if payload.first() == Some(&0xF0) {
            (self.send)(payload);
        }
    }

    fn all_notes_off(&mut self) {
        self.controller_on_all(cc::ALL_NOTES_OFF, 0);
    }

    fn silence(&mut self) {
        self.controller_on_all(cc::ALL_SOUND_OFF, 0);
        self.controller_on_all(cc::ALL_NOTES_OFF, 0);
    }

    fn reset(&mut self) {
        self.silence();
        self.controller_on_all(cc::RESET_ALL_CONTROLLERS, 0);
    }

    // Universal real-time Master Volume, 14-bit
    fn master_volume(&mut self, gain: f32) {
        let level = (gain.clamp(0.0, 1.0) * 16383.0).round() as u16;
        let message = [
            0xF0,
            0x7F,
            0x7F,
            0x04,
            0x01,
            (level & 0x7F) as u8,
            (level >> 7) as u8,
            0xF7,
        ];
        (self.send)(&message);
    }
}
