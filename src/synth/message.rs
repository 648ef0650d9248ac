use std::collections::VecDeque;

#[cfg(feature = "rtrb")]
use rtrb::{Consumer, Producer};

use super::instruments::InstrumentDefinition;

/// Commands from the control thread to the audio thread.
///
/// `Copy` and allocation-free so they can cross a lock-free ring buffer.
/// The instrument is resolved on the control side and travels as a
/// `'static` reference.
#[derive(Debug, Copy, Clone)]
pub enum SynthMessage {
    NoteOn {
        channel: u8,
        note: u8,
        velocity: u8,
        instrument: &'static InstrumentDefinition,
    },
    NoteOff {
        channel: u8,
        note: u8,
    },
    /// Mix-affecting controllers only: volume, pan, expression, sustain,
    /// sound off, reset, notes off.
    ControlChange {
        channel: u8,
        controller: u8,
        value: u8,
    },
    /// Total pitch offset: bend, sensitivity and tuning already applied.
    PitchBend {
        channel: u8,
        semitones: f32,
    },
    ChannelPressure {
        channel: u8,
        pressure: u8,
    },
    PolyPressure {
        channel: u8,
        note: u8,
        pressure: u8,
    },
    /// Release (with envelopes) on one channel, or all when `None`.
    AllNotesOff {
        channel: Option<u8>,
    },
    /// Hard stop on one channel, or all when `None`.
    AllSoundOff {
        channel: Option<u8>,
    },
    MasterVolume {
        gain: f32,
    },
    /// Hard stop everything and restore every channel's mix defaults.
    Reset,
}

pub trait MessageSender {
    /// Returns false when the queue is full and the message was dropped.
    fn push(&mut self, msg: SynthMessage) -> bool;
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<SynthMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageSender for Producer<SynthMessage> {
    fn push(&mut self, msg: SynthMessage) -> bool {
        Producer::push(self, msg).is_ok()
    }
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<SynthMessage> {
    fn pop(&mut self) -> Option<SynthMessage> {
        Consumer::pop(self).ok()
    }
}

/// Unbounded queue for offline rendering and tests. Not for the audio
/// thread: pushing may allocate.
impl MessageSender for VecDeque<SynthMessage> {
    fn push(&mut self, msg: SynthMessage) -> bool {
        self.push_back(msg);
        true
    }
}

impl MessageReceiver for VecDeque<SynthMessage> {
    fn pop(&mut self) -> Option<SynthMessage> {
        self.pop_front()
    }
}
