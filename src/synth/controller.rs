//! Control-thread half of the synth: channel state, standard detection and
//! instrument resolution, feeding the audio thread through a message queue.

use log::{info, warn};

use super::bank::BankResolver;
use super::channel::{cc, ChannelState};
use super::message::{MessageSender, SynthMessage};
use super::standard::StandardSet;
use crate::engine::sink::EventSink;
use crate::io::midi::MidiEvent;
use crate::CHANNEL_COUNT;

pub struct SynthController<T: MessageSender> {
    tx: T,
    channels: [ChannelState; CHANNEL_COUNT],
    standards: StandardSet,
    resolver: BankResolver,
    dropped: u64,
}

impl<T: MessageSender> SynthController<T> {
    pub fn new(tx: T) -> Self {
        Self::with_resolver(tx, BankResolver::new())
    }

    pub fn with_resolver(tx: T, resolver: BankResolver) -> Self {
        Self {
            tx,
            channels: std::array::from_fn(|_| ChannelState::new()),
            standards: StandardSet::new(),
            resolver,
            dropped: 0,
        }
    }

    pub fn channel(&self, channel: u8) -> &ChannelState {
        &self.channels[usize::from(channel) % CHANNEL_COUNT]
    }

    pub fn standards(&self) -> &StandardSet {
        &self.standards
    }

    /// Messages lost to a full queue since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn sender(&self) -> &T {
        &self.tx
    }

    pub fn sender_mut(&mut self) -> &mut T {
        &mut self.tx
    }

    fn send(&mut self, msg: SynthMessage) {
        if !self.tx.push(msg) {
            self.dropped += 1;
            warn!("synth queue full, dropped {msg:?}");
        }
    }

    fn control_change(&mut self, channel: u8, controller: u8, value: u8) {
        let state = &mut self.channels[usize::from(channel)];
        let pitch_before = state.pitch_offset();
        state.control_change(channel, controller, value, &self.standards);
        let pitch_after = state.pitch_offset();

        if matches!(
            controller,
            cc::VOLUME
                | cc::PAN
                | cc::EXPRESSION
                | cc::SUSTAIN
                | cc::ALL_SOUND_OFF
                | cc::RESET_ALL_CONTROLLERS
                | cc::ALL_NOTES_OFF
        ) {
            self.send(SynthMessage::ControlChange {
                channel,
                controller,
                value: value.min(127),
            });
        }

        if pitch_after != pitch_before {
            self.send(SynthMessage::PitchBend {
                channel,
                semitones: pitch_after,
            });
        }
    }
}

impl<T: MessageSender> EventSink for SynthController<T> {
    fn channel_event(&mut self, event: MidiEvent) {
        let channel = event.channel() & 0x0F;

        match event.normalized() {
            MidiEvent::NoteOn { key, velocity, .. } => {
                let note = key.min(127);
                let state = &self.channels[usize::from(channel)];
                let instrument =
                    self.resolver
                        .resolve(state.bank(), state.program, note, &self.standards);
                self.send(SynthMessage::NoteOn {
                    channel,
                    note,
                    velocity: velocity.min(127),
                    instrument,
                });
            }
            MidiEvent::NoteOff { key, .. } => self.send(SynthMessage::NoteOff {
                channel,
                note: key.min(127),
            }),
            MidiEvent::ProgramChange { program, .. } => {
                self.channels[usize::from(channel)].program_change(program)
            }
            MidiEvent::ControlChange {
                controller, value, ..
            } => self.control_change(channel, controller, value),
            MidiEvent::PitchBend { value, .. } => {
                let state = &mut self.channels[usize::from(channel)];
                state.pitch_bend(value);
                let semitones = state.pitch_offset();
                self.send(SynthMessage::PitchBend { channel, semitones });
            }
            MidiEvent::ChannelAftertouch { pressure, .. } => {
                self.send(SynthMessage::ChannelPressure {
                    channel,
                    pressure: pressure.min(127),
                })
            }
            MidiEvent::PolyAftertouch { key, pressure, .. } => {
                self.send(SynthMessage::PolyPressure {
                    channel,
                    note: key.min(127),
                    pressure: pressure.min(127),
                })
            }
        }
    }

    fn system_exclusive(&mut self, payload: &[u8]) {
        if let Some(standard) = self.standards.detect(payload) {
            info!("detected {} ({})", standard.name(), self.standards);
        }
    }

    fn all_notes_off(&mut self) {
        self.send(SynthMessage::AllNotesOff { channel: None });
    }

    fn silence(&mut self) {
        self.send(SynthMessage::AllSoundOff { channel: None });
    }

    fn reset(&mut self) {
        self.channels = std::array::from_fn(|_| ChannelState::new());
        self.standards.clear();
        self.send(SynthMessage::Reset);
    }

    fn master_volume(&mut self, gain: f32) {
        self.send(SynthMessage::MasterVolume {
            gain: gain.clamp(0.0, 1.0),
        });
    }
}
