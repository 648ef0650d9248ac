//! Audio-thread half of the synth.
//!
//! `PolySynth` owns a fixed arena of voices and a per-channel mix mirror.
//! It drains queued [`SynthMessage`]s at the top of every block, renders each
//! live voice into a scratch buffer and pans it into the stereo output.
//!
//! ```text
//!   control thread                      audio thread
//!   SynthController ──(rtrb queue)──▶ PolySynth::render(left, right)
//!                                        │ drain messages
//!                                        │ voice.render(scratch)
//!                                        └▶ gain * pan ──▶ left/right
//! ```
//!
//! Nothing here allocates or logs after construction.

use std::f32::consts::FRAC_PI_4;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::channel::{cc, CENTER_PAN, DEFAULT_VOLUME};
use super::instruments::InstrumentDefinition;
use super::message::{MessageReceiver, SynthMessage};
use super::voice::{Voice, VoicePhase};
use crate::{CHANNEL_COUNT, MAX_BLOCK_SIZE};

const NOTE_COUNT: usize = 128;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthConfig {
    pub sample_rate: f32,
    pub max_voices: usize,
    /// Extra time after the release ramp before a voice is reclaimed.
    pub release_margin_seconds: f32,
    pub master_gain: f32,
    /// Capacity of the control-to-audio message ring.
    pub queue_capacity: usize,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            max_voices: 64,
            release_margin_seconds: 0.05,
            master_gain: 0.25,
            queue_capacity: 1024,
        }
    }
}

impl SynthConfig {
    pub fn sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn max_voices(mut self, max_voices: usize) -> Self {
        self.max_voices = max_voices;
        self
    }

    pub fn master_gain(mut self, gain: f32) -> Self {
        self.master_gain = gain;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }
}

/// Audio-side copy of the controllers that affect the mix.
#[derive(Debug, Clone, Copy)]
struct ChannelMix {
    volume: u8,
    expression: u8,
    pan: u8,
    sustain: bool,
    pitch: f32,
    left: f32,
    right: f32,
}

impl ChannelMix {
    fn new() -> Self {
        let mut mix = Self {
            volume: DEFAULT_VOLUME,
            expression: 127,
            pan: CENTER_PAN,
            sustain: false,
            pitch: 0.0,
            left: 0.0,
            right: 0.0,
        };
        mix.update_gains();
        mix
    }

    // Equal-power pan: 64 is centre, 0 hard left, 127 hard right.
    fn update_gains(&mut self) {
        let gain = f32::from(self.volume) / 127.0 * f32::from(self.expression) / 127.0;
        let position = ((f32::from(self.pan) - 64.0) / 63.0).clamp(-1.0, 1.0);
        let theta = (position + 1.0) * FRAC_PI_4;
        self.left = gain * theta.cos();
        self.right = gain * theta.sin();
    }
}

pub struct PolySynth<R: MessageReceiver> {
    config: SynthConfig,
    voices: Vec<Voice>,
    // Live voice per (channel, note), released ones included until reclaimed
    keys: [[Option<u16>; NOTE_COUNT]; CHANNEL_COUNT],
    channels: [ChannelMix; CHANNEL_COUNT],
    rx: R,
    scratch: Vec<f32>,
    master_gain: f32,
    next_age: u64,
    frame_counter: u64,
    stolen: u64,
}

impl<R: MessageReceiver> PolySynth<R> {
    pub fn new(config: SynthConfig, rx: R) -> Self {
        let capacity = config.max_voices.clamp(1, usize::from(u16::MAX));
        let voices = (0..capacity)
            .map(|_| Voice::new(config.sample_rate))
            .collect();

        Self {
            config,
            voices,
            keys: [[None; NOTE_COUNT]; CHANNEL_COUNT],
            channels: [ChannelMix::new(); CHANNEL_COUNT],
            rx,
            scratch: vec![0.0; MAX_BLOCK_SIZE],
            master_gain: config.master_gain,
            next_age: 0,
            frame_counter: 0,
            stolen: 0,
        }
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn receiver(&self) -> &R {
        &self.rx
    }

    pub fn receiver_mut(&mut self) -> &mut R {
        &mut self.rx
    }

    /// Render one stereo block. Queued messages are applied first.
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        while let Some(msg) = self.rx.pop() {
            self.handle(msg);
        }

        let frames = left.len().min(right.len());
        for (l, r) in left[..frames]
            .chunks_mut(MAX_BLOCK_SIZE)
            .zip(right[..frames].chunks_mut(MAX_BLOCK_SIZE))
        {
            self.render_chunk(l, r);
        }
    }

    fn render_chunk(&mut self, left: &mut [f32], right: &mut [f32]) {
        left.fill(0.0);
        right.fill(0.0);
        let len = left.len();

        for idx in 0..self.voices.len() {
            let voice = &mut self.voices[idx];
            if voice.is_free() {
                continue;
            }
            let mix = self.channels[usize::from(voice.channel())];
            let buf = &mut self.scratch[..len];
            voice.render(buf);

            for ((l, r), s) in left.iter_mut().zip(right.iter_mut()).zip(buf.iter()) {
                *l += s * mix.left;
                *r += s * mix.right;
            }

            if voice.is_free() {
                self.unlink(idx);
            }
        }

        for sample in left.iter_mut().chain(right.iter_mut()) {
            *sample = (*sample * self.master_gain).clamp(-1.0, 1.0);
        }

        self.frame_counter += len as u64;
    }

    /// Apply one message immediately.
    pub fn handle(&mut self, msg: SynthMessage) {
        match msg {
            SynthMessage::NoteOn {
                channel,
                note,
                velocity,
                instrument,
            } => {
                if velocity == 0 {
                    self.note_off(channel, note);
                } else {
                    self.note_on(channel, note, velocity, instrument);
                }
            }
            SynthMessage::NoteOff { channel, note } => self.note_off(channel, note),
            SynthMessage::ControlChange {
                channel,
                controller,
                value,
            } => self.control_change(channel, controller, value),
            SynthMessage::PitchBend { channel, semitones } => {
                let ch = channel_index(channel);
                self.channels[ch].pitch = semitones;
                for voice in self.voices_on(ch) {
                    voice.set_pitch(semitones);
                }
            }
            SynthMessage::ChannelPressure { channel, pressure } => {
                let ch = channel_index(channel);
                for voice in self.voices_on(ch) {
                    voice.set_pressure(f32::from(pressure) / 127.0);
                }
            }
            SynthMessage::PolyPressure {
                channel,
                note,
                pressure,
            } => {
                if let Some(idx) = self.lookup(channel, note) {
                    self.voices[idx].set_pressure(f32::from(pressure) / 127.0);
                }
            }
            SynthMessage::AllNotesOff { channel } => match channel {
                Some(ch) => self.release_channel(channel_index(ch)),
                None => (0..CHANNEL_COUNT).for_each(|ch| self.release_channel(ch)),
            },
            SynthMessage::AllSoundOff { channel } => match channel {
                Some(ch) => self.silence_channel(channel_index(ch)),
                None => (0..CHANNEL_COUNT).for_each(|ch| self.silence_channel(ch)),
            },
            SynthMessage::MasterVolume { gain } => {
                self.master_gain = self.config.master_gain * gain.clamp(0.0, 1.0);
            }
            SynthMessage::Reset => {
                for voice in &mut self.voices {
                    voice.kill();
                }
                self.keys = [[None; NOTE_COUNT]; CHANNEL_COUNT];
                self.channels = [ChannelMix::new(); CHANNEL_COUNT];
            }
        }
    }

    fn note_on(
        &mut self,
        channel: u8,
        note: u8,
        velocity: u8,
        instrument: &'static InstrumentDefinition,
    ) {
        let ch = channel_index(channel);
        let note = note.min(127);

        // Retrigger: the old voice for this key goes first
        if let Some(idx) = self.lookup(channel, note) {
            self.voices[idx].kill();
            self.unlink(idx);
        }

        let idx = self.allocate_voice();
        if self.voices[idx].is_active() {
            self.stolen += 1;
            self.voices[idx].kill();
            self.unlink(idx);
        }

        let age = self.next_age;
        self.next_age += 1;
        self.voices[idx].start(
            ch as u8,
            note,
            velocity.min(127),
            instrument,
            self.channels[ch].pitch,
            age,
        );
        self.keys[ch][usize::from(note)] = Some(idx as u16);
    }

    fn note_off(&mut self, channel: u8, note: u8) {
        let ch = channel_index(channel);
        let sustain = self.channels[ch].sustain;
        let margin = self.config.release_margin_seconds;
        if let Some(idx) = self.lookup(channel, note) {
            let voice = &mut self.voices[idx];
            if sustain {
                voice.hold_for_pedal();
            } else {
                voice.release(margin);
            }
        }
    }

    fn control_change(&mut self, channel: u8, controller: u8, value: u8) {
        let ch = channel_index(channel);
        let mix = &mut self.channels[ch];
        match controller {
            cc::VOLUME => {
                mix.volume = value.min(127);
                mix.update_gains();
            }
            cc::EXPRESSION => {
                mix.expression = value.min(127);
                mix.update_gains();
            }
            cc::PAN => {
                mix.pan = value.min(127);
                mix.update_gains();
            }
            cc::SUSTAIN => {
                let was_down = mix.sustain;
                mix.sustain = value >= 64;
                if was_down && !mix.sustain {
                    self.release_pedal(ch);
                }
            }
            cc::ALL_SOUND_OFF => self.silence_channel(ch),
            cc::ALL_NOTES_OFF => self.release_channel(ch),
            cc::RESET_ALL_CONTROLLERS => {
                mix.expression = 127;
                mix.pan = CENTER_PAN;
                mix.pitch = 0.0;
                mix.update_gains();
                let was_down = std::mem::replace(&mut mix.sustain, false);
                if was_down {
                    self.release_pedal(ch);
                }
                for voice in self.voices_on(ch) {
                    voice.set_pressure(1.0);
                    voice.set_pitch(0.0);
                }
            }
            _ => {}
        }
    }

    /// Note-off for every held key on the channel; the pedal still defers.
    fn release_channel(&mut self, ch: usize) {
        let sustain = self.channels[ch].sustain;
        let margin = self.config.release_margin_seconds;
        for voice in self.voices_on(ch) {
            if voice.is_released() {
                continue;
            }
            if sustain {
                voice.hold_for_pedal();
            } else {
                voice.release(margin);
            }
        }
    }

    fn release_pedal(&mut self, ch: usize) {
        let margin = self.config.release_margin_seconds;
        for voice in self.voices_on(ch) {
            if voice.is_pedal_held() {
                voice.release(margin);
            }
        }
    }

    fn silence_channel(&mut self, ch: usize) {
        for idx in 0..self.voices.len() {
            let voice = &self.voices[idx];
            if voice.is_active() && usize::from(voice.channel()) == ch {
                self.voices[idx].kill();
                self.unlink(idx);
            }
        }
    }

    // Free slot, else the oldest releasing voice, else the oldest voice.
    fn allocate_voice(&self) -> usize {
        if let Some(idx) = self.voices.iter().position(|v| v.is_free()) {
            return idx;
        }

        let oldest_releasing = self
            .voices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.phase() == VoicePhase::Releasing)
            .min_by_key(|(_, v)| v.age())
            .map(|(idx, _)| idx);

        oldest_releasing.unwrap_or_else(|| {
            self.voices
                .iter()
                .enumerate()
                .min_by_key(|(_, v)| v.age())
                .map_or(0, |(idx, _)| idx)
        })
    }

    fn lookup(&self, channel: u8, note: u8) -> Option<usize> {
        self.keys[channel_index(channel)][usize::from(note.min(127))].map(usize::from)
    }

    // Drop the key mapping if it still points at this slot.
    fn unlink(&mut self, idx: usize) {
        let voice = &self.voices[idx];
        let slot = &mut self.keys[usize::from(voice.channel())][usize::from(voice.note())];
        if *slot == Some(idx as u16) {
            *slot = None;
        }
    }

    fn voices_on(&mut self, ch: usize) -> impl Iterator<Item = &mut Voice> {
        self.voices
            .iter_mut()
            .filter(move |v| v.is_active() && usize::from(v.channel()) == ch)
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    /// Live voices for one key. Never more than one.
    pub fn voice_count(&self, channel: u8, note: u8) -> usize {
        self.voices
            .iter()
            .filter(|v| v.is_active() && v.channel() == channel && v.note() == note)
            .count()
    }

    pub fn voice_phase(&self, channel: u8, note: u8) -> Option<VoicePhase> {
        self.lookup(channel, note).map(|idx| self.voices[idx].phase())
    }

    pub fn voice_frequency(&self, channel: u8, note: u8) -> Option<f32> {
        self.lookup(channel, note)
            .map(|idx| self.voices[idx].frequency())
    }

    pub fn capacity(&self) -> usize {
        self.voices.len()
    }

    /// Voices taken over while still sounding.
    pub fn stolen_voices(&self) -> u64 {
        self.stolen
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frame_counter
    }

    pub fn master_gain(&self) -> f32 {
        self.master_gain
    }
}

#[inline]
fn channel_index(channel: u8) -> usize {
    usize::from(channel & 0x0F)
}
