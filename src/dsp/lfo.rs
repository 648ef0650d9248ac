//! Low Frequency Oscillator used for vibrato, tremolo and filter wobble.

use super::oscillator::{OscillatorBlock, Waveform};

/*
Low Frequency Oscillators
=========================

An LFO is the same phase accumulator as an audio oscillator, run at
sub-audio rates (0.1 to 20 Hz) and used to move a parameter instead of being
heard.

  vibrato   LFO → oscillator frequency     sharp and flat around the note
  tremolo   LFO → amplitude                louder and softer
  wah       LFO → filter cutoff            brighter and darker

Output is bipolar, -depth..+depth. Each routing scales it again by its own
amount, so one LFO can drive vibrato lightly and the filter heavily:

    offset = sin(2π · rate · t) · depth · amount

Control rate
------------

Nothing an LFO drives needs per-sample updates. The voice asks for a value
once per sub-block (a few dozen samples) and `advance(n)` moves the phase
forward by n samples in one step. At 48 kHz and 32-sample sub-blocks a 7 Hz
vibrato still gets over 200 updates per cycle.

Phase starts at zero on every note so each note's modulation has the same
shape.
*/

#[derive(Debug, Clone, Copy)]
pub struct Lfo {
    osc: OscillatorBlock,
    rate_hz: f32,
    depth: f32,
}

impl Lfo {
    pub fn new(rate_hz: f32, depth: f32) -> Self {
        Self {
            osc: OscillatorBlock::new(Waveform::Sine),
            rate_hz: rate_hz.max(0.0),
            depth,
        }
    }

    /// Current value (in -depth..=depth), then move `samples` forward.
    #[inline]
    pub fn advance(&mut self, samples: u32, sample_rate: f32) -> f32 {
        self.osc.next_sample(self.rate_hz * samples as f32, sample_rate) * self.depth
    }

    pub fn reset(&mut self) {
        self.osc.reset();
    }

    pub fn rate(&self) -> f32 {
        self.rate_hz
    }

    pub fn depth(&self) -> f32 {
        self.depth
    }
}
