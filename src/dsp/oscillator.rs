use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::Serialize;

/*
Oscillator Waveforms
====================

All shapes are computed from a normalised phase t in [0, 1):

  sine       sin(2π t)
  saw        2t - 1                       ramps -1 → +1, then snaps back
  square     +1 for t < 0.5, else -1
  triangle   4t - 1 for t < 0.5, else 3 - 4t

The phase advances by frequency / sample_rate each sample and wraps at 1.
The first sample of a fresh oscillator is taken at t = 0, so a sine starts
at zero crossing.

No band-limiting is done: saw and square alias at high pitches. Voices sum
several partials at low gain, which keeps it tolerable for General MIDI
playback.
*/

#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Saw,
    Square,
    Triangle,
}

impl Waveform {
    /// Value of the waveform at normalised phase `t` in [0, 1).
    #[inline]
    pub fn at(self, t: f32) -> f32 {
        match self {
            Waveform::Sine => (TAU * t).sin(),
            Waveform::Saw => 2.0 * t - 1.0,
            Waveform::Square => {
                if t < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => {
                if t < 0.5 {
                    4.0 * t - 1.0
                } else {
                    3.0 - 4.0 * t
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OscillatorBlock {
    waveform: Waveform,
    phase: f32,
}

impl OscillatorBlock {
    pub fn new(waveform: Waveform) -> Self {
        Self {
            waveform,
            phase: 0.0,
        }
    }

    pub fn sine() -> Self {
        Self::new(Waveform::Sine)
    }

    pub fn sawtooth() -> Self {
        Self::new(Waveform::Saw)
    }

    pub fn square() -> Self {
        Self::new(Waveform::Square)
    }

    pub fn triangle() -> Self {
        Self::new(Waveform::Triangle)
    }

    /// Current sample, then advance the phase.
    #[inline]
    pub fn next_sample(&mut self, frequency: f32, sample_rate: f32) -> f32 {
        let out = self.waveform.at(self.phase);
        self.phase += frequency / sample_rate;
        self.phase -= self.phase.floor();
        out
    }

    /// Fill `destination` at a fixed frequency.
    pub fn render(&mut self, destination: &mut [f32], frequency: f32, sample_rate: f32) {
        for sample in destination.iter_mut() {
            *sample = self.next_sample(frequency, sample_rate);
        }
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }
}
