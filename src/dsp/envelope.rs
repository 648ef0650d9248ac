use crate::{dsp::RenderCtx, MIN_TIME};

#[cfg(feature = "serde")]
use serde::Serialize;

/*
ADSR Envelope
=============

Linear attack/decay/sustain/release, used for both the amplitude of a voice
and (scaled by an amount) its filter cutoff.

  level
    1.0 ┐    ╱╲
        │   ╱  ╲_________
    S   │  ╱             ╲
        │ ╱               ╲
    0.0 └╱─────────────────╲──→ time
         A    D     S       R

  attack    seconds to ramp 0 → 1
  decay     seconds to ramp 1 → sustain
  sustain   level held while the key is down
  release   seconds to ramp from the CURRENT level → 0

Ramps
-----

Each ramp stage is entered with a target level and a duration. We convert
the duration to a whole number of samples once, then step by a constant
increment:

    samples = round(time * sample_rate)          (at least 1)
    step    = (target - level) / samples

When the counter runs out we snap to the target exactly, so float drift
never leaves a voice hanging at 1e-7 instead of silence.

Release always starts from wherever the level is, so a key lifted during
the attack fades from the partial level instead of jumping.

Control rate
------------

`advance(n)` jumps n samples in one go. Filter envelopes only need a value
every few dozen samples, so they skip ahead instead of ticking per sample.
*/

/// Envelope shape in seconds (sustain is a level).
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adsr {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Adsr {
    pub const fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

#[derive(Debug, Clone)]
pub struct Envelope {
    shape: Adsr,
    ctx: RenderCtx,

    stage: EnvelopeStage,
    level: f32,

    // Active ramp
    step: f32,
    target: f32,
    remaining: u32,
}

impl Envelope {
    pub fn new(shape: Adsr, ctx: RenderCtx) -> Self {
        Self {
            shape: Adsr {
                attack: shape.attack.max(MIN_TIME),
                decay: shape.decay.max(MIN_TIME),
                sustain: shape.sustain.clamp(0.0, 1.0),
                release: shape.release.max(MIN_TIME),
            },
            ctx,
            stage: EnvelopeStage::Idle,
            level: 0.0,
            step: 0.0,
            target: 0.0,
            remaining: 0,
        }
    }

    /// Gate high: restart from zero.
    pub fn note_on(&mut self) {
        self.level = 0.0;
        self.enter(EnvelopeStage::Attack, 1.0, self.shape.attack);
    }

    /// Gate low: fade from the current level.
    pub fn note_off(&mut self) {
        if matches!(self.stage, EnvelopeStage::Idle | EnvelopeStage::Release) {
            return;
        }
        self.enter(EnvelopeStage::Release, 0.0, self.shape.release);
    }

    fn enter(&mut self, stage: EnvelopeStage, target: f32, seconds: f32) {
        let samples = self.ctx.samples(seconds);
        self.stage = stage;
        self.target = target;
        self.remaining = samples;
        self.step = (target - self.level) / samples as f32;
    }

    fn finish_ramp(&mut self) {
        self.level = self.target;
        match self.stage {
            EnvelopeStage::Attack => {
                self.enter(EnvelopeStage::Decay, self.shape.sustain, self.shape.decay)
            }
            EnvelopeStage::Decay => self.stage = EnvelopeStage::Sustain,
            EnvelopeStage::Release => self.stage = EnvelopeStage::Idle,
            EnvelopeStage::Idle | EnvelopeStage::Sustain => {}
        }
    }

    /// Advance one sample and return the new level.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        if self.remaining > 0 {
            self.level += self.step;
            self.remaining -= 1;
            if self.remaining == 0 {
                self.finish_ramp();
            }
        }
        self.level
    }

    /// Advance `samples` at once and return the level reached.
    pub fn advance(&mut self, mut samples: u32) -> f32 {
        while samples > 0 && self.remaining > 0 {
            let n = samples.min(self.remaining);
            self.level += self.step * n as f32;
            self.remaining -= n;
            samples -= n;
            if self.remaining == 0 {
                self.finish_ramp();
            }
        }
        self.level
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample();
        }
    }

    /// Producing output (not idle).
    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Idle
    }

    pub fn reset(&mut self) {
        self.stage = EnvelopeStage::Idle;
        self.level = 0.0;
        self.remaining = 0;
        self.step = 0.0;
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    pub fn shape(&self) -> &Adsr {
        &self.shape
    }
}
