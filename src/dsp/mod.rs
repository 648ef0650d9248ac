//! Low-level DSP primitives embedded in each synth voice.
//!
//! Everything here is allocation-free and realtime-safe. Voices own these
//! blocks by value and drive them from the audio thread.

/// Attack/decay/sustain/release envelope generator.
pub mod envelope;
/// State-variable filter with Q control.
pub mod filter;
/// Sub-audio modulation source and signal helpers.
pub mod lfo;
/// Phase-accumulating oscillator waveforms.
pub mod oscillator;

pub use envelope::{Adsr, Envelope, EnvelopeStage};
pub use filter::{FilterType, SVFilter};
pub use lfo::Lfo;
pub use oscillator::{OscillatorBlock, Waveform};

/// Per-render information handed to DSP blocks.
#[derive(Debug, Clone, Copy)]
pub struct RenderCtx {
    pub sample_rate: f32,
    /// Target frequency in Hz for pitched blocks.
    pub frequency: f32,
}

impl RenderCtx {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            frequency: 440.0,
        }
    }

    pub fn from_freq(sample_rate: f32, frequency: f32) -> Self {
        Self {
            sample_rate,
            frequency,
        }
    }

    /// Seconds to whole samples, at least one.
    #[inline]
    pub fn samples(&self, seconds: f32) -> u32 {
        (seconds * self.sample_rate).round().max(1.0) as u32
    }
}
