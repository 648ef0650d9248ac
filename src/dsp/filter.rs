use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::Serialize;

/*
State-Variable Filter
=====================

Trapezoidal-integrated SVF (two integrators, zero-delay feedback). One
structure gives every response at once:

| response  | output               | passes          | rejects      |
| --------- | -------------------- | --------------- | ------------ |
| low-pass  | v2                   | below cutoff    | above cutoff |
| high-pass | x - k·v1 - v2        | above cutoff    | below cutoff |
| band-pass | v1                   | around cutoff   | far away     |
| notch     | x - k·v1             | far away        | around cutoff|

Coefficients:

    g = tan(π · cutoff / sample_rate)
    k = 1 / Q                      (damping; Q = 0.707 is Butterworth)

Instruments describe their filter with a cutoff and a Q. Envelopes and LFOs
move the cutoff at control rate, so `set_cutoff` recomputes `g` and the
per-sample loop stays free of trig.

Cutoff is clamped to [20 Hz, 0.45 · sample_rate]; tan() blows up as the
cutoff approaches Nyquist.
*/

pub const MIN_CUTOFF_HZ: f32 = 20.0;
pub const DEFAULT_Q: f32 = std::f32::consts::FRAC_1_SQRT_2;

#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    LowPass,
    HighPass,
    BandPass,
    Notch,
}

#[derive(Debug, Clone, Copy)]
pub struct SVFilter {
    ic1eq: f32, // First integrator's memory
    ic2eq: f32, // Second integrator's memory

    filter_type: FilterType,
    sample_rate: f32,
    cutoff_hz: f32,
    q: f32,

    // Cached coefficients
    g: f32,
    k: f32,
}

impl SVFilter {
    pub fn new(filter_type: FilterType, cutoff_hz: f32, q: f32, sample_rate: f32) -> Self {
        let mut filter = Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            filter_type,
            sample_rate,
            cutoff_hz,
            q: DEFAULT_Q,
            g: 0.0,
            k: 1.0 / DEFAULT_Q,
        };
        filter.set_q(q);
        filter.set_cutoff(cutoff_hz);
        filter
    }

    pub fn lowpass(cutoff_hz: f32, sample_rate: f32) -> Self {
        Self::new(FilterType::LowPass, cutoff_hz, DEFAULT_Q, sample_rate)
    }

    pub fn highpass(cutoff_hz: f32, sample_rate: f32) -> Self {
        Self::new(FilterType::HighPass, cutoff_hz, DEFAULT_Q, sample_rate)
    }

    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        let max = self.sample_rate * 0.45;
        self.cutoff_hz = cutoff_hz.clamp(MIN_CUTOFF_HZ, max.max(MIN_CUTOFF_HZ));
        self.g = (TAU * 0.5 * self.cutoff_hz / self.sample_rate).tan();
    }

    pub fn set_q(&mut self, q: f32) {
        self.q = q.max(0.1);
        self.k = 1.0 / self.q;
    }

    #[inline]
    pub fn next_sample(&mut self, input: f32) -> f32 {
        let (g, k) = (self.g, self.k);

        let h = 1.0 / (1.0 + g * (g + k));
        let v3 = input - self.ic2eq;
        let v1 = h * (self.ic1eq + g * v3);
        let v2 = self.ic2eq + g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        match self.filter_type {
            FilterType::LowPass => v2,
            FilterType::HighPass => input - k * v1 - v2,
            FilterType::BandPass => v1,
            FilterType::Notch => input - k * v1,
        }
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(*sample);
        }
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff_hz
    }

    pub fn q(&self) -> f32 {
        self.q
    }
}
