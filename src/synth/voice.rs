use crate::dsp::{
    envelope::{Envelope, EnvelopeStage},
    filter::SVFilter,
    lfo::Lfo,
    oscillator::OscillatorBlock,
    RenderCtx,
};
use crate::io::converter::{midi_note_to_freq, semitones_to_ratio};
use crate::synth::instruments::{InstrumentDefinition, LfoParam, FALLBACK, MAX_HARMONICS};

/// Samples between modulation updates (filter envelope, LFO).
pub const CONTROL_BLOCK: usize = 32;

const MAX_PARTIALS: usize = MAX_HARMONICS + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoicePhase {
    Free,
    Attacking,
    Decaying,
    Sustaining,
    Releasing,
}

#[derive(Debug, Clone, Copy)]
struct Partial {
    osc: OscillatorBlock,
    ratio: f32,
    gain: f32,
}

impl Partial {
    fn silent() -> Self {
        Self {
            osc: OscillatorBlock::sine(),
            ratio: 1.0,
            gain: 0.0,
        }
    }
}

/// One sounding note. Preallocated and reused; `start` never allocates.
#[derive(Debug, Clone)]
pub struct Voice {
    ctx: RenderCtx,
    active: bool,
    channel: u8,
    note: u8,
    velocity: u8,
    age: u64,
    instrument: &'static InstrumentDefinition,

    partials: [Partial; MAX_PARTIALS],
    partial_count: usize,
    base_frequency: f32,
    pitch_ratio: f32,
    pressure: f32,

    amp_env: Envelope,
    filter: Option<SVFilter>,
    filter_env: Option<Envelope>,
    lfo: Option<Lfo>,

    // Note-off arrived while the pedal was down
    pedal_held: bool,
    released: bool,
    // Samples left before the voice is torn down after note-off
    teardown: u32,
}

impl Voice {
    pub fn new(sample_rate: f32) -> Self {
        let ctx = RenderCtx::new(sample_rate);
        Self {
            ctx,
            active: false,
            channel: 0,
            note: 0,
            velocity: 0,
            age: 0,
            instrument: &FALLBACK,
            partials: [Partial::silent(); MAX_PARTIALS],
            partial_count: 0,
            base_frequency: 440.0,
            pitch_ratio: 1.0,
            pressure: 1.0,
            amp_env: Envelope::new(FALLBACK.envelope, ctx),
            filter: None,
            filter_env: None,
            lfo: None,
            pedal_held: false,
            released: false,
            teardown: 0,
        }
    }

    pub fn start(
        &mut self,
        channel: u8,
        note: u8,
        velocity: u8,
        instrument: &'static InstrumentDefinition,
        pitch_semitones: f32,
        age: u64,
    ) {
        self.active = true;
        self.channel = channel;
        self.note = note;
        self.velocity = velocity;
        self.age = age;
        self.instrument = instrument;

        self.base_frequency = midi_note_to_freq(note);
        self.pitch_ratio = semitones_to_ratio(pitch_semitones);
        self.pressure = 1.0;
        self.pedal_held = false;
        self.released = false;
        self.teardown = 0;

        // Perceptual curve, not linear
        let velocity_gain = (velocity as f32 / 127.0).powi(2);

        self.partials[0] = Partial {
            osc: OscillatorBlock::new(instrument.waveform),
            ratio: 1.0,
            gain: velocity_gain,
        };
        let harmonics = &instrument.harmonics[..instrument.harmonics.len().min(MAX_HARMONICS)];
        for (slot, harmonic) in self.partials[1..].iter_mut().zip(harmonics) {
            *slot = Partial {
                osc: OscillatorBlock::new(harmonic.waveform),
                ratio: harmonic.ratio,
                gain: harmonic.gain * velocity_gain,
            };
        }
        self.partial_count = 1 + harmonics.len();

        self.amp_env = Envelope::new(instrument.envelope, self.ctx);
        self.amp_env.note_on();

        self.filter = instrument
            .filter
            .map(|spec| SVFilter::new(spec.kind, spec.cutoff_hz, spec.q, self.ctx.sample_rate));
        self.filter_env = instrument
            .filter
            .and_then(|spec| spec.envelope)
            .map(|fe| {
                let mut env = Envelope::new(fe.adsr, self.ctx);
                env.note_on();
                env
            });
        self.lfo = instrument.lfo.map(|spec| Lfo::new(spec.rate_hz, spec.depth));
    }

    /// Begin the release ramp and schedule teardown.
    pub fn release(&mut self, margin_seconds: f32) {
        if !self.active || self.released {
            return;
        }
        self.released = true;
        self.pedal_held = false;
        self.amp_env.note_off();
        if let Some(env) = self.filter_env.as_mut() {
            env.note_off();
        }
        self.teardown = self
            .ctx
            .samples(self.instrument.release_seconds() + margin_seconds.max(0.0));
    }

    /// Immediate stop, no ramp.
    pub fn kill(&mut self) {
        self.active = false;
        self.released = false;
        self.pedal_held = false;
        self.amp_env.reset();
    }

    pub fn set_pitch(&mut self, semitones: f32) {
        self.pitch_ratio = semitones_to_ratio(semitones);
    }

    pub fn set_pressure(&mut self, pressure: f32) {
        self.pressure = pressure.clamp(0.0, 1.0);
    }

    pub fn hold_for_pedal(&mut self) {
        if self.active && !self.released {
            self.pedal_held = true;
        }
    }

    /// Render into `out` (overwrites). Frees the voice once teardown elapses.
    pub fn render(&mut self, out: &mut [f32]) {
        if !self.active {
            out.fill(0.0);
            return;
        }

        let sample_rate = self.ctx.sample_rate;
        let frequency = self.base_frequency * self.pitch_ratio;

        for chunk in out.chunks_mut(CONTROL_BLOCK) {
            let n = chunk.len() as u32;

            let mut vibrato_hz = 0.0;
            let mut tremolo = 1.0;
            let mut wah_hz = 0.0;
            if let (Some(lfo), Some(spec)) = (self.lfo.as_mut(), self.instrument.lfo) {
                let value = lfo.advance(n, sample_rate);
                for target in spec.targets {
                    match target.param {
                        LfoParam::Frequency => vibrato_hz += value * target.amount,
                        LfoParam::Amplitude => tremolo += value * target.amount,
                        LfoParam::FilterCutoff => wah_hz += value * target.amount,
                    }
                }
            }
            let tremolo = f32::max(tremolo, 0.0);

            if let (Some(filter), Some(spec)) = (self.filter.as_mut(), self.instrument.filter) {
                let base = spec.cutoff_hz;
                let sweep = match (self.filter_env.as_mut(), spec.envelope) {
                    (Some(env), Some(fe)) => {
                        let level = env.level();
                        env.advance(n);
                        fe.amount * base * level
                    }
                    _ => 0.0,
                };
                filter.set_cutoff(base + sweep + wah_hz);
            }

            for sample in chunk.iter_mut() {
                let mut mix = 0.0;
                for partial in &mut self.partials[..self.partial_count] {
                    let hz = (frequency * partial.ratio + vibrato_hz).max(0.0);
                    mix += partial.osc.next_sample(hz, sample_rate) * partial.gain;
                }

                if let Some(filter) = self.filter.as_mut() {
                    mix = filter.next_sample(mix);
                }

                *sample = mix * self.amp_env.next_sample() * tremolo * self.pressure;
            }
        }

        if self.released {
            self.teardown = self.teardown.saturating_sub(out.len() as u32);
            if self.teardown == 0 {
                self.kill();
            }
        }
    }

    pub fn phase(&self) -> VoicePhase {
        if !self.active {
            return VoicePhase::Free;
        }
        if self.released {
            return VoicePhase::Releasing;
        }
        match self.amp_env.stage() {
            EnvelopeStage::Attack => VoicePhase::Attacking,
            EnvelopeStage::Decay => VoicePhase::Decaying,
            EnvelopeStage::Sustain => VoicePhase::Sustaining,
            // Zero-sustain envelopes decay to silence while the key is down
            EnvelopeStage::Idle | EnvelopeStage::Release => VoicePhase::Sustaining,
        }
    }

    pub fn is_free(&self) -> bool {
        !self.active
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn is_pedal_held(&self) -> bool {
        self.pedal_held
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn note(&self) -> u8 {
        self.note
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    pub fn age(&self) -> u64 {
        self.age
    }

    pub fn instrument(&self) -> &'static InstrumentDefinition {
        self.instrument
    }

    /// Current fundamental, pitch offset included.
    pub fn frequency(&self) -> f32 {
        self.base_frequency * self.pitch_ratio
    }

    pub fn envelope_level(&self) -> f32 {
        self.amp_env.level()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{envelope::Adsr, filter::FilterType, oscillator::Waveform};
    use crate::synth::instruments::{
        FilterEnvelope, FilterSpec, Harmonic, LfoSpec, LfoTarget, GM_INSTRUMENTS,
    };
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    const SAMPLE_RATE: f32 = 48_000.0;

    // 5 Hz at 48 kHz: a quarter cycle is 75 control blocks
    const QUARTER: usize = 75;

    const HOLD: Adsr = Adsr::new(0.001, 0.001, 1.0, 0.1);

    static SWEEP: InstrumentDefinition =
        InstrumentDefinition::new("sweep", Waveform::Saw, &[], HOLD).with_filter(FilterSpec {
            kind: FilterType::LowPass,
            cutoff_hz: 500.0,
            q: 0.707,
            envelope: Some(FilterEnvelope {
                adsr: Adsr::new(0.05, 0.05, 0.5, 0.1),
                amount: 4.0,
            }),
        });

    static PLAIN: InstrumentDefinition =
        InstrumentDefinition::new("plain", Waveform::Sine, &[], HOLD);

    static TREMOLO: InstrumentDefinition =
        InstrumentDefinition::new("tremolo", Waveform::Sine, &[], HOLD).with_lfo(LfoSpec {
            rate_hz: 5.0,
            depth: 1.0,
            targets: &[LfoTarget {
                param: LfoParam::Amplitude,
                amount: 0.5,
            }],
        });

    static VIBRATO: InstrumentDefinition = InstrumentDefinition::new(
        "vibrato",
        Waveform::Sine,
        &[
            Harmonic {
                waveform: Waveform::Sine,
                ratio: 2.0,
                gain: 0.5,
            },
            Harmonic {
                waveform: Waveform::Triangle,
                ratio: 3.0,
                gain: 0.3,
            },
        ],
        HOLD,
    )
    .with_lfo(LfoSpec {
        rate_hz: 5.0,
        depth: 1.0,
        targets: &[LfoTarget {
            param: LfoParam::Frequency,
            amount: 20.0,
        }],
    });

    static WAH: InstrumentDefinition =
        InstrumentDefinition::new("wah", Waveform::Saw, &[], HOLD)
            .with_filter(FilterSpec {
                kind: FilterType::LowPass,
                cutoff_hz: 1000.0,
                q: 0.707,
                envelope: None,
            })
            .with_lfo(LfoSpec {
                rate_hz: 5.0,
                depth: 1.0,
                targets: &[LfoTarget {
                    param: LfoParam::FilterCutoff,
                    amount: 400.0,
                }],
            });

    fn cutoff(voice: &Voice) -> f32 {
        voice.filter.as_ref().unwrap().cutoff()
    }

    /// Render one control block and return each partial's frequency over it.
    fn partial_hz(voice: &mut Voice) -> Vec<f32> {
        let before: Vec<f32> = voice.partials[..voice.partial_count]
            .iter()
            .map(|p| p.osc.phase())
            .collect();
        let mut block = [0.0f32; CONTROL_BLOCK];
        voice.render(&mut block);
        voice.partials[..voice.partial_count]
            .iter()
            .zip(before)
            .map(|(p, start)| {
                (p.osc.phase() - start).rem_euclid(1.0) * SAMPLE_RATE / CONTROL_BLOCK as f32
            })
            .collect()
    }

    fn block_rms(voice: &mut Voice, blocks: usize) -> Vec<f32> {
        // 10 ms blocks
        let mut block = [0.0f32; 480];
        (0..blocks)
            .map(|_| {
                voice.render(&mut block);
                (block.iter().map(|s| s * s).sum::<f32>() / block.len() as f32).sqrt()
            })
            .collect()
    }

    fn gm(program: u8) -> &'static InstrumentDefinition {
        &GM_INSTRUMENTS
            .iter()
            .find(|e| e.program == program)
            .unwrap()
            .instrument
    }

    #[test]
    fn start_builds_fundamental_plus_harmonics() {
        let mut voice = Voice::new(SAMPLE_RATE);
        voice.start(0, 69, 127, gm(16), 0.0, 0);

        assert_eq!(voice.partial_count, 4);
        assert_relative_eq!(voice.partials[0].gain, 1.0);
        assert_relative_eq!(voice.partials[1].gain, 0.7);
        assert_relative_eq!(voice.frequency(), 440.0);
        assert_eq!(voice.phase(), VoicePhase::Attacking);
    }

    #[test]
    fn velocity_curve_is_quadratic() {
        let mut voice = Voice::new(SAMPLE_RATE);
        voice.start(0, 60, 64, gm(0), 0.0, 0);
        let expected = (64.0f32 / 127.0).powi(2);
        assert_relative_eq!(voice.partials[0].gain, expected);
        assert_relative_eq!(voice.partials[1].gain, 0.5 * expected);
    }

    #[test]
    fn pitch_offset_applies_live() {
        let mut voice = Voice::new(SAMPLE_RATE);
        voice.start(0, 69, 100, gm(0), 2.0, 0);
        assert_relative_eq!(voice.frequency(), 440.0 * 2f32.powf(2.0 / 12.0), epsilon = 1e-3);

        voice.set_pitch(-12.0);
        assert_relative_eq!(voice.frequency(), 220.0, epsilon = 1e-3);
    }

    #[test]
    fn release_then_teardown() {
        let mut voice = Voice::new(SAMPLE_RATE);
        let piano = gm(0);
        voice.start(0, 60, 100, piano, 0.0, 0);

        let mut block = vec![0.0f32; 256];
        voice.render(&mut block);
        assert!(block.iter().any(|s| s.abs() > 0.0));

        voice.release(0.05);
        assert_eq!(voice.phase(), VoicePhase::Releasing);

        // release (0.3 s) + margin (0.05 s) at 48 kHz
        let teardown = ((0.3 + 0.05) * SAMPLE_RATE) as usize;
        let mut rendered = 0;
        while voice.is_active() {
            voice.render(&mut block);
            rendered += block.len();
            assert!(rendered <= teardown + block.len(), "voice never freed");
        }
        assert!(rendered >= teardown);
        assert_eq!(voice.phase(), VoicePhase::Free);
    }

    #[test]
    fn filtered_instrument_renders_finite_output() {
        let mut voice = Voice::new(SAMPLE_RATE);
        voice.start(0, 48, 127, gm(88), 0.0, 0);
        let mut block = vec![0.0f32; 4096];
        for _ in 0..8 {
            voice.render(&mut block);
            assert!(block.iter().all(|s| s.is_finite()));
        }
        assert!(voice.filter.is_some());
    }

    #[test]
    fn kill_is_immediate() {
        let mut voice = Voice::new(SAMPLE_RATE);
        voice.start(0, 60, 100, gm(0), 0.0, 0);
        voice.kill();
        assert!(voice.is_free());

        let mut block = [1.0f32; 8];
        voice.render(&mut block);
        assert!(block.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn filter_envelope_sweeps_cutoff_then_settles() {
        let mut voice = Voice::new(SAMPLE_RATE);
        voice.start(0, 48, 127, &SWEEP, 0.0, 0);

        let mut block = [0.0f32; CONTROL_BLOCK];
        let mut cutoffs = Vec::new();
        // 0.05 s attack + 0.05 s decay, then well into sustain
        for _ in 0..(QUARTER * 4) {
            voice.render(&mut block);
            cutoffs.push(cutoff(&voice));
        }

        assert_relative_eq!(cutoffs[0], 500.0);
        let attack = &cutoffs[..=QUARTER];
        assert!(attack.windows(2).all(|w| w[1] >= w[0]));
        // base + amount * base at the top of the attack
        assert_abs_diff_eq!(cutoffs[QUARTER], 2500.0, epsilon = 1.0);
        assert!(cutoffs[QUARTER + 10] < cutoffs[QUARTER]);
        // base + amount * base * sustain
        assert_abs_diff_eq!(*cutoffs.last().unwrap(), 1500.0, epsilon = 1.0);
    }

    #[test]
    fn tremolo_moves_block_level_with_the_lfo() {
        let mut voice = Voice::new(SAMPLE_RATE);
        voice.start(0, 69, 127, &TREMOLO, 0.0, 0);
        let rms = block_rms(&mut voice, 40);

        // 5 Hz: crest near 50 ms, trough near 150 ms, period 200 ms
        assert!(rms[5] > 2.0 * rms[15], "crest {} trough {}", rms[5], rms[15]);
        assert_abs_diff_eq!(rms[25], rms[5], epsilon = 0.02);
        assert_abs_diff_eq!(rms[35], rms[15], epsilon = 0.02);

        let mut steady = Voice::new(SAMPLE_RATE);
        steady.start(0, 69, 127, &PLAIN, 0.0, 0);
        let flat = block_rms(&mut steady, 40);
        let (lo, hi) = flat[1..]
            .iter()
            .fold((f32::MAX, 0.0f32), |(lo, hi), &r| (lo.min(r), hi.max(r)));
        assert!(hi / lo < 1.1);
        assert!(rms[5] > hi && rms[15] < lo);
    }

    #[test]
    fn vibrato_shifts_every_partial() {
        let mut voice = Voice::new(SAMPLE_RATE);
        voice.start(0, 69, 127, &VIBRATO, 0.0, 0);
        let fundamental = voice.frequency();
        let ratios = [1.0, 2.0, 3.0];

        // LFO starts at zero
        let first = partial_hz(&mut voice);
        assert_eq!(first.len(), ratios.len());
        for (hz, ratio) in first.iter().zip(ratios) {
            assert_abs_diff_eq!(*hz, fundamental * ratio, epsilon = 0.05);
        }

        for _ in 1..QUARTER {
            partial_hz(&mut voice);
        }
        let crest = partial_hz(&mut voice);
        for (hz, ratio) in crest.iter().zip(ratios) {
            assert_abs_diff_eq!(*hz, fundamental * ratio + 20.0, epsilon = 0.05);
        }

        for _ in (QUARTER + 1)..(QUARTER * 3) {
            partial_hz(&mut voice);
        }
        let trough = partial_hz(&mut voice);
        for (hz, ratio) in trough.iter().zip(ratios) {
            assert_abs_diff_eq!(*hz, fundamental * ratio - 20.0, epsilon = 0.05);
        }
    }

    #[test]
    fn wah_swings_cutoff_around_base() {
        let mut voice = Voice::new(SAMPLE_RATE);
        voice.start(0, 48, 127, &WAH, 0.0, 0);

        let mut block = [0.0f32; CONTROL_BLOCK];
        let mut cutoffs = Vec::new();
        for _ in 0..(QUARTER * 4) {
            voice.render(&mut block);
            cutoffs.push(cutoff(&voice));
        }
        assert_relative_eq!(cutoffs[0], 1000.0);
        assert_abs_diff_eq!(cutoffs[QUARTER], 1400.0, epsilon = 1.0);
        assert_abs_diff_eq!(cutoffs[QUARTER * 3], 600.0, epsilon = 1.0);
    }
}
