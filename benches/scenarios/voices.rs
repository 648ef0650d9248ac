//! Benchmarks for complete voices and a busy synth.
//!
//! Instruments are picked to cover each code path: plain additive,
//! LFO vibrato, and filter plus filter envelope.

use std::collections::VecDeque;
use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_midi::synth::{BankResolver, PolySynth, SynthConfig, SynthMessage, Voice};

use crate::BLOCK_SIZES;

pub fn bench_voices(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voices");
    let bank = BankResolver::new();

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for (name, program) in [("piano", 0), ("violin", 40), ("pad", 88)] {
            let mut voice = Voice::new(48_000.0);
            voice.start(0, 57, 100, bank.general_midi(program), 0.0, 0);
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| voice.render(black_box(&mut buffer)))
            });
        }

        // 32 held notes across 4 channels, stereo out
        let mut synth = PolySynth::new(SynthConfig::default(), VecDeque::new());
        for i in 0..32u8 {
            synth.handle(SynthMessage::NoteOn {
                channel: i % 4,
                note: 36 + i,
                velocity: 100,
                instrument: bank.general_midi([0, 40, 48, 88][usize::from(i % 4)]),
            });
        }
        let mut left = vec![0.0f32; size];
        let mut right = vec![0.0f32; size];
        group.bench_with_input(BenchmarkId::new("poly_32", size), &size, |b, _| {
            b.iter(|| synth.render(black_box(&mut left), black_box(&mut right)))
        });
    }

    group.finish();
}
