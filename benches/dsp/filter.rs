//! Benchmarks for the state-variable filter.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_midi::dsp::{OscillatorBlock, SVFilter};

use crate::BLOCK_SIZES;

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");
    let sample_rate = 48_000.0;

    for &size in BLOCK_SIZES {
        let mut input = vec![0.0f32; size];
        OscillatorBlock::sawtooth().render(&mut input, 110.0, sample_rate);
        let mut buffer = input.clone();

        let mut lowpass = SVFilter::lowpass(1_200.0, sample_rate);
        group.bench_with_input(BenchmarkId::new("lowpass", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                lowpass.render(black_box(&mut buffer));
            })
        });

        // Cutoff moved every 32 samples, as a filter envelope does
        let mut swept = SVFilter::lowpass(800.0, sample_rate);
        group.bench_with_input(BenchmarkId::new("swept", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                for (i, chunk) in buffer.chunks_mut(32).enumerate() {
                    swept.set_cutoff(800.0 + 100.0 * i as f32);
                    swept.render(black_box(chunk));
                }
            })
        });
    }

    group.finish();
}
