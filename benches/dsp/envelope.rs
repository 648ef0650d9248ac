//! Benchmarks for the ADSR envelope generator.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_midi::dsp::{Adsr, Envelope, RenderCtx};

use crate::BLOCK_SIZES;

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");
    let ctx = RenderCtx::new(48_000.0);

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Attack phase (ramping up)
        let mut env = Envelope::new(Adsr::new(0.1, 0.1, 0.7, 0.3), ctx);
        env.note_on();
        group.bench_with_input(BenchmarkId::new("attack", size), &size, |b, _| {
            b.iter(|| env.render(black_box(&mut buffer)))
        });

        // Sustain phase (holding steady)
        let mut env = Envelope::new(Adsr::new(0.001, 0.001, 0.7, 0.3), ctx);
        env.note_on();
        env.advance(200);
        group.bench_with_input(BenchmarkId::new("sustain", size), &size, |b, _| {
            b.iter(|| env.render(black_box(&mut buffer)))
        });

        // Control-rate stepping, as the filter envelope is driven
        let mut env = Envelope::new(Adsr::new(0.5, 0.5, 0.5, 0.5), ctx);
        env.note_on();
        group.bench_with_input(BenchmarkId::new("advance", size), &size, |b, &n| {
            b.iter(|| black_box(env.advance(n as u32)))
        });
    }

    group.finish();
}
