//! Benchmarks for whole voices, the polyphonic synth and file parsing.

mod parse;
mod voices;

pub use parse::bench_parse;
pub use voices::bench_voices;
