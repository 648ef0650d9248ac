pub mod backend; // Pull-based rendering adapter
pub mod dsp;
pub mod engine; // Transport, scheduling and dispatch
pub mod error;
pub mod io;
pub mod sequencing; // Tick <-> wall-clock conversion
pub mod synth; // Channel state, instruments, voices

pub use error::{Error, Result};

pub const MAX_BLOCK_SIZE: usize = 2048;
pub(crate) const MIN_TIME: f32 = 1.0 / 48_000.0;

/// Number of MIDI channels.
pub const CHANNEL_COUNT: usize = 16;
