pub mod tempo;

pub use tempo::{TempoChange, TempoMap, DEFAULT_TEMPO};
