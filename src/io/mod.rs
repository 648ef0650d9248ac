// Purpose - file parsing, event model, wire conversions

pub mod converter;
pub mod midi;
pub mod reader;
pub mod smf;

pub use midi::{Event, EventKind, MetaKind, MidiEvent};
pub use smf::{parse, Song};
