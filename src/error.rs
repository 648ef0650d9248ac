use thiserror::Error;

/// Errors raised while loading a Standard MIDI File.
///
/// Everything after a successful load is infallible: unknown meta events,
/// controllers and bank/program combinations are ignored or resolved
/// permissively instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Missing or garbled `MThd`/`MTrk` chunk, or an unreadable event.
    #[error("invalid MIDI file: {0}")]
    InvalidFormat(String),

    /// A read would run past the end of the buffer.
    #[error("truncated MIDI data: wanted {wanted} byte(s) at offset {offset}, buffer holds {len}")]
    TruncatedData {
        offset: usize,
        wanted: usize,
        len: usize,
    },

    /// SMPTE time division; only pulses-per-quarter-note files are played.
    #[error("unsupported time division 0x{0:04x} (SMPTE timing is not supported)")]
    UnsupportedDivision(u16),
}

pub type Result<T> = std::result::Result<T, Error>;
