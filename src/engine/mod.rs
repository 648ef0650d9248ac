//! Transport: turns a parsed song into timed sink calls.
//!
//! [`Player`] is the single-threaded facade; [`driver::spawn`] puts it on
//! its own thread behind a [`PlayerHandle`].

pub mod clock;
pub mod driver;
pub mod notify;
pub mod player;
pub mod scheduler;
pub mod sink;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use driver::{spawn, Command, PlayerHandle};
pub use notify::PlayerEvent;
pub use player::{Player, PlayerConfig};
pub use scheduler::{Scheduler, Step, TransportState};
pub use sink::{EventSink, RawMidiOut};
