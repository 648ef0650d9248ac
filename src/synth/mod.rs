//! The built-in synthesizer, split across the two threads.
//!
//! [`SynthController`] runs on the control thread: it owns channel state,
//! detects GM2/GS/XG from SysEx and resolves instruments at note-on.
//! [`PolySynth`] runs on the audio thread and only renders what it is told.

pub mod bank;
pub mod channel;
pub mod controller;
pub mod instruments;
pub mod message;
pub mod poly;
pub mod standard;
pub mod voice;

pub use bank::BankResolver;
pub use channel::ChannelState;
pub use controller::SynthController;
pub use instruments::InstrumentDefinition;
pub use message::{MessageReceiver, MessageSender, SynthMessage};
pub use poly::{PolySynth, SynthConfig};
pub use standard::{Standard, StandardSet};
pub use voice::{Voice, VoicePhase};

/// Paired control and audio halves over a lock-free ring.
#[cfg(feature = "rtrb")]
pub fn realtime(
    config: SynthConfig,
) -> (
    SynthController<rtrb::Producer<SynthMessage>>,
    PolySynth<rtrb::Consumer<SynthMessage>>,
) {
    let (tx, rx) = rtrb::RingBuffer::new(config.queue_capacity.max(1));
    (SynthController::new(tx), PolySynth::new(config, rx))
}
