use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::trace;

/// Transport notifications for the shell to poll.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    LoadStart,
    LoadComplete { duration_ms: f64 },
    Play,
    Pause,
    Stop,
    TimeUpdate { current_ms: f64, duration_ms: f64 },
    Seek { position_ms: f64 },
    Ended,
    Error { reason: String },
}

/// Bounded queue; a shell that stops polling loses updates instead of
/// growing memory.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: Sender<PlayerEvent>,
    rx: Receiver<PlayerEvent>,
}

impl Notifier {
    pub const CAPACITY: usize = 256;

    pub fn new() -> Self {
        let (tx, rx) = bounded(Self::CAPACITY);
        Self { tx, rx }
    }

    pub fn emit(&self, event: PlayerEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => trace!("notification queue full, dropped {event:?}"),
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    /// Another handle onto the same queue.
    pub fn subscribe(&self) -> Receiver<PlayerEvent> {
        self.rx.clone()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
