//! Runs a [`Player`] on its own control thread.
//!
//! The thread blocks on the command channel until either a command arrives
//! or the scheduler's next deadline passes, then ticks the player. Position,
//! duration and play state are mirrored into atomics so the shell can read
//! them without a round trip.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, warn};

use super::clock::Clock;
use super::notify::PlayerEvent;
use super::player::Player;
use super::sink::EventSink;

/// Transport commands accepted by the driver thread.
#[derive(Debug, Clone)]
pub enum Command {
    Load(Vec<u8>),
    Play,
    Pause,
    Toggle,
    Stop,
    Seek(f64),
    /// Relative seek from the current position.
    SeekBy(f64),
    SetLooping(bool),
    SetVolume(f32),
    Shutdown,
}

#[derive(Debug, Default)]
struct Shared {
    current_ms: AtomicU64,
    duration_ms: AtomicU64,
    playing: AtomicBool,
    looping: AtomicBool,
}

impl Shared {
    fn publish<S: EventSink, C: Clock>(&self, player: &Player<S, C>) {
        self.current_ms
            .store(player.current_time().to_bits(), Ordering::Relaxed);
        self.duration_ms
            .store(player.duration().to_bits(), Ordering::Relaxed);
        self.playing.store(player.is_playing(), Ordering::Relaxed);
        self.looping.store(player.looping(), Ordering::Relaxed);
    }
}

/// Shell-side handle. Dropping it shuts the thread down.
pub struct PlayerHandle {
    tx: Sender<Command>,
    events: Receiver<PlayerEvent>,
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

pub fn spawn<S, C>(player: Player<S, C>) -> std::io::Result<PlayerHandle>
where
    S: EventSink + Send + 'static,
    C: Clock + 'static,
{
    let (tx, rx) = unbounded();
    let events = player.events();
    let shared = Arc::new(Shared::default());
    shared.publish(&player);

    let thread = thread::Builder::new()
        .name("midi-transport".into())
        .spawn({
            let shared = Arc::clone(&shared);
            move || run(player, rx, shared)
        })?;

    Ok(PlayerHandle {
        tx,
        events,
        shared,
        thread: Some(thread),
    })
}

fn run<S: EventSink, C: Clock>(mut player: Player<S, C>, rx: Receiver<Command>, shared: Arc<Shared>) {
    loop {
        let received = match player.next_deadline() {
            Some(deadline) => {
                let wait_ms = (deadline - player.now_ms()).max(0.0);
                rx.recv_timeout(Duration::from_secs_f64(wait_ms / 1000.0))
            }
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(command) => apply(&mut player, command),
            Err(RecvTimeoutError::Timeout) => {}
        }

        player.tick();
        shared.publish(&player);
    }

    player.stop();
    shared.publish(&player);
    debug!("transport thread exiting");
}

fn apply<S: EventSink, C: Clock>(player: &mut Player<S, C>, command: Command) {
    match command {
        Command::Load(bytes) => {
            if let Err(err) = player.load(&bytes) {
                warn!("load failed: {err}");
            }
        }
        Command::Play => {
            player.play();
        }
        Command::Pause => {
            player.pause();
        }
        Command::Toggle => {
            player.toggle();
        }
        Command::Stop => {
            player.stop();
        }
        Command::Seek(ms) => {
            player.seek(ms);
        }
        Command::SeekBy(delta) => {
            player.seek(player.current_time() + delta);
        }
        Command::SetLooping(looping) => player.set_looping(looping),
        Command::SetVolume(gain) => player.set_master_volume(gain),
        Command::Shutdown => {}
    }
}

impl PlayerHandle {
    pub fn send(&self, command: Command) {
        if self.tx.send(command).is_err() {
            warn!("transport thread is gone");
        }
    }

    pub fn load(&self, bytes: Vec<u8>) {
        self.send(Command::Load(bytes));
    }

    pub fn play(&self) {
        self.send(Command::Play);
    }

    pub fn pause(&self) {
        self.send(Command::Pause);
    }

    pub fn toggle(&self) {
        self.send(Command::Toggle);
    }

    pub fn stop(&self) {
        self.send(Command::Stop);
    }

    pub fn seek(&self, ms: f64) {
        self.send(Command::Seek(ms));
    }

    pub fn seek_by(&self, delta_ms: f64) {
        self.send(Command::SeekBy(delta_ms));
    }

    pub fn set_looping(&self, looping: bool) {
        self.send(Command::SetLooping(looping));
    }

    pub fn set_volume(&self, gain: f32) {
        self.send(Command::SetVolume(gain));
    }

    pub fn current_time(&self) -> f64 {
        f64::from_bits(self.shared.current_ms.load(Ordering::Relaxed))
    }

    pub fn duration(&self) -> f64 {
        f64::from_bits(self.shared.duration_ms.load(Ordering::Relaxed))
    }

    pub fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::Relaxed)
    }

    pub fn looping(&self) -> bool {
        self.shared.looping.load(Ordering::Relaxed)
    }

    /// Transport notifications, in order.
    pub fn events(&self) -> &Receiver<PlayerEvent> {
        &self.events
    }

    /// Stop playback and join the thread.
    pub fn shutdown(mut self) {
        self.join();
    }

    fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.tx.send(Command::Shutdown);
            if thread.join().is_err() {
                warn!("transport thread panicked");
            }
        }
    }
}

impl Drop for PlayerHandle {
    fn drop(&mut self) {
        self.join();
    }
}
