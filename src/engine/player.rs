//! Transport facade: owns the loaded song, the scheduler and the sink.
//!
//! Every operation reads the clock once, so a [`ManualClock`] makes the
//! whole player deterministic.
//!
//! [`ManualClock`]: super::clock::ManualClock

use crossbeam_channel::Receiver;
use log::{debug, info};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::clock::Clock;
use super::notify::{Notifier, PlayerEvent};
use super::scheduler::{Scheduler, Step, TransportState};
use super::sink::EventSink;
use crate::error::Result;
use crate::io::midi::{Event, EventKind, MidiEvent};
use crate::io::smf::Song;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerConfig {
    /// Interval between scheduler scans.
    pub look_ahead_ms: f64,
    /// How far past the current position each scan reaches.
    pub schedule_ahead_ms: f64,
    pub looping: bool,
    /// Start playing as soon as a file loads.
    pub autoplay: bool,
    /// Replay controllers and programs up to the target on seek.
    pub chase_controllers: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            look_ahead_ms: 100.0,
            schedule_ahead_ms: 200.0,
            looping: false,
            autoplay: false,
            chase_controllers: true,
        }
    }
}

impl PlayerConfig {
    pub fn look_ahead_ms(mut self, ms: f64) -> Self {
        self.look_ahead_ms = ms;
        self
    }

    pub fn schedule_ahead_ms(mut self, ms: f64) -> Self {
        self.schedule_ahead_ms = ms;
        self
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    pub fn chase_controllers(mut self, chase: bool) -> Self {
        self.chase_controllers = chase;
        self
    }
}

pub struct Player<S: EventSink, C: Clock> {
    config: PlayerConfig,
    sink: S,
    clock: C,
    scheduler: Scheduler,
    song: Option<Song>,
    notifier: Notifier,
}

impl<S: EventSink, C: Clock> Player<S, C> {
    pub fn new(sink: S, clock: C, config: PlayerConfig) -> Self {
        let mut scheduler = Scheduler::new(config.look_ahead_ms, config.schedule_ahead_ms);
        scheduler.set_looping(config.looping);
        Self {
            config,
            sink,
            clock,
            scheduler,
            song: None,
            notifier: Notifier::new(),
        }
    }

    /// Parse and load a file. On failure nothing of the previous song is
    /// kept and an error notification is sent.
    pub fn load(&mut self, bytes: &[u8]) -> Result<()> {
        self.notifier.emit(PlayerEvent::LoadStart);
        self.unload();

        match Song::from_bytes(bytes) {
            Ok(song) => {
                self.load_song(song);
                Ok(())
            }
            Err(err) => {
                self.notifier.emit(PlayerEvent::Error {
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Load an already parsed song.
    pub fn load_song(&mut self, song: Song) {
        self.unload();
        self.prime(&song);
        self.scheduler.load(song.duration_ms);

        info!(
            "loaded {} events over {:.0} ms{}",
            song.events.len(),
            song.duration_ms,
            song.title()
                .map(|t| format!(" ({t})"))
                .unwrap_or_default()
        );
        self.notifier.emit(PlayerEvent::LoadComplete {
            duration_ms: song.duration_ms,
        });
        self.song = Some(song);

        if self.config.autoplay {
            self.play();
        }
    }

    fn unload(&mut self) {
        if self.scheduler.state() != TransportState::Stopped {
            self.sink.silence();
        }
        self.song = None;
        self.scheduler.load(0.0);
    }

    // Fresh channel state plus the file's SysEx, so standard detection
    // sees the reset strings before any note.
    fn prime(&mut self, song: &Song) {
        self.sink.reset();
        for payload in song.sysex_payloads() {
            self.sink.system_exclusive(payload);
        }
    }

    /// Returns false when nothing is loaded or already playing.
    pub fn play(&mut self) -> bool {
        let Some(song) = self.song.as_ref() else {
            return false;
        };
        let now = self.clock.now_ms();
        if !self.scheduler.play(now, &song.events) {
            return false;
        }
        info!("play from {:.0} ms", self.scheduler.position(now));
        self.notifier.emit(PlayerEvent::Play);
        self.tick();
        true
    }

    pub fn pause(&mut self) -> bool {
        let now = self.clock.now_ms();
        if !self.scheduler.pause(now) {
            return false;
        }
        self.sink.silence();
        info!("paused at {:.0} ms", self.scheduler.position(now));
        self.notifier.emit(PlayerEvent::Pause);
        true
    }

    pub fn toggle(&mut self) -> bool {
        if self.scheduler.is_playing() {
            self.pause()
        } else {
            self.play()
        }
    }

    pub fn stop(&mut self) -> bool {
        if !self.scheduler.stop() {
            return false;
        }
        self.sink.silence();
        info!("stopped");
        self.notifier.emit(PlayerEvent::Stop);
        true
    }

    /// Jump to `ms` (clamped to the song). Returns the new position.
    pub fn seek(&mut self, ms: f64) -> f64 {
        let Some(song) = self.song.as_ref() else {
            return 0.0;
        };
        let now = self.clock.now_ms();
        if self.scheduler.is_playing() {
            self.sink.silence();
        }
        let position = self.scheduler.seek(now, ms, &song.events);

        if self.config.chase_controllers {
            chase(&mut self.sink, song, position);
        }

        debug!("seek to {position:.0} ms");
        self.notifier.emit(PlayerEvent::Seek {
            position_ms: position,
        });
        self.notifier.emit(PlayerEvent::TimeUpdate {
            current_ms: position,
            duration_ms: self.scheduler.duration(),
        });
        self.tick();
        position
    }

    /// Run every scheduler timer that is due.
    pub fn tick(&mut self) {
        let Player {
            scheduler,
            song,
            sink,
            notifier,
            clock,
            ..
        } = self;
        let Some(song) = song.as_ref() else {
            return;
        };
        let duration_ms = song.duration_ms;

        scheduler.tick(clock.now_ms(), &song.events, |step| match step {
            Step::Dispatch(index) => {
                if let Some(event) = song.events.get(index) {
                    dispatch(sink, event);
                }
            }
            Step::Position(current_ms) => notifier.emit(PlayerEvent::TimeUpdate {
                current_ms,
                duration_ms,
            }),
            Step::Looped => {
                sink.silence();
                debug!("looping");
                notifier.emit(PlayerEvent::Seek { position_ms: 0.0 });
            }
            Step::Ended => {
                sink.silence();
                info!("ended");
                notifier.emit(PlayerEvent::Stop);
                notifier.emit(PlayerEvent::Ended);
            }
        });
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.config.looping = looping;
        self.scheduler.set_looping(looping);
    }

    pub fn set_master_volume(&mut self, gain: f32) {
        self.sink.master_volume(gain);
    }

    /// Clock reading of the next due timer.
    pub fn next_deadline(&self) -> Option<f64> {
        self.scheduler.next_deadline()
    }

    /// A receiver for transport notifications.
    pub fn events(&self) -> Receiver<PlayerEvent> {
        self.notifier.subscribe()
    }

    pub fn current_time(&self) -> f64 {
        self.scheduler.position(self.clock.now_ms())
    }

    pub fn duration(&self) -> f64 {
        self.scheduler.duration()
    }

    pub fn is_playing(&self) -> bool {
        self.scheduler.is_playing()
    }

    pub fn state(&self) -> TransportState {
        self.scheduler.state()
    }

    pub fn looping(&self) -> bool {
        self.scheduler.looping()
    }

    pub fn now_ms(&self) -> f64 {
        self.clock.now_ms()
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn song(&self) -> Option<&Song> {
        self.song.as_ref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

fn dispatch<S: EventSink>(sink: &mut S, event: &Event) {
    if let EventKind::Channel(midi) = event.kind {
        sink.channel_event(midi);
    }
}

// Rebuild channel state at `position` without sounding anything.
fn chase<S: EventSink>(sink: &mut S, song: &Song, position: f64) {
    sink.reset();
    for payload in song.sysex_payloads() {
        sink.system_exclusive(payload);
    }

    let mut replayed = 0usize;
    for event in song.events.iter().take_while(|e| e.absolute_time_ms < position) {
        let EventKind::Channel(midi) = event.kind else {
            continue;
        };
        if matches!(
            midi,
            MidiEvent::NoteOn { .. } | MidiEvent::NoteOff { .. } | MidiEvent::PolyAftertouch { .. }
        ) {
            continue;
        }
        sink.channel_event(midi);
        replayed += 1;
    }
    debug!("chased {replayed} controller events up to {position:.0} ms");
}
