//! Look-ahead transport scheduler.
//!
//! Pure state machine over a caller-supplied clock reading (milliseconds).
//! Nothing here sleeps: the driver asks for [`Scheduler::next_deadline`],
//! waits until then, and calls [`Scheduler::tick`].
//!
//! ```text
//!   scan every look_ahead_ms              one-shot per due event
//!   ──┬─────────────┬─────────────┬──     ─────●──●────●──────────
//!     │ window      │             │
//!     [pos, pos + schedule_ahead_ms)  ──▶ pending (due = epoch + t)
//! ```
//!
//! Pause, stop and seek drop every pending one-shot, so nothing scheduled
//! before a transport change can fire after it.

use std::collections::VecDeque;

use crate::io::midi::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Emitted by [`Scheduler::tick`] in chronological order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Index into the event list that is due now.
    Dispatch(usize),
    /// Observable position after a scan.
    Position(f64),
    /// End reached with looping on; position is back at zero.
    Looped,
    /// End reached; transport is stopped.
    Ended,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    due: f64,
    index: usize,
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    look_ahead_ms: f64,
    schedule_ahead_ms: f64,
    looping: bool,
    state: TransportState,
    duration_ms: f64,
    // Clock reading that corresponds to position zero
    epoch: f64,
    // Frozen position while paused or stopped
    position_ms: f64,
    // Next event not yet handed to a one-shot
    cursor: usize,
    pending: VecDeque<Pending>,
    next_scan: f64,
}

impl Scheduler {
    pub fn new(look_ahead_ms: f64, schedule_ahead_ms: f64) -> Self {
        Self {
            look_ahead_ms: look_ahead_ms.max(1.0),
            schedule_ahead_ms: schedule_ahead_ms.max(0.0),
            looping: false,
            state: TransportState::Stopped,
            duration_ms: 0.0,
            epoch: 0.0,
            position_ms: 0.0,
            cursor: 0,
            pending: VecDeque::new(),
            next_scan: 0.0,
        }
    }

    /// Reset for a new timeline of `duration_ms`.
    pub fn load(&mut self, duration_ms: f64) {
        self.state = TransportState::Stopped;
        self.duration_ms = duration_ms.max(0.0);
        self.position_ms = 0.0;
        self.cursor = 0;
        self.pending.clear();
    }

    /// Returns false if already playing.
    pub fn play(&mut self, now: f64, events: &[Event]) -> bool {
        if self.state == TransportState::Playing {
            return false;
        }
        self.epoch = now - self.position_ms;
        // Cursor is kept across pause so already fired events stay fired
        self.cursor = self.cursor.min(events.len());
        self.pending.clear();
        // First scan runs on the next tick without waiting a full interval
        self.next_scan = now;
        self.state = TransportState::Playing;
        true
    }

    /// Returns false unless playing.
    pub fn pause(&mut self, now: f64) -> bool {
        if self.state != TransportState::Playing {
            return false;
        }
        self.position_ms = self.clamp(now - self.epoch);
        // Unfired one-shots are rescanned on resume
        if let Some(shot) = self.pending.front() {
            self.cursor = shot.index;
        }
        self.pending.clear();
        self.state = TransportState::Paused;
        true
    }

    /// Returns false if already stopped at zero.
    pub fn stop(&mut self) -> bool {
        if self.state == TransportState::Stopped && self.position_ms == 0.0 {
            return false;
        }
        self.position_ms = 0.0;
        self.cursor = 0;
        self.pending.clear();
        self.state = TransportState::Stopped;
        true
    }

    /// Move to `target_ms` (clamped). A playing transport pauses, moves and
    /// resumes. Returns the clamped position.
    pub fn seek(&mut self, now: f64, target_ms: f64, events: &[Event]) -> f64 {
        let target = self.clamp(target_ms);
        let was_playing = self.pause(now);
        self.position_ms = target;
        self.cursor = first_at_or_after(events, target);
        if was_playing {
            self.play(now, events);
        }
        target
    }

    /// Fire every timer due at or before `now`.
    ///
    /// One-shots due at the same instant as a scan fire first. Events that
    /// are already late when scanned fire at the scan instant.
    pub fn tick(&mut self, now: f64, events: &[Event], mut emit: impl FnMut(Step)) {
        while self.state == TransportState::Playing {
            match self.pending.front() {
                Some(shot) if shot.due <= self.next_scan => {
                    if shot.due > now {
                        return;
                    }
                    let index = shot.index;
                    self.pending.pop_front();
                    emit(Step::Dispatch(index));
                    continue;
                }
                _ => {}
            }

            let at = self.next_scan;
            if at > now {
                return;
            }
            self.scan(at, events, &mut emit);
        }
    }

    fn scan(&mut self, at: f64, events: &[Event], emit: &mut impl FnMut(Step)) {
        let position = at - self.epoch;
        let window_end = position + self.schedule_ahead_ms;

        while let Some(event) = events.get(self.cursor) {
            if event.absolute_time_ms >= window_end {
                break;
            }
            self.pending.push_back(Pending {
                due: (self.epoch + event.absolute_time_ms).max(at),
                index: self.cursor,
            });
            self.cursor += 1;
        }

        emit(Step::Position(self.clamp(position)));

        if position < self.duration_ms {
            self.next_scan = at + self.look_ahead_ms;
            return;
        }

        // Anything still queued is due by now
        while let Some(shot) = self.pending.pop_front() {
            emit(Step::Dispatch(shot.index));
        }

        // A zero-length timeline cannot loop
        if self.looping && self.duration_ms > 0.0 {
            self.position_ms = 0.0;
            self.epoch = at;
            self.cursor = 0;
            self.next_scan = at;
            emit(Step::Looped);
        } else {
            self.stop();
            emit(Step::Ended);
        }
    }

    /// Clock reading of the next timer, if playing.
    pub fn next_deadline(&self) -> Option<f64> {
        if self.state != TransportState::Playing {
            return None;
        }
        let shot = self.pending.front().map_or(f64::INFINITY, |p| p.due);
        Some(shot.min(self.next_scan))
    }

    pub fn position(&self, now: f64) -> f64 {
        match self.state {
            TransportState::Playing => self.clamp(now - self.epoch),
            _ => self.position_ms,
        }
    }

    fn clamp(&self, ms: f64) -> f64 {
        ms.clamp(0.0, self.duration_ms)
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn duration(&self) -> f64 {
        self.duration_ms
    }

    pub fn looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// One-shots scheduled and not yet fired.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

fn first_at_or_after(events: &[Event], ms: f64) -> usize {
    events.partition_point(|e| e.absolute_time_ms < ms)
}
