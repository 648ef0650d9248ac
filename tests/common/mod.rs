//! In-memory Standard MIDI File builder for integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use saavy_midi::engine::EventSink;
use saavy_midi::io::MidiEvent;

pub const PPQ: u16 = 480;

pub fn vlq(mut value: u32, out: &mut Vec<u8>) {
    let mut bytes = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        bytes.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
    out.extend(bytes.iter().rev());
}

/// Raw track body: `(delta, bytes)` pairs, end-of-track appended.
pub fn track(events: &[(u32, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (delta, bytes) in events {
        vlq(*delta, &mut body);
        body.extend_from_slice(bytes);
    }
    body.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);
    body
}

pub fn smf(format: u16, division: u16, tracks: &[Vec<u8>]) -> Vec<u8> {
    let mut file = b"MThd".to_vec();
    file.extend_from_slice(&6u32.to_be_bytes());
    file.extend_from_slice(&format.to_be_bytes());
    file.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    file.extend_from_slice(&division.to_be_bytes());
    for body in tracks {
        file.extend_from_slice(b"MTrk");
        file.extend_from_slice(&(body.len() as u32).to_be_bytes());
        file.extend_from_slice(body);
    }
    file
}

/// One quarter note of middle C at 120 BPM: note-on at 0, note-off at
/// 1000 ms.
pub fn single_note() -> Vec<u8> {
    smf(
        0,
        PPQ,
        &[track(&[
            (0, &[0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20]),
            (0, &[0x90, 60, 100]),
            (960, &[0x80, 60, 0]),
        ])],
    )
}

/// Sink that records channel events and can be inspected from the test
/// while the player owns a clone.
#[derive(Clone, Default)]
pub struct Recording {
    pub events: Arc<Mutex<Vec<MidiEvent>>>,
    pub silenced: Arc<Mutex<usize>>,
}

impl Recording {
    pub fn events(&self) -> Vec<MidiEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn note_ons(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e.normalized(), MidiEvent::NoteOn { .. }))
            .count()
    }

    pub fn note_offs(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e.normalized(), MidiEvent::NoteOff { .. }))
            .count()
    }
}

impl EventSink for Recording {
    fn channel_event(&mut self, event: MidiEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn all_notes_off(&mut self) {}

    fn silence(&mut self) {
        *self.silenced.lock().unwrap() += 1;
    }
}
