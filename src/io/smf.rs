//! Standard MIDI File parser.

use log::debug;

use super::midi::{Event, EventKind, MetaKind, MidiEvent};
use super::reader::ByteReader;
use crate::error::{Error, Result};
use crate::sequencing::tempo::TempoMap;

/*
File Layout
===========

  "MThd" len:u32 format:u16 ntracks:u16 division:u16
  "MTrk" len:u32 <delta:vlq event>...
  "MTrk" ...

Every track event is a VLQ delta time followed by one of:

  FF type len:vlq data      meta (tempo, names, end of track...)
  F0 len:vlq data           system exclusive
  F7 len:vlq data           sysex escape / continuation
  8n..En d1 [d2]            channel voice

A channel event may omit its status byte when it repeats the previous one
("running status"). We detect that by the first byte having its high bit
clear and re-read it as data.

Tracks are parsed independently (tick counters reset per track), then merged
into one timeline with a stable sort so events on the same tick keep their
track order.
*/

const HEADER_MAGIC: &[u8; 4] = b"MThd";
const TRACK_MAGIC: &[u8; 4] = b"MTrk";
const HEADER_LEN: u32 = 6;

/// A parsed file: one merged timeline plus the tempo map that times it.
#[derive(Debug, Clone)]
pub struct Song {
    pub format: u16,
    pub track_count: u16,
    /// Meta and channel-voice events, sorted by tick and stamped in ms.
    pub events: Vec<Event>,
    /// SysEx events, kept out of the playback timeline.
    pub system_exclusive: Vec<Event>,
    pub tempo_map: TempoMap,
    pub duration_ms: f64,
}

impl Song {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        parse(bytes)
    }

    pub fn ticks_per_quarter(&self) -> u16 {
        self.tempo_map.ticks_per_quarter()
    }

    /// First track-name meta event, if any.
    pub fn title(&self) -> Option<String> {
        self.events
            .iter()
            .find(|e| e.meta_kind() == Some(MetaKind::TrackName))
            .and_then(Event::text)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }

    pub fn channel_events(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(|e| e.midi().is_some())
    }

    /// Raw SysEx payloads (each starting with `F0` or `F7`).
    pub fn sysex_payloads(&self) -> impl Iterator<Item = &[u8]> {
        self.system_exclusive.iter().filter_map(|e| match &e.kind {
            EventKind::SysEx { data } => Some(data.as_slice()),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Parse a complete Standard MIDI File.
pub fn parse(bytes: &[u8]) -> Result<Song> {
    let mut reader = ByteReader::new(bytes);

    let magic = reader.take(4).map_err(|_| missing_chunk("MThd", 0))?;
    if magic != HEADER_MAGIC {
        return Err(missing_chunk("MThd", 0));
    }

    let header_len = reader.read_u32()?;
    if header_len < HEADER_LEN {
        return Err(Error::InvalidFormat(format!(
            "header chunk is {header_len} bytes, expected at least {HEADER_LEN}"
        )));
    }
    let format = reader.read_u16()?;
    let track_count = reader.read_u16()?;
    let division = reader.read_u16()?;
    reader.skip((header_len - HEADER_LEN) as usize)?;

    if division & 0x8000 != 0 {
        return Err(Error::UnsupportedDivision(division));
    }
    if division == 0 {
        return Err(Error::InvalidFormat("time division of zero ticks per quarter".into()));
    }

    let mut tempo_map = TempoMap::new(division);
    let mut events = Vec::new();
    let mut system_exclusive = Vec::new();

    for track in 0..track_count {
        parse_track(
            &mut reader,
            track,
            &mut tempo_map,
            &mut events,
            &mut system_exclusive,
        )?;
    }

    // Stable: same-tick events keep track order
    events.sort_by_key(|e: &Event| e.absolute_ticks);
    system_exclusive.sort_by_key(|e: &Event| e.absolute_ticks);

    for event in events.iter_mut().chain(system_exclusive.iter_mut()) {
        event.absolute_time_ms = tempo_map.ticks_to_ms(event.absolute_ticks);
    }

    let duration_ms = events.last().map_or(0.0, |e| e.absolute_time_ms);

    debug!(
        "parsed SMF: format {format}, {track_count} track(s), {division} ppq, {} event(s), {} sysex, {} tempo change(s), {duration_ms:.1} ms",
        events.len(),
        system_exclusive.len(),
        tempo_map.changes().len(),
    );

    Ok(Song {
        format,
        track_count,
        events,
        system_exclusive,
        tempo_map,
        duration_ms,
    })
}

fn parse_track(
    reader: &mut ByteReader<'_>,
    track: u16,
    tempo_map: &mut TempoMap,
    events: &mut Vec<Event>,
    system_exclusive: &mut Vec<Event>,
) -> Result<()> {
    let chunk_at = reader.position();
    let magic = reader.take(4)?;
    if magic != TRACK_MAGIC {
        return Err(missing_chunk("MTrk", chunk_at));
    }

    let len = reader.read_u32()? as usize;
    let start = reader.position();
    // Events may not run past the declared chunk end
    let mut reader = ByteReader::new(reader.take(len)?);

    let mut ticks: u64 = 0;
    let mut running_status: Option<u8> = None;

    while !reader.is_at_end() {
        let delta = reader.read_vlq()?;
        ticks += u64::from(delta);

        let event_at = start + reader.position();
        let mut status = reader.read_u8()?;
        if status & 0x80 == 0 {
            status = running_status.ok_or_else(|| {
                Error::InvalidFormat(format!(
                    "data byte 0x{status:02x} at offset {event_at} with no running status"
                ))
            })?;
            reader.rewind_one();
        }

        let stamp = |kind| Event {
            delta_ticks: delta,
            absolute_ticks: ticks,
            absolute_time_ms: 0.0,
            track,
            kind,
        };

        match status {
            0xFF => {
                let kind = MetaKind::from(reader.read_u8()?);
                let len = reader.read_vlq()? as usize;
                let data = reader.take(len)?;

                match kind {
                    MetaKind::SetTempo if data.len() >= 3 => {
                        let tempo = u32::from_be_bytes([0, data[0], data[1], data[2]]);
                        tempo_map.insert(ticks, tempo);
                    }
                    MetaKind::Unknown(n) => debug!("track {track}: unknown meta event 0x{n:02x}"),
                    _ => {}
                }

                events.push(stamp(EventKind::Meta {
                    kind,
                    data: data.to_vec(),
                }));

                if kind == MetaKind::EndOfTrack {
                    break;
                }
            }
            0xF0 | 0xF7 => {
                let len = reader.read_vlq()? as usize;
                let body = reader.take(len)?;
                let mut data = Vec::with_capacity(len + 1);
                data.push(status);
                data.extend_from_slice(body);
                system_exclusive.push(stamp(EventKind::SysEx { data }));
            }
            0x80..=0xEF => {
                let data1 = reader.read_u8()?;
                let data2 = if MidiEvent::data_len(status) == 2 {
                    reader.read_u8()?
                } else {
                    0
                };
                running_status = Some(status);

                if let Some(midi) = MidiEvent::from_status(status, data1, data2) {
                    events.push(stamp(EventKind::Channel(midi)));
                }
            }
            other => {
                return Err(Error::InvalidFormat(format!(
                    "unexpected status byte 0x{other:02x} at offset {event_at} in track {track}"
                )));
            }
        }
    }

    // Bytes after end-of-track are skipped with the rest of the chunk
    Ok(())
}

fn missing_chunk(tag: &str, offset: usize) -> Error {
    Error::InvalidFormat(format!("expected {tag} chunk at offset {offset}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(format: u16, tracks: u16, division: u16) -> Vec<u8> {
        let mut out = b"MThd".to_vec();
        out.extend_from_slice(&6u32.to_be_bytes());
        out.extend_from_slice(&format.to_be_bytes());
        out.extend_from_slice(&tracks.to_be_bytes());
        out.extend_from_slice(&division.to_be_bytes());
        out
    }

    fn track(body: &[u8]) -> Vec<u8> {
        let mut out = b"MTrk".to_vec();
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(body);
        out
    }

    const END: [u8; 4] = [0x00, 0xFF, 0x2F, 0x00];

    #[test]
    fn rejects_missing_header() {
        assert!(matches!(parse(b"RIFF\0\0\0\0"), Err(Error::InvalidFormat(_))));
        assert!(matches!(parse(b""), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn rejects_smpte_division() {
        let bytes = header(0, 0, 0xE728);
        assert_eq!(parse(&bytes).unwrap_err(), Error::UnsupportedDivision(0xE728));
    }

    #[test]
    fn rejects_missing_track_magic() {
        let mut bytes = header(0, 1, 96);
        bytes.extend_from_slice(b"XTrk\0\0\0\0");
        assert!(matches!(parse(&bytes), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn truncated_track_fails() {
        let mut bytes = header(0, 1, 96);
        bytes.extend_from_slice(b"MTrk");
        bytes.extend_from_slice(&10u32.to_be_bytes());
        bytes.extend_from_slice(&[0x00, 0x90]);
        assert!(matches!(parse(&bytes), Err(Error::TruncatedData { .. })));
    }

    #[test]
    fn zero_tracks_is_an_empty_song() {
        let song = parse(&header(1, 0, 480)).unwrap();
        assert!(song.is_empty());
        assert_eq!(song.duration_ms, 0.0);
    }

    #[test]
    fn running_status_repeats_channel_status() {
        let mut body = vec![0x00, 0x90, 60, 100, 0x00, 62, 100, 0x00, 64, 100];
        body.extend_from_slice(&END);
        let mut bytes = header(0, 1, 96);
        bytes.extend(track(&body));

        let song = parse(&bytes).unwrap();
        let keys: Vec<u8> = song
            .channel_events()
            .filter_map(|e| match e.midi() {
                Some(MidiEvent::NoteOn { channel: 0, key, .. }) => Some(*key),
                _ => None,
            })
            .collect();
        assert_eq!(keys, vec![60, 62, 64]);
    }

    #[test]
    fn event_cannot_borrow_bytes_from_next_chunk() {
        // First chunk ends one byte short of a full note-on
        let mut bytes = header(1, 2, 96);
        bytes.extend(track(&[0x00, 0x90, 0x3C]));
        bytes.extend(track(&[0x00, 0x91, 61, 100, 0x00, 0xFF, 0x2F, 0x00]));

        assert!(matches!(parse(&bytes), Err(Error::TruncatedData { .. })));
    }

    #[test]
    fn data_byte_without_running_status_fails() {
        let mut bytes = header(0, 1, 96);
        bytes.extend(track(&[0x00, 0x40, 0x40]));
        assert!(matches!(parse(&bytes), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn set_tempo_feeds_tempo_map() {
        let mut body = vec![0x00, 0xFF, 0x51, 0x03, 0x03, 0xD0, 0x90]; // 250 000 µs/q
        body.extend_from_slice(&[0x83, 0x60, 0x80, 60, 0]); // delta 480
        body.extend_from_slice(&END);
        let mut bytes = header(0, 1, 480);
        bytes.extend(track(&body));

        let song = parse(&bytes).unwrap();
        assert_eq!(song.tempo_map.tempo_at(0), 250_000);
        assert!((song.duration_ms - 250.0).abs() < 1e-9);
    }

    #[test]
    fn sysex_is_collected_with_status_prefix() {
        let mut body = vec![0x00, 0xF0, 0x05, 0x7E, 0x7F, 0x09, 0x01, 0xF7];
        body.extend_from_slice(&[0x00, 0xC0, 5]);
        body.extend_from_slice(&END);
        let mut bytes = header(0, 1, 96);
        bytes.extend(track(&body));

        let song = parse(&bytes).unwrap();
        let payloads: Vec<&[u8]> = song.sysex_payloads().collect();
        assert_eq!(payloads, vec![&[0xF0, 0x7E, 0x7F, 0x09, 0x01, 0xF7][..]]);
        assert!(song.events.iter().all(|e| !matches!(e.kind, EventKind::SysEx { .. })));
    }

    #[test]
    fn sysex_does_not_clear_running_status() {
        let body = [
            0x00, 0x90, 60, 100, // note on
            0x00, 0xF0, 0x01, 0xF7, // sysex
            0x00, 62, 100, // running status note on
            0x00, 0xFF, 0x2F, 0x00,
        ];
        let mut bytes = header(0, 1, 96);
        bytes.extend(track(&body));

        let song = parse(&bytes).unwrap();
        assert_eq!(song.channel_events().count(), 2);
    }

    #[test]
    fn bytes_after_end_of_track_are_skipped() {
        let mut body = vec![0x00, 0x90, 60, 100];
        body.extend_from_slice(&END);
        body.extend_from_slice(&[0xDE, 0xAD]);
        let mut bytes = header(1, 2, 96);
        bytes.extend(track(&body));
        bytes.extend(track(&[0x00, 0x91, 61, 100, 0x00, 0xFF, 0x2F, 0x00]));

        let song = parse(&bytes).unwrap();
        assert_eq!(song.channel_events().count(), 2);
    }

    #[test]
    fn title_and_meta_text() {
        let mut body = vec![0x00, 0xFF, 0x03, 0x05];
        body.extend_from_slice(b"Intro");
        body.extend_from_slice(&END);
        let mut bytes = header(0, 1, 96);
        bytes.extend(track(&body));

        let song = parse(&bytes).unwrap();
        assert_eq!(song.title().as_deref(), Some("Intro"));
    }

    #[test]
    fn tracks_merge_in_tick_order() {
        let mut first = vec![0x0A, 0x90, 60, 100];
        first.extend_from_slice(&END);
        let mut second = vec![0x05, 0x91, 61, 100];
        second.extend_from_slice(&END);

        let mut bytes = header(1, 2, 96);
        bytes.extend(track(&first));
        bytes.extend(track(&second));

        let song = parse(&bytes).unwrap();
        assert_eq!(song.events[0].absolute_ticks, 5);
        assert_eq!(song.events[0].track, 1);
        let ticks: Vec<u64> = song.events.iter().map(|e| e.absolute_ticks).collect();
        assert!(ticks.windows(2).all(|w| w[0] <= w[1]));
    }
}
