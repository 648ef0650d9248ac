//! Benchmarks for Standard MIDI File parsing.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput};
use saavy_midi::io::parse;

fn vlq(mut value: u32, out: &mut Vec<u8>) {
    let mut bytes = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        bytes.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
    out.extend(bytes.iter().rev());
}

/// Format 1 file: `tracks` tracks of `notes` eighth notes each, with a
/// tempo change every bar on the first track.
fn synthetic_song(tracks: u16, notes: u32) -> Vec<u8> {
    let mut file = b"MThd".to_vec();
    file.extend_from_slice(&6u32.to_be_bytes());
    file.extend_from_slice(&1u16.to_be_bytes());
    file.extend_from_slice(&tracks.to_be_bytes());
    file.extend_from_slice(&480u16.to_be_bytes());

    for track in 0..tracks {
        let channel = (track % 16) as u8;
        let mut body = Vec::new();
        for n in 0..notes {
            if track == 0 && n % 8 == 0 {
                let tempo: u32 = 400_000 + (n % 64) * 1_000;
                body.extend_from_slice(&[0x00, 0xFF, 0x51, 0x03]);
                body.extend_from_slice(&tempo.to_be_bytes()[1..]);
            }
            let key = 48 + (n % 24) as u8;
            vlq(0, &mut body);
            body.extend_from_slice(&[0x90 | channel, key, 100]);
            // Running status note-off
            vlq(240, &mut body);
            body.extend_from_slice(&[key, 0]);
        }
        body.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);

        file.extend_from_slice(b"MTrk");
        file.extend_from_slice(&(body.len() as u32).to_be_bytes());
        file.extend_from_slice(&body);
    }
    file
}

pub fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/parse");

    for (tracks, notes) in [(1u16, 1_000u32), (16, 1_000), (16, 10_000)] {
        let bytes = synthetic_song(tracks, notes);
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("smf", format!("{tracks}x{notes}")),
            &bytes,
            |b, bytes| b.iter(|| parse(black_box(bytes)).map(|song| song.events.len())),
        );
    }

    group.finish();
}
