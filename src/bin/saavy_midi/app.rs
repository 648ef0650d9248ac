//! Wiring: file, audio backend, synth, transport thread, TUI.

use std::fs;

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::warn;

use saavy_midi::{
    backend::{negotiate, BlockAdapter, Capability, LevelMeter, PacedRenderer},
    engine::{self, MonotonicClock, Player, PlayerConfig},
    io::Song,
    synth::{self, message::SynthMessage, SynthConfig, SynthController},
};

use super::ui::{SongInfo, UiApp};
use super::Cli;

type Controller = SynthController<rtrb::Producer<SynthMessage>>;

/// Block size for the offline renderer.
const OFFLINE_BLOCK: usize = 256;

pub fn run(cli: Cli) -> EyreResult<()> {
    let bytes = fs::read(&cli.file)
        .wrap_err_with(|| format!("failed to read {}", cli.file.display()))?;
    let song = Song::from_bytes(&bytes).wrap_err("not a playable MIDI file")?;

    let meter = LevelMeter::new();
    let synth_config = SynthConfig::default().max_voices(cli.voices.max(1));

    // Negotiated once; nothing below retries the device
    let (capability, realtime) = if cli.no_audio {
        (Capability::Fallback, None)
    } else {
        negotiate(|| start_realtime(synth_config, meter.clone()))
    };

    let (controller, sample_rate, _stream, _paced) = match realtime {
        Some((stream, controller, sample_rate)) => (controller, sample_rate, Some(stream), None),
        None => {
            let (controller, synth) = synth::realtime(synth_config);
            let adapter = BlockAdapter::new(synth).with_meter(meter.clone());
            let paced = PacedRenderer::spawn(adapter, OFFLINE_BLOCK)
                .wrap_err("failed to start offline renderer")?;
            (controller, synth_config.sample_rate, None, Some(paced))
        }
    };

    let config = PlayerConfig::default()
        .look_ahead_ms(cli.look_ahead_ms)
        .schedule_ahead_ms(cli.schedule_ahead_ms)
        .looping(cli.looping);
    let volume = cli.volume.clamp(0.0, 1.0);

    let mut player = Player::new(controller, MonotonicClock::new(), config);
    player.set_master_volume(volume);

    let info = SongInfo {
        file: cli
            .file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        title: song.title(),
        format: song.format,
        tracks: song.track_count,
        events: song.events.len(),
        ticks_per_quarter: song.ticks_per_quarter(),
        capability,
        sample_rate,
        voices: synth_config.max_voices,
        standards: String::new(),
    };
    player.load_song(song);
    let info = SongInfo {
        standards: player.sink().standards().to_string(),
        ..info
    };

    let handle = engine::spawn(player).wrap_err("failed to start transport thread")?;
    handle.play();

    let mut terminal = ratatui::init();
    let result = UiApp::new(handle, info, meter, volume, cli.looping).run(&mut terminal);
    ratatui::restore();
    result
}

/// Open the default device and start a stream pulling from a fresh synth.
fn start_realtime(
    synth_config: SynthConfig,
    meter: LevelMeter,
) -> EyreResult<(cpal::Stream, Controller, f32)> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let config = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;

    let sample_rate = config.sample_rate().0 as f32;
    let channels = usize::from(config.channels());

    let (controller, synth) = synth::realtime(synth_config.sample_rate(sample_rate));
    let mut adapter = BlockAdapter::new(synth).with_meter(meter);

    let stream = device
        .build_output_stream(
            &config.into(),
            move |data: &mut [f32], _| adapter.process_interleaved(data, channels),
            |err| warn!("audio stream error: {err}"),
            None,
        )
        .wrap_err("failed to build output stream")?;
    stream.play().wrap_err("failed to start output stream")?;

    Ok((stream, controller, sample_rate))
}
