//! saavy-midi - play a Standard MIDI File in the terminal
//!
//! Run with: cargo run -- song.mid

mod app;
mod ui;

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "saavy-midi", version, about = "Play a Standard MIDI File")]
pub struct Cli {
    /// Standard MIDI File to play
    pub file: PathBuf,

    /// Restart from the top when the song ends
    #[arg(long = "loop")]
    pub looping: bool,

    /// Master volume, 0.0 to 1.0
    #[arg(long, default_value_t = 0.8)]
    pub volume: f32,

    /// Maximum simultaneous voices
    #[arg(long, default_value_t = 64)]
    pub voices: usize,

    /// Scheduler scan interval in ms
    #[arg(long, default_value_t = 100.0)]
    pub look_ahead_ms: f64,

    /// How far ahead each scan schedules, in ms
    #[arg(long, default_value_t = 200.0)]
    pub schedule_ahead_ms: f64,

    /// Skip the audio device and render offline
    #[arg(long)]
    pub no_audio: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    // Off unless RUST_LOG is set; the TUI owns the terminal
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("off")).init();

    app::run(Cli::parse())
}
