//! TUI for saavy-midi
//!
//! Shows transport state, song details and output level. All playback
//! control goes through the [`PlayerHandle`]; the UI never touches the
//! synth directly.

mod song;
mod transport;

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    DefaultTerminal, Frame,
};
use std::time::Duration;

use saavy_midi::{
    backend::{Capability, LevelMeter},
    engine::{PlayerEvent, PlayerHandle, TransportState},
};

use song::render_song;
use transport::{render_level, render_progress, render_transport};

/// Arrow-key seek distance.
const SEEK_STEP_MS: f64 = 5_000.0;
const VOLUME_STEP: f32 = 0.1;

/// Fixed facts about the loaded file, gathered before playback starts.
#[derive(Debug, Clone)]
pub struct SongInfo {
    pub file: String,
    pub title: Option<String>,
    pub format: u16,
    pub tracks: u16,
    pub events: usize,
    pub ticks_per_quarter: u16,
    pub capability: Capability,
    pub sample_rate: f32,
    pub voices: usize,
    pub standards: String,
}

/// What the widgets draw each frame.
pub struct View<'a> {
    pub info: &'a SongInfo,
    pub state: TransportState,
    pub current_ms: f64,
    pub duration_ms: f64,
    pub volume: f32,
    pub looping: bool,
    pub peak: f32,
    pub status: &'a str,
}

pub struct UiApp {
    handle: PlayerHandle,
    info: SongInfo,
    meter: LevelMeter,
    state: TransportState,
    volume: f32,
    looping: bool,
    status: String,
    should_quit: bool,
}

impl UiApp {
    pub fn new(
        handle: PlayerHandle,
        info: SongInfo,
        meter: LevelMeter,
        volume: f32,
        looping: bool,
    ) -> Self {
        Self {
            handle,
            info,
            meter,
            state: TransportState::Stopped,
            volume,
            looping,
            status: String::from("loaded"),
            should_quit: false,
        }
    }

    pub fn run(mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.poll_events();

            terminal.draw(|frame| self.render(frame))?;

            // ~60fps
            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }

        self.handle.shutdown();
        Ok(())
    }

    fn poll_events(&mut self) {
        while let Ok(event) = self.handle.events().try_recv() {
            match event {
                PlayerEvent::Play => {
                    self.state = TransportState::Playing;
                    self.status = "playing".into();
                }
                PlayerEvent::Pause => {
                    self.state = TransportState::Paused;
                    self.status = "paused".into();
                }
                PlayerEvent::Stop => {
                    self.state = TransportState::Stopped;
                    self.status = "stopped".into();
                }
                PlayerEvent::Ended => self.status = "ended".into(),
                PlayerEvent::Seek { position_ms } => {
                    self.status = format!("seek {}", transport::format_time(position_ms));
                }
                PlayerEvent::Error { reason } => self.status = format!("error: {reason}"),
                PlayerEvent::LoadStart
                | PlayerEvent::LoadComplete { .. }
                | PlayerEvent::TimeUpdate { .. } => {}
            }
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char(' ') => self.handle.toggle(),
            KeyCode::Char('s') | KeyCode::Char('S') => self.handle.stop(),
            KeyCode::Left => self.handle.seek_by(-SEEK_STEP_MS),
            KeyCode::Right => self.handle.seek_by(SEEK_STEP_MS),
            KeyCode::Char('+') | KeyCode::Char('=') => self.nudge_volume(VOLUME_STEP),
            KeyCode::Char('-') | KeyCode::Char('_') => self.nudge_volume(-VOLUME_STEP),
            KeyCode::Char('l') | KeyCode::Char('L') => {
                self.looping = !self.looping;
                self.handle.set_looping(self.looping);
            }
            _ => {}
        }
    }

    fn nudge_volume(&mut self, delta: f32) {
        self.volume = (self.volume + delta).clamp(0.0, 1.0);
        self.handle.set_volume(self.volume);
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Transport bar
                Constraint::Length(3), // Progress
                Constraint::Min(6),    // Song details
                Constraint::Length(3), // Output level
                Constraint::Length(1), // Help bar
            ])
            .split(area);

        let view = View {
            info: &self.info,
            state: self.state,
            current_ms: self.handle.current_time(),
            duration_ms: self.handle.duration(),
            volume: self.volume,
            looping: self.looping,
            peak: self.meter.peak(),
            status: &self.status,
        };

        render_transport(frame, chunks[0], &view);
        render_progress(frame, chunks[1], &view);
        render_song(frame, chunks[2], &view);
        render_level(frame, chunks[3], &view);

        let help = Paragraph::new(
            " [Space] Play/Pause  [S] Stop  [←/→] Seek 5s  [+/-] Volume  [L] Loop  [Q] Quit",
        )
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[4]);
    }
}
