//! Transport bar, progress gauge and output level

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};

use saavy_midi::engine::TransportState;

use super::View;

/// `m:ss.t` from milliseconds.
pub fn format_time(ms: f64) -> String {
    let tenths = (ms.max(0.0) / 100.0).floor() as u64;
    let seconds = tenths / 10;
    format!("{}:{:02}.{}", seconds / 60, seconds % 60, tenths % 10)
}

/// Fraction of the song played, `0.0..=1.0`.
pub fn progress_ratio(current_ms: f64, duration_ms: f64) -> f64 {
    if duration_ms <= 0.0 {
        return 0.0;
    }
    (current_ms / duration_ms).clamp(0.0, 1.0)
}

pub fn render_transport(frame: &mut Frame, area: Rect, view: &View) {
    let block = Block::default().title(" saavy-midi ").borders(Borders::ALL);

    let (symbol, label, color) = match view.state {
        TransportState::Playing => ("▶", "Playing", Color::Green),
        TransportState::Paused => ("⏸", "Paused", Color::Yellow),
        TransportState::Stopped => ("■", "Stopped", Color::Red),
    };

    let line = Line::from(vec![
        Span::styled(format!(" {symbol} {label}  "), Style::default().fg(color)),
        Span::styled(
            format!(
                "{} / {}  ",
                format_time(view.current_ms),
                format_time(view.duration_ms)
            ),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("Vol: {:.0}%  ", view.volume * 100.0),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            if view.looping { "Loop: on  " } else { "Loop: off  " },
            Style::default().fg(Color::Magenta),
        ),
        Span::styled(view.status.to_string(), Style::default().fg(Color::DarkGray)),
    ]);

    frame.render_widget(Paragraph::new(line).block(block), area);
}

pub fn render_progress(frame: &mut Frame, area: Rect, view: &View) {
    let gauge = Gauge::default()
        .block(Block::default().title(" Position ").borders(Borders::ALL))
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(progress_ratio(view.current_ms, view.duration_ms))
        .label(format_time(view.current_ms));
    frame.render_widget(gauge, area);
}

pub fn render_level(frame: &mut Frame, area: Rect, view: &View) {
    let peak = f64::from(view.peak).clamp(0.0, 1.0);
    let color = if peak > 0.9 { Color::Red } else { Color::Green };
    let gauge = Gauge::default()
        .block(Block::default().title(" Output ").borders(Borders::ALL))
        .gauge_style(Style::default().fg(color))
        .ratio(peak)
        .label(format!("peak {:.2}", view.peak));
    frame.render_widget(gauge, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_seconds_tenths() {
        assert_eq!(format_time(0.0), "0:00.0");
        assert_eq!(format_time(1_050.0), "0:01.0");
        assert_eq!(format_time(61_250.0), "1:01.2");
        assert_eq!(format_time(-5.0), "0:00.0");
    }

    #[test]
    fn progress_handles_empty_song() {
        assert_eq!(progress_ratio(10.0, 0.0), 0.0);
        assert_eq!(progress_ratio(500.0, 1_000.0), 0.5);
        assert_eq!(progress_ratio(2_000.0, 1_000.0), 1.0);
    }
}
