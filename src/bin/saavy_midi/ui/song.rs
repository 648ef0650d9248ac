//! Song details panel

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::View;

fn row(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!(" {label:<10}"), Style::default().fg(Color::DarkGray)),
        Span::styled(value, Style::default().fg(Color::White)),
    ])
}

pub fn render_song(frame: &mut Frame, area: Rect, view: &View) {
    let info = view.info;
    let block = Block::default().title(" Song ").borders(Borders::ALL);

    let lines = vec![
        row(
            "Title",
            info.title.clone().unwrap_or_else(|| info.file.clone()),
        ),
        row("File", info.file.clone()),
        row(
            "Format",
            format!(
                "SMF {} | {} tracks | {} events | {} ppq",
                info.format, info.tracks, info.events, info.ticks_per_quarter
            ),
        ),
        row("Standards", info.standards.clone()),
        row(
            "Audio",
            format!(
                "{} @ {:.1}kHz | {} voices",
                info.capability,
                info.sample_rate / 1000.0,
                info.voices
            ),
        ),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
