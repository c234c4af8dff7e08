//! Logs panel rendering.

use crate::logs::LogBuffer;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

/// Render the log panel, newest entries at the bottom.
pub fn render_logs_panel(log_buffer: &LogBuffer, scroll: usize, frame: &mut Frame, area: Rect) {
    let entries = log_buffer.entries();

    let block = Block::default()
        .title(format!(" logs ({}) ", entries.len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if entries.is_empty() {
        let empty = Paragraph::new(Line::from(Span::styled(
            "  No log entries yet...",
            Style::default().fg(Color::DarkGray),
        )));
        frame.render_widget(empty, inner);
        return;
    }

    let visible_height = inner.height as usize;
    let scroll = scroll.min(entries.len().saturating_sub(visible_height));

    let lines: Vec<Line> = entries
        .iter()
        .skip(scroll)
        .take(visible_height)
        .map(|entry| {
            Line::from(vec![
                Span::styled(
                    format!("[{}]", entry.level_prefix()),
                    Style::default()
                        .fg(entry.level_color())
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(" {}: ", entry.short_target()),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(entry.summary()),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}
