//! Main layout rendering.

use crate::app::App;
use crate::ui::chat::render_chat;
use crate::ui::input::{INPUT_HEIGHT, render_input};
use crate::ui::logs::render_logs_panel;
use crate::ui::steps::{render_steps, steps_height};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

/// Render the entire application UI.
pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let (main_area, logs_area) = if app.show_logs {
        let chunks =
            Layout::horizontal([Constraint::Min(30), Constraint::Percentage(35)]).split(area);
        (chunks[0], Some(chunks[1]))
    } else {
        (area, None)
    };

    let chunks = Layout::vertical([
        Constraint::Length(1),                                // Header
        Constraint::Min(3),                                   // Chat
        Constraint::Length(steps_height(app.engine.steps())), // Steps
        Constraint::Length(INPUT_HEIGHT),                     // Input
        Constraint::Length(1),                                // Status bar
    ])
    .split(main_area);

    render_header(app, frame, chunks[0]);
    render_chat(app, frame, chunks[1]);
    render_steps(app.engine.steps(), frame, chunks[2]);
    render_input(
        &app.input,
        &app.attachments,
        app.engine.is_streaming(),
        frame,
        chunks[3],
    );
    render_status_bar(app, frame, chunks[4]);

    if let Some(logs_area) = logs_area {
        render_logs_panel(&app.log_buffer, app.log_scroll, frame, logs_area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = app
        .engine
        .selected_conversation()
        .map(|c| c.title.clone())
        .unwrap_or_default();
    let count = app.engine.store().list().len();

    let mut spans = vec![Span::styled(
        " tempo ",
        Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )];
    if !title.is_empty() {
        spans.push(Span::raw(format!(" {title}")));
    }
    if count > 1 {
        spans.push(Span::styled(
            format!("  ({count} conversations)"),
            Style::default().fg(Color::DarkGray),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let line = if let Some(status) = &app.status_message {
        Line::from(Span::styled(
            format!(" {status}"),
            Style::default().fg(Color::Yellow),
        ))
    } else if app.engine.is_animating() {
        Line::from(Span::styled(
            " streaming · Esc to reveal all · Ctrl+C to cancel",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(Span::styled(
            " Enter send · Ctrl+R regenerate · Ctrl+L logs · Ctrl+Q quit",
            Style::default().fg(Color::DarkGray),
        ))
    };
    frame.render_widget(Paragraph::new(line), area);
}
