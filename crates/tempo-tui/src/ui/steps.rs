//! Work-step panel shown while a response is prepared.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use tempo_types::{StepStatus, TaskStep};

/// Rows needed for `steps`, or zero when there is nothing to show.
pub fn steps_height(steps: &[TaskStep]) -> u16 {
    if steps.is_empty() {
        0
    } else {
        steps.len() as u16 + 1
    }
}

/// One step with its status icon.
pub fn step_line(step: &TaskStep) -> Line<'static> {
    let (icon, icon_style, label_style) = match step.status() {
        StepStatus::Pending => (
            "○ ",
            Style::default().fg(Color::DarkGray),
            Style::default().fg(Color::DarkGray),
        ),
        StepStatus::InProgress => (
            "◐ ",
            Style::default().fg(Color::Yellow),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        StepStatus::Completed => (
            "✓ ",
            Style::default().fg(Color::Green),
            Style::default().fg(Color::Gray),
        ),
    };
    Line::from(vec![
        Span::raw("  "),
        Span::styled(icon, icon_style),
        Span::styled(step.label.clone(), label_style),
    ])
}

/// Render the step panel.
pub fn render_steps(steps: &[TaskStep], frame: &mut Frame, area: Rect) {
    if steps.is_empty() || area.height == 0 {
        return;
    }
    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(" working ", Style::default().fg(Color::Cyan)));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines: Vec<Line> = steps.iter().map(step_line).collect();
    frame.render_widget(Paragraph::new(lines), inner);
}
