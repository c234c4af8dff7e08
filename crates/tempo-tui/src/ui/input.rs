//! Prompt line rendering.

use crate::input::InputState;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

/// Border plus one prompt row.
pub const INPUT_HEIGHT: u16 = 2;

/// Render the prompt; queued attachments show in the border title.
pub fn render_input(
    input: &InputState,
    attachments: &[String],
    streaming: bool,
    frame: &mut Frame,
    area: Rect,
) {
    let mut block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(Color::DarkGray));
    if !attachments.is_empty() {
        block = block.title(Span::styled(
            format!(" attached: {} ", attachments.join(", ")),
            Style::default().fg(Color::Magenta),
        ));
    }

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let prompt_style = if streaming {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Cyan)
    };
    let line = Line::from(vec![
        Span::styled("> ", prompt_style),
        Span::raw(input.content().to_string()),
    ]);
    frame.render_widget(Paragraph::new(line), inner);

    if inner.height > 0 {
        let cursor_x = inner.x + 2 + input.cursor_column() as u16;
        if cursor_x < inner.x + inner.width {
            frame.set_cursor_position((cursor_x, inner.y));
        }
    }
}
