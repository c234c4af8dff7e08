//! Chat view rendering with paced reveal and citations.

use crate::app::App;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
};
use tempo_engine::citations::DEFAULT_EXCERPT_CHARS;
use tempo_engine::{Annotated, MessageView, annotate, cited_sources, truncate_excerpt};
use tempo_types::{Feedback, Message, MessageStatus, Role, Source};

/// Streaming cursor indicator.
pub const STREAMING_CURSOR: &str = "▌";

const SCROLL_HINT: &str = " ↓ more below (Ctrl+End) ";

/// Render the selected conversation and feed its height to the scroll follower.
pub fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let lines = match app.engine.selected_conversation() {
        Some(conversation) if !conversation.messages.is_empty() => {
            let mut lines = Vec::new();
            for (i, msg) in conversation.messages.iter().enumerate() {
                if i > 0 {
                    lines.push(Line::from(""));
                }
                lines.extend(message_lines(msg, app.engine.view(msg)));
            }
            lines
        }
        _ => {
            app.sync_viewport(0, area.height as usize);
            render_welcome(frame, area);
            return;
        }
    };

    let chat = Paragraph::new(lines).wrap(Wrap { trim: false });
    let content_height = chat.line_count(area.width);
    app.sync_viewport(content_height, area.height as usize);

    let offset = u16::try_from(app.viewport.offset()).unwrap_or(u16::MAX);
    frame.render_widget(chat.scroll((offset, 0)), area);

    if app.is_scrolled_away() {
        render_scroll_hint(frame, area);
    }
}

/// Lines for one message, drawn from its current view.
pub fn message_lines(msg: &Message, view: MessageView<'_>) -> Vec<Line<'static>> {
    match msg.role {
        Role::User => vec![Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Cyan)),
            Span::styled(msg.content().to_string(), Style::default().fg(Color::White)),
        ])],
        Role::System => vec![Line::from(Span::styled(
            msg.content().to_string(),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        ))],
        Role::Assistant => assistant_lines(msg, view),
    }
}

fn assistant_lines(msg: &Message, view: MessageView<'_>) -> Vec<Line<'static>> {
    let open = msg.is_open() || view.is_animating;
    let style = if open {
        Style::default().fg(Color::White)
    } else {
        Style::default().fg(Color::Gray)
    };
    let citation_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);

    let mut lines = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    for piece in annotate(view.display_text, msg.sources()) {
        match piece {
            Annotated::Text(text) => {
                let mut parts = text.split('\n');
                if let Some(first) = parts.next()
                    && !first.is_empty()
                {
                    current.push(Span::styled(first.to_string(), style));
                }
                for part in parts {
                    lines.push(Line::from(std::mem::take(&mut current)));
                    if !part.is_empty() {
                        current.push(Span::styled(part.to_string(), style));
                    }
                }
            }
            Annotated::Citation { number, .. } => {
                current.push(Span::styled(format!("[{number}]"), citation_style));
            }
        }
    }
    if open {
        current.push(Span::styled(STREAMING_CURSOR, Style::default().fg(Color::White)));
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(Line::from(current));
    }

    if msg.status() == MessageStatus::Error {
        let reason = msg.error().unwrap_or("failed");
        lines.push(Line::from(Span::styled(
            format!("✗ {reason} (Ctrl+R to regenerate)"),
            Style::default().fg(Color::Red),
        )));
    }

    if !open {
        lines.extend(source_lines(&cited_sources(view.display_text, msg.sources())));
    }

    match msg.feedback() {
        Some(Feedback::Positive) => lines.push(dim_line("  ▲ helpful")),
        Some(Feedback::Negative) => lines.push(dim_line("  ▼ not helpful")),
        None => {}
    }
    lines
}

fn source_lines(sources: &[&Source]) -> Vec<Line<'static>> {
    if sources.is_empty() {
        return Vec::new();
    }
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Sources",
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ];
    for source in sources {
        let mut header = vec![
            Span::styled(format!("  [{}] ", source.id), Style::default().fg(Color::Yellow)),
            Span::raw(source.title.clone()),
            Span::styled(format!(" · {}", source.reference), Style::default().fg(Color::DarkGray)),
        ];
        if let Some(page) = source.page {
            header.push(Span::styled(format!(", p. {page}"), Style::default().fg(Color::DarkGray)));
        }
        lines.push(Line::from(header));

        if let Some(excerpt) = &source.excerpt {
            lines.push(dim_line(format!(
                "      {}",
                truncate_excerpt(excerpt, DEFAULT_EXCERPT_CHARS)
            )));
        } else if let Some(url) = &source.url {
            lines.push(dim_line(format!("      {url}")));
        }
    }
    lines
}

fn dim_line(text: impl Into<String>) -> Line<'static> {
    Line::from(Span::styled(text.into(), Style::default().fg(Color::DarkGray)))
}

fn render_scroll_hint(frame: &mut Frame, area: Rect) {
    let width = (SCROLL_HINT.chars().count() as u16).min(area.width);
    if area.height == 0 || width == 0 {
        return;
    }
    let hint_area = Rect {
        x: area.x + area.width - width,
        y: area.y + area.height - 1,
        width,
        height: 1,
    };
    let hint = Paragraph::new(Span::styled(
        SCROLL_HINT,
        Style::default().fg(Color::Black).bg(Color::Cyan),
    ));
    frame.render_widget(hint, hint_area);
}

fn render_welcome(frame: &mut Frame, area: Rect) {
    let content = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            "  Welcome to Tempo",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("  Type a question and press Enter to send."),
        Line::from("  /attach <file> queues an attachment for the next question."),
        Line::from(""),
        Line::from(Span::styled(
            "  Keyboard shortcuts:",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from("    Esc       Reveal the rest of the answer"),
        Line::from("    Ctrl+R    Regenerate the last answer"),
        Line::from("    Ctrl+T/B  Rate the last answer"),
        Line::from("    Ctrl+N    New conversation"),
        Line::from("    Ctrl+O    Next conversation"),
        Line::from("    Ctrl+D    Delete conversation"),
        Line::from("    Ctrl+L    Logs"),
        Line::from("    Ctrl+C    Cancel / quit"),
        Line::from(""),
        Line::from(Span::styled(
            "  Chat navigation:",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from("    ↑/↓       Scroll chat history"),
        Line::from("    PgUp/PgDn Scroll one page"),
        Line::from("    Ctrl+End  Scroll to bottom"),
    ])
    .wrap(Wrap { trim: false });

    frame.render_widget(content, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempo_types::SourceType;

    fn text(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn view(text: &str, is_animating: bool) -> MessageView<'_> {
        MessageView {
            display_text: text,
            is_animating,
        }
    }

    fn sources() -> Vec<Source> {
        vec![
            Source::new("1", SourceType::Law, "Tenancy Act", "§ 4").with_excerpt("x".repeat(150)),
            Source::new("2", SourceType::Web, "Guide", "Web").with_url("https://example.org"),
        ]
    }

    #[test]
    fn test_citations_and_sources_after_completion() {
        let msg = Message::assistant("Three months [2].\nSee also [1] and [9].").with_sources(sources());
        let lines: Vec<String> = message_lines(&msg, view(msg.content(), false))
            .iter()
            .map(text)
            .collect();

        assert_eq!(lines[0], "Three months [2].");
        assert_eq!(lines[1], "See also [1] and [9].");
        let sources_at = lines.iter().position(|l| l == "Sources").unwrap();
        // first-citation order
        assert!(lines[sources_at + 1].starts_with("  [2] Guide"));
        assert_eq!(lines[sources_at + 2], "      https://example.org");
        assert!(lines[sources_at + 3].starts_with("  [1] Tenancy Act"));
        assert!(lines[sources_at + 4].ends_with("..."));
    }

    #[test]
    fn test_unbound_citation_is_plain_text() {
        let msg = Message::assistant("See [9].").with_sources(sources());
        let rendered = message_lines(&msg, view(msg.content(), false));
        let spans = &rendered[0].spans;

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].content, "See [9].");
    }

    #[test]
    fn test_animating_message_has_cursor_and_no_sources() {
        let msg = Message::assistant("Three months [1].").with_sources(sources());
        let lines: Vec<String> = message_lines(&msg, view("Three mon", true))
            .iter()
            .map(text)
            .collect();

        assert_eq!(lines, vec![format!("Three mon{STREAMING_CURSOR}")]);
    }

    #[test]
    fn test_pending_message_shows_cursor_only() {
        let msg = Message::assistant_pending();
        let lines = message_lines(&msg, view("", false));
        assert_eq!(lines.len(), 1);
        assert_eq!(text(&lines[0]), STREAMING_CURSOR);
    }

    #[test]
    fn test_failed_message_offers_regenerate() {
        let mut msg = Message::assistant_pending();
        msg.set_content("Partial").unwrap();
        msg.fail("interrupted").unwrap();

        let lines: Vec<String> = message_lines(&msg, view(msg.content(), false))
            .iter()
            .map(text)
            .collect();
        assert_eq!(lines[0], "Partial");
        assert_eq!(lines[1], "✗ interrupted (Ctrl+R to regenerate)");
    }

    #[test]
    fn test_feedback_marker() {
        let mut msg = Message::assistant("Done.");
        msg.toggle_feedback(Feedback::Negative);
        let lines = message_lines(&msg, view(msg.content(), false));
        assert_eq!(text(lines.last().unwrap()), "  ▼ not helpful");
    }
}
