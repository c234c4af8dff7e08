//! Application state and main loop.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tempo_engine::{ChatEngine, Notice, ScrollFollower, Viewport};
use tempo_types::{Feedback, Id, Message, Role};
use tokio::time::Instant;

use crate::Tui;
use crate::events::{Event, EventHandler};
use crate::input::InputState;
use crate::logs::LogBuffer;
use crate::ui;

/// Prompt prefix that queues an attachment instead of sending.
pub const ATTACH_COMMAND: &str = "/attach ";

/// Rows moved by PageUp / PageDown.
const PAGE_ROWS: usize = 10;

/// Which pane receives navigation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Input,
    Logs,
}

/// Main application state.
pub struct App {
    pub engine: ChatEngine,
    pub input: InputState,
    pub focus: Focus,
    /// Decides whether growth pulls the chat view down.
    pub follower: ScrollFollower,
    /// Chat scroll position.
    pub viewport: Viewport,
    /// File names queued for the next prompt.
    pub attachments: Vec<String>,
    pub status_message: Option<String>,
    pub log_buffer: LogBuffer,
    pub log_scroll: usize,
    pub show_logs: bool,
    pub should_quit: bool,
    /// Conversation the viewport belongs to.
    shown_conversation: Option<Id>,
}

impl App {
    /// Create the app around an engine.
    pub fn new(engine: ChatEngine, log_buffer: LogBuffer) -> Self {
        let follower = ScrollFollower::new(&engine.config().scroll);
        Self {
            engine,
            input: InputState::new(),
            focus: Focus::default(),
            follower,
            viewport: Viewport::default(),
            attachments: Vec::new(),
            status_message: None,
            log_buffer,
            log_scroll: 0,
            show_logs: false,
            should_quit: false,
            shown_conversation: None,
        }
    }

    /// Run until the user quits.
    pub async fn run(&mut self, terminal: &mut Tui) -> Result<()> {
        let mut events = EventHandler::new(self.engine.config().pacer.frame_interval);

        while !self.should_quit {
            terminal.draw(|frame| ui::render(self, frame))?;

            tokio::select! {
                event = events.next() => match event? {
                    Event::Key(key) => self.handle_key(key),
                    Event::Tick => self.on_tick(Instant::now()),
                    // picked up by the next draw
                    Event::Resize(_, _) => {}
                },
                Some(event) = self.engine.next_event() => {
                    self.engine.handle_event(event);
                }
            }

            self.process_notices();
        }

        self.engine.shutdown();
        Ok(())
    }

    /// Advance reveal and smooth scrolling by one frame.
    pub fn on_tick(&mut self, now: Instant) {
        self.engine.tick(now);
        if self.viewport.step() {
            self.follower.on_viewport(&self.viewport);
        }
    }

    /// Surface engine notices in the status bar.
    pub fn process_notices(&mut self) {
        for notice in self.engine.drain_notices() {
            match notice {
                Notice::TurnStarted { category, .. } => {
                    self.status_message = Some(format!("Working on a {category} request"));
                }
                Notice::MessageCompleted { .. } => self.status_message = None,
                Notice::MessageFailed { reason, .. } => {
                    self.status_message = Some(format!("Response stopped: {reason} (Ctrl+R to regenerate)"));
                }
                Notice::StepChanged { .. }
                | Notice::PhasesCompleted
                | Notice::FeedStarted { .. }
                | Notice::StepsCleared => {}
            }
        }
    }

    /// Feed the laid-out chat size into the scroll follower.
    ///
    /// Called from rendering with the wrapped height of the chat content.
    pub fn sync_viewport(&mut self, content_height: usize, view_height: usize) {
        let selected = self.engine.selected_conversation().map(|c| c.id);
        if selected != self.shown_conversation {
            self.shown_conversation = selected;
            self.follower.reset();
            self.viewport = Viewport::default();
        }

        self.viewport.set_view_height(view_height);
        let grew = content_height > self.viewport.content_height();
        self.viewport.set_content_height(content_height);
        if grew && let Some(command) = self.follower.on_growth() {
            self.viewport.apply(command);
        }
    }

    /// Whether the "more below" hint should show.
    pub fn is_scrolled_away(&self) -> bool {
        !self.follower.is_at_bottom() && !self.viewport.is_scrolling()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Keys
    // ─────────────────────────────────────────────────────────────────────────

    /// Handle a key press.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('q') => {
                    self.should_quit = true;
                    return;
                }
                KeyCode::Char('c') => {
                    if self.engine.is_streaming() {
                        self.engine.cancel();
                        self.status_message = Some("Cancelled".to_string());
                    } else {
                        self.should_quit = true;
                    }
                    return;
                }
                KeyCode::Char('l') => {
                    self.show_logs = !self.show_logs;
                    self.focus = if self.show_logs { Focus::Logs } else { Focus::Input };
                    return;
                }
                KeyCode::Char('n') => {
                    self.engine.new_conversation();
                    self.status_message = None;
                    return;
                }
                KeyCode::Char('o') => {
                    self.next_conversation();
                    return;
                }
                KeyCode::Char('d') => {
                    self.delete_conversation();
                    return;
                }
                KeyCode::Char('r') => {
                    self.regenerate();
                    return;
                }
                KeyCode::Char('t') => {
                    self.rate(Feedback::Positive);
                    return;
                }
                KeyCode::Char('b') => {
                    self.rate(Feedback::Negative);
                    return;
                }
                KeyCode::Home => {
                    self.scroll_up(usize::MAX);
                    return;
                }
                KeyCode::End => {
                    self.scroll_to_bottom();
                    return;
                }
                _ => {}
            }
        }

        match self.focus {
            Focus::Input => self.handle_input_key(key),
            Focus::Logs => self.handle_logs_key(key),
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.input.insert_char(c)
            }
            KeyCode::Backspace => self.input.backspace(),
            KeyCode::Delete => self.input.delete(),
            KeyCode::Left => self.input.move_left(),
            KeyCode::Right => self.input.move_right(),
            KeyCode::Home => self.input.move_home(),
            KeyCode::End => self.input.move_end(),
            KeyCode::Enter => {
                if !self.input.is_empty() {
                    self.submit();
                }
            }
            KeyCode::Esc => {
                if self.engine.is_animating() {
                    self.engine.skip_to_end();
                } else {
                    self.input.clear();
                }
            }
            KeyCode::Up => {
                if self.input.is_empty() {
                    self.scroll_up(1);
                } else {
                    self.input.history_prev();
                }
            }
            KeyCode::Down => {
                if self.input.is_empty() {
                    self.scroll_down(1);
                } else {
                    self.input.history_next();
                }
            }
            KeyCode::PageUp => self.scroll_up(PAGE_ROWS),
            KeyCode::PageDown => self.scroll_down(PAGE_ROWS),
            _ => {}
        }
    }

    fn handle_logs_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.show_logs = false;
                self.focus = Focus::Input;
            }
            KeyCode::Up => self.log_scroll = self.log_scroll.saturating_sub(1),
            KeyCode::Down => self.log_scroll = self.log_scroll.saturating_add(1),
            KeyCode::PageUp => self.log_scroll = self.log_scroll.saturating_sub(PAGE_ROWS),
            KeyCode::PageDown => self.log_scroll = self.log_scroll.saturating_add(PAGE_ROWS),
            KeyCode::Home => self.log_scroll = 0,
            // clamped when rendered
            KeyCode::End => self.log_scroll = usize::MAX,
            KeyCode::Delete => {
                self.log_buffer.clear();
                self.log_scroll = 0;
            }
            _ => {}
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Actions
    // ─────────────────────────────────────────────────────────────────────────

    fn submit(&mut self) {
        let text = self.input.submit();
        if let Some(name) = text.strip_prefix(ATTACH_COMMAND) {
            let name = name.trim();
            if !name.is_empty() {
                self.attachments.push(name.to_string());
                self.status_message = Some(format!("Attached {name}"));
            }
            return;
        }

        match self.engine.send(&text, &self.attachments) {
            Ok(_) => {
                self.attachments.clear();
                self.follower.force_follow_on_next();
                self.status_message = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to send");
                self.status_message = Some(format!("Failed to send: {e}"));
            }
        }
    }

    fn regenerate(&mut self) {
        let Some(message) = self.latest_assistant().map(|m| m.id) else {
            self.status_message = Some("Nothing to regenerate".to_string());
            return;
        };
        match self.engine.regenerate(message) {
            Ok(_) => {
                self.follower.force_follow_on_next();
                self.status_message = None;
            }
            Err(e) => self.status_message = Some(format!("Cannot regenerate: {e}")),
        }
    }

    fn rate(&mut self, feedback: Feedback) {
        let Some(message) = self.latest_assistant().map(|m| m.id) else {
            return;
        };
        if let Err(e) = self.engine.toggle_feedback(message, feedback) {
            tracing::debug!(error = %e, "Feedback not applied");
        }
    }

    fn next_conversation(&mut self) {
        let list = self.engine.store().list();
        if list.is_empty() {
            return;
        }
        let current = self
            .engine
            .store()
            .selected_id()
            .and_then(|id| list.iter().position(|c| c.id == id));
        let next = current.map_or(0, |i| (i + 1) % list.len());
        let id = list[next].id;
        if let Err(e) = self.engine.select_conversation(id) {
            self.status_message = Some(e.to_string());
        }
    }

    fn delete_conversation(&mut self) {
        let Some(id) = self.engine.store().selected_id() else {
            return;
        };
        match self.engine.delete_conversation(id) {
            Ok(removed) => self.status_message = Some(format!("Deleted \"{}\"", removed.title)),
            Err(e) => self.status_message = Some(e.to_string()),
        }
    }

    fn latest_assistant(&self) -> Option<&Message> {
        self.engine
            .selected_conversation()?
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
    }

    fn scroll_up(&mut self, rows: usize) {
        self.viewport.scroll_up(rows);
        self.follower.on_viewport(&self.viewport);
    }

    fn scroll_down(&mut self, rows: usize) {
        self.viewport.scroll_down(rows);
        self.follower.on_viewport(&self.viewport);
    }

    fn scroll_to_bottom(&mut self) {
        let command = self.follower.scroll_to_bottom();
        self.viewport.apply(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempo_engine::EngineConfig;
    use tempo_types::{MessageStatus, QueryCategory};

    fn app() -> App {
        let engine = ChatEngine::with_scripted_responder(EngineConfig::default().with_seed(3));
        App::new(engine, LogBuffer::new())
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_line(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        app.handle_key(key(KeyCode::Enter));
    }

    fn messages(app: &App) -> Vec<(Role, MessageStatus)> {
        app.engine
            .selected_conversation()
            .map(|c| c.messages.iter().map(|m| (m.role, m.status())).collect())
            .unwrap_or_default()
    }

    #[tokio::test(start_paused = true)]
    async fn test_enter_sends_and_settles() {
        let mut app = app();
        type_line(&mut app, "What is the notice period?");

        assert!(app.input.is_empty());
        assert!(app.engine.is_streaming());
        app.engine.run_until_settled().await;

        assert_eq!(
            messages(&app),
            vec![
                (Role::User, MessageStatus::Complete),
                (Role::Assistant, MessageStatus::Complete),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_command_routes_to_document_steps() {
        let mut app = app();
        type_line(&mut app, "/attach lease.pdf");
        assert_eq!(app.attachments, vec!["lease.pdf".to_string()]);
        assert!(messages(&app).is_empty());

        type_line(&mut app, "Summarise this");
        assert!(app.attachments.is_empty());
        let started = app.engine.drain_notices().into_iter().any(|n| {
            matches!(
                n,
                Notice::TurnStarted {
                    category: QueryCategory::Document,
                    ..
                }
            )
        });
        assert!(started);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ctrl_c_cancels_then_quits() {
        let mut app = app();
        type_line(&mut app, "hello");

        app.handle_key(ctrl('c'));
        assert!(!app.should_quit);
        assert!(!app.engine.is_streaming());
        assert_eq!(messages(&app)[1].1, MessageStatus::Error);

        app.handle_key(ctrl('c'));
        assert!(app.should_quit);
    }

    #[tokio::test(start_paused = true)]
    async fn test_feedback_and_regenerate_target_latest_reply() {
        let mut app = app();
        type_line(&mut app, "hello");
        app.engine.run_until_settled().await;

        app.handle_key(ctrl('t'));
        assert_eq!(app.latest_assistant().and_then(|m| m.feedback()), Some(Feedback::Positive));
        app.handle_key(ctrl('b'));
        assert_eq!(app.latest_assistant().and_then(|m| m.feedback()), Some(Feedback::Negative));

        app.handle_key(ctrl('r'));
        assert_eq!(messages(&app).len(), 3);
        assert!(app.engine.is_streaming());
    }

    #[tokio::test(start_paused = true)]
    async fn test_escape_skips_reveal() {
        let mut app = app();
        type_line(&mut app, "hello");
        while !app.engine.is_animating() {
            app.engine.step().await;
        }

        app.handle_key(key(KeyCode::Esc));
        assert!(!app.engine.is_animating());
        app.engine.run_until_settled().await;
        assert_eq!(messages(&app)[1].1, MessageStatus::Complete);
    }

    #[test]
    fn test_first_growth_jumps_to_bottom() {
        let mut app = app();
        app.engine.new_conversation();
        app.sync_viewport(50, 10);
        assert_eq!(app.viewport.offset(), 40);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scrolled_away_view_stays_put() {
        let mut app = app();
        app.engine.new_conversation();
        app.sync_viewport(50, 10);
        app.handle_key(key(KeyCode::PageUp));
        assert_eq!(app.viewport.offset(), 30);
        assert!(app.is_scrolled_away());

        app.sync_viewport(60, 10);
        assert_eq!(app.viewport.offset(), 30);
        assert!(!app.viewport.is_scrolling());

        app.handle_key(KeyEvent::new(KeyCode::End, KeyModifiers::CONTROL));
        assert!(app.viewport.is_scrolling());
        for _ in 0..10 {
            app.on_tick(Instant::now());
        }
        assert_eq!(app.viewport.offset(), 50);
        assert!(!app.is_scrolled_away());
    }

    #[test]
    fn test_switching_conversation_resets_view() {
        let mut app = app();
        app.engine.new_conversation();
        app.sync_viewport(50, 10);
        app.handle_key(key(KeyCode::PageUp));

        app.handle_key(ctrl('n'));
        app.sync_viewport(30, 10);
        assert_eq!(app.viewport.offset(), 20);
    }
}
