//! The chat engine: turns, their pipelines, and the frame loop.
//!
//! A turn runs phase sequencer → feed → pacer for one assistant message.
//! Spawned tasks never touch engine state. They send [`TurnEvent`]s tagged
//! with their turn id over a channel, and events from any turn other than the
//! active one are dropped on arrival.

use futures::StreamExt;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tempo_types::{
    Conversation, Feedback, Id, Message, MessagePatch, MessageStatus, QueryCategory, Role,
    StepStatus, TaskStep,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::classifier::Classifier;
use crate::config::EngineConfig;
use crate::dispose::{CompositeDisposer, Disposer};
use crate::error::{EngineError, Result};
use crate::feed::{FeedEvent, FeedStatus};
use crate::pacer::RevealPacer;
use crate::responder::{Request, Responder, Response, ScriptedResponder};
use crate::sequencer::{PhaseEvent, PhasePlan, TaskBoard, spawn_sequence};
use crate::store::ConversationStore;

/// Identifies one turn; also the pacer's stream id.
pub type TurnId = u64;

/// Reason recorded on a message cut off by a newer turn.
pub const INTERRUPTED: &str = "interrupted";

/// Reason recorded on a message cancelled explicitly.
pub const CANCELLED: &str = "cancelled";

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// Payload sent by a turn's background tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Phase(PhaseEvent),
    Feed(FeedEvent),
    /// The grace period after the last step has passed.
    ClearSteps,
}

/// An event tagged with the turn that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnEvent {
    pub turn: TurnId,
    pub event: EngineEvent,
}

/// Something a render surface or printer may want to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    TurnStarted {
        turn: TurnId,
        message: Id,
        category: QueryCategory,
    },
    StepChanged {
        id: String,
        label: String,
        status: StepStatus,
    },
    PhasesCompleted,
    FeedStarted {
        message: Id,
    },
    MessageCompleted {
        message: Id,
    },
    MessageFailed {
        message: Id,
        reason: String,
    },
    StepsCleared,
}

/// What to draw for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageView<'a> {
    pub display_text: &'a str,
    pub is_animating: bool,
}

struct ActiveTurn {
    id: TurnId,
    conversation: Id,
    message: Id,
    /// Held back until the phases complete.
    pending: Option<Response>,
    feed_status: FeedStatus,
    tasks: CompositeDisposer,
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat Engine
// ─────────────────────────────────────────────────────────────────────────────

/// Owns conversations and runs at most one turn at a time.
pub struct ChatEngine {
    config: EngineConfig,
    store: ConversationStore,
    board: TaskBoard,
    classifier: Classifier,
    responder: Box<dyn Responder>,
    pacer: RevealPacer,
    rng: StdRng,
    turn: Option<ActiveTurn>,
    last_turn: TurnId,
    tx: UnboundedSender<TurnEvent>,
    rx: UnboundedReceiver<TurnEvent>,
    notices: Vec<Notice>,
}

impl ChatEngine {
    /// Create an engine answering with `responder`.
    pub fn new(config: EngineConfig, responder: Box<dyn Responder>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            store: ConversationStore::new(config.max_messages),
            board: TaskBoard::new(),
            classifier: Classifier::new(config.classifier.clone()),
            pacer: RevealPacer::new(&config.pacer),
            responder,
            rng,
            turn: None,
            last_turn: 0,
            tx,
            rx,
            notices: Vec::new(),
            config,
        }
    }

    /// An engine answering with the canned scripted response.
    pub fn with_scripted_responder(config: EngineConfig) -> Self {
        let mut responder = ScriptedResponder::new(config.feed.clone());
        if let Some(seed) = config.seed {
            responder = responder.with_seed(seed);
        }
        Self::new(config, Box::new(responder))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Get the selected conversation.
    pub fn selected_conversation(&self) -> Option<&Conversation> {
        self.store.selected()
    }

    /// The current step list.
    pub fn steps(&self) -> &[TaskStep] {
        self.board.steps()
    }

    pub fn board(&self) -> &TaskBoard {
        &self.board
    }

    pub fn active_turn(&self) -> Option<TurnId> {
        self.turn.as_ref().map(|t| t.id)
    }

    /// The message the active turn writes to.
    pub fn active_message(&self) -> Option<Id> {
        self.turn.as_ref().map(|t| t.message)
    }

    /// Whether the active turn's message is still open.
    pub fn is_streaming(&self) -> bool {
        self.turn.as_ref().is_some_and(|turn| {
            self.store
                .message(turn.conversation, turn.message)
                .is_ok_and(|m| m.is_open())
        })
    }

    /// Whether the pacer still has text to reveal for the active turn.
    pub fn is_animating(&self) -> bool {
        self.pacer_owned_by_turn().is_some() && self.pacer.is_animating()
    }

    /// Display state for a message. Only the active turn's message is paced.
    pub fn view<'a>(&'a self, message: &'a Message) -> MessageView<'a> {
        match self.pacer_owned_by_turn() {
            Some(turn) if turn.message == message.id => MessageView {
                display_text: self.pacer.display_text(),
                is_animating: self.pacer.is_animating(),
            },
            _ => MessageView {
                display_text: message.content(),
                is_animating: false,
            },
        }
    }

    /// Take the notices accumulated since the last call.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Conversations
    // ─────────────────────────────────────────────────────────────────────────

    /// Create and select an empty conversation.
    pub fn new_conversation(&mut self) -> Id {
        self.store.create()
    }

    /// Select a conversation. A running turn keeps running.
    pub fn select_conversation(&mut self, id: Id) -> Result<()> {
        self.store.select(id)
    }

    pub fn rename_conversation(&mut self, id: Id, title: impl Into<String>) -> Result<()> {
        self.store.rename(id, title)
    }

    /// Delete a conversation, tearing down its turn if one is running.
    pub fn delete_conversation(&mut self, id: Id) -> Result<Conversation> {
        if self.turn.as_ref().is_some_and(|t| t.conversation == id)
            && let Some(mut turn) = self.turn.take()
        {
            turn.tasks.dispose();
            self.board.clear();
            self.pacer.clear();
        }
        self.store.delete(id)
    }

    /// Toggle a rating on a message of the selected conversation.
    pub fn toggle_feedback(&mut self, message: Id, feedback: Feedback) -> Result<Option<Feedback>> {
        let conversation = self
            .store
            .selected_id()
            .ok_or(EngineError::MessageNotFound(message))?;
        self.store.toggle_feedback(conversation, message, feedback)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Turns
    // ─────────────────────────────────────────────────────────────────────────

    /// Send a user message to the selected conversation (creating one when
    /// none is selected) and start a turn answering it.
    ///
    /// An open turn is interrupted first. Returns the new assistant message id.
    pub fn send(&mut self, text: &str, attachments: &[String]) -> Result<Id> {
        let conversation = match self.store.selected_id() {
            Some(id) => id,
            None => self.store.create(),
        };
        self.interrupt(INTERRUPTED);
        self.store.append(conversation, Message::user(text))?;
        self.start_turn(conversation, text, attachments)
    }

    /// Re-run the pipeline for the user message that `message` answered.
    ///
    /// Allowed for a failed assistant message, or for the latest assistant
    /// message once it is complete.
    pub fn regenerate(&mut self, message: Id) -> Result<Id> {
        let conversation = self
            .store
            .selected_id()
            .ok_or(EngineError::MessageNotFound(message))?;
        let prompt = {
            let conv = self.store.get(conversation)?;
            let index = conv
                .messages
                .iter()
                .position(|m| m.id == message)
                .ok_or(EngineError::MessageNotFound(message))?;
            let target = &conv.messages[index];
            let latest_assistant = conv
                .messages
                .iter()
                .rev()
                .find(|m| m.role == Role::Assistant)
                .map(|m| m.id);

            let allowed = target.role == Role::Assistant
                && match target.status() {
                    MessageStatus::Error => true,
                    MessageStatus::Complete => latest_assistant == Some(message),
                    MessageStatus::Pending | MessageStatus::Streaming => false,
                };
            if !allowed {
                return Err(EngineError::NothingToRegenerate(message));
            }
            conv.messages[..index]
                .iter()
                .rev()
                .find(|m| m.role == Role::User)
                .map(|m| m.content().to_string())
                .ok_or(EngineError::NothingToRegenerate(message))?
        };

        tracing::debug!(%message, "Regenerating");
        self.interrupt(INTERRUPTED);
        self.start_turn(conversation, &prompt, &[])
    }

    /// Stop the active turn, failing its message if still open.
    pub fn cancel(&mut self) {
        self.interrupt(CANCELLED);
        self.board.clear();
    }

    /// Reveal the rest of the active message now.
    pub fn skip_to_end(&mut self) {
        if self.pacer_owned_by_turn().is_some() && self.pacer.skip_to_end() {
            self.complete_message();
        }
    }

    /// Tear down every background task.
    pub fn shutdown(&mut self) {
        if let Some(mut turn) = self.turn.take() {
            turn.tasks.dispose();
        }
    }

    fn start_turn(&mut self, conversation: Id, text: &str, attachments: &[String]) -> Result<Id> {
        let category = self.classifier.classify(text, !attachments.is_empty());
        let steps = self.classifier.steps_for(category);
        let message = self
            .store
            .append(conversation, Message::assistant_pending())?;

        self.last_turn += 1;
        let turn_id = self.last_turn;
        let response = self.responder.respond(&Request {
            text,
            category,
            attachments,
        });
        let plan = PhasePlan::new(&steps, &self.config.sequencer, &mut self.rng);

        tracing::debug!(
            turn = turn_id,
            %message,
            %category,
            steps = steps.len(),
            phases_ms = plan.total().as_millis() as u64,
            "Starting turn"
        );

        self.board.load(steps);
        self.pacer
            .observe(turn_id, "", FeedStatus::NotStarted, Instant::now());

        let tx = self.tx.clone();
        let mut tasks = CompositeDisposer::new();
        tasks.add(spawn_sequence(plan, move |event| {
            let _ = tx.send(TurnEvent {
                turn: turn_id,
                event: EngineEvent::Phase(event),
            });
        }));

        self.turn = Some(ActiveTurn {
            id: turn_id,
            conversation,
            message,
            pending: Some(response),
            feed_status: FeedStatus::NotStarted,
            tasks,
        });
        self.notices.push(Notice::TurnStarted {
            turn: turn_id,
            message,
            category,
        });
        Ok(message)
    }

    /// Cancel the active turn. An open message keeps everything delivered so
    /// far and moves to `error` with `reason`.
    fn interrupt(&mut self, reason: &str) {
        let Some(mut turn) = self.turn.take() else {
            return;
        };
        turn.tasks.dispose();

        if let Ok(message) = self.store.message_mut(turn.conversation, turn.message)
            && message.is_open()
        {
            tracing::debug!(turn = turn.id, message = %turn.message, reason, "Interrupting turn");
            if let Err(e) = message.fail(reason) {
                tracing::warn!(error = %e, "Failed to freeze interrupted message");
            }
            self.pacer
                .observe(turn.id, message.content(), FeedStatus::Failed, Instant::now());
            self.notices.push(Notice::MessageFailed {
                message: turn.message,
                reason: reason.to_string(),
            });
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Event handling
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply one event from a turn's background tasks.
    pub fn handle_event(&mut self, event: TurnEvent) {
        let now = Instant::now();
        match &self.turn {
            Some(turn) if turn.id == event.turn => {}
            _ => {
                tracing::trace!(turn = event.turn, "Dropping event from stale turn");
                return;
            }
        }

        match event.event {
            EngineEvent::Phase(PhaseEvent::Step { id, status }) => self.on_step(&id, status),
            EngineEvent::Phase(PhaseEvent::Completed) => self.on_phases_completed(),
            EngineEvent::Feed(feed_event) => self.on_feed(feed_event, now),
            EngineEvent::ClearSteps => {
                self.board.clear();
                self.notices.push(Notice::StepsCleared);
            }
        }
    }

    /// Apply every event already queued. Returns how many were handled.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Wait for the next event from a background task.
    pub async fn next_event(&mut self) -> Option<TurnEvent> {
        self.rx.recv().await
    }

    /// Advance the pacer to `now`. Returns `true` if the display changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.pacer_owned_by_turn().is_none() {
            return false;
        }
        let before = self.pacer.revealed_chars();
        let completed = self.pacer.tick(now);
        if completed {
            self.complete_message();
        }
        completed || before != self.pacer.revealed_chars()
    }

    /// Wait for one event or, while animating, one frame, and apply it.
    pub async fn step(&mut self) {
        if self.is_animating() {
            let frame = self.config.pacer.frame_interval;
            tokio::select! {
                event = self.rx.recv() => {
                    if let Some(event) = event {
                        self.handle_event(event);
                    }
                }
                _ = tokio::time::sleep(frame) => {
                    self.tick(Instant::now());
                }
            }
        } else if let Some(event) = self.rx.recv().await {
            self.handle_event(event);
        }
    }

    /// Drive the active turn until its message is complete or failed.
    pub async fn run_until_settled(&mut self) {
        while self.is_streaming() {
            self.step().await;
        }
    }

    fn on_step(&mut self, id: &str, status: StepStatus) {
        match self.board.apply(id, status) {
            Ok(true) => {
                let label = self
                    .board
                    .step(id)
                    .map(|s| s.label.clone())
                    .unwrap_or_default();
                tracing::trace!(step = id, %status, "Step changed");
                self.notices.push(Notice::StepChanged {
                    id: id.to_string(),
                    label,
                    status,
                });
            }
            Ok(false) => tracing::trace!(step = id, "Ignoring unknown step"),
            Err(e) => tracing::warn!(error = %e, "Rejected step transition"),
        }
    }

    fn on_phases_completed(&mut self) {
        let Some(turn) = self.turn.as_mut() else {
            return;
        };
        self.notices.push(Notice::PhasesCompleted);
        let turn_id = turn.id;

        let Some(response) = turn.pending.take() else {
            return;
        };
        let started = self
            .store
            .message_mut(turn.conversation, turn.message)
            .and_then(|m| {
                m.apply(MessagePatch {
                    sources: Some(response.sources),
                    status: Some(MessageStatus::Streaming),
                    ..MessagePatch::default()
                })
                .map_err(EngineError::from)
            });
        if let Err(e) = started {
            tracing::warn!(turn = turn_id, error = %e, "Could not start feed");
            return;
        }

        let tx = self.tx.clone();
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let mut stream = response.feed.into_stream();
        let pump = tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = cancelled.cancelled() => break,
                    event = stream.next() => event,
                };
                let Some(event) = event else {
                    break;
                };
                let terminal = event.is_terminal();
                let sent = tx.send(TurnEvent {
                    turn: turn_id,
                    event: EngineEvent::Feed(event),
                });
                if sent.is_err() || terminal {
                    break;
                }
            }
        });
        turn.tasks.add(Disposer::new(token, pump));

        tracing::debug!(turn = turn_id, "Feed started");
        self.notices.push(Notice::FeedStarted {
            message: turn.message,
        });
    }

    fn on_feed(&mut self, event: FeedEvent, now: Instant) {
        let Some(turn) = self.turn.as_mut() else {
            return;
        };
        let turn_id = turn.id;

        match event {
            FeedEvent::Text(text) => {
                turn.feed_status = FeedStatus::Delivering;
                let written = self
                    .store
                    .message_mut(turn.conversation, turn.message)
                    .and_then(|m| m.set_content(&text).map_err(EngineError::from));
                if let Err(e) = written {
                    tracing::warn!(turn = turn_id, error = %e, "Rejected feed update");
                    self.fail_message(&e.to_string(), now);
                    return;
                }
                self.pacer
                    .observe(turn_id, &text, FeedStatus::Delivering, now);
            }
            FeedEvent::Finished => {
                turn.feed_status = FeedStatus::Finished;
                let content = match self.store.message(turn.conversation, turn.message) {
                    Ok(m) => m.content().to_string(),
                    Err(e) => {
                        tracing::warn!(turn = turn_id, error = %e, "Finished turn lost its message");
                        return;
                    }
                };
                tracing::debug!(turn = turn_id, chars = content.len(), "Feed finished");
                if self
                    .pacer
                    .observe(turn_id, &content, FeedStatus::Finished, now)
                {
                    self.complete_message();
                }
            }
            FeedEvent::Failed(reason) => {
                tracing::warn!(turn = turn_id, %reason, "Feed failed");
                self.fail_message(&reason, now);
            }
        }
    }

    /// Freeze the active message as delivered and mark it failed. The pacer
    /// stops animating and shows the whole delivered text.
    fn fail_message(&mut self, reason: &str, now: Instant) {
        let Some(turn) = self.turn.as_mut() else {
            return;
        };
        turn.feed_status = FeedStatus::Failed;
        let (turn_id, conversation, message_id) = (turn.id, turn.conversation, turn.message);

        let Ok(message) = self.store.message_mut(conversation, message_id) else {
            return;
        };
        if !message.is_open() {
            return;
        }
        if let Err(e) = message.fail(reason) {
            tracing::warn!(turn = turn_id, error = %e, "Failed to mark message as failed");
            return;
        }
        self.pacer
            .observe(turn_id, message.content(), FeedStatus::Failed, now);
        self.notices.push(Notice::MessageFailed {
            message: message_id,
            reason: reason.to_string(),
        });
        self.schedule_clear_steps();
    }

    fn complete_message(&mut self) {
        let Some(turn) = self.turn.as_ref() else {
            return;
        };
        if turn.feed_status != FeedStatus::Finished {
            return;
        }
        let completed = self
            .store
            .message_mut(turn.conversation, turn.message)
            .and_then(|m| m.complete().map_err(EngineError::from));
        match completed {
            Ok(()) => {
                tracing::debug!(turn = turn.id, message = %turn.message, "Message complete");
                self.notices.push(Notice::MessageCompleted {
                    message: turn.message,
                });
                self.schedule_clear_steps();
            }
            Err(e) => tracing::warn!(turn = turn.id, error = %e, "Could not complete message"),
        }
    }

    /// Clear the step list once the grace period after the response ends.
    fn schedule_clear_steps(&mut self) {
        let Some(turn) = self.turn.as_mut() else {
            return;
        };
        let turn_id = turn.id;
        let tx = self.tx.clone();
        let clear_after = self.config.sequencer.clear_after;
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let clear = tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(clear_after) => {
                    let _ = tx.send(TurnEvent { turn: turn_id, event: EngineEvent::ClearSteps });
                }
            }
        });
        turn.tasks.add(Disposer::new(token, clear));
    }

    fn pacer_owned_by_turn(&self) -> Option<&ActiveTurn> {
        self.turn
            .as_ref()
            .filter(|turn| self.pacer.stream() == Some(turn.id))
    }
}

impl Drop for ChatEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
