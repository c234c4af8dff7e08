//! Reveal pacing: display text that catches up with delivered text at a
//! fixed character rate.
//!
//! The pacer is pure state driven by explicit instants. The engine feeds it
//! `tokio::time::Instant`s from its frame loop; tests pass synthetic ones.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::PacerConfig;
use crate::feed::FeedStatus;
use crate::text::{char_len, char_prefix};

/// Identifies one logical stream; a new id restarts the reveal.
pub type StreamId = u64;

/// Paces the visible part of a growing text.
#[derive(Debug, Clone)]
pub struct RevealPacer {
    chars_per_tick: usize,
    tick_interval: Duration,
    stream: Option<StreamId>,
    source: String,
    source_chars: usize,
    status: FeedStatus,
    revealed: usize,
    last_tick: Option<Instant>,
    /// Observed before it finished, so it is a live stream.
    live: bool,
    skipped: bool,
    completion_reported: bool,
}

impl RevealPacer {
    /// Create an idle pacer.
    pub fn new(config: &PacerConfig) -> Self {
        Self {
            chars_per_tick: config.chars_per_tick.max(1),
            tick_interval: config.tick_interval.max(Duration::from_nanos(1)),
            stream: None,
            source: String::new(),
            source_chars: 0,
            status: FeedStatus::NotStarted,
            revealed: 0,
            last_tick: None,
            live: false,
            skipped: false,
            completion_reported: false,
        }
    }

    /// Take in the current source text and status.
    ///
    /// Returns `true` when this observation completes the stream.
    pub fn observe(
        &mut self,
        stream: StreamId,
        source: &str,
        status: FeedStatus,
        now: Instant,
    ) -> bool {
        let source_chars = char_len(source);
        if self.stream != Some(stream) {
            self.reset(Some(stream));
        } else if source_chars < self.source_chars {
            tracing::debug!(
                stream,
                previous = self.source_chars,
                next = source_chars,
                "Source shrank, restarting reveal"
            );
            self.reset(Some(stream));
        }

        if matches!(status, FeedStatus::NotStarted | FeedStatus::Delivering) {
            self.live = true;
        }
        self.source.clear();
        self.source.push_str(source);
        self.source_chars = source_chars;
        self.status = status;

        if !self.is_paced() || self.skipped {
            self.revealed = self.source_chars;
            self.last_tick = None;
        } else if self.revealed < self.source_chars && self.last_tick.is_none() {
            self.last_tick = Some(now);
        }

        self.check_complete()
    }

    /// Advance the reveal to `now`.
    ///
    /// Reveals `floor(elapsed / tick_interval) * chars_per_tick` characters and
    /// carries the remainder of the elapsed time into the next frame. Returns
    /// `true` when this tick completes the stream.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.is_animating() {
            self.last_tick = None;
            return self.check_complete();
        }

        let last = *self.last_tick.get_or_insert(now);
        let elapsed = now.saturating_duration_since(last);
        let ticks = elapsed.as_nanos() / self.tick_interval.as_nanos();
        if ticks == 0 {
            return false;
        }

        let ticks = usize::try_from(ticks).unwrap_or(usize::MAX);
        let reveal = ticks.saturating_mul(self.chars_per_tick);
        self.revealed = self.revealed.saturating_add(reveal).min(self.source_chars);

        if self.revealed >= self.source_chars {
            self.last_tick = None;
        } else {
            let advance = self.tick_interval.saturating_mul(u32::try_from(ticks).unwrap_or(u32::MAX));
            self.last_tick = Some(last + advance);
        }
        tracing::trace!(revealed = self.revealed, total = self.source_chars, "Pacer tick");

        self.check_complete()
    }

    /// Reveal everything now. Later text is revealed as it arrives.
    pub fn skip_to_end(&mut self) -> bool {
        self.skipped = true;
        self.revealed = self.source_chars;
        self.last_tick = None;
        self.check_complete()
    }

    /// The currently visible text.
    pub fn display_text(&self) -> &str {
        char_prefix(&self.source, self.revealed)
    }

    /// Whether visible text still trails the source.
    pub fn is_animating(&self) -> bool {
        self.is_paced() && !self.skipped && self.revealed < self.source_chars
    }

    /// Whether completion has been reported for the current stream.
    pub fn is_complete(&self) -> bool {
        self.completion_reported
    }

    /// Number of characters revealed.
    pub fn revealed_chars(&self) -> usize {
        self.revealed
    }

    pub fn stream(&self) -> Option<StreamId> {
        self.stream
    }

    /// Forget the current stream entirely.
    pub fn clear(&mut self) {
        self.reset(None);
    }

    /// Pacing applies to live streams that have not failed. Content that
    /// arrives already finished is shown as-is.
    fn is_paced(&self) -> bool {
        match self.status {
            FeedStatus::Failed => false,
            FeedStatus::Finished => self.live,
            FeedStatus::NotStarted | FeedStatus::Delivering => true,
        }
    }

    fn check_complete(&mut self) -> bool {
        if self.completion_reported
            || !self.is_paced()
            || self.status != FeedStatus::Finished
            || self.revealed < self.source_chars
        {
            return false;
        }
        self.completion_reported = true;
        tracing::debug!(stream = ?self.stream, chars = self.source_chars, "Reveal complete");
        true
    }

    fn reset(&mut self, stream: Option<StreamId>) {
        self.stream = stream;
        self.source.clear();
        self.source_chars = 0;
        self.status = FeedStatus::NotStarted;
        self.revealed = 0;
        self.last_tick = None;
        self.live = false;
        self.skipped = false;
        self.completion_reported = false;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
