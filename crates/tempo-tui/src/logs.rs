//! Captures tracing events into a ring buffer for the log panel.
//!
//! The terminal is in raw mode while the TUI runs, so console logging is
//! replaced by [`TuiLogLayer`].

use std::collections::VecDeque;
use std::fmt::{self, Write as _};
use std::sync::Arc;

use parking_lot::Mutex;
use ratatui::style::Color;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// Default number of entries kept before the oldest are dropped.
pub const DEFAULT_LOG_CAPACITY: usize = 500;

/// One captured event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: Level,
    /// Module path of the call site.
    pub target: String,
    pub message: String,
    /// Structured fields rendered as `key=value`.
    pub fields: Vec<(String, String)>,
}

impl LogEntry {
    /// Color used for the level column.
    pub fn level_color(&self) -> Color {
        match self.level {
            Level::ERROR => Color::Red,
            Level::WARN => Color::Yellow,
            Level::INFO => Color::Green,
            Level::DEBUG => Color::Cyan,
            Level::TRACE => Color::DarkGray,
        }
    }

    /// Three-letter level tag.
    pub fn level_prefix(&self) -> &'static str {
        match self.level {
            Level::ERROR => "ERR",
            Level::WARN => "WRN",
            Level::INFO => "INF",
            Level::DEBUG => "DBG",
            Level::TRACE => "TRC",
        }
    }

    /// Last path component of the target.
    pub fn short_target(&self) -> &str {
        self.target.rsplit("::").next().unwrap_or(&self.target)
    }

    /// Message followed by its fields.
    pub fn summary(&self) -> String {
        let mut out = self.message.clone();
        for (key, value) in &self.fields {
            let _ = write!(out, " {key}={value}");
        }
        out
    }
}

/// Shared, bounded log buffer.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
    capacity: usize,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LogBuffer {
    /// Create a buffer with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }

    /// Create a buffer holding at most `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Snapshot of the current entries, oldest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Get the number of entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Add an entry, dropping the oldest when full.
    pub fn push(&self, entry: LogEntry) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }
}

/// A tracing layer that writes events into a [`LogBuffer`].
pub struct TuiLogLayer {
    buffer: LogBuffer,
    min_level: Level,
}

impl TuiLogLayer {
    /// Create a layer writing into `buffer`, capturing debug and above.
    pub fn new(buffer: LogBuffer) -> Self {
        Self {
            buffer,
            min_level: Level::DEBUG,
        }
    }

    /// Drop events less severe than `level`.
    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }
}

#[derive(Default)]
struct EntryVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl EntryVisitor {
    fn record(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.push((field.name().to_string(), value));
        }
    }
}

impl Visit for EntryVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let mut rendered = format!("{value:?}");
        if rendered.len() >= 2 && rendered.starts_with('"') && rendered.ends_with('"') {
            rendered = rendered[1..rendered.len() - 1].to_string();
        }
        self.record(field, rendered);
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record(field, value.to_string());
    }
}

impl<S: Subscriber> Layer<S> for TuiLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if *metadata.level() > self.min_level {
            return;
        }

        let mut visitor = EntryVisitor::default();
        event.record(&mut visitor);

        self.buffer.push(LogEntry {
            level: *metadata.level(),
            target: metadata.target().to_string(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::prelude::*;

    fn entry(level: Level, message: &str) -> LogEntry {
        LogEntry {
            level,
            target: "tempo_engine::engine".to_string(),
            message: message.to_string(),
            fields: Vec::new(),
        }
    }

    #[test]
    fn test_buffer_drops_oldest() {
        let buffer = LogBuffer::with_capacity(2);
        buffer.push(entry(Level::INFO, "a"));
        buffer.push(entry(Level::INFO, "b"));
        buffer.push(entry(Level::INFO, "c"));

        let messages: Vec<_> = buffer.entries().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["b", "c"]);
    }

    #[test]
    fn test_entry_presentation() {
        let mut e = entry(Level::WARN, "Feed failed");
        e.fields.push(("turn".into(), "3".into()));

        assert_eq!(e.level_color(), Color::Yellow);
        assert_eq!(e.level_prefix(), "WRN");
        assert_eq!(e.short_target(), "engine");
        assert_eq!(e.summary(), "Feed failed turn=3");
    }

    #[test]
    fn test_layer_captures_message_and_fields() {
        let buffer = LogBuffer::new();
        let subscriber = tracing_subscriber::registry()
            .with(TuiLogLayer::new(buffer.clone()).with_min_level(Level::INFO));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(turn = 7, reason = "interrupted", "Turn ended");
            tracing::debug!("too quiet");
        });

        let entries = buffer.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "Turn ended");
        assert_eq!(
            entries[0].fields,
            vec![
                ("turn".to_string(), "7".to_string()),
                ("reason".to_string(), "interrupted".to_string()),
            ]
        );
    }
}
