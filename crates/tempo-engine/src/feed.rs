//! Source feeds: cumulative, prefix-stable text plus a lifecycle status.
//!
//! A feed is consumed as a [`FeedStream`] of [`FeedEvent`]s. Every `Text`
//! event carries the whole text delivered so far, each one extending the
//! previous, and the stream ends with exactly one `Finished` or `Failed`.

use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use async_stream::stream;
use futures::{Stream, StreamExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::FeedConfig;
use crate::text::{char_len, char_prefix};

// ─────────────────────────────────────────────────────────────────────────────
// Feed Events
// ─────────────────────────────────────────────────────────────────────────────

/// One update from a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// Cumulative text delivered so far.
    Text(String),
    /// All text has been delivered.
    Finished,
    /// Delivery stopped for good.
    Failed(String),
}

impl FeedEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed(_))
    }
}

/// Lifecycle of a feed as seen by its consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedStatus {
    #[default]
    NotStarted,
    Delivering,
    Finished,
    Failed,
}

impl FeedStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }
}

impl fmt::Display for FeedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::Delivering => "delivering",
            Self::Finished => "finished",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A boxed stream of feed events.
pub type FeedStream = Pin<Box<dyn Stream<Item = FeedEvent> + Send + 'static>>;

/// Anything that can deliver a response as a feed.
pub trait SourceFeed: Send {
    fn into_stream(self: Box<Self>) -> FeedStream;
}

// ─────────────────────────────────────────────────────────────────────────────
// Simulated Feed
// ─────────────────────────────────────────────────────────────────────────────

/// Delivers a fixed payload in random-sized chunks at random delays.
///
/// The first chunk is delivered without delay.
#[derive(Debug, Clone)]
pub struct SimulatedFeed {
    payload: String,
    config: FeedConfig,
    fail_after: Option<usize>,
    seed: Option<u64>,
}

impl SimulatedFeed {
    /// Create a feed for `payload`.
    pub fn new(payload: impl Into<String>, config: FeedConfig) -> Self {
        Self {
            payload: payload.into(),
            config,
            fail_after: None,
            seed: None,
        }
    }

    /// Fail once `chars` characters have been delivered.
    pub fn with_failure_after(mut self, chars: usize) -> Self {
        self.fail_after = Some(chars);
        self
    }

    /// Use a fixed seed for chunk sizes and delays.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl SourceFeed for SimulatedFeed {
    fn into_stream(self: Box<Self>) -> FeedStream {
        let SimulatedFeed {
            payload,
            config,
            fail_after,
            seed,
        } = *self;
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Box::pin(stream! {
            let total = char_len(&payload);
            let limit = fail_after.map(|n| n.min(total));
            let mut delivered = 0;

            while delivered < total {
                if delivered > 0 {
                    let delay = rng.random_range(config.min_delay..=config.max_delay);
                    tokio::time::sleep(delay).await;
                }

                let size = rng.random_range(config.min_chunk_chars..=config.max_chunk_chars);
                let next = (delivered + size).min(total);

                if let Some(limit) = limit.filter(|limit| next >= *limit) {
                    if limit > delivered {
                        yield FeedEvent::Text(char_prefix(&payload, limit).to_string());
                    }
                    tracing::debug!(delivered = limit, "Simulated feed failing");
                    yield FeedEvent::Failed("simulated delivery failure".to_string());
                    return;
                }

                delivered = next;
                yield FeedEvent::Text(char_prefix(&payload, delivered).to_string());
            }

            if limit == Some(0) {
                yield FeedEvent::Failed("simulated delivery failure".to_string());
                return;
            }
            yield FeedEvent::Finished;
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Delta Feed
// ─────────────────────────────────────────────────────────────────────────────

/// Adapts a stream of text deltas into the cumulative feed contract.
///
/// A delta stream error becomes `Failed`; the end of the stream is `Finished`.
pub struct DeltaFeed<S> {
    deltas: S,
}

impl<S> DeltaFeed<S> {
    pub fn new(deltas: S) -> Self {
        Self { deltas }
    }
}

impl<S, E> SourceFeed for DeltaFeed<S>
where
    S: Stream<Item = Result<String, E>> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    fn into_stream(self: Box<Self>) -> FeedStream {
        let mut deltas = Box::pin(self.deltas);
        Box::pin(stream! {
            let mut text = String::new();
            while let Some(item) = deltas.next().await {
                match item {
                    Ok(delta) => {
                        if delta.is_empty() {
                            continue;
                        }
                        text.push_str(&delta);
                        yield FeedEvent::Text(text.clone());
                    }
                    Err(e) => {
                        yield FeedEvent::Failed(e.to_string());
                        return;
                    }
                }
            }
            yield FeedEvent::Finished;
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Replay Feed
// ─────────────────────────────────────────────────────────────────────────────

/// Replays a fixed schedule of events, each after its own delay.
#[derive(Debug, Clone, Default)]
pub struct ReplayFeed {
    schedule: Vec<(Duration, FeedEvent)>,
}

impl ReplayFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit `event` after `delay`.
    pub fn then(mut self, delay: Duration, event: FeedEvent) -> Self {
        self.schedule.push((delay, event));
        self
    }

    /// Deliver `text` cumulatively in the given chunks, one per `delay`, then
    /// finish.
    pub fn chunks<'a>(chunks: impl IntoIterator<Item = &'a str>, delay: Duration) -> Self {
        let mut text = String::new();
        let mut feed = Self::new();
        for chunk in chunks {
            text.push_str(chunk);
            feed = feed.then(delay, FeedEvent::Text(text.clone()));
        }
        feed.then(delay, FeedEvent::Finished)
    }
}

impl SourceFeed for ReplayFeed {
    fn into_stream(self: Box<Self>) -> FeedStream {
        let schedule = self.schedule;
        Box::pin(stream! {
            for (delay, event) in schedule {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                yield event;
            }
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Prefix Guard
// ─────────────────────────────────────────────────────────────────────────────

/// Enforces the feed contract on an arbitrary inner feed.
///
/// A text update that does not extend the previous one fails the feed. Events
/// after the first terminal event are dropped, and an inner stream that ends
/// without a terminal event fails.
pub struct PrefixGuard {
    inner: Box<dyn SourceFeed>,
}

impl PrefixGuard {
    /// Guard `inner`.
    pub fn new(inner: Box<dyn SourceFeed>) -> Self {
        Self { inner }
    }
}

impl SourceFeed for PrefixGuard {
    fn into_stream(self: Box<Self>) -> FeedStream {
        let mut inner = self.inner.into_stream();
        Box::pin(stream! {
            let mut last = String::new();
            while let Some(event) = inner.next().await {
                match event {
                    FeedEvent::Text(text) => {
                        if !text.starts_with(last.as_str()) {
                            tracing::warn!(
                                previous = last.len(),
                                next = text.len(),
                                "Feed emitted a non-prefix update"
                            );
                            yield FeedEvent::Failed("feed emitted a non-prefix update".to_string());
                            return;
                        }
                        if text.len() > last.len() {
                            last.clone_from(&text);
                            yield FeedEvent::Text(text);
                        }
                    }
                    terminal => {
                        yield terminal;
                        return;
                    }
                }
            }
            tracing::warn!("Feed ended without a terminal event");
            yield FeedEvent::Failed("feed ended without finishing".to_string());
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
