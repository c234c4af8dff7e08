//! Runtime configuration for the engine components.

use std::time::Duration;

use tempo_config::{ClassifierSection, TempoConfig};
use tempo_types::MIN_MESSAGES;

/// Default maximum number of messages kept per conversation.
pub const DEFAULT_MAX_MESSAGES: usize = 10_000;

/// Reveal rate and frame cadence.
#[derive(Debug, Clone, PartialEq)]
pub struct PacerConfig {
    /// Characters revealed per elapsed tick.
    pub chars_per_tick: usize,
    /// Length of one tick.
    pub tick_interval: Duration,
    /// Frame period of the driver loop while animating.
    pub frame_interval: Duration,
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            chars_per_tick: 1,
            tick_interval: Duration::from_millis(8),
            frame_interval: Duration::from_millis(16),
        }
    }
}

impl PacerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chars_per_tick(mut self, chars: usize) -> Self {
        self.chars_per_tick = chars.max(1);
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }
}

/// Chunking of the simulated feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    pub min_chunk_chars: usize,
    pub max_chunk_chars: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            min_chunk_chars: 5,
            max_chunk_chars: 20,
            min_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(150),
        }
    }
}

impl FeedConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set chunk size bounds in chars. `max` is raised to `min` when smaller.
    pub fn with_chunk_chars(mut self, min: usize, max: usize) -> Self {
        self.min_chunk_chars = min.max(1);
        self.max_chunk_chars = max.max(self.min_chunk_chars);
        self
    }

    /// Set inter-chunk delay bounds. `max` is raised to `min` when smaller.
    pub fn with_delay(mut self, min: Duration, max: Duration) -> Self {
        self.min_delay = min;
        self.max_delay = max.max(min);
        self
    }
}

/// Phase durations.
#[derive(Debug, Clone, PartialEq)]
pub struct SequencerConfig {
    pub min_step: Duration,
    pub max_step: Duration,
    /// How long completed steps stay visible before being cleared.
    pub clear_after: Duration,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            min_step: Duration::from_millis(800),
            max_step: Duration::from_millis(1500),
            clear_after: Duration::from_millis(2000),
        }
    }
}

impl SequencerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step_duration(mut self, min: Duration, max: Duration) -> Self {
        self.min_step = min;
        self.max_step = max.max(min);
        self
    }

    pub fn with_clear_after(mut self, delay: Duration) -> Self {
        self.clear_after = delay;
        self
    }
}

/// Scroll-follow behaviour.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollConfig {
    /// Rows from the end that still count as "at bottom".
    pub threshold_rows: usize,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self { threshold_rows: 1 }
    }
}

/// Configuration for a [`ChatEngine`](crate::ChatEngine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub pacer: PacerConfig,
    pub feed: FeedConfig,
    pub sequencer: SequencerConfig,
    pub scroll: ScrollConfig,
    pub classifier: ClassifierSection,
    pub max_messages: usize,
    /// Fixed seed for phase durations; `None` draws from the OS.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pacer: PacerConfig::default(),
            feed: FeedConfig::default(),
            sequencer: SequencerConfig::default(),
            scroll: ScrollConfig::default(),
            classifier: ClassifierSection::default(),
            max_messages: DEFAULT_MAX_MESSAGES,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pacer(mut self, pacer: PacerConfig) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn with_feed(mut self, feed: FeedConfig) -> Self {
        self.feed = feed;
        self
    }

    pub fn with_sequencer(mut self, sequencer: SequencerConfig) -> Self {
        self.sequencer = sequencer;
        self
    }

    pub fn with_classifier(mut self, classifier: ClassifierSection) -> Self {
        self.classifier = classifier;
        self
    }

    /// Cap messages per conversation. Values below 2 are raised to 2.
    pub fn with_max_messages(mut self, max: usize) -> Self {
        self.max_messages = max.max(MIN_MESSAGES);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl From<&TempoConfig> for EngineConfig {
    fn from(config: &TempoConfig) -> Self {
        let pacer = config.pacer();
        let feed = config.feed();
        let sequencer = config.sequencer();

        Self {
            pacer: PacerConfig::new()
                .with_chars_per_tick(pacer.chars_per_tick as usize)
                .with_tick_interval(Duration::from_millis(pacer.tick_interval_ms))
                .with_frame_interval(Duration::from_millis(pacer.frame_interval_ms)),
            feed: FeedConfig::new()
                .with_chunk_chars(feed.min_chunk_chars, feed.max_chunk_chars)
                .with_delay(
                    Duration::from_millis(feed.min_delay_ms),
                    Duration::from_millis(feed.max_delay_ms),
                ),
            sequencer: SequencerConfig::new()
                .with_step_duration(
                    Duration::from_millis(sequencer.min_step_ms),
                    Duration::from_millis(sequencer.max_step_ms),
                )
                .with_clear_after(Duration::from_millis(sequencer.clear_after_ms)),
            scroll: ScrollConfig {
                threshold_rows: usize::from(config.scroll().threshold_rows),
            },
            classifier: config.classifier(),
            max_messages: config.store().max_messages.max(MIN_MESSAGES),
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_file_defaults() {
        let from_file = EngineConfig::from(&TempoConfig::new());
        let built = EngineConfig::new();

        assert_eq!(from_file.pacer, built.pacer);
        assert_eq!(from_file.feed, built.feed);
        assert_eq!(from_file.sequencer, built.sequencer);
        assert_eq!(from_file.scroll, built.scroll);
        assert_eq!(from_file.max_messages, DEFAULT_MAX_MESSAGES);
    }

    #[test]
    fn test_builders_keep_ranges_ordered() {
        let feed = FeedConfig::new().with_chunk_chars(10, 3);
        assert_eq!((feed.min_chunk_chars, feed.max_chunk_chars), (10, 10));

        let seq = SequencerConfig::new()
            .with_step_duration(Duration::from_millis(500), Duration::from_millis(100));
        assert_eq!(seq.max_step, Duration::from_millis(500));
    }
}
