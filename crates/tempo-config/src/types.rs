//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [pacer]          # reveal rate and frame cadence
//! [feed]           # simulated feed chunking
//! [sequencer]      # phase durations
//! [scroll]         # follow threshold
//! [classifier]     # keyword tables and step labels
//! [store]          # conversation limits
//! ```

use serde::{Deserialize, Serialize};
use tempo_types::{MIN_MESSAGES, QueryCategory};

use crate::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TempoConfig {
    pub pacer: Option<PacerSection>,
    pub feed: Option<FeedSection>,
    pub sequencer: Option<SequencerSection>,
    pub scroll: Option<ScrollSection>,
    pub classifier: Option<ClassifierSection>,
    pub store: Option<StoreSection>,
}

impl TempoConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// A config with every section filled with its defaults.
    pub fn with_defaults() -> Self {
        Self {
            pacer: Some(PacerSection::default()),
            feed: Some(FeedSection::default()),
            sequencer: Some(SequencerSection::default()),
            scroll: Some(ScrollSection::default()),
            classifier: Some(ClassifierSection::default()),
            store: Some(StoreSection::default()),
        }
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: TempoConfig) {
        if other.pacer.is_some() {
            self.pacer = other.pacer;
        }
        if other.feed.is_some() {
            self.feed = other.feed;
        }
        if other.sequencer.is_some() {
            self.sequencer = other.sequencer;
        }
        if other.scroll.is_some() {
            self.scroll = other.scroll;
        }
        if other.classifier.is_some() {
            self.classifier = other.classifier;
        }
        if other.store.is_some() {
            self.store = other.store;
        }
    }

    /// Check value ranges of every present section.
    pub fn validate(&self) -> Result<()> {
        self.pacer().validate()?;
        self.feed().validate()?;
        self.sequencer().validate()?;
        self.store().validate()?;
        Ok(())
    }

    /// Get the pacer section, or its defaults.
    pub fn pacer(&self) -> PacerSection {
        self.pacer.clone().unwrap_or_default()
    }

    pub fn feed(&self) -> FeedSection {
        self.feed.clone().unwrap_or_default()
    }

    pub fn sequencer(&self) -> SequencerSection {
        self.sequencer.clone().unwrap_or_default()
    }

    pub fn scroll(&self) -> ScrollSection {
        self.scroll.clone().unwrap_or_default()
    }

    pub fn classifier(&self) -> ClassifierSection {
        self.classifier.clone().unwrap_or_default()
    }

    pub fn store(&self) -> StoreSection {
        self.store.clone().unwrap_or_default()
    }
}

fn check_range(section: &'static str, field: &'static str, min: u64, max: u64) -> Result<()> {
    if min > max {
        return Err(ConfigError::InvalidRange {
            section,
            field,
            min,
            max,
        });
    }
    Ok(())
}

fn check_positive(section: &'static str, field: &'static str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(ConfigError::Zero { section, field });
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────────────────────────────────────

/// `[pacer]`: how fast revealed text catches up with delivered text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacerSection {
    /// Characters revealed per elapsed tick.
    pub chars_per_tick: u32,
    /// Length of one tick in milliseconds (8 ms ≈ 125 chars/s).
    pub tick_interval_ms: u64,
    /// How often the frame loop runs while animating.
    pub frame_interval_ms: u64,
}

impl Default for PacerSection {
    fn default() -> Self {
        Self {
            chars_per_tick: 1,
            tick_interval_ms: 8,
            frame_interval_ms: 16,
        }
    }
}

impl PacerSection {
    fn validate(&self) -> Result<()> {
        check_positive("pacer", "chars_per_tick", u64::from(self.chars_per_tick))?;
        check_positive("pacer", "tick_interval_ms", self.tick_interval_ms)?;
        check_positive("pacer", "frame_interval_ms", self.frame_interval_ms)
    }
}

/// `[feed]`: chunking of the simulated source feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSection {
    pub min_chunk_chars: usize,
    pub max_chunk_chars: usize,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for FeedSection {
    fn default() -> Self {
        Self {
            min_chunk_chars: 5,
            max_chunk_chars: 20,
            min_delay_ms: 50,
            max_delay_ms: 150,
        }
    }
}

impl FeedSection {
    fn validate(&self) -> Result<()> {
        check_positive("feed", "min_chunk_chars", self.min_chunk_chars as u64)?;
        check_range(
            "feed",
            "chunk_chars",
            self.min_chunk_chars as u64,
            self.max_chunk_chars as u64,
        )?;
        check_range("feed", "delay_ms", self.min_delay_ms, self.max_delay_ms)
    }
}

/// `[sequencer]`: duration of each narrated phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerSection {
    pub min_step_ms: u64,
    pub max_step_ms: u64,
    /// Grace period before completed steps are cleared.
    pub clear_after_ms: u64,
}

impl Default for SequencerSection {
    fn default() -> Self {
        Self {
            min_step_ms: 800,
            max_step_ms: 1500,
            clear_after_ms: 2000,
        }
    }
}

impl SequencerSection {
    fn validate(&self) -> Result<()> {
        check_range("sequencer", "step_ms", self.min_step_ms, self.max_step_ms)
    }
}

/// `[scroll]`: how close to the end still counts as "at bottom".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollSection {
    pub threshold_rows: u16,
}

impl Default for ScrollSection {
    fn default() -> Self {
        Self { threshold_rows: 1 }
    }
}

/// `[store]`: conversation limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub max_messages: usize,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            max_messages: 10_000,
        }
    }
}

impl StoreSection {
    fn validate(&self) -> Result<()> {
        if self.max_messages < MIN_MESSAGES {
            return Err(ConfigError::TooSmall {
                section: "store",
                field: "max_messages",
                min: MIN_MESSAGES as u64,
            });
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Classifier
// ─────────────────────────────────────────────────────────────────────────────

/// `[classifier]`: keyword tables, step labels and match precedence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSection {
    /// Categories checked in order; the first with a matching keyword wins.
    /// Attached files always select `document` before this list is consulted.
    pub precedence: Vec<QueryCategory>,
    pub keywords: KeywordTable,
    pub steps: StepTable,
}

impl Default for ClassifierSection {
    fn default() -> Self {
        Self {
            precedence: vec![
                QueryCategory::Drafting,
                QueryCategory::Legal,
                QueryCategory::Document,
            ],
            keywords: KeywordTable::default(),
            steps: StepTable::default(),
        }
    }
}

/// Trigger keywords per category. `general` has none: it is the fallback.
///
/// A category listed in a config file replaces that category's defaults;
/// categories left out keep theirs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordTable {
    pub legal: Vec<String>,
    pub document: Vec<String>,
    pub drafting: Vec<String>,
}

impl KeywordTable {
    pub fn get(&self, category: QueryCategory) -> &[String] {
        match category {
            QueryCategory::Legal => &self.legal,
            QueryCategory::Document => &self.document,
            QueryCategory::Drafting => &self.drafting,
            QueryCategory::General => &[],
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self {
            legal: strings(&[
                "tenancy act",
                "lease",
                "eviction",
                "notice period",
                "termination",
                "tenant",
                "landlord",
                "sublet",
                "rent increase",
                "deposit",
                "contract",
                "law",
                "legal",
                "statute",
                "rights",
                "obligation",
                "section",
                "§",
            ]),
            document: strings(&[
                "attached",
                "attachment",
                "uploaded",
                "analyze",
                "analyse",
                "review",
                "pdf",
            ]),
            drafting: strings(&[
                "write",
                "draft",
                "compose",
                "formulate",
                "create",
                "template",
                "letter",
                "message",
                "document",
            ]),
        }
    }
}

/// Ordered step labels per category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepTable {
    pub legal: Vec<String>,
    pub document: Vec<String>,
    pub drafting: Vec<String>,
    pub general: Vec<String>,
}

impl StepTable {
    pub fn get(&self, category: QueryCategory) -> &[String] {
        match category {
            QueryCategory::Legal => &self.legal,
            QueryCategory::Document => &self.document,
            QueryCategory::Drafting => &self.drafting,
            QueryCategory::General => &self.general,
        }
    }
}

impl Default for StepTable {
    fn default() -> Self {
        Self {
            legal: strings(&[
                "Analyzing the question",
                "Searching the tenancy act",
                "Retrieving relevant sections",
                "Generating answer with sources",
            ]),
            document: strings(&[
                "Reading document",
                "Extracting key terms",
                "Comparing with standard agreement",
                "Compiling analysis",
            ]),
            drafting: strings(&[
                "Understanding the assignment",
                "Gathering relevant context",
                "Writing draft",
                "Formatting document",
            ]),
            general: strings(&[
                "Analyzing the question",
                "Searching for information",
                "Generating answer",
            ]),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_section_fills_defaults() {
        let config = TempoConfig::from_toml(
            r#"
[pacer]
tick_interval_ms = 4
"#,
        )
        .unwrap();

        let pacer = config.pacer();
        assert_eq!(pacer.tick_interval_ms, 4);
        assert_eq!(pacer.chars_per_tick, 1);
        assert_eq!(pacer.frame_interval_ms, 16);
        assert!(config.feed.is_none());
        assert_eq!(config.feed(), FeedSection::default());
    }

    #[test]
    fn test_merge_overrides_sections() {
        let mut base = TempoConfig::with_defaults();
        let overlay = TempoConfig::from_toml(
            r#"
[sequencer]
min_step_ms = 10
max_step_ms = 20
"#,
        )
        .unwrap();

        base.merge(overlay);
        assert_eq!(base.sequencer().min_step_ms, 10);
        assert_eq!(base.sequencer().clear_after_ms, 2000);
        assert_eq!(base.pacer(), PacerSection::default());
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let config = TempoConfig::from_toml(
            r#"
[feed]
min_delay_ms = 200
max_delay_ms = 100
"#,
        )
        .unwrap();

        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidRange {
                section: "feed",
                ..
            }
        ));
    }

    #[test]
    fn test_validate_rejects_zero_tick() {
        let config = TempoConfig::from_toml("[pacer]\ntick_interval_ms = 0\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Zero {
                field: "tick_interval_ms",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_single_message_store() {
        let config = TempoConfig::from_toml("[store]\nmax_messages = 1\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TooSmall {
                field: "max_messages",
                min: 2,
                ..
            })
        ));
        let config = TempoConfig::from_toml("[store]\nmax_messages = 2\n").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_classifier_tables_parse() {
        let config = TempoConfig::from_toml(
            r#"
[classifier]
precedence = ["legal", "drafting"]

[classifier.keywords]
legal = ["hyreslagen"]

[classifier.steps]
general = ["Thinking"]
"#,
        )
        .unwrap();

        let classifier = config.classifier();
        assert_eq!(
            classifier.precedence,
            vec![QueryCategory::Legal, QueryCategory::Drafting]
        );
        assert_eq!(classifier.keywords.get(QueryCategory::Legal), ["hyreslagen"]);
        // unlisted categories keep their built-in keywords
        let defaults = KeywordTable::default();
        assert_eq!(classifier.keywords.drafting, defaults.drafting);
        assert_eq!(classifier.keywords.document, defaults.document);
        assert_eq!(classifier.steps.legal, StepTable::default().legal);
        assert_eq!(classifier.steps.get(QueryCategory::General), ["Thinking"]);
        assert!(classifier.keywords.get(QueryCategory::General).is_empty());
    }

    #[test]
    fn test_defaults_roundtrip_through_toml() {
        let config = TempoConfig::with_defaults();
        let text = config.to_toml().unwrap();
        let back = TempoConfig::from_toml(&text).unwrap();
        assert_eq!(back, config);
    }
}
