//! Keyword classification of requests into narrated step sequences.

use regex::Regex;
use tempo_config::ClassifierSection;
use tempo_types::{QueryCategory, TaskStep};

/// Picks a [`QueryCategory`] for a request and the steps to narrate for it.
#[derive(Debug, Clone)]
pub struct Classifier {
    table: ClassifierSection,
    /// One matcher per category in precedence order. Categories without
    /// keywords have none.
    matchers: Vec<(QueryCategory, Regex)>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(ClassifierSection::default())
    }
}

impl Classifier {
    /// Build from a keyword table.
    ///
    /// Keywords match case-insensitively and only as whole words, so `lease`
    /// does not fire on "please".
    pub fn new(table: ClassifierSection) -> Self {
        let matchers = table
            .precedence
            .iter()
            .filter_map(|&category| {
                keyword_matcher(table.keywords.get(category)).map(|regex| (category, regex))
            })
            .collect();
        Self { table, matchers }
    }

    /// Classify a request.
    ///
    /// Attached files always mean document analysis. Otherwise categories are
    /// tried in configured precedence and the first with a keyword in the
    /// text wins; no match is `General`.
    pub fn classify(&self, text: &str, has_attachments: bool) -> QueryCategory {
        if has_attachments {
            return QueryCategory::Document;
        }
        self.matchers
            .iter()
            .find(|(_, regex)| regex.is_match(text))
            .map(|(category, _)| *category)
            .unwrap_or(QueryCategory::General)
    }

    /// Fresh pending steps for a category. A category without labels falls
    /// back to the general sequence.
    pub fn steps_for(&self, category: QueryCategory) -> Vec<TaskStep> {
        let labels = self.table.steps.get(category);
        let labels = if labels.is_empty() {
            self.table.steps.get(QueryCategory::General)
        } else {
            labels
        };
        TaskStep::sequence(labels.iter().cloned())
    }
}

/// `(?i)` alternation of the keywords. A `\b` anchors each end that is a
/// word character; symbols such as `§` match anywhere.
fn keyword_matcher(keywords: &[String]) -> Option<Regex> {
    let alternatives: Vec<String> = keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(|keyword| {
            let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
            let start = if is_word(keyword.chars().next()) { r"\b" } else { "" };
            let end = if is_word(keyword.chars().next_back()) { r"\b" } else { "" };
            format!("{start}{}{end}", regex::escape(keyword))
        })
        .collect();
    if alternatives.is_empty() {
        return None;
    }

    let pattern = format!("(?i)(?:{})", alternatives.join("|"));
    match Regex::new(&pattern) {
        Ok(regex) => Some(regex),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unusable keyword list");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempo_config::KeywordTable;

    #[test]
    fn test_attachments_force_document() {
        let c = Classifier::default();
        assert_eq!(c.classify("Write a letter", true), QueryCategory::Document);
    }

    #[test]
    fn test_drafting_beats_legal() {
        let c = Classifier::default();
        assert_eq!(
            c.classify("Draft a termination notice for my tenant", false),
            QueryCategory::Drafting
        );
    }

    #[test]
    fn test_legal_keywords() {
        let c = Classifier::default();
        assert_eq!(
            c.classify("What notice period applies under the Tenancy Act?", false),
            QueryCategory::Legal
        );
    }

    #[test]
    fn test_document_keywords_after_legal() {
        let c = Classifier::default();
        assert_eq!(c.classify("Please review the PDF", false), QueryCategory::Document);
    }

    #[test]
    fn test_keywords_match_whole_words_only() {
        let c = Classifier::default();
        assert_eq!(c.classify("Please help me", false), QueryCategory::General);
        assert_eq!(
            c.classify("Mowing the lawn at the intersection", false),
            QueryCategory::General
        );
        assert_eq!(c.classify("Is my lease valid?", false), QueryCategory::Legal);
        assert_eq!(c.classify("See § 4 of the act", false), QueryCategory::Legal);
    }

    #[test]
    fn test_miss_is_general() {
        let c = Classifier::default();
        assert_eq!(c.classify("What's the weather like?", false), QueryCategory::General);
        assert_eq!(c.steps_for(QueryCategory::General).len(), 3);
    }

    #[test]
    fn test_step_lists() {
        let c = Classifier::default();
        let legal = c.steps_for(QueryCategory::Legal);
        assert_eq!(legal.len(), 4);
        assert_eq!(legal[1].label, "Searching the tenancy act");
        assert_eq!(legal[0].id, "1");
    }

    #[test]
    fn test_configured_keywords_are_case_insensitive() {
        let mut table = ClassifierSection::default();
        table.keywords = KeywordTable {
            legal: vec!["Hyreslagen".into()],
            document: vec![],
            drafting: vec![],
        };
        table.steps.legal.clear();
        let c = Classifier::new(table);

        assert_eq!(c.classify("vad säger HYRESLAGEN?", false), QueryCategory::Legal);
        assert_eq!(c.steps_for(QueryCategory::Legal).len(), 3);
    }
}
