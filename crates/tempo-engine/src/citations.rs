//! Inline citation markers (`[1]`, `[2]`, ...) and their sources.

use std::sync::LazyLock;

use regex::Regex;
use tempo_types::Source;

/// Closed citation markers only; a half-revealed `[2` stays plain text.
static CITATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d+)\]").expect("citation pattern is valid"));

/// Default preview length for source excerpts.
pub const DEFAULT_EXCERPT_CHARS: usize = 100;

/// A piece of scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Citation { number: u32, raw: &'a str },
}

/// A piece of text with citations bound to their sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Annotated<'a> {
    Text(&'a str),
    Citation { number: u32, source: &'a Source },
}

/// Split text into plain and citation segments.
///
/// Markers whose number does not fit a `u32` stay in the surrounding text.
pub fn segments(text: &str) -> Vec<Segment<'_>> {
    split(text, |_| Some(()))
        .into_iter()
        .map(|piece| match piece {
            Piece::Text(t) => Segment::Text(t),
            Piece::Cite { number, raw, .. } => Segment::Citation { number, raw },
        })
        .collect()
}

/// Split text and bind each marker to the source whose id is its number.
///
/// Markers without a matching source render as their literal text.
pub fn annotate<'a>(text: &'a str, sources: &'a [Source]) -> Vec<Annotated<'a>> {
    split(text, |n| find_source(sources, n))
        .into_iter()
        .map(|piece| match piece {
            Piece::Text(t) => Annotated::Text(t),
            Piece::Cite { number, value, .. } => Annotated::Citation {
                number,
                source: value,
            },
        })
        .collect()
}

/// Every marker in order, with its bound source if any.
pub fn citations<'a>(text: &str, sources: &'a [Source]) -> Vec<(u32, Option<&'a Source>)> {
    segments(text)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Citation { number, .. } => Some((number, find_source(sources, number))),
            Segment::Text(_) => None,
        })
        .collect()
}

/// Distinct cited sources, in order of first citation.
pub fn cited_sources<'a>(text: &str, sources: &'a [Source]) -> Vec<&'a Source> {
    let mut cited: Vec<&Source> = Vec::new();
    for (_, source) in citations(text, sources) {
        if let Some(source) = source
            && !cited.iter().any(|s| s.id == source.id)
        {
            cited.push(source);
        }
    }
    cited
}

/// Shorten an excerpt for previews, appending `...` when cut.
pub fn truncate_excerpt(excerpt: &str, max_chars: usize) -> String {
    if excerpt.chars().count() <= max_chars {
        return excerpt.to_string();
    }
    let cut: String = excerpt.chars().take(max_chars).collect();
    format!("{}...", cut.trim())
}

fn find_source(sources: &[Source], number: u32) -> Option<&Source> {
    sources.iter().find(|s| s.matches_citation(number))
}

enum Piece<'a, T> {
    Text(&'a str),
    Cite { number: u32, raw: &'a str, value: T },
}

/// Cut `text` at every marker `bind` accepts; everything else is text.
fn split<'a, T>(text: &'a str, mut bind: impl FnMut(u32) -> Option<T>) -> Vec<Piece<'a, T>> {
    let mut pieces = Vec::new();
    let mut text_start = 0;

    for caps in CITATION_RE.captures_iter(text) {
        let (Some(whole), Some(digits)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Ok(number) = digits.as_str().parse::<u32>() else {
            continue;
        };
        let Some(value) = bind(number) else {
            continue;
        };

        if whole.start() > text_start {
            pieces.push(Piece::Text(&text[text_start..whole.start()]));
        }
        pieces.push(Piece::Cite {
            number,
            raw: whole.as_str(),
            value,
        });
        text_start = whole.end();
    }

    if text_start < text.len() {
        pieces.push(Piece::Text(&text[text_start..]));
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempo_types::SourceType;

    fn sources() -> Vec<Source> {
        vec![
            Source::new("1", SourceType::Law, "Tenancy Act", "Ch. 12 § 4"),
            Source::new("2", SourceType::Document, "Lease agreement", "Clause 7"),
        ]
    }

    #[test]
    fn test_segments_split_markers() {
        assert_eq!(
            segments("See [1] and [2]."),
            vec![
                Segment::Text("See "),
                Segment::Citation { number: 1, raw: "[1]" },
                Segment::Text(" and "),
                Segment::Citation { number: 2, raw: "[2]" },
                Segment::Text("."),
            ]
        );
    }

    #[test]
    fn test_annotate_binds_by_id() {
        let sources = sources();
        let parts = annotate("See [1] and [2].", &sources);
        assert_eq!(parts.len(), 5);
        assert_eq!(
            parts[1],
            Annotated::Citation {
                number: 1,
                source: &sources[0]
            }
        );
        assert_eq!(
            parts[3],
            Annotated::Citation {
                number: 2,
                source: &sources[1]
            }
        );
    }

    #[test]
    fn test_binding_ignores_array_position() {
        let sources = vec![Source::new("2", SourceType::Web, "Guide", "example.org")];
        let parts = annotate("[1] [2]", &sources);
        assert_eq!(
            parts,
            vec![
                Annotated::Text("[1] "),
                Annotated::Citation {
                    number: 2,
                    source: &sources[0]
                },
            ]
        );
    }

    #[test]
    fn test_unbound_citation_is_literal() {
        let sources = sources();
        assert_eq!(annotate("See [9].", &sources), vec![Annotated::Text("See [9].")]);
    }

    #[test]
    fn test_unterminated_marker_is_text() {
        assert_eq!(segments("as stated in [2"), vec![Segment::Text("as stated in [2")]);
        assert_eq!(segments("[]"), vec![Segment::Text("[]")]);
    }

    #[test]
    fn test_overflowing_number_is_text() {
        let text = "See [99999999999].";
        assert_eq!(segments(text), vec![Segment::Text(text)]);
    }

    #[test]
    fn test_citations_report_missing_sources() {
        let sources = sources();
        let found = citations("[2] then [5] then [1]", &sources);
        let numbers: Vec<_> = found.iter().map(|(n, s)| (*n, s.is_some())).collect();
        assert_eq!(numbers, vec![(2, true), (5, false), (1, true)]);
    }

    #[test]
    fn test_cited_sources_first_citation_order() {
        let sources = sources();
        let cited = cited_sources("[2] [1] [2] [7]", &sources);
        let ids: Vec<_> = cited.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[test]
    fn test_truncate_excerpt() {
        assert_eq!(truncate_excerpt("short", DEFAULT_EXCERPT_CHARS), "short");
        assert_eq!(truncate_excerpt("The tenant may  terminate", 15), "The tenant may...");
    }

    proptest! {
        #[test]
        fn prop_segments_reassemble_text(text in "[a-z \\[\\]0-9.]{0,60}") {
            let joined: String = segments(&text)
                .iter()
                .map(|s| match s {
                    Segment::Text(t) => *t,
                    Segment::Citation { raw, .. } => *raw,
                })
                .collect();
            prop_assert_eq!(joined, text);
        }
    }
}
