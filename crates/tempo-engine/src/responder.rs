//! Responders supply the feed and sources for a turn.

use tempo_types::{Confidence, QueryCategory, Source, SourceType};

use crate::config::FeedConfig;
use crate::feed::{PrefixGuard, SimulatedFeed, SourceFeed};

/// What a turn is answering.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    pub text: &'a str,
    pub category: QueryCategory,
    pub attachments: &'a [String],
}

/// The response for one turn: a feed to stream and the sources it cites.
pub struct Response {
    pub feed: Box<dyn SourceFeed>,
    pub sources: Vec<Source>,
}

/// Produces responses for the engine.
pub trait Responder: Send {
    fn respond(&mut self, request: &Request<'_>) -> Response;
}

/// Answers every request with the same cited text on a simulated feed.
#[derive(Debug, Clone)]
pub struct ScriptedResponder {
    text: String,
    sources: Vec<Source>,
    feed: FeedConfig,
    fail_after: Option<usize>,
    seed: Option<u64>,
}

impl Default for ScriptedResponder {
    fn default() -> Self {
        Self::new(FeedConfig::default())
    }
}

impl ScriptedResponder {
    /// The canned tenancy answer with three sources.
    pub fn new(feed: FeedConfig) -> Self {
        Self {
            text: CANNED_ANSWER.to_string(),
            sources: canned_sources(),
            feed,
            fail_after: None,
            seed: None,
        }
    }

    /// Use a different answer and sources.
    pub fn with_answer(mut self, text: impl Into<String>, sources: Vec<Source>) -> Self {
        self.text = text.into();
        self.sources = sources;
        self
    }

    /// Make every feed fail after `chars` characters.
    pub fn with_failure_after(mut self, chars: usize) -> Self {
        self.fail_after = Some(chars);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Responder for ScriptedResponder {
    fn respond(&mut self, request: &Request<'_>) -> Response {
        tracing::debug!(category = %request.category, chars = self.text.len(), "Scripted response");
        let mut feed = SimulatedFeed::new(self.text.clone(), self.feed.clone());
        if let Some(chars) = self.fail_after {
            feed = feed.with_failure_after(chars);
        }
        if let Some(seed) = self.seed {
            feed = feed.with_seed(seed);
        }
        Response {
            feed: Box::new(PrefixGuard::new(Box::new(feed))),
            sources: self.sources.clone(),
        }
    }
}

const CANNED_ANSWER: &str = "\
Under the Tenancy Act, a tenant may terminate an open-ended lease with three \
months' notice [1]. The notice must be given in writing, and the notice period \
runs from the turn of the month following the notice.

Your lease sets out the same period in clause 7 and does not require a \
specific form [2]. The landlord, on the other hand, has to state the reason \
for termination and refer the matter to the rent tribunal if you object [1].

**In summary:**
- Notice period: 3 months, counted from the next turn of the month
- Form: written notice, preferably with a receipt
- Landlord termination requires a stated reason

Guidance from the tenants' association describes how to word the notice [3].";

fn canned_sources() -> Vec<Source> {
    vec![
        Source::new(
            "1",
            SourceType::Law,
            "Tenancy Act, chapter 12",
            "Ch. 12 § 4",
        )
        .with_excerpt(
            "A lease that runs for an indefinite period ends after notice of \
             termination. The notice period is three months for the tenant.",
        )
        .with_confidence(Confidence::High),
        Source::new(
            "2",
            SourceType::Document,
            "Lease agreement",
            "Clause 7",
        )
        .with_excerpt("The lease may be terminated by either party with three months' notice.")
        .with_page(3)
        .with_confidence(Confidence::High),
        Source::new(
            "3",
            SourceType::Web,
            "Tenants' association: giving notice",
            "Guide",
        )
        .with_url("https://example.org/tenants/notice")
        .with_confidence(Confidence::Medium),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citations::cited_sources;
    use crate::feed::FeedEvent;
    use futures::StreamExt;

    #[test]
    fn test_canned_answer_cites_every_source() {
        let sources = canned_sources();
        let cited = cited_sources(CANNED_ANSWER, &sources);
        assert_eq!(cited.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scripted_feed_delivers_answer() {
        let mut responder = ScriptedResponder::default()
            .with_answer("Short [1].", vec![])
            .with_seed(5);
        let request = Request {
            text: "hi",
            category: QueryCategory::General,
            attachments: &[],
        };
        let events: Vec<_> = responder.respond(&request).feed.into_stream().collect().await;

        assert_eq!(events.last(), Some(&FeedEvent::Finished));
        assert_eq!(
            events[events.len() - 2],
            FeedEvent::Text("Short [1].".to_string())
        );
    }
}
