//! Paced streaming engine for assistant responses.
//!
//! Decouples the rate at which response text is delivered from the rate at
//! which it is shown:
//!
//! - [`feed`]: cumulative, prefix-stable source feeds
//! - [`pacer`]: frame-driven character reveal
//! - [`citations`]: `[n]` markers bound to sources
//! - [`sequencer`]: narrated work phases before content exists
//! - [`scroll`]: viewport following for growing content
//! - [`engine`]: turns tying it all to the conversation store

pub mod citations;
pub mod classifier;
pub mod config;
pub mod dispose;
pub mod engine;
pub mod error;
pub mod feed;
pub mod pacer;
pub mod responder;
pub mod scroll;
pub mod sequencer;
pub mod store;
pub mod text;

pub use citations::{Annotated, Segment, annotate, cited_sources, segments, truncate_excerpt};
pub use classifier::Classifier;
pub use config::{EngineConfig, FeedConfig, PacerConfig, ScrollConfig, SequencerConfig};
pub use dispose::{CompositeDisposer, Disposer};
pub use engine::{ChatEngine, EngineEvent, MessageView, Notice, TurnEvent, TurnId};
pub use error::{EngineError, Result};
pub use feed::{
    DeltaFeed, FeedEvent, FeedStatus, FeedStream, PrefixGuard, ReplayFeed, SimulatedFeed,
    SourceFeed,
};
pub use pacer::RevealPacer;
pub use responder::{Request, Responder, Response, ScriptedResponder};
pub use scroll::{ScrollCommand, ScrollFollower, Viewport};
pub use sequencer::{PhaseEvent, PhasePlan, TaskBoard, spawn_sequence};
pub use store::ConversationStore;
