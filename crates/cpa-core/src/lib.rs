//! `cpa-core` — contextual page action aggregation core.
//!
//! Decides which single contextual action (price tracking, reader mode,
//! price insights, discounts, tab grouping) to offer for the currently
//! displayed page. Independent providers compute boolean applicability
//! signals asynchronously; a per-cycle [`SignalAccumulator`] collects them
//! against a bounded timeout and completes exactly once; the
//! [`Orchestrator`] feeds the finished signal set to an external
//! [`ActionScorer`] and, if the page is still the one being observed,
//! dispatches the winner to every provider and to the [`ActionSink`].
//!
//! # Architecture
//!
//! ```text
//! PageEvent (paint / activate / destroy)
//!     │
//!     ▼
//! Orchestrator          Idle → Collecting → Scoring → Dispatched
//!     │
//!     ▼
//! SignalAccumulator     fan-out to providers, 100 ms timer race,
//!     │                 exactly-once completion
//!     ▼
//! ActionScorer          external: feature vector → chosen action
//!     │
//!     ▼
//! providers + ActionSink (only if the page is still current)
//! ```
//!
//! Providers are untrusted with respect to timing: one hung backend must not
//! block the rest, so any slot still unset when the timer fires reads as
//! `false`. In the worst case (every provider slow, scoring never returns)
//! the page simply shows no contextual action.

pub mod accumulator;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod page;
pub mod provider;
pub mod scoring;
pub mod signals;
pub mod types;

pub use accumulator::{SignalAccumulator, SignalReporter};
pub use config::OrchestratorConfig;
pub use error::{CpaError, Result};
pub use orchestrator::{CycleStage, DispatchedOutcome, Orchestrator};
pub use page::{PageContext, PageHandle};
pub use provider::{ActionProvider, ProviderRegistry};
pub use scoring::{ActionScorer, ActionSink, FeatureVector, ScoringRequest};
pub use signals::{SignalSet, SignalState};
pub use types::{ActionType, PageEvent, PageId};
