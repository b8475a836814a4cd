//! Scoring and presentation boundaries.
//!
//! The core never picks the winning action itself: it builds a
//! [`ScoringRequest`] out of the finished signal set and hands it to an
//! [`ActionScorer`]. Any transport works — in-process model, IPC, network —
//! as long as the call is asynchronous; results that come back for a stale
//! page are simply ignored by the orchestrator.

use std::collections::BTreeMap;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::signals::SignalSet;
use crate::types::ActionType;

// ---------------------------------------------------------------------------
// FeatureVector
// ---------------------------------------------------------------------------

/// Numeric encoding of one cycle's signal set: one `1.0`/`0.0` entry per
/// signal slot, keyed by [`ActionType::feature_key`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub features: BTreeMap<String, f64>,
}

impl FeatureVector {
    pub fn from_signals(signals: &SignalSet) -> Self {
        FeatureVector {
            features: signals
                .actions()
                .map(|action| {
                    let value = if signals.get(action) { 1.0 } else { 0.0 };
                    (action.feature_key(), value)
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// ScoringRequest
// ---------------------------------------------------------------------------

/// Everything the external scorer gets to see: the encoded signals plus
/// contextual features of the page the cycle ran for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringRequest {
    /// Last committed address of the originating page.
    pub url: String,
    pub features: FeatureVector,
}

// ---------------------------------------------------------------------------
// ActionScorer
// ---------------------------------------------------------------------------

/// External scoring/segmentation service boundary.
///
/// `None` means "no contextual action for this page" and is always a valid,
/// safe outcome. The orchestrator never retries a failed or hung score; the
/// page simply keeps its default behavior for this view.
pub trait ActionScorer: Send + Sync {
    fn score(&self, request: ScoringRequest) -> BoxFuture<'static, Result<Option<ActionType>>>;
}

// ---------------------------------------------------------------------------
// ActionSink
// ---------------------------------------------------------------------------

/// Presentation boundary: receives the chosen action once per completed,
/// non-stale cycle. No feedback path exists back into the core.
pub trait ActionSink: Send + Sync {
    fn show_action(&self, action: Option<ActionType>);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
