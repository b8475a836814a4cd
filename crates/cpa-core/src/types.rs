use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ActionType
// ---------------------------------------------------------------------------

/// The closed set of contextual actions a page can surface.
///
/// One signal slot exists per variant; the set never changes during a
/// collection cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    PriceTracking,
    ReaderMode,
    PriceInsights,
    Discounts,
    TabGrouping,
}

impl ActionType {
    pub fn all() -> &'static [ActionType] {
        &[
            ActionType::PriceTracking,
            ActionType::ReaderMode,
            ActionType::PriceInsights,
            ActionType::Discounts,
            ActionType::TabGrouping,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::PriceTracking => "price_tracking",
            ActionType::ReaderMode => "reader_mode",
            ActionType::PriceInsights => "price_insights",
            ActionType::Discounts => "discounts",
            ActionType::TabGrouping => "tab_grouping",
        }
    }

    /// Key under which this action's signal appears in the feature vector.
    pub fn feature_key(self) -> String {
        format!("can_{}", self.as_str())
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PageId
// ---------------------------------------------------------------------------

/// Identity of one observed page view. Two navigations to the same URL get
/// distinct ids; staleness checks compare ids, never URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId(Uuid);

impl PageId {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        PageId(Uuid::new_v4())
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// PageEvent
// ---------------------------------------------------------------------------

/// Page lifecycle events delivered by the page/context source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEvent {
    /// First meaningful content rendered — the usual cycle trigger.
    FirstMeaningfulPaint,
    /// An already-settled page became the active one (e.g. tab switch).
    Activated,
    /// The page is no longer the one being observed.
    Deactivated,
    /// The page is gone; any in-flight cycle result must be discarded.
    Destroyed,
}
