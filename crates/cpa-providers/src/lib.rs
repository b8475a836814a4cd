//! `cpa-providers` — concrete contextual action providers.
//!
//! Each provider implements [`cpa_core::ActionProvider`] for one action type
//! and keeps its domain backend behind an injected trait so hosts (and
//! tests) decide where the data actually comes from. The one obligation
//! every provider honors: report through the [`cpa_core::SignalReporter`] on
//! every control path — early-exit guards included — or knowingly let the
//! slot degrade to `false` at the accumulator timeout (the superseded-reply
//! case).

use std::sync::Arc;

use cpa_core::{ActionProvider, ActionType};

pub mod discounts;
pub mod price_insights;
pub mod price_tracking;
pub mod reader_mode;
pub mod tab_grouping;

pub use discounts::{Discount, DiscountsBackend, DiscountsProvider};
pub use price_insights::{PriceInsights, PriceInsightsBackend, PriceInsightsProvider};
pub use price_tracking::{PriceTrackingProvider, ShoppingBackend};
pub use reader_mode::ReaderModeProvider;
pub use tab_grouping::{TabGroupingProvider, TabModel};

/// Contextual actions only ever apply to ordinary web pages; chrome://,
/// about:, file: and friends early-exit with a `false` report.
pub(crate) fn has_web_scheme(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Assemble the full provider set for a registry build.
pub fn all_providers(
    shopping: Arc<dyn ShoppingBackend>,
    distillability: tokio::sync::watch::Receiver<Option<bool>>,
    insights: Arc<dyn PriceInsightsBackend>,
    discounts: Arc<dyn DiscountsBackend>,
    tabs: Arc<dyn TabModel>,
) -> Vec<(ActionType, Arc<dyn ActionProvider>)> {
    vec![
        (
            ActionType::PriceTracking,
            Arc::new(PriceTrackingProvider::new(shopping)),
        ),
        (
            ActionType::ReaderMode,
            Arc::new(ReaderModeProvider::new(distillability)),
        ),
        (
            ActionType::PriceInsights,
            Arc::new(PriceInsightsProvider::new(insights)),
        ),
        (
            ActionType::Discounts,
            Arc::new(DiscountsProvider::new(discounts)),
        ),
        (
            ActionType::TabGrouping,
            Arc::new(TabGroupingProvider::new(tabs)),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn web_scheme_guard() {
        assert!(has_web_scheme("https://example.com"));
        assert!(has_web_scheme("http://example.com"));
        assert!(!has_web_scheme("chrome://settings"));
        assert!(!has_web_scheme("about:blank"));
        assert!(!has_web_scheme("file:///tmp/page.html"));
    }
}
