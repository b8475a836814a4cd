use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// OrchestratorConfig
// ---------------------------------------------------------------------------

/// Tunables for the orchestration core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// How long the accumulator waits for provider signals before completing
    /// with partial data.
    #[serde(default = "default_signal_timeout_ms")]
    pub signal_timeout_ms: u64,
}

fn default_signal_timeout_ms() -> u64 {
    100
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            signal_timeout_ms: default_signal_timeout_ms(),
        }
    }
}

impl OrchestratorConfig {
    pub fn signal_timeout(&self) -> Duration {
        Duration::from_millis(self.signal_timeout_ms)
    }
}
