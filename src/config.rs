//! Configuration types.

use std::time::Duration;

/// Detector configuration.
///
/// Fusion weights and risk bands are fixed constants of the scoring
/// contract, not configuration — only the transport-facing knobs live here.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Deadline for a single model call; after this the AI verdict is
    /// treated as unavailable.
    pub model_timeout: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_timeout: Duration::from_secs(30),
        }
    }
}
