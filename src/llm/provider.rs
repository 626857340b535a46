//! The model-call capability consumed by the AI analyzer.

use async_trait::async_trait;

use crate::error::LlmError;

/// An injected "model call" capability: prompt text in, completion text out.
///
/// This is the only seam between the scoring core and any LLM provider.
/// Implementations may fail with any [`LlmError`]; the analyzer treats every
/// failure uniformly as "AI analysis unavailable". Tests substitute mocks.
#[async_trait]
pub trait ModelCall: Send + Sync {
    /// Send a prompt and return the raw completion text.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;

    /// Model identifier for logging.
    fn model_name(&self) -> &str {
        "unknown"
    }
}
