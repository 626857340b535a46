//! LLM backends for phishscan.
//!
//! Supports:
//! - **Anthropic**: Direct API access via rig-core
//! - **OpenAI**: Direct API access via rig-core
//!
//! Uses the rig-core crate for HTTP transport and a thin adapter bridging
//! rig agents to the crate's [`ModelCall`] capability trait. The scoring
//! core only ever sees `Arc<dyn ModelCall>`, so tests run against mocks and
//! never touch this module.

pub mod provider;
pub mod retry;

pub use provider::ModelCall;
pub use retry::{RetryPolicy, RetryingModel};

use std::sync::Arc;

use rig::agent::Agent;
use rig::client::CompletionClient;
use rig::completion::{CompletionModel, Prompt};
use secrecy::ExposeSecret;

use crate::error::LlmError;

/// System preamble sent with every analysis prompt.
const SYSTEM_PREAMBLE: &str =
    "You are a cybersecurity expert. Provide analysis in valid JSON format only.";

/// Temperature for analysis calls (deterministic-ish).
const ANALYSIS_TEMPERATURE: f64 = 0.1;

/// Max tokens for the analysis completion.
const ANALYSIS_MAX_TOKENS: u64 = 1024;

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Anthropic,
    OpenAi,
}

/// Configuration for creating an LLM-backed model call.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: secrecy::SecretString,
    pub model: String,
}

/// Create a model-call capability from configuration.
pub fn create_model(config: &LlmConfig) -> Result<Arc<dyn ModelCall>, LlmError> {
    match config.backend {
        LlmBackend::Anthropic => create_anthropic_model(config),
        LlmBackend::OpenAi => create_openai_model(config),
    }
}

fn create_anthropic_model(config: &LlmConfig) -> Result<Arc<dyn ModelCall>, LlmError> {
    use rig::providers::anthropic;

    let client: rig::client::Client<anthropic::client::AnthropicExt> =
        anthropic::Client::new(config.api_key.expose_secret()).map_err(|e| {
            LlmError::RequestFailed {
                provider: "anthropic".to_string(),
                reason: format!("Failed to create Anthropic client: {}", e),
            }
        })?;

    let agent = client
        .agent(&config.model)
        .preamble(SYSTEM_PREAMBLE)
        .temperature(ANALYSIS_TEMPERATURE)
        .max_tokens(ANALYSIS_MAX_TOKENS)
        .build();
    tracing::info!("Using Anthropic (model: {})", config.model);
    Ok(Arc::new(RigModel::new(agent, "anthropic", &config.model)))
}

fn create_openai_model(config: &LlmConfig) -> Result<Arc<dyn ModelCall>, LlmError> {
    use rig::providers::openai;

    let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
        openai::Client::new(config.api_key.expose_secret()).map_err(|e| {
            LlmError::RequestFailed {
                provider: "openai".to_string(),
                reason: format!("Failed to create OpenAI client: {}", e),
            }
        })?;

    let agent = client
        .agent(&config.model)
        .preamble(SYSTEM_PREAMBLE)
        .temperature(ANALYSIS_TEMPERATURE)
        .max_tokens(ANALYSIS_MAX_TOKENS)
        .build();
    tracing::info!("Using OpenAI (model: {})", config.model);
    Ok(Arc::new(RigModel::new(agent, "openai", &config.model)))
}

/// Bridges a rig agent to the [`ModelCall`] trait.
pub struct RigModel<M: CompletionModel> {
    agent: Agent<M>,
    provider: &'static str,
    model: String,
}

impl<M: CompletionModel> RigModel<M> {
    pub fn new(agent: Agent<M>, provider: &'static str, model: &str) -> Self {
        Self {
            agent,
            provider,
            model: model.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl<M: CompletionModel> ModelCall for RigModel<M> {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.agent
            .prompt(prompt)
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: self.provider.to_string(),
                reason: e.to_string(),
            })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
