use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use phishscan::config::DetectorConfig;
use phishscan::email::EmailMessage;
use phishscan::llm::{LlmBackend, LlmConfig, RetryPolicy, RetryingModel, create_model};
use phishscan::PhishingDetector;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // Backend selection follows whichever API key is present.
    let (backend, api_key) = if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
        (LlmBackend::Anthropic, key)
    } else if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        (LlmBackend::OpenAi, key)
    } else {
        eprintln!("Error: neither ANTHROPIC_API_KEY nor OPENAI_API_KEY is set");
        eprintln!("  export ANTHROPIC_API_KEY=sk-ant-...");
        std::process::exit(1);
    };

    let model_name = std::env::var("PHISHSCAN_MODEL").unwrap_or_else(|_| match backend {
        LlmBackend::Anthropic => "claude-sonnet-4-20250514".to_string(),
        LlmBackend::OpenAi => "gpt-4o".to_string(),
    });

    let timeout_secs: u64 = std::env::var("PHISHSCAN_TIMEOUT_SECS")
        .unwrap_or_else(|_| "30".to_string())
        .parse()
        .unwrap_or(30);

    // Read the raw message from the argument path, or stdin if absent/"-".
    let path = std::env::args().nth(1);
    let raw = match path.as_deref() {
        Some("-") | None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            buf
        }
        Some(path) => std::fs::read(path)?,
    };
    let email = EmailMessage::from_rfc822(&raw)?;

    let llm_config = LlmConfig {
        backend,
        api_key: secrecy::SecretString::from(api_key),
        model: model_name,
    };
    let model = create_model(&llm_config)?;
    let model = Arc::new(RetryingModel::new(model, RetryPolicy::default()));

    let detector = PhishingDetector::new(
        model,
        DetectorConfig {
            model_timeout: Duration::from_secs(timeout_secs),
        },
    );

    let report = detector.analyze(&email).await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
