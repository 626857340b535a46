//! AI analysis client — prompts the model and validates its JSON verdict.
//!
//! The model is an injected [`ModelCall`] capability. Every failure mode
//! (timeout, provider error, rate limit, unusable JSON) downgrades to `None`,
//! meaning "AI analysis unavailable" — never an error. The fusion stage
//! treats `None` as absence, not as a zero score.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::email::EmailMessage;
use crate::llm::ModelCall;
use crate::types::{AiAnalysisResult, IndicatorSource, ThreatCategory, ThreatIndicator};

/// Default weight for an AI indicator that doesn't report one.
const DEFAULT_INDICATOR_WEIGHT: f32 = 0.5;

/// Body characters included in the prompt (kept bounded for token cost).
const BODY_PROMPT_CHARS: usize = 4000;

/// Semantic analysis of an email via an LLM.
pub struct AiAnalyzer {
    model: Arc<dyn ModelCall>,
    timeout: Duration,
}

impl AiAnalyzer {
    pub fn new(model: Arc<dyn ModelCall>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    /// Ask the model for a structured phishing verdict.
    ///
    /// Returns `None` when the call times out, the provider fails, or the
    /// response yields no usable JSON object.
    pub async fn analyze(&self, email: &EmailMessage) -> Option<AiAnalysisResult> {
        let prompt = build_analysis_prompt(email);

        let raw = match tokio::time::timeout(self.timeout, self.model.complete(&prompt)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                warn!(model = self.model.model_name(), error = %e, "Model call failed");
                return None;
            }
            Err(_) => {
                warn!(
                    model = self.model.model_name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Model call timed out"
                );
                return None;
            }
        };

        match parse_ai_response(&raw) {
            Some(result) => {
                debug!(
                    score = result.score,
                    confidence = result.confidence,
                    indicators = result.indicators.len(),
                    "AI analysis parsed"
                );
                Some(result)
            }
            None => {
                let preview: String = raw.chars().take(200).collect();
                warn!(raw_response = %preview, "Unusable AI response, discarding");
                None
            }
        }
    }
}

// ── Prompt construction ─────────────────────────────────────────────

/// Build the analysis prompt with an explicit JSON schema request.
fn build_analysis_prompt(email: &EmailMessage) -> String {
    let mut prompt = String::with_capacity(1024);

    prompt.push_str(
        "Analyze this email for phishing attempts. Respond with ONLY a JSON object:\n\
         {\n\
           \"score\": <float 0-1, overall phishing risk>,\n\
           \"confidence\": <float 0-1, your confidence in the verdict>,\n\
           \"indicators\": [{\"category\": \"linguistic_manipulation\" | \"technical_indicator\" | \"social_engineering\", \"description\": \"...\", \"weight\": <float 0-1>}],\n\
           \"rationale\": \"<short explanation>\"\n\
         }\n\n\
         Consider:\n\
         1. Linguistic patterns and urgency\n\
         2. Technical indicators (links, headers, sender address)\n\
         3. Social engineering tactics\n\
         4. Credential harvesting attempts\n\n",
    );

    prompt.push_str(&format!("From: {}\n", email.sender));
    if !email.subject.is_empty() {
        prompt.push_str(&format!("Subject: {}\n", email.subject));
    }
    if let Some(reply_to) = email.header("Reply-To") {
        prompt.push_str(&format!("Reply-To: {}\n", reply_to));
    }

    let body_preview: String = email.body.chars().take(BODY_PROMPT_CHARS).collect();
    prompt.push_str(&format!("\nEmail body:\n{}", body_preview));

    prompt
}

// ── Response parsing ────────────────────────────────────────────────

/// Parse and validate the model's raw text into an [`AiAnalysisResult`].
///
/// Accepts the field aliases the prompt's schema evolved from
/// (`risk_score`, `threat_indicators`, `reasoning`). `score` and
/// `confidence` must both parse as numbers; anything else is repaired or
/// dropped rather than rejected.
fn parse_ai_response(raw: &str) -> Option<AiAnalysisResult> {
    let json_str = extract_json_object(raw);
    let value: Value = serde_json::from_str(&json_str).ok()?;
    let obj = value.as_object()?;

    let score = number_field(obj, &["score", "risk_score"])?;
    let confidence = number_field(obj, &["confidence"])?;

    let indicators = obj
        .get("indicators")
        .or_else(|| obj.get("threat_indicators"))
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_indicator).collect())
        .unwrap_or_default();

    let rationale = obj
        .get("rationale")
        .or_else(|| obj.get("reasoning"))
        .map(text_or_joined_list)
        .unwrap_or_default();

    Some(AiAnalysisResult {
        score: score.clamp(0.0, 1.0),
        confidence: confidence.clamp(0.0, 1.0),
        indicators,
        rationale,
    })
}

/// Read the first present key as an f32.
fn number_field(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<f32> {
    keys.iter()
        .find_map(|key| obj.get(*key))
        .and_then(Value::as_f64)
        .map(|n| n as f32)
}

/// A rationale may arrive as a string or a list of strings.
fn text_or_joined_list(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("; "),
        _ => String::new(),
    }
}

/// Map one reported indicator (object or bare string) to a typed indicator.
///
/// Unrecognized categories are inferred from the description text or the
/// indicator is dropped — never fatal.
fn parse_indicator(value: &Value) -> Option<ThreatIndicator> {
    let (category_text, description, weight) = match value {
        Value::String(s) => (None, s.clone(), None),
        Value::Object(obj) => {
            let description = obj.get("description").and_then(Value::as_str)?.to_string();
            let category = obj.get("category").and_then(Value::as_str);
            let weight = obj.get("weight").and_then(Value::as_f64).map(|w| w as f32);
            (category, description, weight)
        }
        _ => return None,
    };

    let category = category_text
        .and_then(map_category)
        .or_else(|| map_category(&description))?;

    Some(ThreatIndicator {
        category,
        description,
        source: IndicatorSource::AiAnalysis,
        weight: weight.unwrap_or(DEFAULT_INDICATOR_WEIGHT).clamp(0.0, 1.0),
    })
}

/// Fuzzy-map a category string to the closest enum value.
fn map_category(raw: &str) -> Option<ThreatCategory> {
    let s = raw.to_lowercase();
    if ["linguistic", "language", "urgency", "manipulation", "emotional"]
        .iter()
        .any(|k| s.contains(k))
    {
        Some(ThreatCategory::LinguisticManipulation)
    } else if ["technical", "link", "url", "header", "domain", "sender"]
        .iter()
        .any(|k| s.contains(k))
    {
        Some(ThreatCategory::TechnicalIndicator)
    } else if ["social", "engineering", "impersonation", "credential", "phishing"]
        .iter()
        .any(|k| s.contains(k))
    {
        Some(ThreatCategory::SocialEngineering)
    } else {
        None
    }
}

/// Extract a JSON object from model output (handles prose and markdown
/// wrapping).
fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    // Already a JSON object
    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    // Wrapped in a markdown code block
    for fence in ["```json", "```"] {
        if let Some(start) = trimmed.find(fence) {
            let after = &trimmed[start + fence.len()..];
            if let Some(end) = after.find("```") {
                let inner = after[..end].trim();
                if inner.starts_with('{') {
                    return inner.to_string();
                }
            }
        }
    }

    // First object-shaped substring embedded in prose
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}
