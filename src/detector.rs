//! Orchestrator — sequences extraction, AI analysis, and fusion.
//!
//! The only stage that can fail is the model call, and the analyzer already
//! downgrades every failure to "AI analysis unavailable", so `analyze`
//! always returns a report.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::analyzer::AiAnalyzer;
use crate::config::DetectorConfig;
use crate::email::EmailMessage;
use crate::fusion::fuse;
use crate::llm::ModelCall;
use crate::rules::RuleEngine;
use crate::types::RiskReport;

/// Hybrid phishing detector: rule-based scan + LLM verdict + fusion.
pub struct PhishingDetector {
    rules: RuleEngine,
    analyzer: AiAnalyzer,
}

impl PhishingDetector {
    /// Create a detector with the default rule catalog.
    pub fn new(model: Arc<dyn ModelCall>, config: DetectorConfig) -> Self {
        Self::with_rules(model, config, RuleEngine::default_rules())
    }

    /// Create a detector with a custom rule engine.
    pub fn with_rules(
        model: Arc<dyn ModelCall>,
        config: DetectorConfig,
        rules: RuleEngine,
    ) -> Self {
        Self {
            rules,
            analyzer: AiAnalyzer::new(model, config.model_timeout),
        }
    }

    /// Run the full pipeline on one email.
    ///
    /// Analyses of different emails share no mutable state, so a single
    /// detector can serve concurrent callers.
    pub async fn analyze(&self, email: &EmailMessage) -> RiskReport {
        info!(sender = %email.sender_address(), "Analyzing email");

        let rule = self.rules.extract(email);
        debug!(
            rule_score = rule.score,
            rule_indicators = rule.indicators.len(),
            "Rule-based extraction complete"
        );

        let ai = self.analyzer.analyze(email).await;
        if ai.is_none() {
            info!("AI analysis unavailable, degrading to rule-based-only scoring");
        }

        let report = fuse(&rule, ai.as_ref());
        info!(
            final_score = report.final_score,
            risk_level = report.risk_level.label(),
            indicators = report.indicators.len(),
            "Analysis complete"
        );
        report
    }
}

/// One-shot entry point: analyze a single email with an injected model call
/// and timeout, using the default rule catalog.
pub async fn analyze_email(
    email: &EmailMessage,
    model: Arc<dyn ModelCall>,
    timeout: Duration,
) -> RiskReport {
    let detector = PhishingDetector::new(model, DetectorConfig { model_timeout: timeout });
    detector.analyze(email).await
}
