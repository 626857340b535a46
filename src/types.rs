//! Shared types for the analysis pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Threat indicators ───────────────────────────────────────────────

/// Broad class of phishing signal an indicator belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatCategory {
    /// Urgency phrases, emotional triggers, pressure tactics in the text.
    LinguisticManipulation,
    /// Suspicious links, sender/domain mismatches, unusual routing headers.
    TechnicalIndicator,
    /// Authority impersonation, fear framing, credential/payment requests.
    SocialEngineering,
}

impl ThreatCategory {
    /// Short label for logging and rationale text.
    pub fn label(&self) -> &'static str {
        match self {
            Self::LinguisticManipulation => "linguistic manipulation",
            Self::TechnicalIndicator => "technical indicator",
            Self::SocialEngineering => "social engineering",
        }
    }
}

/// Which analysis stage produced an indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorSource {
    RuleBased,
    AiAnalysis,
}

/// A single matched threat signal.
///
/// Immutable once created. Indicators are aggregated in detection order;
/// duplicates across sources are allowed (no dedup guarantee).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatIndicator {
    pub category: ThreatCategory,
    pub description: String,
    pub source: IndicatorSource,
    /// Contribution weight in [0, 1].
    pub weight: f32,
}

// ── Stage results ───────────────────────────────────────────────────

/// Output of the rule-based feature extractor.
///
/// `score` is the capped weight-sum of matched rules, always in [0, 1].
/// All indicators carry `source = RuleBased`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleBasedResult {
    pub score: f32,
    pub indicators: Vec<ThreatIndicator>,
}

impl RuleBasedResult {
    /// Result for an email with no rule matches.
    pub fn empty() -> Self {
        Self {
            score: 0.0,
            indicators: Vec::new(),
        }
    }
}

/// Validated verdict parsed from the LLM's JSON response.
///
/// Absence (the analyzer returning `None`) means "AI analysis unavailable" —
/// not a zero score. All indicators carry `source = AiAnalysis`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiAnalysisResult {
    /// Model-reported risk score, clamped to [0, 1].
    pub score: f32,
    /// Model-reported confidence in its own verdict, clamped to [0, 1].
    pub confidence: f32,
    pub indicators: Vec<ThreatIndicator>,
    /// Free-text explanation from the model. Empty if the model omitted it.
    pub rationale: String,
}

// ── Final report ────────────────────────────────────────────────────

/// Risk band for a fused score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Map a fused score to its band: [0, 0.3) Low, [0.3, 0.6) Medium,
    /// [0.6, 1.0] High.
    pub fn from_score(score: f32) -> Self {
        if score < 0.3 {
            Self::Low
        } else if score < 0.6 {
            Self::Medium
        } else {
            Self::High
        }
    }

    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Final fused verdict returned to the caller.
///
/// Indicator order is stable: rule-based indicators first (detection order),
/// then AI-reported indicators (response order).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskReport {
    pub final_score: f32,
    pub risk_level: RiskLevel,
    pub indicators: Vec<ThreatIndicator>,
    pub rationale: String,
    pub analyzed_at: DateTime<Utc>,
}
