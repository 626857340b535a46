//! Score fusion — blends the rule-based and AI signals into one verdict.
//!
//! Pure and total: any rule result plus any optional AI result produces a
//! report. With an AI verdict present, the blend is weighted 30/70 toward
//! the model, then damped by the model's own confidence — low confidence
//! pulls the blended score toward zero instead of discarding the signal.
//! With no AI verdict, the rule score stands alone.

use chrono::Utc;

use crate::types::{AiAnalysisResult, RiskLevel, RiskReport, RuleBasedResult, ThreatCategory};

/// Blend weight of the rule-based score.
pub const RULE_WEIGHT: f32 = 0.3;

/// Blend weight of the AI score.
pub const AI_WEIGHT: f32 = 0.7;

/// Fuse both signals into the final report.
///
/// Indicator order is stable: rule-based first (detection order), then AI
/// (response order); no deduplication across sources.
pub fn fuse(rule: &RuleBasedResult, ai: Option<&AiAnalysisResult>) -> RiskReport {
    let final_score = match ai {
        Some(ai) => {
            let blended = RULE_WEIGHT * rule.score + AI_WEIGHT * ai.score;
            (blended * (0.5 + 0.5 * ai.confidence)).clamp(0.0, 1.0)
        }
        None => rule.score,
    };

    let mut indicators = rule.indicators.clone();
    if let Some(ai) = ai {
        indicators.extend(ai.indicators.iter().cloned());
    }

    let mut rationale = rule_summary(rule);
    match ai {
        Some(ai) if !ai.rationale.is_empty() => {
            rationale.push(' ');
            rationale.push_str(&ai.rationale);
        }
        Some(_) => {}
        None => {
            rationale.push_str(" AI analysis unavailable; score reflects rule-based signals only.");
        }
    }

    RiskReport {
        final_score,
        risk_level: RiskLevel::from_score(final_score),
        indicators,
        rationale,
        analyzed_at: Utc::now(),
    }
}

/// One-sentence summary of the rule-based stage: match count plus the
/// distinct categories in first-seen order.
fn rule_summary(rule: &RuleBasedResult) -> String {
    if rule.indicators.is_empty() {
        return "No rule-based indicators matched.".to_string();
    }

    let mut categories: Vec<ThreatCategory> = Vec::new();
    for indicator in &rule.indicators {
        if !categories.contains(&indicator.category) {
            categories.push(indicator.category);
        }
    }
    let category_list = categories
        .iter()
        .map(|c| c.label())
        .collect::<Vec<_>>()
        .join(", ");

    let noun = if rule.indicators.len() == 1 {
        "indicator"
    } else {
        "indicators"
    };
    format!(
        "{} rule-based {} matched ({}).",
        rule.indicators.len(),
        noun,
        category_list
    )
}
