//! Rule-based feature extractor.
//!
//! Scans an email against a fixed catalog of detection rules, each a
//! (pattern, category, weight) triple, plus two structural checks over the
//! sender and headers. Pure function over the input: no network, no state,
//! never fails.
//!
//! Scoring: each matched rule contributes its weight once, regardless of how
//! many substrings it matches; distinct rules matching overlapping text all
//! count (no suppression). The partial score is the weight sum capped at 1.0.

use regex::Regex;
use tracing::debug;

use crate::email::EmailMessage;
use crate::types::{IndicatorSource, RuleBasedResult, ThreatCategory, ThreatIndicator};

/// Weight of the display-name vs. sender-domain mismatch check.
const SENDER_MISMATCH_WEIGHT: f32 = 0.3;

/// Weight of the Reply-To vs. From domain mismatch check.
const REPLY_TO_MISMATCH_WEIGHT: f32 = 0.2;

/// Brand names commonly impersonated in display names.
const BRAND_KEYWORDS: &[&str] = &[
    "paypal",
    "microsoft",
    "apple",
    "amazon",
    "google",
    "netflix",
    "docusign",
    "bank",
];

/// Which email field a rule matches against.
#[derive(Debug, Clone, Copy)]
pub enum RuleField {
    Subject,
    Body,
    SubjectOrBody,
    /// Matches the addr-spec only, display name excluded.
    Sender,
}

/// A single detection rule with a compiled regex.
#[derive(Debug, Clone)]
pub struct DetectionRule {
    /// Human-readable description, reused as the indicator text.
    pub description: String,
    /// Compiled case-insensitive regex.
    pub regex: Regex,
    /// Which field to match.
    pub field: RuleField,
    pub category: ThreatCategory,
    /// Score contribution in [0, 1].
    pub weight: f32,
}

/// Rule-based scanner over email text and structure.
pub struct RuleEngine {
    rules: Vec<DetectionRule>,
    /// Domain-like token embedded in a display name, e.g. "paypal.com".
    display_domain: Regex,
}

impl RuleEngine {
    /// Create an engine with the default detection catalog.
    pub fn default_rules() -> Self {
        use ThreatCategory::*;

        let rule = |description: &str, pattern: &str, field: RuleField, category, weight| {
            DetectionRule {
                description: description.into(),
                regex: Regex::new(pattern).unwrap(),
                field,
                category,
                weight,
            }
        };

        let rules = vec![
            rule(
                "urgency phrasing",
                r"(?i)\b(urgent|immediate action|act now|immediately|right away|without delay)\b",
                RuleField::SubjectOrBody,
                LinguisticManipulation,
                0.2,
            ),
            rule(
                "deadline pressure",
                r"(?i)\b(within 24 hours|final (notice|warning)|last chance|before it'?s too late)\b",
                RuleField::SubjectOrBody,
                LinguisticManipulation,
                0.2,
            ),
            rule(
                "prize or reward bait",
                r"(?i)\b(congratulations|you('ve| have) won|winner|prize|lottery|limited[- ]time offer)\b",
                RuleField::SubjectOrBody,
                LinguisticManipulation,
                0.15,
            ),
            rule(
                "account threat or fear framing",
                r"(?i)\b(account (has been |will be )?(suspended|locked|compromised|disabled)|security alert|unauthorized (access|activity|login)|unusual (activity|sign[- ]?in))\b",
                RuleField::SubjectOrBody,
                SocialEngineering,
                0.25,
            ),
            rule(
                "verification lure",
                r"(?i)\b(verify your (account|identity|information)|confirm your (identity|account|password|details)|update your (payment|billing|account) (information|details)|validate your account)\b",
                RuleField::SubjectOrBody,
                SocialEngineering,
                0.2,
            ),
            rule(
                "credential request",
                r"(?i)\b(enter your (password|credentials|pin)|log[- ]?in credentials|one[- ]time (code|password)|verification code|social security number)\b",
                RuleField::SubjectOrBody,
                SocialEngineering,
                0.2,
            ),
            rule(
                "authority impersonation",
                r"(?i)\b(security (team|department)|it (help ?desk|department|support)|fraud (department|prevention)|account services|your bank|tax (office|authority)|customs)\b",
                RuleField::SubjectOrBody,
                SocialEngineering,
                0.2,
            ),
            rule(
                "payment pressure",
                r"(?i)\b(wire transfer|gift ?cards?|bitcoin|outstanding (payment|invoice|balance)|payment (is )?(due|overdue)|bank details)\b",
                RuleField::SubjectOrBody,
                SocialEngineering,
                0.25,
            ),
            rule(
                "IP-literal URL",
                r"https?://\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}",
                RuleField::SubjectOrBody,
                TechnicalIndicator,
                0.3,
            ),
            rule(
                "link shortener URL",
                r"(?i)https?://(www\.)?(bit\.ly|tinyurl\.com|t\.co|goo\.gl|is\.gd|cutt\.ly)/",
                RuleField::SubjectOrBody,
                TechnicalIndicator,
                0.2,
            ),
            rule(
                "punycode or userinfo URL",
                r"(?i)https?://([^\s/]*xn--[^\s]*|[^\s/@]+@[^\s]+)",
                RuleField::SubjectOrBody,
                TechnicalIndicator,
                0.25,
            ),
            rule(
                "role account on freemail domain",
                r"(?i)^(support|security|admin|billing|helpdesk)[^@]*@(gmail|yahoo|hotmail|outlook)\.",
                RuleField::Sender,
                TechnicalIndicator,
                0.2,
            ),
        ];

        Self {
            rules,
            display_domain: Regex::new(r"(?i)\b([a-z0-9][a-z0-9-]*\.(?:com|net|org|io|co|gov|edu))\b")
                .unwrap(),
        }
    }

    /// Create an empty engine (for testing).
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            display_domain: Regex::new(r"(?i)\b([a-z0-9][a-z0-9-]*\.(?:com|net|org|io|co|gov|edu))\b")
                .unwrap(),
        }
    }

    /// Add a custom detection rule.
    pub fn add_rule(
        &mut self,
        description: &str,
        pattern: &str,
        field: RuleField,
        category: ThreatCategory,
        weight: f32,
    ) -> Result<(), regex::Error> {
        self.rules.push(DetectionRule {
            description: description.into(),
            regex: Regex::new(pattern)?,
            field,
            category,
            weight: weight.clamp(0.0, 1.0),
        });
        Ok(())
    }

    /// Scan an email and return matched indicators plus the partial score.
    ///
    /// Indicator order is catalog order followed by the structural checks.
    pub fn extract(&self, email: &EmailMessage) -> RuleBasedResult {
        let mut indicators = Vec::new();

        for rule in &self.rules {
            let matched = match rule.field {
                RuleField::Subject => rule.regex.is_match(&email.subject),
                RuleField::Body => rule.regex.is_match(&email.body),
                RuleField::SubjectOrBody => {
                    rule.regex.is_match(&email.subject) || rule.regex.is_match(&email.body)
                }
                RuleField::Sender => rule.regex.is_match(email.sender_address()),
            };
            if matched {
                debug!(rule = %rule.description, "Detection rule matched");
                indicators.push(ThreatIndicator {
                    category: rule.category,
                    description: rule.description.clone(),
                    source: IndicatorSource::RuleBased,
                    weight: rule.weight,
                });
            }
        }

        if let Some(indicator) = self.check_sender_alignment(email) {
            indicators.push(indicator);
        }
        if let Some(indicator) = check_reply_to_alignment(email) {
            indicators.push(indicator);
        }

        let score = indicators
            .iter()
            .map(|i| i.weight)
            .sum::<f32>()
            .min(1.0);

        RuleBasedResult { score, indicators }
    }

    /// Flag display names that claim a brand or domain the sender address
    /// does not belong to.
    fn check_sender_alignment(&self, email: &EmailMessage) -> Option<ThreatIndicator> {
        let name = email.display_name()?.to_lowercase();
        let domain = email.sender_domain()?.to_lowercase();

        let claimed = if let Some(captures) = self.display_domain.captures(&name) {
            let token = captures.get(1)?.as_str().to_lowercase();
            (token != domain && !domain.ends_with(&format!(".{token}"))).then_some(token)
        } else {
            BRAND_KEYWORDS
                .iter()
                .find(|brand| name.contains(**brand) && !domain.contains(**brand))
                .map(|brand| brand.to_string())
        };

        claimed.map(|claimed| {
            debug!(
                display_name = %name,
                sender_domain = %domain,
                "Display name does not match sender domain"
            );
            ThreatIndicator {
                category: ThreatCategory::TechnicalIndicator,
                description: format!(
                    "display name claims '{claimed}' but sender domain is '{domain}'"
                ),
                source: IndicatorSource::RuleBased,
                weight: SENDER_MISMATCH_WEIGHT,
            }
        })
    }
}

/// Flag a Reply-To header pointing at a different domain than the sender.
fn check_reply_to_alignment(email: &EmailMessage) -> Option<ThreatIndicator> {
    let reply_to = email.header("Reply-To")?;
    let reply_domain = address_domain(reply_to)?.to_lowercase();
    let sender_domain = email.sender_domain()?.to_lowercase();

    (reply_domain != sender_domain).then(|| ThreatIndicator {
        category: ThreatCategory::TechnicalIndicator,
        description: format!(
            "Reply-To domain '{reply_domain}' differs from sender domain '{sender_domain}'"
        ),
        source: IndicatorSource::RuleBased,
        weight: REPLY_TO_MISMATCH_WEIGHT,
    })
}

/// Extract the domain from a bare address or a `Name <addr>` form.
fn address_domain(value: &str) -> Option<&str> {
    let value = value.trim();
    let addr = match (value.find('<'), value.rfind('>')) {
        (Some(start), Some(end)) if end > start => value[start + 1..end].trim(),
        _ => value,
    };
    addr.rsplit_once('@')
        .map(|(_, domain)| domain)
        .filter(|d| !d.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(subject: &str, body: &str, sender: &str) -> EmailMessage {
        EmailMessage::new(subject, body, sender)
    }

    #[test]
    fn benign_email_scores_zero() {
        let engine = RuleEngine::default_rules();
        let result = engine.extract(&email(
            "Schedule change",
            "Meeting moved to 3pm, see you then.",
            "alice@example.com",
        ));
        assert_eq!(result.score, 0.0);
        assert!(result.indicators.is_empty());
    }

    #[test]
    fn urgent_verification_with_sender_mismatch() {
        let engine = RuleEngine::default_rules();
        let result = engine.extract(&email(
            "Action required",
            "URGENT: verify your account immediately or it will be suspended!",
            "\"PayPal Support\" <alerts@secure-billing.ru>",
        ));
        assert!(result.score > 0.0);
        assert!(result.indicators.iter().any(|i| {
            i.category == ThreatCategory::LinguisticManipulation
                && i.description == "urgency phrasing"
        }));
        assert!(
            result
                .indicators
                .iter()
                .any(|i| i.category == ThreatCategory::TechnicalIndicator)
        );
        assert!(
            result
                .indicators
                .iter()
                .all(|i| i.source == IndicatorSource::RuleBased)
        );
    }

    #[test]
    fn matching_is_case_insensitive() {
        let engine = RuleEngine::default_rules();
        let lower = engine.extract(&email("", "please act now", "a@b.com"));
        let upper = engine.extract(&email("", "PLEASE ACT NOW", "a@b.com"));
        assert_eq!(lower.score, upper.score);
        assert!(!lower.indicators.is_empty());
    }

    #[test]
    fn rule_counts_once_per_email() {
        let engine = RuleEngine::default_rules();
        let single = engine.extract(&email("", "urgent", "a@b.com"));
        let repeated = engine.extract(&email("", "urgent urgent urgent", "a@b.com"));
        assert_eq!(single.score, repeated.score);
        assert_eq!(single.indicators.len(), repeated.indicators.len());
    }

    #[test]
    fn score_is_capped_at_one() {
        let engine = RuleEngine::default_rules();
        let result = engine.extract(&email(
            "URGENT final notice",
            "Congratulations, you have won! Security alert: verify your account \
             and enter your password. Our security team needs a wire transfer. \
             http://192.0.2.7/login http://bit.ly/x",
            "\"Apple Billing\" <support123@gmail.com>",
        ));
        assert_eq!(result.score, 1.0);
        assert!(result.indicators.len() >= 6);
    }

    #[test]
    fn adding_a_trigger_never_lowers_the_score() {
        let engine = RuleEngine::default_rules();
        let base = "Quarterly numbers attached.";
        let mut body = String::from(base);
        let mut previous = engine.extract(&email("", &body, "a@b.com")).score;
        for trigger in ["act now", "verify your account", "wire transfer"] {
            body.push(' ');
            body.push_str(trigger);
            let score = engine.extract(&email("", &body, "a@b.com")).score;
            assert!(score >= previous, "score dropped after adding '{trigger}'");
            previous = score;
        }
    }

    #[test]
    fn extraction_is_idempotent() {
        let engine = RuleEngine::default_rules();
        let msg = email("Urgent", "verify your account", "a@b.com");
        let first = engine.extract(&msg);
        let second = engine.extract(&msg);
        assert_eq!(first.score, second.score);
        assert_eq!(first.indicators, second.indicators);
    }

    #[test]
    fn ip_literal_url_is_technical() {
        let engine = RuleEngine::default_rules();
        let result = engine.extract(&email("", "see http://10.0.0.1/verify", "a@b.com"));
        assert!(result.indicators.iter().any(|i| {
            i.category == ThreatCategory::TechnicalIndicator && i.description == "IP-literal URL"
        }));
    }

    #[test]
    fn subject_only_match_counts() {
        let engine = RuleEngine::default_rules();
        let result = engine.extract(&email("Last chance!", "details inside", "a@b.com"));
        assert!(
            result
                .indicators
                .iter()
                .any(|i| i.description == "deadline pressure")
        );
    }

    #[test]
    fn reply_to_mismatch_flagged() {
        let engine = RuleEngine::default_rules();
        let msg = email("Hi", "see attachment", "billing@acme.com")
            .with_header("Reply-To", "collect@other.net");
        let result = engine.extract(&msg);
        assert!(result.indicators.iter().any(|i| {
            i.category == ThreatCategory::TechnicalIndicator
                && i.description.contains("Reply-To")
        }));
    }

    #[test]
    fn matching_reply_to_not_flagged() {
        let engine = RuleEngine::default_rules();
        let msg = email("Hi", "see attachment", "billing@acme.com")
            .with_header("Reply-To", "Acme Billing <billing@acme.com>");
        let result = engine.extract(&msg);
        assert!(result.indicators.is_empty());
    }

    #[test]
    fn brandless_display_name_not_flagged() {
        let engine = RuleEngine::default_rules();
        let result = engine.extract(&email("Hi", "lunch?", "Alice <alice@example.com>"));
        assert!(result.indicators.is_empty());
    }

    #[test]
    fn display_name_domain_token_mismatch_flagged() {
        let engine = RuleEngine::default_rules();
        let result = engine.extract(&email(
            "Hi",
            "statement attached",
            "chase.com Alerts <no-reply@mail-updates.info>",
        ));
        assert!(result.indicators.iter().any(|i| {
            i.category == ThreatCategory::TechnicalIndicator
                && i.description.contains("chase.com")
        }));
    }

    #[test]
    fn display_name_matching_subdomain_not_flagged() {
        let engine = RuleEngine::default_rules();
        let result = engine.extract(&email(
            "Hi",
            "statement attached",
            "example.com Billing <billing@mail.example.com>",
        ));
        assert!(result.indicators.is_empty());
    }

    #[test]
    fn freemail_role_account_flagged() {
        let engine = RuleEngine::default_rules();
        let result = engine.extract(&email("Hi", "hello", "security-desk@gmail.com"));
        assert!(
            result
                .indicators
                .iter()
                .any(|i| i.description == "role account on freemail domain")
        );
    }

    #[test]
    fn empty_engine_matches_nothing() {
        let engine = RuleEngine::empty();
        let result = engine.extract(&email("URGENT", "verify your account now", "a@b.com"));
        assert_eq!(result.score, 0.0);
        assert!(result.indicators.is_empty());
    }

    #[test]
    fn custom_rule_weight_is_clamped() {
        let mut engine = RuleEngine::empty();
        engine
            .add_rule(
                "custom marker",
                r"(?i)xyzzy",
                RuleField::Body,
                ThreatCategory::SocialEngineering,
                7.0,
            )
            .unwrap();
        let result = engine.extract(&email("", "xyzzy", "a@b.com"));
        assert_eq!(result.score, 1.0);
        assert_eq!(result.indicators[0].weight, 1.0);
    }

    #[test]
    fn empty_fields_are_treated_as_no_match() {
        let engine = RuleEngine::default_rules();
        let result = engine.extract(&email("", "", ""));
        assert_eq!(result.score, 0.0);
        assert!(result.indicators.is_empty());
    }
}
