//! Email input type — `EmailMessage` struct, sender parsing, RFC 822 ingestion.

use std::collections::HashMap;

use mail_parser::MessageParser;
use serde::{Deserialize, Serialize};

use crate::error::EmailError;

/// Immutable email input for analysis.
///
/// Constructed by the caller (or parsed from raw RFC 822 bytes) and read-only
/// throughout analysis. Missing fields are represented as empty strings — the
/// extractor treats absent text as "no match", never as an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    /// Subject line.
    #[serde(default)]
    pub subject: String,
    /// Plain-text body.
    #[serde(default)]
    pub body: String,
    /// Raw From value — may include a display name, e.g.
    /// `"PayPal Support" <alerts@example.ru>`.
    #[serde(default)]
    pub sender: String,
    /// Selected header fields (name → value).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

impl EmailMessage {
    pub fn new(
        subject: impl Into<String>,
        body: impl Into<String>,
        sender: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            sender: sender.into(),
            headers: HashMap::new(),
        }
    }

    /// Builder-style header attachment.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Display-name portion of the From value, if present.
    ///
    /// `"PayPal Support" <a@b.ru>` → `PayPal Support`.
    pub fn display_name(&self) -> Option<&str> {
        let s = self.sender.trim();
        let lt = s.find('<')?;
        let name = s[..lt].trim().trim_matches('"').trim();
        (!name.is_empty()).then_some(name)
    }

    /// Addr-spec portion of the From value.
    ///
    /// Falls back to the whole sender string when no angle brackets are
    /// present.
    pub fn sender_address(&self) -> &str {
        let s = self.sender.trim();
        match (s.find('<'), s.rfind('>')) {
            (Some(start), Some(end)) if end > start => s[start + 1..end].trim(),
            _ => s,
        }
    }

    /// Domain of the sender address, lowercased comparison left to callers.
    pub fn sender_domain(&self) -> Option<&str> {
        self.sender_address()
            .rsplit_once('@')
            .map(|(_, domain)| domain)
            .filter(|d| !d.is_empty())
    }

    /// Parse a raw RFC 822 message into an `EmailMessage`.
    ///
    /// Keeps only the fields the analysis pipeline looks at: subject, text
    /// body, From (with display name preserved), and the Reply-To address.
    pub fn from_rfc822(raw: &[u8]) -> Result<Self, EmailError> {
        let parsed = MessageParser::default()
            .parse(raw)
            .ok_or_else(|| EmailError::Parse("not a parseable RFC 822 message".into()))?;

        let subject = parsed.subject().unwrap_or_default().to_string();
        let body = parsed
            .body_text(0)
            .map(|text| text.to_string())
            .unwrap_or_default();

        let sender = parsed
            .from()
            .and_then(|addr| addr.first())
            .map(|a| match (a.name(), a.address()) {
                (Some(name), Some(address)) => format!("{name} <{address}>"),
                (None, Some(address)) => address.to_string(),
                _ => String::new(),
            })
            .unwrap_or_default();

        let mut headers = HashMap::new();
        if let Some(reply_to) = parsed
            .reply_to()
            .and_then(|addr| addr.first())
            .and_then(|a| a.address())
        {
            headers.insert("Reply-To".to_string(), reply_to.to_string());
        }

        Ok(Self {
            subject,
            body,
            sender,
            headers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_extraction() {
        let email = EmailMessage::new("Hi", "body", "\"PayPal Support\" <a@scam.ru>");
        assert_eq!(email.display_name(), Some("PayPal Support"));
        assert_eq!(email.sender_address(), "a@scam.ru");
        assert_eq!(email.sender_domain(), Some("scam.ru"));
    }

    #[test]
    fn bare_address_has_no_display_name() {
        let email = EmailMessage::new("Hi", "body", "alice@example.com");
        assert_eq!(email.display_name(), None);
        assert_eq!(email.sender_address(), "alice@example.com");
        assert_eq!(email.sender_domain(), Some("example.com"));
    }

    #[test]
    fn unquoted_display_name() {
        let email = EmailMessage::new("Hi", "body", "Security Team <it@corp.example>");
        assert_eq!(email.display_name(), Some("Security Team"));
        assert_eq!(email.sender_domain(), Some("corp.example"));
    }

    #[test]
    fn empty_sender_yields_nothing() {
        let email = EmailMessage::new("Hi", "body", "");
        assert_eq!(email.display_name(), None);
        assert_eq!(email.sender_address(), "");
        assert_eq!(email.sender_domain(), None);
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let email = EmailMessage::new("Hi", "body", "a@b.com")
            .with_header("Reply-To", "other@elsewhere.net");
        assert_eq!(email.header("reply-to"), Some("other@elsewhere.net"));
        assert_eq!(email.header("REPLY-TO"), Some("other@elsewhere.net"));
        assert_eq!(email.header("X-Missing"), None);
    }

    #[test]
    fn parses_rfc822_message() {
        let raw = b"From: \"Acme Billing\" <billing@acme-pay.biz>\r\n\
Reply-To: collect@other.example\r\n\
Subject: Invoice overdue\r\n\
Content-Type: text/plain\r\n\
\r\n\
Please wire the outstanding amount today.\r\n";
        let email = EmailMessage::from_rfc822(raw).unwrap();
        assert_eq!(email.subject, "Invoice overdue");
        assert_eq!(email.display_name(), Some("Acme Billing"));
        assert_eq!(email.sender_domain(), Some("acme-pay.biz"));
        assert_eq!(email.header("reply-to"), Some("collect@other.example"));
        assert!(email.body.contains("wire the outstanding amount"));
    }

    #[test]
    fn serde_defaults_missing_fields_to_empty() {
        let email: EmailMessage = serde_json::from_str(r#"{"body": "hello"}"#).unwrap();
        assert_eq!(email.body, "hello");
        assert!(email.subject.is_empty());
        assert!(email.sender.is_empty());
        assert!(email.headers.is_empty());
    }
}
