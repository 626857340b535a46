//! Phishscan — hybrid phishing email classifier.
//!
//! Combines a deterministic rule-based scanner with an LLM semantic verdict
//! and fuses both into a single risk score. The LLM is an injected
//! [`llm::ModelCall`] capability; when it fails the pipeline degrades to
//! rule-based-only scoring instead of erroring.

pub mod analyzer;
pub mod config;
pub mod detector;
pub mod email;
pub mod error;
pub mod fusion;
pub mod llm;
pub mod rules;
pub mod types;

pub use detector::{PhishingDetector, analyze_email};
pub use email::EmailMessage;
pub use types::{RiskLevel, RiskReport};
