//! LLM analysis backend abstraction.
//!
//! Turns a transcript into a structured result (summary, action items,
//! decisions). The model's reply must be strict JSON; anything that fails
//! structural validation is a non-retryable error.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::AnalysisConfig;
use crate::pipeline::retry::Retryable;

pub mod providers;

pub use providers::{AnalysisProvider, GeminiProvider};

/// Structured analysis of one meeting transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: String,
    #[serde(default)]
    pub action_items: Vec<ActionItem>,
    #[serde(default)]
    pub decisions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionItem {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis backend error: {reason}")]
    Backend { reason: String, retryable: bool },
    #[error("malformed analysis response: {reason}")]
    Malformed { reason: String },
    #[error("invalid analysis configuration: {reason}")]
    Config { reason: String },
}

impl Retryable for AnalysisError {
    fn retryable(&self) -> bool {
        matches!(self, Self::Backend { retryable: true, .. })
    }
}

pub struct Analyzer {
    provider: Box<dyn AnalysisProvider>,
}

impl Analyzer {
    pub fn with_provider(
        provider_name: &str,
        config: &AnalysisConfig,
    ) -> Result<Self, AnalysisError> {
        let provider: Box<dyn AnalysisProvider> = match provider_name {
            "gemini" => {
                let api_key = config.api_key.clone().ok_or_else(|| AnalysisError::Config {
                    reason: "api_key is required for the gemini provider".to_string(),
                })?;
                Box::new(GeminiProvider::new(
                    api_key,
                    config.api_endpoint.clone(),
                    config.model.clone(),
                ))
            }
            _ => {
                return Err(AnalysisError::Config {
                    reason: format!(
                        "unknown analysis provider '{}'. Supported providers: gemini",
                        provider_name
                    ),
                })
            }
        };

        info!("Using {} for analysis", provider.name());

        Ok(Self { provider })
    }

    pub fn from_trait(provider: Box<dyn AnalysisProvider>) -> Self {
        Self { provider }
    }

    pub async fn analyze(&self, transcript: &str) -> Result<AnalysisResult, AnalysisError> {
        info!(
            "Analyzing transcript ({} chars) with {}",
            transcript.len(),
            self.provider.name()
        );
        self.provider.analyze(transcript).await
    }
}

/// Parse and validate a model reply into an `AnalysisResult`.
///
/// Models wrap JSON in markdown fences often enough that stripping them is
/// part of parsing, not a provider quirk.
pub fn parse_analysis(raw: &str) -> Result<AnalysisResult, AnalysisError> {
    let stripped = strip_code_fences(raw);

    let result: AnalysisResult =
        serde_json::from_str(stripped).map_err(|e| AnalysisError::Malformed {
            reason: e.to_string(),
        })?;

    if result.summary.trim().is_empty() {
        return Err(AnalysisError::Malformed {
            reason: "summary is empty".to_string(),
        });
    }

    Ok(result)
}

fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let result = parse_analysis(
            r#"{"summary": "Team sync", "action_items": [{"text": "Follow up", "owner": "Ada"}], "decisions": ["Ship v2"]}"#,
        )
        .unwrap();

        assert_eq!(result.summary, "Team sync");
        assert_eq!(result.action_items.len(), 1);
        assert_eq!(result.action_items[0].owner.as_deref(), Some("Ada"));
        assert!(result.action_items[0].deadline.is_none());
        assert_eq!(result.decisions, vec!["Ship v2".to_string()]);
    }

    #[test]
    fn test_parse_fenced_json() {
        let raw = "```json\n{\"summary\": \"S\", \"action_items\": [], \"decisions\": []}\n```";
        let result = parse_analysis(raw).unwrap();
        assert_eq!(result.summary, "S");
    }

    #[test]
    fn test_missing_lists_default_empty() {
        let result = parse_analysis(r#"{"summary": "Just a summary"}"#).unwrap();
        assert!(result.action_items.is_empty());
        assert!(result.decisions.is_empty());
    }

    #[test]
    fn test_malformed_is_not_retryable() {
        let err = parse_analysis("this is not json").unwrap_err();
        assert!(matches!(err, AnalysisError::Malformed { .. }));
        assert!(!err.retryable());
    }

    #[test]
    fn test_empty_summary_rejected() {
        let err = parse_analysis(r#"{"summary": "  "}"#).unwrap_err();
        assert!(matches!(err, AnalysisError::Malformed { .. }));
    }

    #[test]
    fn test_backend_retryable_classification() {
        let transient = AnalysisError::Backend {
            reason: "timeout".to_string(),
            retryable: true,
        };
        let rejected = AnalysisError::Backend {
            reason: "401".to_string(),
            retryable: false,
        };
        assert!(transient.retryable());
        assert!(!rejected.retryable());
    }
}
