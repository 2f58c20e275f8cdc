//! Gemini analysis provider.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info};

use super::AnalysisProvider;
use crate::analysis::{parse_analysis, AnalysisError, AnalysisResult};

const PROMPT: &str = "You are a meeting assistant. Read the transcript below and reply with \
JSON only, no prose, matching this shape: {\"summary\": string, \"action_items\": \
[{\"text\": string, \"owner\": string or null, \"deadline\": string or null}], \
\"decisions\": [string]}. The summary covers the key points of the meeting; \
action_items are concrete follow-ups with assignees and due dates when mentioned; \
decisions are conclusions the participants agreed on.\n\nTranscript:\n";

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: String,
}

pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, endpoint: Option<String>, model: String) -> Self {
        let base_url =
            endpoint.unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string());

        info!("Initialized Gemini analysis provider with model {}", model);

        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            model,
        }
    }
}

fn transport_error(e: reqwest::Error) -> AnalysisError {
    AnalysisError::Backend {
        reason: e.to_string(),
        retryable: e.is_timeout() || e.is_connect(),
    }
}

#[async_trait]
impl AnalysisProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    async fn analyze(&self, transcript: &str) -> Result<AnalysisResult, AnalysisError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let body = json!({
            "contents": [ { "parts": [ { "text": format!("{}{}", PROMPT, transcript) } ] } ],
            "generationConfig": { "response_mime_type": "application/json" }
        });

        debug!("Sending analysis request to Gemini");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let response_text = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            error!("Gemini request failed with status {}: {}", status, response_text);
            return Err(AnalysisError::Backend {
                reason: format!("status {}: {}", status, response_text),
                retryable: status.as_u16() == 429 || status.is_server_error(),
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&response_text).map_err(|e| AnalysisError::Backend {
                reason: format!("unparseable Gemini response envelope: {}", e),
                retryable: false,
            })?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| AnalysisError::Malformed {
                reason: "response contains no candidates".to_string(),
            })?;

        parse_analysis(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_parsing() {
        let body = r#"{
            "candidates": [ { "content": { "parts": [ { "text": "{\"summary\": \"S\"}" } ], "role": "model" } } ]
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.candidates.len(), 1);
        assert_eq!(
            parsed.candidates[0].content.parts[0].text,
            "{\"summary\": \"S\"}"
        );
    }
}
