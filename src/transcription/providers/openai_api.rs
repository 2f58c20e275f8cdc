//! OpenAI-compatible transcription endpoint (multipart audio upload).

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, error, info};

use super::TranscriptionProvider;
use crate::transcription::TranscriptionError;

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

pub struct OpenAiTranscriptionProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl OpenAiTranscriptionProvider {
    pub fn new(api_key: String, endpoint: Option<String>, model: String) -> Self {
        let endpoint = endpoint
            .unwrap_or_else(|| "https://api.openai.com/v1/audio/transcriptions".to_string());

        info!("Initialized OpenAI transcription provider: {}", endpoint);

        Self {
            client: reqwest::Client::new(),
            api_key,
            endpoint,
            model,
        }
    }
}

fn transport_error(e: reqwest::Error) -> TranscriptionError {
    TranscriptionError::Backend {
        reason: e.to_string(),
        retryable: e.is_timeout() || e.is_connect(),
    }
}

/// Rate limits and server-side failures are worth retrying; other
/// rejections are not.
fn status_is_retryable(status: reqwest::StatusCode) -> bool {
    status.as_u16() == 429 || status.is_server_error()
}

#[async_trait]
impl TranscriptionProvider for OpenAiTranscriptionProvider {
    fn name(&self) -> &'static str {
        "OpenAI API"
    }

    async fn transcribe(
        &self,
        audio_path: &Path,
        language: &str,
    ) -> Result<String, TranscriptionError> {
        debug!("Uploading audio for transcription: {:?}", audio_path);

        let audio_data =
            tokio::fs::read(audio_path)
                .await
                .map_err(|e| TranscriptionError::Backend {
                    reason: format!("failed to read audio file: {}", e),
                    retryable: false,
                })?;

        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.wav".to_string());

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio_data).file_name(file_name),
            )
            .text("model", self.model.clone())
            .text("language", language.to_string())
            .text("response_format", "json");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let response_text = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            error!(
                "Transcription request failed with status {}: {}",
                status, response_text
            );

            let reason = serde_json::from_str::<ErrorResponse>(&response_text)
                .map(|e| e.error.message)
                .unwrap_or(response_text);

            return Err(TranscriptionError::Backend {
                reason: format!("status {}: {}", status, reason),
                retryable: status_is_retryable(status),
            });
        }

        let parsed: TranscriptionResponse =
            serde_json::from_str(&response_text).map_err(|e| TranscriptionError::Backend {
                reason: format!("unparseable transcription response: {}", e),
                retryable: false,
            })?;

        info!("Transcription complete: {} chars", parsed.text.len());
        Ok(parsed.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        assert!(status_is_retryable(reqwest::StatusCode::TOO_MANY_REQUESTS));
        assert!(status_is_retryable(reqwest::StatusCode::BAD_GATEWAY));
        assert!(!status_is_retryable(reqwest::StatusCode::UNAUTHORIZED));
        assert!(!status_is_retryable(reqwest::StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_error_response_parsing() {
        let body = r#"{"error": {"message": "Invalid file format", "type": "invalid_request_error"}}"#;
        let parsed: ErrorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.message, "Invalid file format");
    }
}
