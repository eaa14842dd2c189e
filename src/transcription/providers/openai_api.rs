use anyhow::{Context, Result};
use serde::Deserialize;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use tracing::{debug, error, info};

use super::TranscriptionProvider;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/audio/transcriptions";

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
    r#type: Option<String>,
    code: Option<String>,
}

pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl OpenAIProvider {
    pub fn new(api_key: String, endpoint: Option<String>, model: String) -> Result<Self> {
        let client = reqwest::Client::new();
        let endpoint = endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        info!(
            "Initialized OpenAI transcription provider with endpoint: {}",
            endpoint
        );

        Ok(Self {
            client,
            api_key,
            endpoint,
            model,
        })
    }
}

impl TranscriptionProvider for OpenAIProvider {
    fn name(&self) -> &'static str {
        "OpenAI transcription API"
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn transcribe<'a>(
        &'a self,
        audio_path: &'a Path,
        language: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            info!("Transcribing audio file via OpenAI API: {:?}", audio_path);

            let audio_data = tokio::fs::read(audio_path)
                .await
                .context("Failed to read audio file")?;

            let file_name = audio_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("audio.mp3")
                .to_string();

            let part = reqwest::multipart::Part::bytes(audio_data)
                .file_name(file_name)
                .mime_str("audio/mpeg")
                .context("Failed to build multipart audio part")?;

            let form = reqwest::multipart::Form::new()
                .part("file", part)
                .text("model", self.model.clone())
                .text("language", language.to_string());

            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .multipart(form)
                .send()
                .await
                .context("Failed to send request to OpenAI transcription API")?;

            let status = response.status();
            let response_text = response
                .text()
                .await
                .context("Failed to read response body")?;

            if !status.is_success() {
                error!(
                    "OpenAI transcription request failed with status {}: {}",
                    status, response_text
                );

                if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&response_text) {
                    return Err(anyhow::anyhow!(
                        "OpenAI transcription API error: {} (type: {:?}, code: {:?})",
                        error_response.error.message,
                        error_response.error.r#type,
                        error_response.error.code
                    ));
                }

                return Err(anyhow::anyhow!(
                    "OpenAI transcription request failed with status {}: {}",
                    status,
                    response_text
                ));
            }

            let transcription: TranscriptionResponse = serde_json::from_str(&response_text)
                .context("Failed to parse transcription response")?;

            let text = transcription.text.trim().to_string();
            info!("Transcription complete: {} chars", text.len());
            debug!("Raw transcription: {}", text);

            Ok(text)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_available_requires_key() {
        let provider =
            OpenAIProvider::new("sk-test".to_string(), None, "whisper-1".to_string()).unwrap();
        assert!(provider.is_available());

        let empty = OpenAIProvider::new(String::new(), None, "whisper-1".to_string()).unwrap();
        assert!(!empty.is_available());
    }

    #[test]
    fn test_default_endpoint() {
        let provider =
            OpenAIProvider::new("sk-test".to_string(), None, "whisper-1".to_string()).unwrap();
        assert_eq!(provider.endpoint, DEFAULT_ENDPOINT);
    }
}
