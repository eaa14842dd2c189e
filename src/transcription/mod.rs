//! Speech-to-text adapter.
//!
//! [`Transcriber`] wraps a [`TranscriptionProvider`] and never retries
//! internally: retries belong to the recording pipeline, and provider errors
//! propagate unchanged so the orchestrator's failure policy can apply.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tracing::info;

pub mod providers;

pub use providers::{OpenAIProvider, TranscriptionProvider};

use crate::audio::RecordingPipeline;

pub struct Transcriber {
    provider: Box<dyn TranscriptionProvider>,
    language: String,
}

impl std::fmt::Debug for Transcriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transcriber")
            .field("provider", &self.provider.name())
            .field("language", &self.language)
            .finish()
    }
}

impl Transcriber {
    pub fn with_provider(provider_name: &str, config: ProviderConfig) -> Result<Self> {
        let language = config.language.clone().unwrap_or_else(|| "en".to_string());

        let provider: Box<dyn TranscriptionProvider> = match provider_name {
            "openai-api" => {
                let api_key = config
                    .api_key
                    .context("api_key is required for the OpenAI transcription provider")?;

                let model = config.model.unwrap_or_else(|| "whisper-1".to_string());
                Box::new(OpenAIProvider::new(api_key, config.api_endpoint, model)?)
            }
            _ => bail!(
                "Unknown transcription provider '{}'. Supported providers: openai-api",
                provider_name
            ),
        };

        info!("Using {} for transcription", provider.name());

        Ok(Self { provider, language })
    }

    pub async fn transcribe(&self, audio_path: &Path, call_id: &str) -> Result<String> {
        info!(
            "Transcribing audio file {:?} for call {} with {}",
            audio_path,
            call_id,
            self.provider.name()
        );
        self.provider.transcribe(audio_path, &self.language).await
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    pub model: Option<String>,
    pub language: Option<String>,
    pub api_endpoint: Option<String>,
    pub api_key: Option<String>,
}

/// One interview turn: recording reference in, candidate text out.
///
/// The seam the orchestrator depends on; production composes the recording
/// pipeline with the transcriber, tests substitute a stub.
#[async_trait]
pub trait TurnTranscriber: Send + Sync {
    async fn transcribe_turn(&self, recording_url: &str, call_id: &str) -> Result<String>;
}

/// Production turn transcriber: fetch, transcode, transcribe, clean up.
pub struct RecordedTurnTranscriber {
    pipeline: RecordingPipeline,
    transcriber: Transcriber,
}

impl RecordedTurnTranscriber {
    pub fn new(pipeline: RecordingPipeline, transcriber: Transcriber) -> Self {
        Self {
            pipeline,
            transcriber,
        }
    }
}

#[async_trait]
impl TurnTranscriber for RecordedTurnTranscriber {
    async fn transcribe_turn(&self, recording_url: &str, call_id: &str) -> Result<String> {
        let audio_path = self.pipeline.retrieve(recording_url, call_id).await?;

        let result = self.transcriber.transcribe(&audio_path, call_id).await;

        self.pipeline.cleanup(&audio_path);
        if result.is_err() {
            self.pipeline.sweep(call_id);
        }

        result
    }
}
