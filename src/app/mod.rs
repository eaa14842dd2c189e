//! Service wiring: config, providers, session store, sweeper, API server.

use crate::api::ApiServer;
use crate::audio::RecordingPipeline;
use crate::config::Config;
use crate::generation::OpenAIChatGenerator;
use crate::global;
use crate::interview::{FileReportHook, InterviewMachine, InterviewSettings, PostInterviewHook};
use crate::session::SessionStore;
use crate::telephony::{CallPlacer, RestCallPlacer};
use crate::transcription::{ProviderConfig, RecordedTurnTranscriber, Transcriber};
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub async fn run_service() -> Result<()> {
    info!("Starting phonescreen service");

    let config = Config::load()?;

    // A missing ffmpeg is a deployment problem; fail at startup, not mid-call.
    if !RecordingPipeline::check_ffmpeg_available() {
        bail!("ffmpeg is required to transcode call recordings but was not found on PATH");
    }

    let store = SessionStore::new(Duration::from_secs(config.session.ttl_secs));
    let _sweeper = store.spawn_sweeper(Duration::from_secs(config.session.sweep_interval_secs));

    let pipeline = RecordingPipeline::new(
        global::work_dir(),
        config.interview.fetch_attempts,
        Duration::from_secs(config.interview.fetch_retry_delay_secs),
    )?;

    let transcriber = Transcriber::with_provider(
        "openai-api",
        ProviderConfig {
            model: config.openai.transcription_model.clone(),
            language: config.openai.language.clone(),
            api_endpoint: config.openai.transcription_endpoint.clone(),
            api_key: config.openai.api_key.clone(),
        },
    )?;

    let generator = OpenAIChatGenerator::new(
        config
            .openai
            .api_key
            .clone()
            .context("openai.api_key is required")?,
        config.openai.chat_endpoint.clone(),
        config
            .openai
            .chat_model
            .clone()
            .unwrap_or_else(|| "gpt-4o-mini".to_string()),
        config.openai.qna_temperature,
        config.openai.scoring_temperature,
    )?;

    let hook: Arc<dyn PostInterviewHook> = Arc::new(FileReportHook::new(global::reports_dir()?)?);

    let settings = InterviewSettings {
        callback_base_url: config
            .telephony
            .callback_base_url
            .clone()
            .context("telephony.callback_base_url is required")?,
        max_recording_secs: config.interview.max_recording_secs,
        silence_timeout_secs: config.interview.silence_timeout_secs,
        finish_on_key: config.interview.finish_on_key.clone(),
    };

    let machine = Arc::new(InterviewMachine::new(
        store,
        Arc::new(RecordedTurnTranscriber::new(pipeline, transcriber)),
        Arc::new(generator),
        Some(hook),
        settings,
    ));

    let placer: Arc<dyn CallPlacer> = Arc::new(RestCallPlacer::from_config(&config.telephony)?);

    info!("phonescreen is ready");

    ApiServer::new(machine, placer, &config.server).start().await
}
