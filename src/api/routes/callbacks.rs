//! Telephony callback endpoints, one per interview phase.
//!
//! Each endpoint translates the provider's delivery (recording reference,
//! digits, or neither) into a [`CallbackEvent`] and hands it to the interview
//! machine; the response body is the next voice-response directive document.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::post,
    Form, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::api::error::ApiResult;
use crate::interview::{CallbackEvent, InterviewMachine, VoiceResponse};
use crate::session::InterviewPhase;

#[derive(Clone)]
pub struct CallbacksState {
    pub machine: Arc<InterviewMachine>,
}

#[derive(Debug, Deserialize)]
pub struct AnsweredParams {
    pub call_id: String,
}

/// Body posted by the provider after a record directive completes. Both
/// fields are optional: silence timeouts deliver neither.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackForm {
    pub recording_url: Option<String>,
    pub digits: Option<String>,
}

pub fn router(state: CallbacksState) -> Router {
    Router::new()
        .route("/callbacks/answered", post(answered))
        .route("/callbacks/:call_id/introduction", post(introduction))
        .route("/callbacks/:call_id/question1", post(question1))
        .route("/callbacks/:call_id/question2", post(question2))
        .route("/callbacks/:call_id/qna", post(qna))
        .with_state(state)
}

async fn answered(
    State(state): State<CallbacksState>,
    Query(params): Query<AnsweredParams>,
) -> ApiResult<Json<VoiceResponse>> {
    info!("Answered callback received for call {}", params.call_id);
    Ok(Json(state.machine.begin(&params.call_id).await?))
}

async fn introduction(
    State(state): State<CallbacksState>,
    Path(call_id): Path<String>,
    body: Option<Form<CallbackForm>>,
) -> ApiResult<Json<VoiceResponse>> {
    phase_callback(&state, call_id, InterviewPhase::Introduction, body).await
}

async fn question1(
    State(state): State<CallbacksState>,
    Path(call_id): Path<String>,
    body: Option<Form<CallbackForm>>,
) -> ApiResult<Json<VoiceResponse>> {
    phase_callback(&state, call_id, InterviewPhase::Question1, body).await
}

async fn question2(
    State(state): State<CallbacksState>,
    Path(call_id): Path<String>,
    body: Option<Form<CallbackForm>>,
) -> ApiResult<Json<VoiceResponse>> {
    phase_callback(&state, call_id, InterviewPhase::Question2, body).await
}

async fn qna(
    State(state): State<CallbacksState>,
    Path(call_id): Path<String>,
    body: Option<Form<CallbackForm>>,
) -> ApiResult<Json<VoiceResponse>> {
    let form = body.map(|Form(f)| f).unwrap_or_default();
    let event = qna_event(&form, &state.machine.settings().finish_on_key);

    info!("Q&A callback for call {}: {:?}", call_id, event);

    Ok(Json(
        state
            .machine
            .handle(&call_id, InterviewPhase::Qna, event)
            .await?,
    ))
}

async fn phase_callback(
    state: &CallbacksState,
    call_id: String,
    phase: InterviewPhase,
    body: Option<Form<CallbackForm>>,
) -> ApiResult<Json<VoiceResponse>> {
    let form = body.map(|Form(f)| f).unwrap_or_default();
    let event = recording_event(&form);

    info!(
        "{} callback for call {}: {:?}",
        phase.as_str(),
        call_id,
        event
    );

    Ok(Json(state.machine.handle(&call_id, phase, event).await?))
}

fn recording_event(form: &CallbackForm) -> CallbackEvent {
    match &form.recording_url {
        Some(url) if !url.trim().is_empty() => CallbackEvent::Recording(url.clone()),
        _ => CallbackEvent::Silence,
    }
}

/// In the Q&A loop the finish key ends the interview; so does silence.
fn qna_event(form: &CallbackForm, finish_on_key: &str) -> CallbackEvent {
    if form.digits.as_deref() == Some(finish_on_key) {
        return CallbackEvent::EndSignal;
    }
    recording_event(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_event_with_url() {
        let form = CallbackForm {
            recording_url: Some("https://host/rec.wav".to_string()),
            digits: None,
        };
        assert_eq!(
            recording_event(&form),
            CallbackEvent::Recording("https://host/rec.wav".to_string())
        );
    }

    #[test]
    fn test_recording_event_blank_url_is_silence() {
        let form = CallbackForm {
            recording_url: Some("  ".to_string()),
            digits: None,
        };
        assert_eq!(recording_event(&form), CallbackEvent::Silence);
        assert_eq!(recording_event(&CallbackForm::default()), CallbackEvent::Silence);
    }

    #[test]
    fn test_qna_event_finish_key_wins_over_recording() {
        let form = CallbackForm {
            recording_url: Some("https://host/rec.wav".to_string()),
            digits: Some("#".to_string()),
        };
        assert_eq!(qna_event(&form, "#"), CallbackEvent::EndSignal);
    }

    #[test]
    fn test_qna_event_other_digit_keeps_recording() {
        let form = CallbackForm {
            recording_url: Some("https://host/rec.wav".to_string()),
            digits: Some("5".to_string()),
        };
        assert_eq!(
            qna_event(&form, "#"),
            CallbackEvent::Recording("https://host/rec.wav".to_string())
        );
    }

    #[test]
    fn test_qna_event_silence() {
        assert_eq!(qna_event(&CallbackForm::default(), "#"), CallbackEvent::Silence);
    }
}
