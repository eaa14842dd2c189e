//! Call initiation endpoint.
//!
//! Places one outbound call per candidate and seeds a session for each call
//! that was successfully placed. Outcomes are reported per candidate — one
//! candidate's failure never aborts the rest of the batch.

use axum::{extract::State, response::Json, routing::post, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::interview::InterviewMachine;
use crate::telephony::CallPlacer;

#[derive(Clone)]
pub struct CallsState {
    pub machine: Arc<InterviewMachine>,
    pub placer: Arc<dyn CallPlacer>,
}

#[derive(Debug, Deserialize)]
pub struct InitiateRequest {
    pub job_role: String,
    pub job_description: String,
    pub candidates: Vec<CandidateRequest>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateRequest {
    pub name: Option<String>,
    pub phone: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CandidateOutcome {
    pub phone: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn router(state: CallsState) -> Router {
    Router::new()
        .route("/calls", post(initiate_calls))
        .with_state(state)
}

async fn initiate_calls(
    State(state): State<CallsState>,
    Json(request): Json<InitiateRequest>,
) -> ApiResult<Json<Value>> {
    validate_request(&request).map_err(ApiError::bad_request)?;

    info!(
        "Initiating {} call(s) for role {}",
        request.candidates.len(),
        request.job_role
    );

    let outcomes = place_candidates(&state, &request).await;
    let placed = outcomes.iter().filter(|o| o.success).count();

    Ok(Json(json!({
        "requested": outcomes.len(),
        "placed": placed,
        "results": outcomes,
    })))
}

/// Validation errors reject the whole request before any call is placed.
pub fn validate_request(request: &InitiateRequest) -> Result<(), String> {
    if request.job_role.trim().is_empty() {
        return Err("job_role must not be empty".to_string());
    }
    if request.candidates.is_empty() {
        return Err("at least one candidate is required".to_string());
    }
    Ok(())
}

/// Place one call per candidate. Per-candidate failures are captured in the
/// outcome list and never abort the batch.
pub async fn place_candidates(
    state: &CallsState,
    request: &InitiateRequest,
) -> Vec<CandidateOutcome> {
    let answer_url = format!(
        "{}/callbacks/answered",
        state
            .machine
            .settings()
            .callback_base_url
            .trim_end_matches('/')
    );

    let mut outcomes = Vec::with_capacity(request.candidates.len());

    for candidate in &request.candidates {
        if candidate.phone.trim().is_empty() {
            outcomes.push(CandidateOutcome {
                phone: candidate.phone.clone(),
                success: false,
                call_id: None,
                error: Some("missing phone number".to_string()),
            });
            continue;
        }

        match state.placer.place_call(&candidate.phone, &answer_url).await {
            Ok(call_id) => {
                state
                    .machine
                    .store()
                    .create(&call_id, &request.job_role, &request.job_description)
                    .await;

                info!(
                    "Seeded session for call {} to {} ({})",
                    call_id,
                    candidate.phone,
                    candidate.name.as_deref().unwrap_or("unnamed candidate")
                );

                outcomes.push(CandidateOutcome {
                    phone: candidate.phone.clone(),
                    success: true,
                    call_id: Some(call_id),
                    error: None,
                });
            }
            Err(e) => {
                warn!("Failed to place call to {}: {e:#}", candidate.phone);
                outcomes.push(CandidateOutcome {
                    phone: candidate.phone.clone(),
                    success: false,
                    call_id: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(candidates: Vec<CandidateRequest>) -> InitiateRequest {
        InitiateRequest {
            job_role: "Backend Engineer".to_string(),
            job_description: "Rust services".to_string(),
            candidates,
        }
    }

    #[test]
    fn test_validate_rejects_empty_candidate_list() {
        let err = validate_request(&request(Vec::new())).unwrap_err();
        assert!(err.contains("at least one candidate"));
    }

    #[test]
    fn test_validate_rejects_blank_role() {
        let mut req = request(vec![CandidateRequest {
            name: None,
            phone: "+15550101".to_string(),
        }]);
        req.job_role = "  ".to_string();
        assert!(validate_request(&req).is_err());
    }

    #[test]
    fn test_validate_accepts_well_formed_request() {
        let req = request(vec![CandidateRequest {
            name: Some("Alex".to_string()),
            phone: "+15550101".to_string(),
        }]);
        assert!(validate_request(&req).is_ok());
    }
}
