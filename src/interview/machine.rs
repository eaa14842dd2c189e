//! Per-call interview state machine.
//!
//! Each telephony callback is a one-shot HTTP request; the machine reads the
//! session, runs exactly one `(phase, event)` transition from the table below,
//! and answers with a directive document:
//!
//! | phase        | event                 | next         |
//! |--------------|-----------------------|--------------|
//! | introduction | recording / silence   | question1    |
//! | question1    | recording / silence   | question2    |
//! | question2    | recording / silence   | qna          |
//! | qna          | recording             | qna          |
//! | qna          | end signal / silence  | ended        |
//!
//! Anything else is an [`InterviewError`]. The session mutex is held for the
//! whole transition, so redelivered callbacks for one call serialize.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};

use super::report::{InterviewReport, PostInterviewHook};
use super::script;
use super::VoiceResponse;
use crate::generation::ResponseGenerator;
use crate::session::{CallSession, InterviewPhase, SessionStore};
use crate::transcription::TurnTranscriber;

/// Inbound signal extracted from a provider callback.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackEvent {
    /// A recording reference was delivered.
    Recording(String),
    /// The caller pressed the finish key.
    EndSignal,
    /// No recording and no digit — the silence timeout elapsed.
    Silence,
}

#[derive(Debug, Error)]
pub enum InterviewError {
    #[error("no session found for call {0}")]
    SessionNotFound(String),

    #[error(
        "call {call_id} is in phase {}, but a {} callback fired",
        actual.as_str(),
        expected.as_str()
    )]
    StalePhase {
        call_id: String,
        expected: InterviewPhase,
        actual: InterviewPhase,
    },

    #[error("call {call_id}: no transition from phase {} on {event:?}", phase.as_str())]
    IllegalTransition {
        call_id: String,
        phase: InterviewPhase,
        event: CallbackEvent,
    },
}

#[derive(Debug, Clone)]
pub struct InterviewSettings {
    /// Public base URL for the record-directive callback targets.
    pub callback_base_url: String,
    pub max_recording_secs: u32,
    pub silence_timeout_secs: u32,
    pub finish_on_key: String,
}

pub struct InterviewMachine {
    store: SessionStore,
    turns: Arc<dyn TurnTranscriber>,
    generator: Arc<dyn ResponseGenerator>,
    hook: Option<Arc<dyn PostInterviewHook>>,
    settings: InterviewSettings,
}

impl InterviewMachine {
    pub fn new(
        store: SessionStore,
        turns: Arc<dyn TurnTranscriber>,
        generator: Arc<dyn ResponseGenerator>,
        hook: Option<Arc<dyn PostInterviewHook>>,
        settings: InterviewSettings,
    ) -> Self {
        Self {
            store,
            turns,
            generator,
            hook,
            settings,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn settings(&self) -> &InterviewSettings {
        &self.settings
    }

    /// The call was answered: greet the candidate and record the introduction.
    ///
    /// The session was seeded when the outbound call was placed; an answered
    /// callback for an unknown id is a not-found condition, never a fresh
    /// default session.
    pub async fn begin(&self, call_id: &str) -> Result<VoiceResponse, InterviewError> {
        let shared = self
            .store
            .get(call_id)
            .await
            .ok_or_else(|| InterviewError::SessionNotFound(call_id.to_string()))?;
        let mut session = shared.lock().await;
        session.touch();

        info!(
            "Call {} answered, starting interview for role {}",
            call_id, session.job_role
        );

        let response = VoiceResponse::new().speak(script::introduction(&session.job_role));
        Ok(self.with_record(response, call_id, InterviewPhase::Introduction))
    }

    /// Run one callback transition. `expected` is the phase the callback URL
    /// was issued for; a mismatch with the session's actual phase (for example
    /// a redelivered question2 callback arriving after the session reached
    /// qna) mutates nothing.
    pub async fn handle(
        &self,
        call_id: &str,
        expected: InterviewPhase,
        event: CallbackEvent,
    ) -> Result<VoiceResponse, InterviewError> {
        let shared = self
            .store
            .get(call_id)
            .await
            .ok_or_else(|| InterviewError::SessionNotFound(call_id.to_string()))?;
        let mut session = shared.lock().await;

        if session.phase != expected {
            return Err(InterviewError::StalePhase {
                call_id: call_id.to_string(),
                expected,
                actual: session.phase,
            });
        }

        session.touch();

        match (expected, event) {
            (InterviewPhase::Introduction, CallbackEvent::Recording(url)) => Ok(self
                .question_turn(
                    &mut session,
                    Some(url),
                    script::FIRST_QUESTION_INSTRUCTION,
                    InterviewPhase::Question1,
                )
                .await),
            (InterviewPhase::Introduction, CallbackEvent::Silence) => Ok(self
                .question_turn(
                    &mut session,
                    None,
                    script::FIRST_QUESTION_INSTRUCTION,
                    InterviewPhase::Question1,
                )
                .await),
            (InterviewPhase::Question1, CallbackEvent::Recording(url)) => Ok(self
                .question_turn(
                    &mut session,
                    Some(url),
                    script::SECOND_QUESTION_INSTRUCTION,
                    InterviewPhase::Question2,
                )
                .await),
            (InterviewPhase::Question1, CallbackEvent::Silence) => Ok(self
                .question_turn(
                    &mut session,
                    None,
                    script::SECOND_QUESTION_INSTRUCTION,
                    InterviewPhase::Question2,
                )
                .await),
            (InterviewPhase::Question2, CallbackEvent::Recording(url)) => {
                Ok(self.qna_invite_turn(&mut session, Some(url)).await)
            }
            (InterviewPhase::Question2, CallbackEvent::Silence) => {
                Ok(self.qna_invite_turn(&mut session, None).await)
            }
            (InterviewPhase::Qna, CallbackEvent::Recording(url)) => {
                Ok(self.qna_turn(&mut session, url).await)
            }
            (InterviewPhase::Qna, CallbackEvent::EndSignal | CallbackEvent::Silence) => {
                Ok(self.finish(&mut session).await)
            }
            (phase, event) => Err(InterviewError::IllegalTransition {
                call_id: call_id.to_string(),
                phase,
                event,
            }),
        }
    }

    /// Transcribe the candidate's turn, generate the next technical question,
    /// and advance.
    async fn question_turn(
        &self,
        session: &mut CallSession,
        recording: Option<String>,
        instruction: &str,
        next: InterviewPhase,
    ) -> VoiceResponse {
        if let Some(text) = self.turn_text(session, recording).await {
            session.push_user(text);
        }

        match self
            .generator
            .generate(
                instruction,
                &session.job_role,
                &session.job_description,
                &session.history,
            )
            .await
        {
            Ok(question) => {
                session.push_assistant(question.clone());
                session.advance(next);
                info!(
                    "Call {} advanced to {} ({} history entries)",
                    session.call_id,
                    next.as_str(),
                    session.history.len()
                );
                let call_id = session.call_id.clone();
                self.with_record(VoiceResponse::new().speak(question), &call_id, next)
            }
            Err(e) => self.abort(session, e).await,
        }
    }

    /// Capture the answer to the last technical question and open the Q&A loop.
    async fn qna_invite_turn(
        &self,
        session: &mut CallSession,
        recording: Option<String>,
    ) -> VoiceResponse {
        if let Some(text) = self.turn_text(session, recording).await {
            session.push_user(text);
        }

        // The invitation goes into history too, so Q&A answers are generated
        // with the full conversation in the prompt.
        let invitation = script::qna_invitation(&self.settings.finish_on_key);
        session.push_assistant(invitation.clone());
        session.advance(InterviewPhase::Qna);
        info!("Call {} entered the Q&A loop", session.call_id);

        let call_id = session.call_id.clone();
        self.with_record(
            VoiceResponse::new().speak(invitation),
            &call_id,
            InterviewPhase::Qna,
        )
    }

    /// Answer one candidate question and re-invite. Phase stays `qna`.
    async fn qna_turn(&self, session: &mut CallSession, recording_url: String) -> VoiceResponse {
        let question = self.turn_text(session, Some(recording_url)).await;

        let instruction = match &question {
            Some(q) => script::answer_instruction(q),
            None => script::REPEAT_REQUEST_INSTRUCTION.to_string(),
        };
        if let Some(q) = question {
            session.push_user(q);
        }

        match self
            .generator
            .generate(
                &instruction,
                &session.job_role,
                &session.job_description,
                &session.history,
            )
            .await
        {
            Ok(answer) => {
                session.push_assistant(answer.clone());
                session.advance(InterviewPhase::Qna);
                let call_id = session.call_id.clone();
                let response = VoiceResponse::new()
                    .speak(answer)
                    .speak(script::qna_reinvitation(&self.settings.finish_on_key));
                self.with_record(response, &call_id, InterviewPhase::Qna)
            }
            Err(e) => self.abort(session, e).await,
        }
    }

    /// Close the interview, destroy the session, and score it in the background.
    async fn finish(&self, session: &mut CallSession) -> VoiceResponse {
        info!(
            "Call {} finished with {} history entries",
            session.call_id,
            session.history.len()
        );

        session.advance(InterviewPhase::Ended);
        self.store.remove(&session.call_id).await;
        self.spawn_scoring(session);

        VoiceResponse::new().speak(script::CLOSING_REMARK).hangup()
    }

    /// Generation failure is fatal for the call: apologize, hang up, and
    /// destroy the session rather than leaving it in an inconsistent phase.
    async fn abort(&self, session: &mut CallSession, err: anyhow::Error) -> VoiceResponse {
        error!(
            "Response generation failed for call {} in phase {}, ending call: {err:#}",
            session.call_id,
            session.phase.as_str()
        );

        session.advance(InterviewPhase::Ended);
        self.store.remove(&session.call_id).await;

        VoiceResponse::new().speak(script::APOLOGY).hangup()
    }

    /// Transcribe a recording, tolerating failure: a lost or unintelligible
    /// recording becomes a missing user turn and the interview keeps moving.
    async fn turn_text(
        &self,
        session: &mut CallSession,
        recording: Option<String>,
    ) -> Option<String> {
        let url = match recording {
            Some(url) => url,
            None => {
                warn!(
                    "No recording delivered for call {} in phase {}; continuing without a user turn",
                    session.call_id,
                    session.phase.as_str()
                );
                return None;
            }
        };

        session.note_recording(session.phase, &url);

        match self.turns.transcribe_turn(&url, &session.call_id).await {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => {
                warn!(
                    "Empty transcription for call {} in phase {}; continuing without a user turn",
                    session.call_id,
                    session.phase.as_str()
                );
                None
            }
            Err(e) => {
                warn!(
                    "Transcription failed for call {} in phase {}; continuing without a user turn: {e:#}",
                    session.call_id,
                    session.phase.as_str()
                );
                None
            }
        }
    }

    /// Score the finished interview off the callback path. Scoring and hook
    /// failures are logged and absorbed; the call is already over.
    fn spawn_scoring(&self, session: &CallSession) {
        let generator = Arc::clone(&self.generator);
        let hook = self.hook.clone();
        let call_id = session.call_id.clone();
        let job_role = session.job_role.clone();
        let job_description = session.job_description.clone();
        let history = session.history.clone();

        tokio::spawn(async move {
            let score = generator
                .final_score(&job_role, &job_description, &history)
                .await;

            if score.is_error() {
                warn!("Scoring unavailable for call {}", call_id);
            } else {
                info!(
                    "Call {} scored: technical {}, communication {}",
                    call_id, score.technical_score, score.communication_score
                );
            }

            if let Some(hook) = hook {
                let report = InterviewReport {
                    call_id: call_id.clone(),
                    job_role,
                    completed_at: Utc::now(),
                    transcript: history,
                    score,
                };
                if let Err(e) = hook.execute(&report).await {
                    warn!("Post-interview hook failed for call {}: {e:#}", call_id);
                }
            }
        });
    }

    fn callback_url(&self, call_id: &str, phase: InterviewPhase) -> String {
        format!(
            "{}/callbacks/{}/{}",
            self.settings.callback_base_url.trim_end_matches('/'),
            call_id,
            phase.as_str()
        )
    }

    /// Append the signal tone and the record directive targeting the callback
    /// endpoint for `phase`.
    fn with_record(
        &self,
        response: VoiceResponse,
        call_id: &str,
        phase: InterviewPhase,
    ) -> VoiceResponse {
        response.signal_tone().record(
            self.callback_url(call_id, phase),
            self.settings.max_recording_secs,
            self.settings.finish_on_key.clone(),
            self.settings.silence_timeout_secs,
        )
    }
}
