//! Call session types and the in-memory session store.

mod store;

pub use store::{SessionStore, SharedSession};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Phase of a phone-screen interview.
///
/// Phases only ever advance along
/// introduction → question1 → question2 → qna → ended, with `Qna` allowed to
/// self-loop while the candidate keeps asking questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterviewPhase {
    Introduction,
    Question1,
    Question2,
    Qna,
    Ended,
}

impl InterviewPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Introduction => "introduction",
            Self::Question1 => "question1",
            Self::Question2 => "question2",
            Self::Qna => "qna",
            Self::Ended => "ended",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Introduction => 0,
            Self::Question1 => 1,
            Self::Question2 => 2,
            Self::Qna => 3,
            Self::Ended => 4,
        }
    }

    /// Forward-only transitions, plus the `qna` self-loop.
    pub fn can_advance_to(&self, next: InterviewPhase) -> bool {
        next.rank() > self.rank() || (*self == Self::Qna && next == Self::Qna)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// One turn of the interview conversation. Append-only once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub speaker: Speaker,
    pub text: String,
}

/// Per-call interview state. Lives only in process memory; created when the
/// outbound call is placed and destroyed when the interview ends or the TTL
/// sweeper reclaims it.
#[derive(Debug, Clone)]
pub struct CallSession {
    pub call_id: String,
    pub job_role: String,
    pub job_description: String,
    pub phase: InterviewPhase,
    pub history: Vec<ConversationEntry>,
    /// Last recording reference processed per phase. Audit only.
    pub recording_refs: HashMap<&'static str, String>,
    pub last_activity: DateTime<Utc>,
}

impl CallSession {
    pub fn new(call_id: &str, job_role: &str, job_description: &str) -> Self {
        Self {
            call_id: call_id.to_string(),
            job_role: job_role.to_string(),
            job_description: job_description.to_string(),
            phase: InterviewPhase::Introduction,
            history: Vec::new(),
            recording_refs: HashMap::new(),
            last_activity: Utc::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.history.push(ConversationEntry {
            speaker: Speaker::User,
            text: text.into(),
        });
    }

    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.history.push(ConversationEntry {
            speaker: Speaker::Assistant,
            text: text.into(),
        });
    }

    pub fn note_recording(&mut self, phase: InterviewPhase, reference: &str) {
        self.recording_refs
            .insert(phase.as_str(), reference.to_string());
    }

    pub fn advance(&mut self, next: InterviewPhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "backward phase transition {} -> {}",
            self.phase.as_str(),
            next.as_str()
        );
        self.phase = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_as_str() {
        assert_eq!(InterviewPhase::Introduction.as_str(), "introduction");
        assert_eq!(InterviewPhase::Question1.as_str(), "question1");
        assert_eq!(InterviewPhase::Question2.as_str(), "question2");
        assert_eq!(InterviewPhase::Qna.as_str(), "qna");
        assert_eq!(InterviewPhase::Ended.as_str(), "ended");
    }

    #[test]
    fn test_phase_only_advances_forward() {
        use InterviewPhase::*;
        assert!(Introduction.can_advance_to(Question1));
        assert!(Question1.can_advance_to(Question2));
        assert!(Question2.can_advance_to(Qna));
        assert!(Qna.can_advance_to(Ended));
        // Any phase may jump straight to ended (fatal error path)
        assert!(Introduction.can_advance_to(Ended));
        assert!(Question1.can_advance_to(Ended));
        // Backward moves are never allowed
        assert!(!Question2.can_advance_to(Question1));
        assert!(!Qna.can_advance_to(Introduction));
        assert!(!Ended.can_advance_to(Qna));
        // Only qna may self-loop
        assert!(Qna.can_advance_to(Qna));
        assert!(!Question1.can_advance_to(Question1));
    }

    #[test]
    fn test_phase_serialization() {
        let json = serde_json::to_string(&InterviewPhase::Qna).unwrap();
        assert_eq!(json, "\"qna\"");
        let parsed: InterviewPhase = serde_json::from_str("\"question2\"").unwrap();
        assert_eq!(parsed, InterviewPhase::Question2);
    }

    #[test]
    fn test_history_preserves_insertion_order() {
        let mut session = CallSession::new("CA1", "Backend Engineer", "Rust services");
        session.push_user("hello");
        session.push_assistant("first question");
        session.push_user("my answer");

        assert_eq!(session.history.len(), 3);
        assert_eq!(session.history[0].speaker, Speaker::User);
        assert_eq!(session.history[1].speaker, Speaker::Assistant);
        assert_eq!(session.history[2].text, "my answer");
    }

    #[test]
    fn test_note_recording_keeps_last_per_phase() {
        let mut session = CallSession::new("CA1", "Backend Engineer", "Rust services");
        session.note_recording(InterviewPhase::Qna, "https://host/rec1");
        session.note_recording(InterviewPhase::Qna, "https://host/rec2");
        assert_eq!(
            session.recording_refs.get("qna").map(String::as_str),
            Some("https://host/rec2")
        );
    }

    #[test]
    fn test_touch_updates_last_activity() {
        let mut session = CallSession::new("CA1", "Backend Engineer", "Rust services");
        let before = session.last_activity;
        session.last_activity = before - chrono::Duration::seconds(30);
        session.touch();
        assert!(session.last_activity >= before);
    }
}
