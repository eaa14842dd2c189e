//! AI response generation: the next interviewer utterance and the final
//! structured score, both driven by the full conversation history.

mod openai_chat;

pub use openai_chat::OpenAIChatGenerator;

use crate::session::ConversationEntry;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Structured outcome of scoring a finished interview.
///
/// A `completion_status` of `"error"` with zero scores is the sentinel for
/// "scoring unavailable" — callers must not read it as a real score of zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewScore {
    pub technical_score: u8,
    pub communication_score: u8,
    pub justification: String,
    pub completion_status: String,
}

impl InterviewScore {
    pub fn error_sentinel() -> Self {
        Self {
            technical_score: 0,
            communication_score: 0,
            justification: String::new(),
            completion_status: "error".to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.completion_status == "error"
    }
}

/// Produces interviewer utterances and final scores from conversation history.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Generate the next interviewer utterance. The prompt is the persona
    /// (parameterized by role and job description), the full ordered history,
    /// and a final instruction turn describing what is requested.
    async fn generate(
        &self,
        instruction: &str,
        job_role: &str,
        job_description: &str,
        history: &[ConversationEntry],
    ) -> Result<String>;

    /// Score the finished interview. Never fails: provider or parse errors
    /// yield [`InterviewScore::error_sentinel`].
    async fn final_score(
        &self,
        job_role: &str,
        job_description: &str,
        history: &[ConversationEntry],
    ) -> InterviewScore;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_sentinel() {
        let score = InterviewScore::error_sentinel();
        assert_eq!(score.technical_score, 0);
        assert_eq!(score.communication_score, 0);
        assert_eq!(score.completion_status, "error");
        assert!(score.is_error());
    }

    #[test]
    fn test_real_score_is_not_error() {
        let score = InterviewScore {
            technical_score: 7,
            communication_score: 8,
            justification: "Solid fundamentals".to_string(),
            completion_status: "complete".to_string(),
        };
        assert!(!score.is_error());
    }
}
