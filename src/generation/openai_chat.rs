//! OpenAI chat-completion backed response generator.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::{InterviewScore, ResponseGenerator};
use crate::session::{ConversationEntry, Speaker};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

const SCORING_INSTRUCTION: &str = "The interview is over. Based on the conversation so \
     far, rate the candidate. Respond with a JSON object containing exactly these keys: \
     technical_score (integer 0-10), communication_score (integer 0-10), justification \
     (one short paragraph), completion_status (\"complete\" if the candidate answered \
     both technical questions, otherwise \"partial\").";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
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

#[derive(Debug, Deserialize)]
struct ScorePayload {
    technical_score: u8,
    communication_score: u8,
    #[serde(default)]
    justification: String,
    #[serde(default = "default_completion_status")]
    completion_status: String,
}

fn default_completion_status() -> String {
    "complete".to_string()
}

pub struct OpenAIChatGenerator {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    qna_temperature: f32,
    scoring_temperature: f32,
}

impl OpenAIChatGenerator {
    pub fn new(
        api_key: String,
        endpoint: Option<String>,
        model: String,
        qna_temperature: f32,
        scoring_temperature: f32,
    ) -> Result<Self> {
        let client = reqwest::Client::new();
        let endpoint = endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        info!(
            "Initialized OpenAI chat generator with model {} at {}",
            model, endpoint
        );

        Ok(Self {
            client,
            api_key,
            endpoint,
            model,
            qna_temperature,
            scoring_temperature,
        })
    }

    fn persona(job_role: &str, job_description: &str) -> String {
        format!(
            "You are a professional technical interviewer conducting an automated phone \
             screen for the {job_role} position. Job description: {job_description}. Your \
             replies are read aloud over the phone, so keep them short, natural, and free \
             of markup or lists."
        )
    }

    fn build_messages(
        instruction: &str,
        job_role: &str,
        job_description: &str,
        history: &[ConversationEntry],
    ) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage {
            role: "system",
            content: Self::persona(job_role, job_description),
        });
        for entry in history {
            messages.push(ChatMessage {
                role: match entry.speaker {
                    Speaker::User => "user",
                    Speaker::Assistant => "assistant",
                },
                content: entry.text.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: instruction.to_string(),
        });
        messages
    }

    async fn complete(&self, messages: &[ChatMessage], temperature: f32, json: bool) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature,
            response_format: json.then_some(ResponseFormat { r#type: "json_object" }),
        };

        debug!("Sending {} messages to chat completion API", messages.len());

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to send request to chat completion API")?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .context("Failed to read chat completion response body")?;

        if !status.is_success() {
            error!(
                "Chat completion request failed with status {}: {}",
                status, response_text
            );

            if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&response_text) {
                return Err(anyhow::anyhow!(
                    "Chat completion API error: {} (type: {:?}, code: {:?})",
                    error_response.error.message,
                    error_response.error.r#type,
                    error_response.error.code
                ));
            }

            return Err(anyhow::anyhow!(
                "Chat completion request failed with status {}: {}",
                status,
                response_text
            ));
        }

        let completion: ChatCompletionResponse = serde_json::from_str(&response_text)
            .context("Failed to parse chat completion response")?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .context("Chat completion returned no choices")?;

        Ok(content.trim().to_string())
    }
}

fn parse_score(content: &str) -> Result<InterviewScore> {
    let payload: ScorePayload =
        serde_json::from_str(content).context("Failed to parse score payload")?;
    Ok(InterviewScore {
        technical_score: payload.technical_score.min(10),
        communication_score: payload.communication_score.min(10),
        justification: payload.justification,
        completion_status: payload.completion_status,
    })
}

#[async_trait]
impl ResponseGenerator for OpenAIChatGenerator {
    async fn generate(
        &self,
        instruction: &str,
        job_role: &str,
        job_description: &str,
        history: &[ConversationEntry],
    ) -> Result<String> {
        let messages = Self::build_messages(instruction, job_role, job_description, history);
        let text = self
            .complete(&messages, self.qna_temperature, false)
            .await?;
        info!("Generated interviewer utterance: {} chars", text.len());
        Ok(text)
    }

    async fn final_score(
        &self,
        job_role: &str,
        job_description: &str,
        history: &[ConversationEntry],
    ) -> InterviewScore {
        let messages =
            Self::build_messages(SCORING_INSTRUCTION, job_role, job_description, history);

        let content = match self
            .complete(&messages, self.scoring_temperature, true)
            .await
        {
            Ok(content) => content,
            Err(e) => {
                warn!("Scoring request failed, returning error sentinel: {e:#}");
                return InterviewScore::error_sentinel();
            }
        };

        match parse_score(&content) {
            Ok(score) => score,
            Err(e) => {
                warn!("Scoring payload unparseable, returning error sentinel: {e:#}");
                InterviewScore::error_sentinel()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_messages_order() {
        let history = vec![
            ConversationEntry {
                speaker: Speaker::User,
                text: "I have five years of Rust experience".to_string(),
            },
            ConversationEntry {
                speaker: Speaker::Assistant,
                text: "How does borrowing work?".to_string(),
            },
        ];

        let messages = OpenAIChatGenerator::build_messages(
            "Ask the next question",
            "Backend Engineer",
            "Rust services",
            &history,
        );

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.contains("Backend Engineer"));
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[2].role, "assistant");
        assert_eq!(messages[3].role, "user");
        assert_eq!(messages[3].content, "Ask the next question");
    }

    #[test]
    fn test_parse_score_complete() {
        let score = parse_score(
            r#"{"technical_score": 8, "communication_score": 9, "justification": "Strong answers", "completion_status": "complete"}"#,
        )
        .unwrap();
        assert_eq!(score.technical_score, 8);
        assert_eq!(score.communication_score, 9);
        assert!(!score.is_error());
    }

    #[test]
    fn test_parse_score_clamps_out_of_range() {
        let score = parse_score(
            r#"{"technical_score": 250, "communication_score": 11, "justification": ""}"#,
        )
        .unwrap();
        assert_eq!(score.technical_score, 10);
        assert_eq!(score.communication_score, 10);
        assert_eq!(score.completion_status, "complete");
    }

    #[test]
    fn test_parse_score_rejects_garbage() {
        assert!(parse_score("not json at all").is_err());
    }

    #[tokio::test]
    async fn test_final_score_returns_sentinel_on_provider_error() {
        // Port 9 (discard) refuses connections; the request fails fast.
        let generator = OpenAIChatGenerator::new(
            "sk-test".to_string(),
            Some("http://127.0.0.1:9/v1/chat/completions".to_string()),
            "gpt-4o-mini".to_string(),
            0.8,
            0.2,
        )
        .unwrap();

        let score = generator
            .final_score("Backend Engineer", "Rust services", &[])
            .await;
        assert!(score.is_error());
        assert_eq!(score.technical_score, 0);
        assert_eq!(score.communication_score, 0);
    }
}
