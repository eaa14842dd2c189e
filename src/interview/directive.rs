//! Declarative voice-response directives.
//!
//! Each callback transition answers with an ordered list of primitives; the
//! telephony integration layer renders them into the vendor's wire format.
//! The orchestrator never touches that format directly.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum VoiceDirective {
    /// Read the text to the caller via TTS.
    Speak { text: String },
    /// Play the "start talking now" tone.
    SignalTone,
    /// Record the caller and post the result to `callback_url`.
    Record {
        callback_url: String,
        max_duration_secs: u32,
        finish_on_key: String,
        silence_timeout_secs: u32,
    },
    /// Terminate the call.
    Hangup,
}

/// Ordered directive document returned to the telephony provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceResponse {
    pub directives: Vec<VoiceDirective>,
}

impl VoiceResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn speak(mut self, text: impl Into<String>) -> Self {
        self.directives.push(VoiceDirective::Speak { text: text.into() });
        self
    }

    pub fn signal_tone(mut self) -> Self {
        self.directives.push(VoiceDirective::SignalTone);
        self
    }

    pub fn record(
        mut self,
        callback_url: impl Into<String>,
        max_duration_secs: u32,
        finish_on_key: impl Into<String>,
        silence_timeout_secs: u32,
    ) -> Self {
        self.directives.push(VoiceDirective::Record {
            callback_url: callback_url.into(),
            max_duration_secs,
            finish_on_key: finish_on_key.into(),
            silence_timeout_secs,
        });
        self
    }

    pub fn hangup(mut self) -> Self {
        self.directives.push(VoiceDirective::Hangup);
        self
    }

    pub fn ends_call(&self) -> bool {
        self.directives
            .iter()
            .any(|d| matches!(d, VoiceDirective::Hangup))
    }

    pub fn spoken_lines(&self) -> Vec<&str> {
        self.directives
            .iter()
            .filter_map(|d| match d {
                VoiceDirective::Speak { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_builder_order() {
        let response = VoiceResponse::new()
            .speak("Hello")
            .signal_tone()
            .record("https://host/callbacks/CA1/introduction", 120, "#", 5);

        assert_eq!(response.directives.len(), 3);
        assert!(matches!(response.directives[0], VoiceDirective::Speak { .. }));
        assert!(matches!(response.directives[1], VoiceDirective::SignalTone));
        assert!(matches!(response.directives[2], VoiceDirective::Record { .. }));
        assert!(!response.ends_call());
    }

    #[test]
    fn test_hangup_detection() {
        let response = VoiceResponse::new().speak("Goodbye").hangup();
        assert!(response.ends_call());
        assert_eq!(response.spoken_lines(), vec!["Goodbye"]);
    }

    #[test]
    fn test_json_shape() {
        let response = VoiceResponse::new()
            .speak("Hi")
            .record("https://host/cb", 60, "#", 5)
            .hangup();

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({
                "directives": [
                    { "action": "speak", "text": "Hi" },
                    {
                        "action": "record",
                        "callback_url": "https://host/cb",
                        "max_duration_secs": 60,
                        "finish_on_key": "#",
                        "silence_timeout_secs": 5
                    },
                    { "action": "hangup" }
                ]
            })
        );
    }
}
