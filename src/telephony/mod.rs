//! Outbound call placement.
//!
//! Only the placement boundary lives here: the vendor's callback protocol is
//! rendered elsewhere from [`crate::interview::VoiceResponse`] documents.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{error, info};

use crate::config::TelephonyConfig;

/// Places outbound calls with a telephony provider.
#[async_trait]
pub trait CallPlacer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Dial `phone_number` and return the provider-assigned call id. The
    /// provider invokes `answer_url` (with the call id appended as a query
    /// parameter) once the call is answered.
    async fn place_call(&self, phone_number: &str, answer_url: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct CallCreatedResponse {
    call_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// REST telephony adapter: one authenticated POST per outbound call.
#[derive(Debug)]
pub struct RestCallPlacer {
    client: reqwest::Client,
    endpoint: String,
    account_id: String,
    auth_token: String,
    caller_number: String,
}

impl RestCallPlacer {
    pub fn from_config(config: &TelephonyConfig) -> Result<Self> {
        let endpoint = config
            .api_endpoint
            .clone()
            .context("telephony.api_endpoint is required")?;
        let account_id = config
            .account_id
            .clone()
            .context("telephony.account_id is required")?;
        let auth_token = config
            .auth_token
            .clone()
            .context("telephony.auth_token is required")?;
        let caller_number = config
            .caller_number
            .clone()
            .context("telephony.caller_number is required")?;

        info!("Initialized telephony adapter with endpoint: {}", endpoint);

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            account_id,
            auth_token,
            caller_number,
        })
    }
}

#[async_trait]
impl CallPlacer for RestCallPlacer {
    fn name(&self) -> &'static str {
        "REST telephony API"
    }

    async fn place_call(&self, phone_number: &str, answer_url: &str) -> Result<String> {
        let url = format!(
            "{}/accounts/{}/calls",
            self.endpoint.trim_end_matches('/'),
            self.account_id
        );

        info!("Placing outbound call to {}", phone_number);

        let params = [
            ("to", phone_number),
            ("from", self.caller_number.as_str()),
            ("answer_url", answer_url),
        ];

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_id, Some(&self.auth_token))
            .form(&params)
            .send()
            .await
            .context("Failed to send call placement request")?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .context("Failed to read call placement response body")?;

        if !status.is_success() {
            error!(
                "Call placement failed with status {}: {}",
                status, response_text
            );

            if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&response_text) {
                return Err(anyhow::anyhow!(
                    "Telephony API error: {}",
                    error_response.error
                ));
            }

            return Err(anyhow::anyhow!(
                "Call placement failed with status {}: {}",
                status,
                response_text
            ));
        }

        let created: CallCreatedResponse = serde_json::from_str(&response_text)
            .context("Failed to parse call placement response")?;

        info!(
            "Outbound call to {} placed: {}",
            phone_number, created.call_id
        );
        Ok(created.call_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_config() -> TelephonyConfig {
        TelephonyConfig {
            api_endpoint: Some("https://voice.example.com/v1".to_string()),
            account_id: Some("ac-1".to_string()),
            auth_token: Some("secret".to_string()),
            caller_number: Some("+15550100".to_string()),
            callback_base_url: Some("https://screen.example.com".to_string()),
        }
    }

    #[test]
    fn test_from_config_complete() {
        assert!(RestCallPlacer::from_config(&full_config()).is_ok());
    }

    #[test]
    fn test_from_config_requires_credentials() {
        let mut config = full_config();
        config.auth_token = None;
        let err = RestCallPlacer::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("auth_token"));
    }
}
