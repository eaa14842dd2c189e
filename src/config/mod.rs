use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub telephony: TelephonyConfig,
    pub openai: OpenAiConfig,
    pub interview: InterviewConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Web origins allowed to reach the dashboard-facing endpoints.
    /// Enforcement is delegated to the deployment proxy; listed here so one
    /// config file carries the whole deployment surface.
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelephonyConfig {
    pub api_endpoint: Option<String>,
    pub account_id: Option<String>,
    pub auth_token: Option<String>,
    /// Number outbound calls are placed from.
    pub caller_number: Option<String>,
    /// Public base URL the provider uses to reach our callback endpoints.
    pub callback_base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub chat_endpoint: Option<String>,
    pub chat_model: Option<String>,
    pub transcription_endpoint: Option<String>,
    pub transcription_model: Option<String>,
    pub language: Option<String>,
    /// Sampling temperature for interview prompts and Q&A answers.
    pub qna_temperature: f32,
    /// Sampling temperature for the final structured score.
    pub scoring_temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterviewConfig {
    pub max_recording_secs: u32,
    pub silence_timeout_secs: u32,
    /// DTMF key that ends the Q&A loop.
    pub finish_on_key: String,
    pub fetch_attempts: u32,
    pub fetch_retry_delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Sessions idle longer than this are reclaimed by the sweeper.
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 3860,
            allowed_origins: Vec::new(),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            chat_endpoint: None,
            chat_model: Some("gpt-4o-mini".to_string()),
            transcription_endpoint: None,
            transcription_model: Some("whisper-1".to_string()),
            language: Some("en".to_string()),
            qna_temperature: 0.8,
            scoring_temperature: 0.2,
        }
    }
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            max_recording_secs: 120,
            silence_timeout_secs: 5,
            finish_on_key: "#".to_string(),
            fetch_attempts: 3,
            fetch_retry_delay_secs: 2,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 1800,
            sweep_interval_secs: 60,
        }
    }
}

/// Environment variables that override file-based secrets.
pub mod env_keys {
    pub const OPENAI_API_KEY: &str = "PHONESCREEN_OPENAI_API_KEY";
    pub const TELEPHONY_ACCOUNT_ID: &str = "PHONESCREEN_TELEPHONY_ACCOUNT_ID";
    pub const TELEPHONY_AUTH_TOKEN: &str = "PHONESCREEN_TELEPHONY_AUTH_TOKEN";
    pub const CALLBACK_BASE_URL: &str = "PHONESCREEN_CALLBACK_BASE_URL";
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let mut config = Self::default();
            config.save()?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let mut config: Self = toml::from_str(&content).context("Failed to parse config file")?;
        config.apply_env_overrides();

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Secrets may come from the environment instead of the config file.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(env_keys::OPENAI_API_KEY) {
            self.openai.api_key = Some(key);
        }
        if let Some(id) = lookup(env_keys::TELEPHONY_ACCOUNT_ID) {
            self.telephony.account_id = Some(id);
        }
        if let Some(token) = lookup(env_keys::TELEPHONY_AUTH_TOKEN) {
            self.telephony.auth_token = Some(token);
        }
        if let Some(url) = lookup(env_keys::CALLBACK_BASE_URL) {
            self.telephony.callback_base_url = Some(url);
        }
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 3860);
        assert_eq!(config.interview.finish_on_key, "#");
        assert_eq!(config.interview.fetch_attempts, 3);
        assert_eq!(config.session.ttl_secs, 1800);
        assert_eq!(config.openai.chat_model.as_deref(), Some("gpt-4o-mini"));
        assert!(config.openai.qna_temperature > config.openai.scoring_temperature);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 8080

            [interview]
            finish_on_key = "9"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.interview.finish_on_key, "9");
        // Unspecified sections keep their defaults
        assert_eq!(config.session.sweep_interval_secs, 60);
    }

    #[test]
    fn test_overrides_replace_secrets() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            env_keys::OPENAI_API_KEY => Some("sk-test-override".to_string()),
            env_keys::TELEPHONY_AUTH_TOKEN => Some("token-override".to_string()),
            _ => None,
        });
        assert_eq!(config.openai.api_key.as_deref(), Some("sk-test-override"));
        assert_eq!(config.telephony.auth_token.as_deref(), Some("token-override"));
    }

    #[test]
    fn test_overrides_leave_unset_keys_alone() {
        let mut config = Config::default();
        config.telephony.account_id = Some("ac-from-file".to_string());
        config.apply_overrides(|_| None);
        assert_eq!(config.telephony.account_id.as_deref(), Some("ac-from-file"));
        assert!(config.openai.api_key.is_none());
    }
}
