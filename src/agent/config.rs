//! Conversation options, entry credentials and integration constants.
//!
//! Options are resolved in order: explicit values → environment variables → defaults.
//! Hosts that persist options as JSON can deserialize [`ConversationOptions`]
//! directly; missing keys fall back to the same defaults.

use serde::{Deserialize, Serialize};

use super::prompt::DEFAULT_INSTRUCTIONS_PROMPT;
use crate::error::SetupError;

/// Default chat model.
pub const DEFAULT_CHAT_MODEL: &str = "MiniMaxAI/MiniMax-M2";
/// Default maximum completion tokens.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.5;
/// Default nucleus sampling probability.
pub const DEFAULT_TOP_P: f32 = 0.5;
/// Maximum model ↔ tool round-trips in a single turn.
pub const MAX_TOOL_ITERATIONS: usize = 10;
/// Timeout for the credential check at setup, in seconds.
pub const VALIDATION_TIMEOUT_SECS: u64 = 10;

/// Fixed facts about the remote service and how the integration presents itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Integration {
    /// Integration domain, used as the chat-log owner and device namespace.
    pub domain: &'static str,
    /// Base URI of the chat-completion API.
    pub base_uri: &'static str,
    /// Header carrying the API key.
    pub api_key_header: &'static str,
    /// Header carrying the project identifier.
    pub project_id_header: &'static str,
    /// Device manufacturer shown by the host.
    pub manufacturer: &'static str,
    /// Device model shown by the host.
    pub model: &'static str,
}

/// Cloud.ru Foundation Models.
pub const CLOUD_RU: Integration = Integration {
    domain: "cloud_ru_ai",
    base_uri: "https://foundation-models.api.cloud.ru/v1",
    api_key_header: "x-api-key",
    project_id_header: "x-project-id",
    manufacturer: "Cloud.ru",
    model: "Foundation Models",
};

impl Default for Integration {
    fn default() -> Self {
        CLOUD_RU
    }
}

/// A configured integration instance: credentials plus host bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryConfig {
    /// Host-assigned entry identifier, also the agent's unique id.
    pub entry_id: String,
    /// Human-readable entry title.
    pub title: String,
    /// API key sent as `x-api-key`.
    pub api_key: String,
    /// Project identifier sent as `x-project-id`.
    pub project_id: String,
    /// Overrides the integration's base URI (proxies, test servers).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Per-entry conversation options.
    #[serde(default)]
    pub options: ConversationOptions,
}

impl EntryConfig {
    /// Creates an entry with default options.
    #[must_use]
    pub fn new(
        entry_id: impl Into<String>,
        api_key: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            entry_id: entry_id.into(),
            title: "Cloud.ru Foundation Models".to_string(),
            api_key: api_key.into(),
            project_id: project_id.into(),
            base_url: None,
            options: ConversationOptions::default(),
        }
    }

    /// Sets the base URI override.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the conversation options.
    #[must_use]
    pub fn with_options(mut self, options: ConversationOptions) -> Self {
        self.options = options;
        self
    }

    /// The base URI requests go to.
    #[must_use]
    pub fn api_base<'a>(&'a self, integration: &'a Integration) -> &'a str {
        self.base_url.as_deref().unwrap_or(integration.base_uri)
    }

    /// Reads credentials from `CLOUDRU_API_KEY` and `CLOUDRU_PROJECT_ID`,
    /// and the optional base URI override from `CLOUDRU_BASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::InvalidConfig`] if either variable is unset.
    pub fn from_env(entry_id: impl Into<String>) -> Result<Self, SetupError> {
        let api_key = require_env("CLOUDRU_API_KEY")?;
        let project_id = require_env("CLOUDRU_PROJECT_ID")?;
        let mut entry = Self::new(entry_id, api_key, project_id);
        entry.base_url = std::env::var("CLOUDRU_BASE_URL").ok();
        Ok(entry)
    }

    /// Checks that both credentials are present.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::InvalidConfig`] naming the first empty field.
    pub fn validate(&self) -> Result<(), SetupError> {
        if self.api_key.trim().is_empty() {
            return Err(SetupError::InvalidConfig {
                message: "api_key is required".to_string(),
            });
        }
        if self.project_id.trim().is_empty() {
            return Err(SetupError::InvalidConfig {
                message: "project_id is required".to_string(),
            });
        }
        Ok(())
    }
}

fn require_env(name: &str) -> Result<String, SetupError> {
    std::env::var(name).map_err(|_| SetupError::InvalidConfig {
        message: format!("{name} is not set"),
    })
}

/// User-adjustable options for the conversation agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationOptions {
    /// Instructions prompt. `None` uses [`DEFAULT_INSTRUCTIONS_PROMPT`].
    pub prompt: Option<String>,
    /// Render the prompt as a template and send it instead of the
    /// host-assembled system prompt.
    #[serde(alias = "no_ha_default_prompt")]
    pub bypass_default_prompt: bool,
    /// Chat model identifier.
    pub chat_model: String,
    /// Maximum completion tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling probability.
    pub top_p: f32,
    /// Let the model emit reasoning traces.
    pub thinking_mode: bool,
    /// Identifier of the host LLM tool API to expose, if any.
    #[serde(alias = "llm_hass_api")]
    pub llm_api: Option<String>,
}

impl Default for ConversationOptions {
    fn default() -> Self {
        Self {
            prompt: None,
            bypass_default_prompt: false,
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            thinking_mode: false,
            llm_api: None,
        }
    }
}

impl ConversationOptions {
    /// Creates a new builder for `ConversationOptions`.
    #[must_use]
    pub fn builder() -> ConversationOptionsBuilder {
        ConversationOptionsBuilder::default()
    }

    /// Creates options from environment variables with defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::builder().from_env().build()
    }

    /// The effective instructions prompt.
    #[must_use]
    pub fn system_prompt(&self) -> &str {
        self.prompt.as_deref().unwrap_or(DEFAULT_INSTRUCTIONS_PROMPT)
    }
}

/// Builder for [`ConversationOptions`].
#[derive(Debug, Clone, Default)]
pub struct ConversationOptionsBuilder {
    prompt: Option<String>,
    bypass_default_prompt: Option<bool>,
    chat_model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    top_p: Option<f32>,
    thinking_mode: Option<bool>,
    llm_api: Option<String>,
}

impl ConversationOptionsBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.prompt.is_none() {
            self.prompt = std::env::var("CLOUDRU_PROMPT").ok();
        }
        if self.chat_model.is_none() {
            self.chat_model = std::env::var("CLOUDRU_CHAT_MODEL").ok();
        }
        if self.max_tokens.is_none() {
            self.max_tokens = parse_env("CLOUDRU_MAX_TOKENS");
        }
        if self.temperature.is_none() {
            self.temperature = parse_env("CLOUDRU_TEMPERATURE");
        }
        if self.top_p.is_none() {
            self.top_p = parse_env("CLOUDRU_TOP_P");
        }
        if self.thinking_mode.is_none() {
            self.thinking_mode = parse_env("CLOUDRU_THINKING_MODE");
        }
        self
    }

    /// Sets the instructions prompt.
    #[must_use]
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Sets whether the host's default prompt is bypassed.
    #[must_use]
    pub const fn bypass_default_prompt(mut self, bypass: bool) -> Self {
        self.bypass_default_prompt = Some(bypass);
        self
    }

    /// Sets the chat model.
    #[must_use]
    pub fn chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = Some(model.into());
        self
    }

    /// Sets the maximum completion tokens.
    #[must_use]
    pub const fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    /// Sets the nucleus sampling probability.
    #[must_use]
    pub const fn top_p(mut self, p: f32) -> Self {
        self.top_p = Some(p);
        self
    }

    /// Sets thinking mode.
    #[must_use]
    pub const fn thinking_mode(mut self, enabled: bool) -> Self {
        self.thinking_mode = Some(enabled);
        self
    }

    /// Sets the host LLM tool API identifier.
    #[must_use]
    pub fn llm_api(mut self, id: impl Into<String>) -> Self {
        self.llm_api = Some(id.into());
        self
    }

    /// Builds the [`ConversationOptions`].
    #[must_use]
    pub fn build(self) -> ConversationOptions {
        let defaults = ConversationOptions::default();
        ConversationOptions {
            prompt: self.prompt,
            bypass_default_prompt: self
                .bypass_default_prompt
                .unwrap_or(defaults.bypass_default_prompt),
            chat_model: self.chat_model.unwrap_or(defaults.chat_model),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            top_p: self.top_p.unwrap_or(defaults.top_p),
            thinking_mode: self.thinking_mode.unwrap_or(defaults.thinking_mode),
            llm_api: self.llm_api,
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
