//! Error types for cloudru-assist.
//!
//! Errors are split by the phase they occur in: entry setup
//! ([`SetupError`]), a single conversation turn ([`ConverseError`]),
//! tool schema conversion ([`ToolError`]) and prompt rendering
//! ([`TemplateError`]).

use thiserror::Error;

/// Result alias for conversation-turn operations.
pub type Result<T> = std::result::Result<T, ConverseError>;

/// Errors raised while setting up a config entry.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The remote API rejected the credentials. Not retryable.
    #[error("authentication failed: {message}")]
    AuthFailed {
        /// Provider-supplied reason.
        message: String,
    },

    /// The remote API could not be reached or answered with an error.
    /// The host should retry the setup later.
    #[error("service not ready: {message}")]
    NotReady {
        /// Description of the connectivity failure.
        message: String,
    },

    /// The entry configuration is incomplete or invalid.
    #[error("invalid entry configuration: {message}")]
    InvalidConfig {
        /// What is wrong with the configuration.
        message: String,
    },
}

impl SetupError {
    /// Returns `true` if the host should schedule another setup attempt.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::NotReady { .. })
    }
}

/// Errors raised while converting a tool's parameter schema.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The schema (or a nested part of it) has the wrong JSON shape.
    #[error("invalid schema for tool '{name}': {message}")]
    InvalidSchema {
        /// Tool whose schema failed to convert.
        name: String,
        /// What was wrong.
        message: String,
    },
}

/// Errors raised while rendering a prompt template.
#[derive(Debug, Error)]
#[error("error rendering prompt template: {message}")]
pub struct TemplateError {
    /// Renderer diagnostic, including the source chain.
    pub message: String,
}

impl From<tera::Error> for TemplateError {
    fn from(err: tera::Error) -> Self {
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self { message }
    }
}

/// Errors that abort a single conversation turn.
///
/// Prior chat history is left untouched; the next turn starts from it.
#[derive(Debug, Error)]
pub enum ConverseError {
    /// The provider rate-limited the request.
    #[error("rate limited by provider: {message}")]
    RateLimited {
        /// Provider error text.
        message: String,
    },

    /// Any other provider or transport failure.
    #[error("error talking to provider: {message}")]
    Api {
        /// Provider error text.
        message: String,
    },

    /// The response stream violated the chat-completion protocol.
    #[error("unexpected stream content: {message}")]
    Protocol {
        /// Description of the violation.
        message: String,
    },

    /// Accumulated tool-call arguments were not valid JSON.
    #[error("invalid arguments for tool call '{tool_name}': {source}")]
    InvalidToolArguments {
        /// Tool the arguments belong to.
        tool_name: String,
        /// JSON parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// The system prompt template failed to render.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// A tool declaration could not be built.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// The loop ended without the chat log ending in an assistant message.
    #[error("provider did not return a valid assistant response")]
    NoAssistantResponse,

    /// The chat log could not prepare LLM data for the turn.
    #[error("failed to prepare conversation: {message}")]
    Setup {
        /// Host-supplied reason.
        message: String,
    },
}

impl ConverseError {
    /// Stable key a host uses to look up a localized message.
    #[must_use]
    pub const fn translation_key(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::Api { .. } => "api_error",
            Self::Protocol { .. } | Self::InvalidToolArguments { .. } => "invalid_response",
            Self::Template(_) => "template_error",
            Self::Tool(_) => "tool_error",
            Self::NoAssistantResponse => "no_assistant_response",
            Self::Setup { .. } => "setup_error",
        }
    }

    /// Returns `true` for the rate-limit failure category.
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}
