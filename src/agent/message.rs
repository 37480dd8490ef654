//! Platform-side conversation types.
//!
//! These mirror the host's chat-log model: content items, tool inputs,
//! assistant deltas and the conversation input/result pair. They carry no
//! wire-format concerns; see [`codec`](super::codec) for that.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Role of a chat-log content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// System instructions.
    System,
    /// User input.
    User,
    /// Assistant response.
    Assistant,
    /// Result of a tool call.
    ToolResult,
}

impl Role {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::ToolResult => "tool_result",
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInput {
    /// Provider-assigned call identifier.
    pub id: String,
    /// Name of the tool to invoke.
    pub tool_name: String,
    /// Structured arguments.
    pub tool_args: Map<String, Value>,
}

/// A single turn in conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Content {
    /// System prompt.
    System {
        /// Prompt text.
        content: String,
    },
    /// User utterance.
    User {
        /// Utterance text.
        content: String,
    },
    /// Assistant response, possibly with tool calls.
    Assistant {
        /// Agent that produced the response.
        agent_id: String,
        /// Response text, if any.
        content: Option<String>,
        /// Tool calls requested in this response.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolInput>,
    },
    /// Result of executing a tool call.
    ToolResult {
        /// Agent that requested the call.
        agent_id: String,
        /// Identifier of the originating call.
        tool_call_id: String,
        /// Name of the tool that ran.
        tool_name: String,
        /// JSON result value.
        tool_result: Value,
    },
}

impl Content {
    /// Creates a system item.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    /// Creates a user item.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    /// Creates an assistant item without tool calls.
    #[must_use]
    pub fn assistant(agent_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Assistant {
            agent_id: agent_id.into(),
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    /// Role of this item.
    #[must_use]
    pub const fn role(&self) -> Role {
        match self {
            Self::System { .. } => Role::System,
            Self::User { .. } => Role::User,
            Self::Assistant { .. } => Role::Assistant,
            Self::ToolResult { .. } => Role::ToolResult,
        }
    }

    /// Text content, if this item has any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::System { content } | Self::User { content } => Some(content),
            Self::Assistant { content, .. } => content.as_deref(),
            Self::ToolResult { .. } => None,
        }
    }
}

/// Incremental update to the in-progress assistant message.
///
/// A delta carrying a `role` starts a new assistant message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantContentDelta {
    /// Role marker, present on the first delta of a message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Text fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Completed tool calls.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolInput>,
}

impl AssistantContentDelta {
    /// A text-only delta.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// A delta carrying one completed tool call.
    #[must_use]
    pub fn tool_call(call: ToolInput) -> Self {
        Self {
            tool_calls: vec![call],
            ..Self::default()
        }
    }
}

/// A user utterance handed to the agent by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationInput {
    /// Utterance text.
    pub text: String,
    /// Existing conversation to continue, if any.
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// Language of the utterance.
    pub language: String,
    /// Agent that should answer.
    pub agent_id: String,
    /// Extra instructions appended to the system prompt for this turn.
    #[serde(default)]
    pub extra_system_prompt: Option<String>,
}

impl ConversationInput {
    /// Creates an input with no conversation id or extra prompt.
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        language: impl Into<String>,
        agent_id: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            conversation_id: None,
            language: language.into(),
            agent_id: agent_id.into(),
            extra_system_prompt: None,
        }
    }
}

/// Why an intent response is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentErrorCode {
    /// The agent failed before or while answering.
    Unknown,
    /// The request could not be understood.
    NoIntentMatch,
}

/// Speech response returned to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentResponse {
    /// Response language.
    pub language: String,
    /// Text to speak or display.
    pub speech: String,
    /// Set when the response reports a failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<IntentErrorCode>,
}

impl IntentResponse {
    /// A successful speech response.
    #[must_use]
    pub fn speech(language: impl Into<String>, speech: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            speech: speech.into(),
            error: None,
        }
    }

    /// An error response with the given message.
    #[must_use]
    pub fn error(
        language: impl Into<String>,
        code: IntentErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            language: language.into(),
            speech: message.into(),
            error: Some(code),
        }
    }
}

/// Outcome of one conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationResult {
    /// Speech response.
    pub response: IntentResponse,
    /// Conversation the turn belongs to.
    pub conversation_id: String,
    /// Whether the host should keep listening for a follow-up.
    pub continue_conversation: bool,
}

impl ConversationResult {
    /// Builds an error result for a failed turn.
    #[must_use]
    pub fn from_error(
        err: &crate::error::ConverseError,
        language: impl Into<String>,
        conversation_id: impl Into<String>,
    ) -> Self {
        Self {
            response: IntentResponse::error(language, IntentErrorCode::Unknown, err.to_string()),
            conversation_id: conversation_id.into(),
            continue_conversation: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConverseError;
    use serde_json::json;

    #[test]
    fn test_content_roles() {
        assert_eq!(Content::system("s").role(), Role::System);
        assert_eq!(Content::user("u").role(), Role::User);
        assert_eq!(Content::assistant("a", "hi").role(), Role::Assistant);
        assert_eq!(Role::ToolResult.as_str(), "tool_result");
    }

    #[test]
    fn test_content_text() {
        assert_eq!(Content::user("hello").text(), Some("hello"));
        let result = Content::ToolResult {
            agent_id: "a".to_string(),
            tool_call_id: "c1".to_string(),
            tool_name: "t".to_string(),
            tool_result: json!({"ok": true}),
        };
        assert_eq!(result.text(), None);
    }

    #[test]
    fn test_content_serialization() {
        let json = serde_json::to_string(&Content::user("test")).unwrap_or_default();
        assert!(json.contains("\"role\":\"user\""));

        let assistant = serde_json::to_string(&Content::assistant("agent", "ok")).unwrap_or_default();
        assert!(!assistant.contains("tool_calls"));
    }

    #[test]
    fn test_delta_constructors() {
        let delta = AssistantContentDelta::text("Hello");
        assert_eq!(delta.content.as_deref(), Some("Hello"));
        assert!(delta.role.is_none());

        let call = ToolInput {
            id: "c1".to_string(),
            tool_name: "get_state".to_string(),
            tool_args: Map::new(),
        };
        let delta = AssistantContentDelta::tool_call(call);
        assert_eq!(delta.tool_calls.len(), 1);
    }

    #[test]
    fn test_result_from_error() {
        let result =
            ConversationResult::from_error(&ConverseError::NoAssistantResponse, "ru", "conv-1");
        assert_eq!(result.response.error, Some(IntentErrorCode::Unknown));
        assert_eq!(result.conversation_id, "conv-1");
        assert!(!result.continue_conversation);
    }
}
