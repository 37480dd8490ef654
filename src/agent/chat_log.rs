//! Host chat-log and tool-API seams, with an in-memory chat log.
//!
//! The conversation driver never owns history. It asks a [`ChatLog`] to
//! prepare the turn, feeds it assistant deltas and reads the items back.
//! [`InMemoryChatLog`] is a complete implementation for hosts that keep
//! history in process (and for the CLI and tests).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::message::{Content, ConversationInput, ToolInput};
use super::stream::DeltaStream;
use super::tool::{SchemaSerializer, ToolDescriptor};
use crate::error::ConverseError;

/// A host tool API the model can call into.
#[async_trait]
pub trait LlmApi: Send + Sync {
    /// Identifier the options refer to.
    fn id(&self) -> &str;

    /// Tools offered to the model.
    fn tools(&self) -> &[ToolDescriptor];

    /// Renderer for host-specific schema leaves.
    fn custom_serializer(&self) -> Option<&SchemaSerializer> {
        None
    }

    /// Instructions appended to the system prompt while this API is active.
    fn api_prompt(&self) -> Option<&str> {
        None
    }

    /// Executes one tool call.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message; it is reported back to the model
    /// as the tool result rather than aborting the turn.
    async fn call_tool(&self, call: &ToolInput) -> Result<Value, String>;
}

/// Conversation history owned by the host.
#[async_trait]
pub trait ChatLog: Send {
    /// Identifier of the conversation.
    fn conversation_id(&self) -> &str;

    /// All items, oldest first.
    fn content(&self) -> &[Content];

    /// Tool API selected for the current turn.
    fn llm_api(&self) -> Option<&dyn LlmApi>;

    /// Whether the host should keep listening after this turn.
    fn continue_conversation(&self) -> bool;

    /// Whether the newest item is a tool result the model has not seen.
    fn unresponded_tool_results(&self) -> bool {
        matches!(self.content().last(), Some(Content::ToolResult { .. }))
    }

    /// Prepares the log for a turn: selects the tool API, installs the
    /// system prompt and records the user utterance.
    ///
    /// # Errors
    ///
    /// Returns [`ConverseError::Setup`] if the requested tool API is unknown.
    async fn update_llm_data(
        &mut self,
        domain: &str,
        input: &ConversationInput,
        llm_api: Option<&str>,
        prompt: &str,
    ) -> Result<(), ConverseError>;

    /// Consumes an assistant delta stream, appending the resulting items
    /// and running requested tools. Returns the appended items in order.
    ///
    /// # Errors
    ///
    /// Propagates the first error yielded by the stream. Items completed
    /// before the error stay in the log.
    async fn add_delta_content_stream(
        &mut self,
        agent_id: &str,
        deltas: DeltaStream<'_>,
    ) -> Result<Vec<Content>, ConverseError>;
}

/// Assistant message being assembled from deltas.
#[derive(Debug, Default)]
struct PendingMessage {
    content: String,
    tool_calls: Vec<ToolInput>,
}

impl PendingMessage {
    fn is_empty(&self) -> bool {
        self.content.is_empty() && self.tool_calls.is_empty()
    }
}

/// In-process chat log.
pub struct InMemoryChatLog {
    conversation_id: String,
    content: Vec<Content>,
    apis: HashMap<String, Arc<dyn LlmApi>>,
    llm_api: Option<Arc<dyn LlmApi>>,
}

impl InMemoryChatLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            content: Vec::new(),
            apis: HashMap::new(),
            llm_api: None,
        }
    }

    /// Makes a tool API selectable by id.
    #[must_use]
    pub fn with_api(mut self, api: Arc<dyn LlmApi>) -> Self {
        self.apis.insert(api.id().to_string(), api);
        self
    }

    fn system_prompt(&self, prompt: &str, input: &ConversationInput) -> String {
        let mut parts = vec![prompt.trim_end().to_string()];
        if let Some(api_prompt) = self.llm_api.as_ref().and_then(|api| api.api_prompt()) {
            parts.push(api_prompt.to_string());
        }
        if let Some(extra) = input.extra_system_prompt.as_deref() {
            parts.push(extra.to_string());
        }
        parts.retain(|p| !p.is_empty());
        parts.join("\n")
    }

    /// Appends a finished assistant message and the results of its tool calls.
    async fn flush(&mut self, agent_id: &str, pending: PendingMessage, added: &mut Vec<Content>) {
        if pending.is_empty() {
            return;
        }

        let calls = pending.tool_calls.clone();
        let assistant = Content::Assistant {
            agent_id: agent_id.to_string(),
            content: (!pending.content.is_empty()).then_some(pending.content),
            tool_calls: pending.tool_calls,
        };
        self.content.push(assistant.clone());
        added.push(assistant);

        for call in calls {
            let tool_result = self.run_tool(&call).await;
            let item = Content::ToolResult {
                agent_id: agent_id.to_string(),
                tool_call_id: call.id,
                tool_name: call.tool_name,
                tool_result,
            };
            self.content.push(item.clone());
            added.push(item);
        }
    }

    async fn run_tool(&self, call: &ToolInput) -> Value {
        let Some(api) = self.llm_api.as_ref() else {
            warn!(tool = %call.tool_name, "tool call without an active LLM API");
            return tool_error("no LLM API is active for this conversation");
        };

        debug!(tool = %call.tool_name, args = ?call.tool_args, "calling tool");
        match api.call_tool(call).await {
            Ok(value) => value,
            Err(message) => {
                warn!(tool = %call.tool_name, %message, "tool call failed");
                tool_error(&message)
            }
        }
    }
}

fn tool_error(message: &str) -> Value {
    json!({"error": "HomeAssistantError", "error_text": message})
}

impl std::fmt::Debug for InMemoryChatLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryChatLog")
            .field("conversation_id", &self.conversation_id)
            .field("content", &self.content)
            .field("apis", &self.apis.keys().collect::<Vec<_>>())
            .field("llm_api", &self.llm_api.as_ref().map(|api| api.id()))
            .finish()
    }
}

#[async_trait]
impl ChatLog for InMemoryChatLog {
    fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    fn content(&self) -> &[Content] {
        &self.content
    }

    fn llm_api(&self) -> Option<&dyn LlmApi> {
        self.llm_api.as_deref()
    }

    fn continue_conversation(&self) -> bool {
        match self.content.last() {
            Some(Content::Assistant {
                content: Some(text),
                ..
            }) => text
                .trim_end()
                .ends_with(['?', ';', '？', '；']),
            _ => false,
        }
    }

    async fn update_llm_data(
        &mut self,
        domain: &str,
        input: &ConversationInput,
        llm_api: Option<&str>,
        prompt: &str,
    ) -> Result<(), ConverseError> {
        self.llm_api = match llm_api {
            Some(id) => Some(self.apis.get(id).cloned().ok_or_else(|| ConverseError::Setup {
                message: format!("LLM API '{id}' is not available"),
            })?),
            None => None,
        };

        let system = Content::system(self.system_prompt(prompt, input));
        match self.content.first_mut() {
            Some(first @ Content::System { .. }) => *first = system,
            _ => self.content.insert(0, system),
        }
        self.content.push(Content::user(&input.text));

        debug!(
            domain,
            conversation_id = %self.conversation_id,
            llm_api = ?llm_api,
            items = self.content.len(),
            "prepared chat log"
        );
        Ok(())
    }

    async fn add_delta_content_stream(
        &mut self,
        agent_id: &str,
        mut deltas: DeltaStream<'_>,
    ) -> Result<Vec<Content>, ConverseError> {
        let mut added = Vec::new();
        let mut pending = PendingMessage::default();

        while let Some(delta) = deltas.next().await {
            let delta = match delta {
                Ok(delta) => delta,
                Err(err) => {
                    self.flush(agent_id, pending, &mut added).await;
                    return Err(err);
                }
            };

            if delta.role.is_some() {
                let finished = std::mem::take(&mut pending);
                self.flush(agent_id, finished, &mut added).await;
            }
            if let Some(text) = delta.content {
                pending.content.push_str(&text);
            }
            pending.tool_calls.extend(delta.tool_calls);
        }

        self.flush(agent_id, pending, &mut added).await;
        Ok(added)
    }
}
