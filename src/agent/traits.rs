//! Conversation entity trait and the Cloud.ru conversation agent.
//!
//! The host talks to every conversation agent through
//! [`ConversationEntity`]. [`ConversationAgent`] is the one implementation:
//! it prepares the chat log, runs the bounded tool loop against its
//! provider and turns the final assistant message into a
//! [`ConversationResult`].

use std::sync::Arc;

use async_openai::types::ChatCompletionTool;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info};

use super::agentic_loop::agentic_loop;
use super::chat_log::{ChatLog, LlmApi};
use super::codec::encode_all;
use super::config::{ConversationOptions, EntryConfig, Integration, MAX_TOOL_ITERATIONS};
use super::message::{Content, ConversationInput, ConversationResult, IntentResponse};
use super::prompt::render_prompt_template;
use super::provider::LlmProvider;
use super::tool::format_tool;
use crate::error::{ConverseError, ToolError};

/// Languages an entity accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupportedLanguages {
    /// Any language, serialized as `"*"`.
    All,
    /// Only the listed language codes.
    Only(Vec<String>),
}

impl Serialize for SupportedLanguages {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::All => serializer.serialize_str("*"),
            Self::Only(languages) => languages.serialize(serializer),
        }
    }
}

/// Optional capabilities of a conversation entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationFeature {
    /// The agent can control devices through a tool API.
    Control,
}

/// Device the entity is grouped under in the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// `(domain, entry id)` identifier pair.
    pub identifiers: (String, String),
    /// Display name (the entry title).
    pub name: String,
    /// Manufacturer name.
    pub manufacturer: String,
    /// Model name.
    pub model: String,
    /// Device entry type; always `"service"`.
    pub entry_type: String,
}

/// A conversation agent as seen by the host.
#[async_trait]
pub trait ConversationEntity: Send + Sync {
    /// Stable unique id (the config entry id).
    fn unique_id(&self) -> &str;

    /// Device grouping information.
    fn device_info(&self) -> &DeviceInfo;

    /// Languages the agent accepts.
    fn supported_languages(&self) -> SupportedLanguages;

    /// Optional capabilities.
    fn supported_features(&self) -> Vec<ConversationFeature>;

    /// Handles one user utterance.
    ///
    /// Chat-log preparation failures come back as an error
    /// [`ConversationResult`]; everything else that aborts the turn is an
    /// `Err`.
    ///
    /// # Errors
    ///
    /// Returns [`ConverseError`] for provider, protocol, template and
    /// loop-exhaustion failures.
    async fn handle_message(
        &self,
        input: &ConversationInput,
        chat_log: &mut dyn ChatLog,
    ) -> Result<ConversationResult, ConverseError>;
}

/// Conversation agent backed by Cloud.ru Foundation Models.
pub struct ConversationAgent {
    entry_id: String,
    options: ConversationOptions,
    integration: Integration,
    device_info: DeviceInfo,
    provider: Arc<dyn LlmProvider>,
}

impl ConversationAgent {
    /// Creates an agent for an entry, sharing an existing provider.
    #[must_use]
    pub fn new(entry: &EntryConfig, integration: Integration, provider: Arc<dyn LlmProvider>) -> Self {
        let device_info = DeviceInfo {
            identifiers: (integration.domain.to_string(), entry.entry_id.clone()),
            name: entry.title.clone(),
            manufacturer: integration.manufacturer.to_string(),
            model: integration.model.to_string(),
            entry_type: "service".to_string(),
        };

        Self {
            entry_id: entry.entry_id.clone(),
            options: entry.options.clone(),
            integration,
            device_info,
            provider,
        }
    }

    /// Options this agent was created with.
    #[must_use]
    pub const fn options(&self) -> &ConversationOptions {
        &self.options
    }

    /// Handles an utterance and converts any failure into an error result.
    pub async fn converse(
        &self,
        input: &ConversationInput,
        chat_log: &mut dyn ChatLog,
    ) -> ConversationResult {
        match self.handle_message(input, chat_log).await {
            Ok(result) => result,
            Err(err) => {
                error!(
                    error = %err,
                    key = err.translation_key(),
                    conversation_id = chat_log.conversation_id(),
                    "conversation turn failed"
                );
                ConversationResult::from_error(&err, &input.language, chat_log.conversation_id())
            }
        }
    }

    fn format_tools(api: &dyn LlmApi) -> Result<Vec<ChatCompletionTool>, ToolError> {
        api.tools()
            .iter()
            .map(|tool| format_tool(tool, api.custom_serializer()))
            .collect()
    }
}

impl std::fmt::Debug for ConversationAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationAgent")
            .field("entry_id", &self.entry_id)
            .field("options", &self.options)
            .field("provider", &self.provider.name())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ConversationEntity for ConversationAgent {
    fn unique_id(&self) -> &str {
        &self.entry_id
    }

    fn device_info(&self) -> &DeviceInfo {
        &self.device_info
    }

    fn supported_languages(&self) -> SupportedLanguages {
        SupportedLanguages::All
    }

    fn supported_features(&self) -> Vec<ConversationFeature> {
        if self.options.llm_api.is_some() {
            vec![ConversationFeature::Control]
        } else {
            Vec::new()
        }
    }

    async fn handle_message(
        &self,
        input: &ConversationInput,
        chat_log: &mut dyn ChatLog,
    ) -> Result<ConversationResult, ConverseError> {
        let options = &self.options;
        let system_prompt = options.system_prompt();

        if let Err(err) = chat_log
            .update_llm_data(
                self.integration.domain,
                input,
                options.llm_api.as_deref(),
                system_prompt,
            )
            .await
        {
            error!(error = %err, "failed to prepare chat log");
            return Ok(ConversationResult::from_error(
                &err,
                &input.language,
                chat_log.conversation_id(),
            ));
        }

        let tools = chat_log.llm_api().map(Self::format_tools).transpose()?;

        let system_prompt_override = if options.bypass_default_prompt {
            Some(render_prompt_template(
                system_prompt,
                input,
                chat_log.conversation_id(),
            )?)
        } else {
            None
        };

        let mut messages = encode_all(chat_log.content(), system_prompt_override.as_deref());

        let iterations = agentic_loop(
            self.provider.as_ref(),
            chat_log,
            options,
            tools.as_deref(),
            &input.agent_id,
            &mut messages,
            MAX_TOOL_ITERATIONS,
        )
        .await?;

        let Some(Content::Assistant { content, .. }) = chat_log.content().last() else {
            error!(iterations, "API did not return a valid assistant response");
            return Err(ConverseError::NoAssistantResponse);
        };

        info!(
            iterations,
            conversation_id = chat_log.conversation_id(),
            "turn answered"
        );
        Ok(ConversationResult {
            response: IntentResponse::speech(&input.language, content.clone().unwrap_or_default()),
            conversation_id: chat_log.conversation_id().to_string(),
            continue_conversation: chat_log.continue_conversation(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::chat_log::InMemoryChatLog;
    use crate::agent::config::CLOUD_RU;
    use crate::agent::message::{IntentErrorCode, ToolInput};
    use crate::agent::testing::{ScriptedProvider, text_reply, tool_reply};
    use crate::agent::tool::ToolDescriptor;
    use serde_json::{Value, json};

    struct HomeApi {
        tools: Vec<ToolDescriptor>,
    }

    #[async_trait]
    impl LlmApi for HomeApi {
        fn id(&self) -> &str {
            "assist"
        }

        fn tools(&self) -> &[ToolDescriptor] {
            &self.tools
        }

        async fn call_tool(&self, call: &ToolInput) -> Result<Value, String> {
            Ok(json!({"called": call.tool_name}))
        }
    }

    fn home_api() -> Arc<HomeApi> {
        Arc::new(HomeApi {
            tools: vec![ToolDescriptor::new(
                "HassTurnOn",
                "Turns on a device",
                json!({"type": "object", "properties": {"name": {"type": "string"}}, "required": {}}),
            )],
        })
    }

    fn agent(options: ConversationOptions, provider: Arc<ScriptedProvider>) -> ConversationAgent {
        let entry = EntryConfig::new("entry-1", "key", "proj").with_options(options);
        ConversationAgent::new(&entry, CLOUD_RU, provider)
    }

    fn input() -> ConversationInput {
        ConversationInput::new("Включи свет на кухне", "ru", "conversation.cloud_ru")
    }

    #[tokio::test]
    async fn test_plain_answer() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(text_reply("Привет!"))]));
        let agent = agent(ConversationOptions::default(), provider.clone());
        let mut log = InMemoryChatLog::new("conv-1");

        let result = agent
            .handle_message(&input(), &mut log)
            .await
            .unwrap_or_else(|e| panic!("turn failed: {e}"));

        assert_eq!(result.response.speech, "Привет!");
        assert_eq!(result.conversation_id, "conv-1");
        assert!(!result.continue_conversation);

        let request = &provider.requests()[0];
        assert_eq!(request["tool_choice"], "none");
        assert!(request.get("tools").is_none());
        assert_eq!(request["messages"][0]["role"], "system");
    }

    #[tokio::test]
    async fn test_tool_turn() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(tool_reply("c1", "HassTurnOn", &json!({"name": "кухня"}))),
            Ok(text_reply("Включил свет на кухне.")),
        ]));
        let options = ConversationOptions::builder().llm_api("assist").build();
        let agent = agent(options, provider.clone());
        let mut log = InMemoryChatLog::new("conv-1").with_api(home_api());

        let result = agent
            .handle_message(&input(), &mut log)
            .await
            .unwrap_or_else(|e| panic!("turn failed: {e}"));

        assert_eq!(result.response.speech, "Включил свет на кухне.");
        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0]["tool_choice"], "auto");
        assert_eq!(requests[0]["parallel_tool_calls"], false);
        // Empty `required` map is dropped from the declaration.
        assert!(requests[0]["tools"][0]["function"]["parameters"].get("required").is_none());
        assert_eq!(agent.supported_features(), vec![ConversationFeature::Control]);
    }

    #[tokio::test]
    async fn test_bypass_renders_template_as_system_message() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(text_reply("Ок"))]));
        let options = ConversationOptions::builder()
            .prompt("Язык: {{ language }}.")
            .bypass_default_prompt(true)
            .build();
        let agent = agent(options, provider.clone());
        let mut log = InMemoryChatLog::new("conv-1");
        let mut input = input();
        input.extra_system_prompt = Some(" Дополнительно.".to_string());

        let _ = agent
            .handle_message(&input, &mut log)
            .await
            .unwrap_or_else(|e| panic!("turn failed: {e}"));

        let request = &provider.requests()[0];
        assert_eq!(request["messages"][0]["content"], "Язык: ru. Дополнительно.");
    }

    #[tokio::test]
    async fn test_template_error() {
        let provider = Arc::new(ScriptedProvider::new(Vec::new()));
        let options = ConversationOptions::builder()
            .prompt("{{ unknown_variable }}")
            .bypass_default_prompt(true)
            .build();
        let agent = agent(options, provider.clone());
        let mut log = InMemoryChatLog::new("conv-1");

        let result = agent.handle_message(&input(), &mut log).await;
        assert!(matches!(result, Err(ConverseError::Template(_))));
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn test_loop_exhaustion_is_no_assistant_response() {
        let reply = tool_reply("c1", "HassTurnOn", &json!({}));
        let provider = Arc::new(ScriptedProvider::repeating(&reply, MAX_TOOL_ITERATIONS));
        let options = ConversationOptions::builder().llm_api("assist").build();
        let agent = agent(options, provider.clone());
        let mut log = InMemoryChatLog::new("conv-1").with_api(home_api());

        let result = agent.handle_message(&input(), &mut log).await;
        assert!(matches!(result, Err(ConverseError::NoAssistantResponse)));
        assert_eq!(provider.requests().len(), MAX_TOOL_ITERATIONS);
    }

    #[tokio::test]
    async fn test_empty_response_is_no_assistant_response() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(Vec::new())]));
        let agent = agent(ConversationOptions::default(), provider);
        let mut log = InMemoryChatLog::new("conv-1");

        let result = agent.handle_message(&input(), &mut log).await;
        assert!(matches!(result, Err(ConverseError::NoAssistantResponse)));
    }

    #[tokio::test]
    async fn test_rate_limit_surfaces() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(ConverseError::RateLimited {
            message: "429 Too Many Requests".to_string(),
        })]));
        let agent = agent(ConversationOptions::default(), provider);
        let mut log = InMemoryChatLog::new("conv-1");

        let result = agent.handle_message(&input(), &mut log).await;
        let Err(err) = result else {
            panic!("expected failure");
        };
        assert_eq!(err.translation_key(), "rate_limited");
    }

    #[tokio::test]
    async fn test_unknown_api_becomes_error_result() {
        let provider = Arc::new(ScriptedProvider::new(Vec::new()));
        let options = ConversationOptions::builder().llm_api("missing").build();
        let agent = agent(options, provider);
        let mut log = InMemoryChatLog::new("conv-1");

        let result = agent
            .handle_message(&input(), &mut log)
            .await
            .unwrap_or_else(|e| panic!("expected an error result, got {e}"));
        assert_eq!(result.response.error, Some(IntentErrorCode::Unknown));
    }

    #[tokio::test]
    async fn test_converse_maps_errors() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(ConverseError::Api {
            message: "boom".to_string(),
        })]));
        let agent = agent(ConversationOptions::default(), provider);
        let mut log = InMemoryChatLog::new("conv-9");

        let result = agent.converse(&input(), &mut log).await;
        assert_eq!(result.conversation_id, "conv-9");
        assert_eq!(result.response.error, Some(IntentErrorCode::Unknown));
        assert!(result.response.speech.contains("boom"));
    }

    #[test]
    fn test_identity() {
        let agent = agent(
            ConversationOptions::default(),
            Arc::new(ScriptedProvider::default()),
        );
        assert_eq!(agent.unique_id(), "entry-1");
        assert_eq!(agent.supported_languages(), SupportedLanguages::All);
        assert!(agent.supported_features().is_empty());
        assert_eq!(agent.device_info().manufacturer, "Cloud.ru");
        assert_eq!(agent.device_info().entry_type, "service");
        assert_eq!(
            serde_json::to_value(SupportedLanguages::All).unwrap_or_default(),
            json!("*")
        );
    }
}
