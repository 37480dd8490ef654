//! Per-iteration chat-completion request.
//!
//! [`TurnRequest`] wraps the standard request with the fields the Foundation
//! Models endpoint understands on top of the `OpenAI` shape: vLLM stream
//! usage flags and chat-template arguments for switching thinking off.

use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionTool, ChatCompletionToolChoiceOption,
    CreateChatCompletionRequest,
};
use serde::Serialize;

use super::config::ConversationOptions;

/// Stream usage reporting flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamOptions {
    /// Send a final usage chunk.
    pub include_usage: bool,
    /// Attach usage to every chunk.
    pub continuous_usage_stats: bool,
}

/// Arguments forwarded to the model's chat template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChatTemplateKwargs {
    /// Whether the model may emit a reasoning block.
    pub enable_thinking: bool,
}

/// A streaming chat-completion request for one loop iteration.
#[derive(Debug, Clone, Serialize)]
pub struct TurnRequest {
    /// Standard request body.
    #[serde(flatten)]
    pub chat: CreateChatCompletionRequest,
    /// Usage reporting flags.
    pub stream_options: StreamOptions,
    /// Template arguments; only sent when thinking mode is off.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_template_kwargs: Option<ChatTemplateKwargs>,
}

impl TurnRequest {
    /// Builds the request for one iteration of a turn.
    ///
    /// Tool choice is `auto` when tools are offered and `none` otherwise.
    /// Parallel tool calls are always disabled.
    #[must_use]
    pub fn new(
        options: &ConversationOptions,
        messages: Vec<ChatCompletionRequestMessage>,
        tools: Option<Vec<ChatCompletionTool>>,
        conversation_id: &str,
    ) -> Self {
        let tools = tools.filter(|t| !t.is_empty());
        let tool_choice = if tools.is_some() {
            ChatCompletionToolChoiceOption::Auto
        } else {
            ChatCompletionToolChoiceOption::None
        };

        let chat = CreateChatCompletionRequest {
            model: options.chat_model.clone(),
            messages,
            tools,
            tool_choice: Some(tool_choice),
            parallel_tool_calls: Some(false),
            max_completion_tokens: Some(options.max_tokens),
            top_p: Some(options.top_p),
            temperature: Some(options.temperature),
            user: Some(conversation_id.to_string()),
            stream: Some(true),
            ..Default::default()
        };

        Self {
            chat,
            stream_options: StreamOptions::default(),
            chat_template_kwargs: (!options.thinking_mode).then_some(ChatTemplateKwargs {
                enable_thinking: false,
            }),
        }
    }

    /// Number of messages in the request.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.chat.messages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::codec::encode;
    use crate::agent::message::Content;
    use async_openai::types::{ChatCompletionToolType, FunctionObject};
    use serde_json::{Value, json};

    fn tool() -> ChatCompletionTool {
        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: "HassTurnOn".to_string(),
                description: None,
                parameters: Some(json!({"type": "object", "properties": {}})),
                strict: None,
            },
        }
    }

    fn to_json(request: &TurnRequest) -> Value {
        serde_json::to_value(request).unwrap_or_default()
    }

    #[test]
    fn test_request_defaults_serialized() {
        let options = ConversationOptions::default();
        let request = TurnRequest::new(
            &options,
            vec![encode(&Content::user("Привет"), None)],
            None,
            "conv-1",
        );
        let json = to_json(&request);

        assert_eq!(json["model"], "MiniMaxAI/MiniMax-M2");
        assert_eq!(json["stream"], true);
        assert_eq!(json["parallel_tool_calls"], false);
        assert_eq!(json["tool_choice"], "none");
        assert_eq!(json["user"], "conv-1");
        assert_eq!(json["max_completion_tokens"], 1024);
        assert_eq!(json["temperature"], 0.5);
        assert_eq!(json["top_p"], 0.5);
        assert_eq!(
            json["stream_options"],
            json!({"include_usage": false, "continuous_usage_stats": false})
        );
        assert_eq!(json["chat_template_kwargs"], json!({"enable_thinking": false}));
        assert!(json.get("tools").is_none());
        assert_eq!(request.message_count(), 1);
    }

    #[test]
    fn test_tools_enable_auto_choice() {
        let options = ConversationOptions::default();
        let request = TurnRequest::new(&options, Vec::new(), Some(vec![tool()]), "conv-1");
        let json = to_json(&request);
        assert_eq!(json["tool_choice"], "auto");
        assert_eq!(json["tools"][0]["function"]["name"], "HassTurnOn");
    }

    #[test]
    fn test_empty_tool_list_treated_as_none() {
        let options = ConversationOptions::default();
        let request = TurnRequest::new(&options, Vec::new(), Some(Vec::new()), "conv-1");
        assert!(request.chat.tools.is_none());
        assert_eq!(to_json(&request)["tool_choice"], "none");
    }

    #[test]
    fn test_thinking_mode_omits_template_kwargs() {
        let options = ConversationOptions::builder().thinking_mode(true).build();
        let request = TurnRequest::new(&options, Vec::new(), None, "conv-1");
        assert!(to_json(&request).get("chat_template_kwargs").is_none());
    }

    #[test]
    fn test_options_flow_into_request() {
        let options = ConversationOptions::builder()
            .chat_model("Qwen/Qwen3-235B-A22B-Instruct-2507")
            .max_tokens(256)
            .temperature(0.2)
            .build();
        let request = TurnRequest::new(&options, Vec::new(), None, "conv-2");
        assert_eq!(request.chat.model, "Qwen/Qwen3-235B-A22B-Instruct-2507");
        assert_eq!(request.chat.max_completion_tokens, Some(256));
        assert_eq!(request.chat.temperature, Some(0.2));
    }
}
