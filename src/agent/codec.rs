//! Chat-log content → chat-completion wire messages.

use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessage,
    ChatCompletionRequestAssistantMessageContent, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestSystemMessageContent,
    ChatCompletionRequestToolMessage, ChatCompletionRequestToolMessageContent,
    ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageContent,
    ChatCompletionToolType, FunctionCall,
};
use serde_json::Value;

use super::message::Content;

/// Encodes one chat-log item as a wire message.
///
/// `system_prompt_override` replaces the text of a system item; it carries a
/// template-rendered prompt that bypasses the host's prompt assembly.
#[must_use]
pub fn encode(content: &Content, system_prompt_override: Option<&str>) -> ChatCompletionRequestMessage {
    match content {
        Content::ToolResult {
            tool_call_id,
            tool_result,
            ..
        } => ChatCompletionRequestMessage::Tool(ChatCompletionRequestToolMessage {
            content: ChatCompletionRequestToolMessageContent::Text(tool_result.to_string()),
            tool_call_id: tool_call_id.clone(),
        }),
        Content::Assistant {
            content,
            tool_calls,
            ..
        } => {
            let tool_calls = if tool_calls.is_empty() {
                None
            } else {
                Some(
                    tool_calls
                        .iter()
                        .map(|call| ChatCompletionMessageToolCall {
                            id: call.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: call.tool_name.clone(),
                                arguments: Value::Object(call.tool_args.clone()).to_string(),
                            },
                        })
                        .collect(),
                )
            };

            ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                content: content
                    .clone()
                    .map(ChatCompletionRequestAssistantMessageContent::Text),
                tool_calls,
                ..Default::default()
            })
        }
        Content::System { content } => {
            let text = system_prompt_override.unwrap_or(content);
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                content: ChatCompletionRequestSystemMessageContent::Text(text.to_string()),
                name: None,
            })
        }
        Content::User { content } => {
            ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(content.clone()),
                name: None,
            })
        }
    }
}

/// Encodes a whole history, applying the override to system items.
#[must_use]
pub fn encode_all(
    history: &[Content],
    system_prompt_override: Option<&str>,
) -> Vec<ChatCompletionRequestMessage> {
    history
        .iter()
        .map(|content| encode(content, system_prompt_override))
        .collect()
}
