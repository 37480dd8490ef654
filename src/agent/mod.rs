//! Conversation agent for Cloud.ru Foundation Models.
//!
//! Handles one user utterance per call: prepares the host chat log, streams
//! chat completions from the `OpenAI`-compatible endpoint and runs a bounded
//! tool-calling loop until the model answers in plain text.
//!
//! # Architecture
//!
//! ```text
//! Utterance → ConversationAgent::handle_message
//!   ├── ChatLog::update_llm_data (system prompt + user turn)
//!   ├── format_tool (LLM API tools → wire declarations)
//!   ├── encode_all (chat log → wire messages)
//!   └── agentic_loop (≤ MAX_TOOL_ITERATIONS)
//!       ├── LlmProvider::chat_stream (TurnRequest → chunk stream)
//!       ├── transform_stream (chunks → content deltas)
//!       └── ChatLog::add_delta_content_stream (deltas → items, tool runs)
//! ```

pub mod agentic_loop;
pub mod chat_log;
pub mod client;
pub mod codec;
pub mod config;
pub mod executor;
pub mod message;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod request;
pub mod stream;
pub mod tool;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types
pub use chat_log::{ChatLog, InMemoryChatLog, LlmApi};
pub use client::{create_provider, validate_credentials};
pub use config::{CLOUD_RU, ConversationOptions, EntryConfig, Integration, MAX_TOOL_ITERATIONS};
pub use executor::StaticToolApi;
pub use message::{
    AssistantContentDelta, Content, ConversationInput, ConversationResult, IntentResponse, Role,
    ToolInput,
};
pub use provider::LlmProvider;
pub use providers::CloudRuProvider;
pub use request::TurnRequest;
pub use stream::{StreamTransformer, transform_stream};
pub use tool::{ToolDescriptor, format_tool};
pub use traits::{ConversationAgent, ConversationEntity};
