//! Cloud.ru Foundation Models provider using the `async-openai` crate.
//!
//! The endpoint speaks the `OpenAI` chat-completion protocol. Requests go
//! through the bring-your-own-types entry point so the vLLM extension
//! fields on [`TurnRequest`] reach the wire.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_trait::async_trait;
use tracing::debug;

use super::classify_provider_error;
use crate::agent::client::build_http_client;
use crate::agent::config::{EntryConfig, Integration};
use crate::agent::provider::LlmProvider;
use crate::agent::request::TurnRequest;
use crate::agent::stream::ChunkStream;
use crate::error::{ConverseError, SetupError};

/// Cloud.ru chat-completion provider.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct CloudRuProvider {
    client: Client<OpenAIConfig>,
}

impl CloudRuProvider {
    /// Creates a provider for an entry.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::InvalidConfig`] if the credentials cannot be
    /// turned into request headers.
    pub fn new(entry: &EntryConfig, integration: &Integration) -> Result<Self, SetupError> {
        let http_client = build_http_client(entry, integration)?;
        let config = OpenAIConfig::new()
            .with_api_key(&entry.api_key)
            .with_api_base(entry.api_base(integration));

        Ok(Self {
            client: Client::with_config(config).with_http_client(http_client),
        })
    }
}

impl std::fmt::Debug for CloudRuProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudRuProvider")
            .field("client", &"<async-openai::Client>")
            .finish()
    }
}

#[async_trait]
impl LlmProvider for CloudRuProvider {
    fn name(&self) -> &'static str {
        "cloud_ru"
    }

    async fn chat_stream(&self, request: &TurnRequest) -> Result<ChunkStream, ConverseError> {
        debug!(
            model = %request.chat.model,
            messages = request.message_count(),
            tools = request.chat.tools.as_ref().map_or(0, Vec::len),
            "opening chat completion stream"
        );

        self.client
            .chat()
            .create_stream_byot(request)
            .await
            .map_err(classify_provider_error)
    }
}
