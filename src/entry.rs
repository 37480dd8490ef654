//! Config-entry lifecycle: setup, unload and reload on options change.
//!
//! Setup validates the credentials, builds the long-lived provider and
//! registers a [`ConversationAgent`] with the host through an
//! [`AgentRegistry`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::agent::client::{create_provider, validate_credentials};
use crate::agent::config::{ConversationOptions, EntryConfig, Integration};
use crate::agent::provider::LlmProvider;
use crate::agent::traits::{ConversationAgent, ConversationEntity};
use crate::error::SetupError;

/// Host-side registry of conversation entities.
#[async_trait]
pub trait AgentRegistry: Send + Sync {
    /// Registers an entity, replacing any entity with the same unique id.
    async fn register(&self, entity: Arc<dyn ConversationEntity>);

    /// Removes an entity. Returns `false` if it was not registered.
    async fn unregister(&self, unique_id: &str) -> bool;
}

/// Registry keeping entities in a map.
#[derive(Default)]
pub struct InMemoryRegistry {
    entities: RwLock<HashMap<String, Arc<dyn ConversationEntity>>>,
}

impl InMemoryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up an entity by unique id.
    pub async fn get(&self, unique_id: &str) -> Option<Arc<dyn ConversationEntity>> {
        self.entities.read().await.get(unique_id).cloned()
    }

    /// Number of registered entities.
    pub async fn len(&self) -> usize {
        self.entities.read().await.len()
    }

    /// Returns `true` if nothing is registered.
    pub async fn is_empty(&self) -> bool {
        self.entities.read().await.is_empty()
    }
}

impl std::fmt::Debug for InMemoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRegistry").finish_non_exhaustive()
    }
}

#[async_trait]
impl AgentRegistry for InMemoryRegistry {
    async fn register(&self, entity: Arc<dyn ConversationEntity>) {
        self.entities
            .write()
            .await
            .insert(entity.unique_id().to_string(), entity);
    }

    async fn unregister(&self, unique_id: &str) -> bool {
        self.entities.write().await.remove(unique_id).is_some()
    }
}

/// Sets up an entry: validates credentials, then registers its agent.
///
/// # Errors
///
/// Returns [`SetupError::AuthFailed`] if the credentials are rejected
/// (do not retry) and [`SetupError::NotReady`] if the service could not be
/// reached (retry later).
pub async fn setup_entry(
    entry: &EntryConfig,
    integration: &Integration,
    registry: &dyn AgentRegistry,
) -> Result<Arc<ConversationAgent>, SetupError> {
    validate_credentials(entry, integration)
        .await
        .inspect_err(|e| warn!(entry_id = %entry.entry_id, error = %e, "entry setup failed"))?;
    let provider = create_provider(entry, integration)?;
    Ok(register_agent(entry, integration, provider, registry).await)
}

/// Registers an agent for an entry using an already built provider.
pub async fn register_agent(
    entry: &EntryConfig,
    integration: &Integration,
    provider: Arc<dyn LlmProvider>,
    registry: &dyn AgentRegistry,
) -> Arc<ConversationAgent> {
    let agent = Arc::new(ConversationAgent::new(entry, integration.clone(), provider));
    registry.register(agent.clone()).await;
    info!(
        entry_id = %entry.entry_id,
        model = %entry.options.chat_model,
        "conversation agent registered"
    );
    agent
}

/// Unloads an entry. Returns `false` if it was not loaded.
pub async fn unload_entry(entry_id: &str, registry: &dyn AgentRegistry) -> bool {
    let removed = registry.unregister(entry_id).await;
    info!(entry_id, removed, "entry unloaded");
    removed
}

/// Reloads an entry so changed options take effect.
///
/// # Errors
///
/// See [`setup_entry`].
pub async fn reload_entry(
    entry: &EntryConfig,
    integration: &Integration,
    registry: &dyn AgentRegistry,
) -> Result<Arc<ConversationAgent>, SetupError> {
    unload_entry(&entry.entry_id, registry).await;
    setup_entry(entry, integration, registry).await
}

/// Stores new options on an entry and reloads it.
///
/// The device info, supported features and request parameters all derive
/// from the options, so the agent is rebuilt rather than patched.
///
/// # Errors
///
/// See [`setup_entry`].
pub async fn update_options(
    entry: &mut EntryConfig,
    options: ConversationOptions,
    integration: &Integration,
    registry: &dyn AgentRegistry,
) -> Result<Arc<ConversationAgent>, SetupError> {
    entry.options = options;
    reload_entry(entry, integration, registry).await
}
