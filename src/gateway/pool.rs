//! Agent pool
//!
//! Maps a conversation identity to a lazily built agent. Lookup-or-create is
//! serialized per identity: the map lock is held only long enough to fetch
//! the identity's cell, and the cell itself guarantees a single
//! initialization, so distinct identities are created concurrently.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rand::seq::IndexedRandom;
use tokio::sync::{broadcast, Mutex, OnceCell};
use tracing::{debug, info, warn};

use crate::agent::Agent;
use crate::capability::CapabilitySet;
use crate::core::{Config, Persona, Result};
use crate::gateway::profiles::ProfileStore;
use crate::gateway::transport::GatewayEvent;
use crate::llm::LlmProvider;

/// An agent shared between handlers; the lock enforces one solve at a time
pub type SharedAgent = Arc<Mutex<Agent>>;

/// A pool entry
#[derive(Debug, Clone)]
pub struct PooledAgent {
    pub agent: SharedAgent,
    pub name: String,
    pub avatar: Option<String>,
    /// Queue message id that opened the conversation
    pub origin: Option<String>,
}

pub struct AgentPool {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_retries: usize,
    fallback: Persona,
    avatars: Vec<String>,
    capabilities: Arc<CapabilitySet>,
    profiles: Arc<dyn ProfileStore>,
    events: broadcast::Sender<GatewayEvent>,
    slots: Mutex<HashMap<String, Arc<OnceCell<PooledAgent>>>>,
}

impl fmt::Debug for AgentPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentPool")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("fallback", &self.fallback.name)
            .finish_non_exhaustive()
    }
}

impl AgentPool {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        config: &Config,
        profiles: Arc<dyn ProfileStore>,
        events: broadcast::Sender<GatewayEvent>,
    ) -> Self {
        Self {
            provider,
            model: config.provider.model.clone(),
            max_retries: config.agent.max_retries,
            fallback: config.persona.to_persona(),
            avatars: config.gateway.avatars.clone(),
            capabilities: Arc::new(CapabilitySet::new("pool")),
            profiles,
            events,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Capabilities given to every agent created from now on
    pub fn with_capabilities(mut self, capabilities: Arc<CapabilitySet>) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Agent for `identity`, creating it on first contact.
    ///
    /// Concurrent first calls for the same identity share one creation. A
    /// failed creation leaves the slot empty so the next call retries.
    pub async fn get_or_create(
        &self,
        identity: &str,
        display_context: &str,
        origin: Option<&str>,
    ) -> Result<PooledAgent> {
        let cell = {
            let mut slots = self.slots.lock().await;
            Arc::clone(slots.entry(identity.to_string()).or_default())
        };

        let pooled = cell
            .get_or_try_init(|| self.create(identity, display_context, origin))
            .await?;
        Ok(pooled.clone())
    }

    async fn create(
        &self,
        identity: &str,
        display_context: &str,
        origin: Option<&str>,
    ) -> Result<PooledAgent> {
        let persona = self.resolve_persona().await;
        let avatar = self.avatars.choose(&mut rand::rng()).cloned();

        let mut builder = Agent::builder(persona.name.clone())
            .role(persona.role.clone())
            .persona_prompt(format!(
                "{}\nSPEAKING WITH: {}",
                persona.description, display_context
            ))
            .provider(Arc::clone(&self.provider), self.model.clone())
            .shared_capabilities(Arc::clone(&self.capabilities))
            .max_retries(self.max_retries);
        if let Some(avatar) = &avatar {
            builder = builder.avatar(avatar.clone());
        }
        let agent = builder.build()?;

        info!(identity, agent = %persona.name, "pooled agent created");
        Ok(PooledAgent {
            agent: Arc::new(Mutex::new(agent)),
            name: persona.name,
            avatar,
            origin: origin.map(str::to_string),
        })
    }

    async fn resolve_persona(&self) -> Persona {
        let reason = match self.profiles.active_profile().await {
            Ok(Some(persona)) => return persona,
            Ok(None) => {
                warn!(fallback = %self.fallback.name, "no active profile");
                "no active profile".to_string()
            }
            Err(e) => {
                warn!(error = %e, "profile lookup failed");
                format!("profile lookup failed: {}", e)
            }
        };

        // No receivers is fine
        let _ = self.events.send(GatewayEvent::Information(format!(
            "{}, using default persona {}",
            reason, self.fallback.name
        )));
        self.fallback.clone()
    }

    /// Existing agent for `identity`, if created
    pub async fn get(&self, identity: &str) -> Option<PooledAgent> {
        let slots = self.slots.lock().await;
        slots.get(identity).and_then(|cell| cell.get().cloned())
    }

    /// Origin recorded for `identity`
    pub async fn origin(&self, identity: &str) -> Option<String> {
        self.get(identity).await.and_then(|p| p.origin)
    }

    /// Number of created agents
    pub async fn len(&self) -> usize {
        let slots = self.slots.lock().await;
        slots.values().filter(|cell| cell.initialized()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Identities with a created agent, sorted
    pub async fn identities(&self) -> Vec<String> {
        let slots = self.slots.lock().await;
        let mut ids: Vec<String> = slots
            .iter()
            .filter(|(_, cell)| cell.initialized())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        debug!(count = ids.len(), "listed pooled identities");
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Answer;
    use crate::gateway::profiles::StaticProfileStore;
    use crate::llm::ScriptedProvider;

    fn pool(profiles: Arc<dyn ProfileStore>) -> (AgentPool, broadcast::Receiver<GatewayEvent>) {
        let (tx, rx) = broadcast::channel(16);
        let provider = Arc::new(ScriptedProvider::repeating(Answer::text("hi")));
        (AgentPool::new(provider, &Config::default(), profiles, tx), rx)
    }

    #[tokio::test]
    async fn test_active_profile_seeds_prompt() {
        let store = Arc::new(StaticProfileStore::new(Some(Persona::new(
            "support",
            "Caio",
            "You fix printers.",
        ))));
        let (pool, _rx) = pool(store);

        let pooled = pool.get_or_create("5511", "Zé", Some("m1")).await.unwrap();
        let agent = pooled.agent.lock().await;
        assert_eq!(agent.name(), "Caio");
        assert_eq!(
            agent.log()[0].content,
            "You fix printers.\nSPEAKING WITH: Zé\nYOUR NAME IS: Caio"
        );
        assert!(pooled.avatar.is_some());
        assert_eq!(pooled.origin.as_deref(), Some("m1"));
    }

    #[tokio::test]
    async fn test_fallback_is_broadcast() {
        let (pool, mut rx) = pool(Arc::new(StaticProfileStore::default()));
        let pooled = pool.get_or_create("x", "X", None).await.unwrap();
        assert_eq!(pooled.name, Config::default().persona.name);

        match rx.recv().await.unwrap() {
            GatewayEvent::Information(text) => assert!(text.contains("no active profile")),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_second_call_reuses_agent() {
        let (pool, _rx) = pool(Arc::new(StaticProfileStore::default()));
        let first = pool.get_or_create("a", "A", Some("m1")).await.unwrap();
        let second = pool.get_or_create("a", "A", Some("m2")).await.unwrap();
        assert!(Arc::ptr_eq(&first.agent, &second.agent));
        assert_eq!(pool.origin("a").await.as_deref(), Some("m1"));
        assert_eq!(pool.len().await, 1);
        assert!(pool.get("b").await.is_none());
    }
}
