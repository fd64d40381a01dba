//! Gateway module - routes inbound traffic to agents
//!
//! Interactive clients talk to one agent whose capabilities follow the
//! catalog's enabled flags. Queue contacts each get a pooled agent. Observers
//! subscribe to a broadcast of timeline lines, notices and agent activity.

pub mod catalog;
pub mod pool;
pub mod profiles;
pub mod transport;

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use crate::agent::Agent;
use crate::capability::CapabilitySet;
use crate::core::{AgentEvent, Answer, Config, EventCallback, Outcome, Result};
use crate::llm::LlmProvider;

pub use catalog::{CapabilityCatalog, CatalogEntry, InMemoryCatalog};
pub use pool::{AgentPool, PooledAgent, SharedAgent};
pub use profiles::{FileProfileStore, ProfileRecord, ProfileStore, StaticProfileStore};
pub use transport::{
    ChannelPublisher, GatewayEvent, QueueMessage, QueuePublisher, QueueReply, TimelineEvent,
};

const EVENT_CAPACITY: usize = 256;
const NO_RESPONSE: &str = "No response";

pub struct Gateway {
    interactive: SharedAgent,
    available: Arc<CapabilitySet>,
    catalog: Arc<dyn CapabilityCatalog>,
    pool: AgentPool,
    publisher: Arc<dyn QueuePublisher>,
    events: broadcast::Sender<GatewayEvent>,
    failure_notice: String,
}

impl Gateway {
    /// Build a gateway; an empty catalog is seeded from `available` with
    /// every entry disabled.
    pub async fn new(
        config: &Config,
        provider: Arc<dyn LlmProvider>,
        available: CapabilitySet,
        catalog: Arc<dyn CapabilityCatalog>,
        profiles: Arc<dyn ProfileStore>,
        publisher: Arc<dyn QueuePublisher>,
    ) -> Result<Self> {
        let available = Arc::new(available);
        if catalog.entries().await?.is_empty() {
            catalog.seed(CatalogEntry::from_set(&available)).await?;
            debug!(count = available.len(), "capability catalog seeded");
        }

        let interactive = Agent::builder(config.persona.name.clone())
            .persona(&config.persona.to_persona())
            .avatar(config.gateway.default_avatar.clone())
            .provider(Arc::clone(&provider), config.provider.model.clone())
            .max_retries(config.agent.max_retries)
            .build()?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let pool = AgentPool::new(provider, config, profiles, events.clone())
            .with_capabilities(Arc::clone(&available));

        Ok(Self {
            interactive: Arc::new(Mutex::new(interactive)),
            available,
            catalog,
            pool,
            publisher,
            events,
            failure_notice: config.gateway.failure_notice.clone(),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.events.subscribe()
    }

    pub fn pool(&self) -> &AgentPool {
        &self.pool
    }

    pub fn interactive(&self) -> &SharedAgent {
        &self.interactive
    }

    fn broadcast(&self, event: GatewayEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    fn activity_callback(&self) -> EventCallback {
        let events = self.events.clone();
        Box::new(move |event: AgentEvent| {
            let _ = events.send(GatewayEvent::Activity(event));
        })
    }

    /// Reply text for an outcome; failures become the generic notice
    fn reply_text(&self, agent: &str, outcome: Outcome<Answer>) -> String {
        match outcome {
            Outcome::Done(answer) => answer.text_or_empty().to_string(),
            Outcome::Exhausted(answer) => {
                warn!(agent, "reply produced after exhausting the retry budget");
                answer.text_or_empty().to_string()
            }
            Outcome::Failed(e) => {
                error!(agent, error = %e, "solve failed");
                self.failure_notice.clone()
            }
        }
    }

    /// Message from an interactive client
    pub async fn handle_client_message(&self, text: &str) -> Result<String> {
        let enabled = self.catalog.enabled_ids().await?;
        let capabilities = Arc::new(self.available.filtered(enabled.as_slice()));
        let on_event = self.activity_callback();

        let mut agent = self.interactive.lock().await;
        agent.replace_capabilities(capabilities);
        let outcome = agent.solve(text, Some(&on_event)).await;
        Ok(self.reply_text(agent.name(), outcome))
    }

    /// Message from the queue channel; the reply goes back through the publisher
    pub async fn handle_queue_message(&self, message: QueueMessage) -> Result<String> {
        let display = message.username.as_deref().unwrap_or(&message.from);
        let pooled = self
            .pool
            .get_or_create(&message.from, display, Some(&message.id))
            .await?;
        self.broadcast(GatewayEvent::Timeline(TimelineEvent::inbound(
            &message,
            &pooled.name,
        )));

        let on_event = self.activity_callback();
        let outcome = pooled.agent.lock().await.solve(&message.body, Some(&on_event)).await;
        let mut response = self.reply_text(&pooled.name, outcome);
        if response.trim().is_empty() {
            response = NO_RESPONSE.to_string();
        }

        self.publisher
            .publish(QueueReply {
                origin: message.id.clone(),
                response: response.clone(),
            })
            .await?;
        self.broadcast(GatewayEvent::Timeline(TimelineEvent::outbound(
            Some(&message.id),
            &pooled.name,
            &message.from,
            pooled.avatar.clone(),
            response.clone(),
        )));
        info!(from = %message.from, agent = %pooled.name, "queue message answered");
        Ok(response)
    }

    /// A human answers on an agent's behalf
    pub async fn handle_human_message(&self, to: &str, text: &str) -> Result<()> {
        let Some(pooled) = self.pool.get(to).await else {
            warn!(to, "human message for unknown conversation");
            return Ok(());
        };

        pooled.agent.lock().await.append_assistant(text);
        let origin = pooled.origin.clone().unwrap_or_default();
        self.publisher
            .publish(QueueReply {
                origin,
                response: text.to_string(),
            })
            .await?;
        self.broadcast(GatewayEvent::Timeline(TimelineEvent::outbound(
            pooled.origin.as_deref(),
            &pooled.name,
            to,
            pooled.avatar.clone(),
            text,
        )));
        Ok(())
    }

    pub async fn handle_capability_toggle(
        &self,
        id: &str,
        enabled: bool,
    ) -> Result<Vec<CatalogEntry>> {
        self.catalog.set_enabled(id, enabled).await?;
        info!(capability = id, enabled, "capability toggled");
        self.catalog.entries().await
    }

    pub async fn capabilities(&self) -> Result<Vec<CatalogEntry>> {
        self.catalog.entries().await
    }
}
