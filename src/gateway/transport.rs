//! Transport records
//!
//! Wire shapes exchanged with the queue channel and pushed to observers. The
//! gateway only produces and consumes these; sockets and brokers live
//! elsewhere.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::core::{AgentEvent, CohortError, Result};

/// Message arriving from the queue channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueMessage {
    pub id: String,
    pub from: String,
    pub body: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// Reply published back to the queue channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueReply {
    /// Id of the queue message that started the conversation
    pub origin: String,
    pub response: String,
}

/// Chat line pushed to observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub to: String,
    pub from: String,
    pub avatar_url: Option<String>,
    pub message: String,
    pub username: Option<String>,
    /// True for inbound lines, false for agent replies
    pub to_chat: bool,
    pub timestamp: DateTime<Utc>,
}

impl TimelineEvent {
    /// A line received from a contact; carries the queue message id
    pub fn inbound(message: &QueueMessage, agent: &str) -> Self {
        Self {
            kind: "timeline".to_string(),
            id: message.id.clone(),
            to: agent.to_string(),
            from: message.from.clone(),
            avatar_url: message.avatar_url.clone(),
            message: message.body.clone(),
            username: message.username.clone(),
            to_chat: true,
            timestamp: Utc::now(),
        }
    }

    /// A line sent by an agent. `id` pairs it with the inbound line it
    /// answers; without one a fresh id is drawn.
    pub fn outbound(
        id: Option<&str>,
        agent: &str,
        to: &str,
        avatar_url: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: "timeline".to_string(),
            id: id.map_or_else(|| Uuid::new_v4().to_string(), str::to_string),
            to: to.to_string(),
            from: agent.to_string(),
            avatar_url,
            message: message.into(),
            username: Some(agent.to_string()),
            to_chat: false,
            timestamp: Utc::now(),
        }
    }
}

/// Everything observers can receive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum GatewayEvent {
    Timeline(TimelineEvent),
    /// Operational notices, such as a persona fallback
    Information(String),
    Activity(AgentEvent),
}

/// Outbound half of the queue channel
#[async_trait]
pub trait QueuePublisher: Send + Sync {
    async fn publish(&self, reply: QueueReply) -> Result<()>;
}

/// Publisher that hands replies to an in-process channel
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    tx: mpsc::Sender<QueueReply>,
}

impl ChannelPublisher {
    pub fn new(tx: mpsc::Sender<QueueReply>) -> Self {
        Self { tx }
    }

    /// Publisher plus the receiving end
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<QueueReply>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl QueuePublisher for ChannelPublisher {
    async fn publish(&self, reply: QueueReply) -> Result<()> {
        self.tx
            .send(reply)
            .await
            .map_err(|e| CohortError::transport(format!("reply channel closed: {}", e)))
    }
}
