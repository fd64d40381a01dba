//! Shared types used across cohort modules
//!
//! Conversation turns, the canonical answer of one reasoning step, solve
//! outcomes and persona records.

use serde::{Deserialize, Serialize};

use crate::core::error::CohortError;

/// Author of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry of a conversation log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Who produced the turn
    pub role: Role,
    /// Text of the turn
    pub content: String,
}

impl ChatTurn {
    /// Create a new system turn
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a new user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create a new assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A request from the reasoning provider to run one capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    /// Capability id, already unescaped to the id it was registered under
    pub id: String,
    /// Arguments as a JSON document
    pub arguments: String,
}

impl Invocation {
    pub fn new(id: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            arguments: arguments.into(),
        }
    }
}

/// Canonical result of one reasoning step, independent of provider wire format.
///
/// Both fields may be populated, but an invocation always takes precedence
/// when the agent decides what to do next.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// Free-text reply
    pub content: Option<String>,
    /// Capability the provider wants to run
    pub invocation: Option<Invocation>,
    /// Tokens reported by the provider, 0 when unreported
    pub usage: u64,
}

impl Answer {
    /// A free-text answer
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            invocation: None,
            usage: 0,
        }
    }

    /// An answer that asks for a capability invocation
    pub fn invoke(id: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            content: None,
            invocation: Some(Invocation::new(id, arguments)),
            usage: 0,
        }
    }

    /// Attach a usage count
    pub fn with_usage(mut self, usage: u64) -> Self {
        self.usage = usage;
        self
    }

    /// Whether this answer drives an invocation
    pub fn is_invocation(&self) -> bool {
        self.invocation.is_some()
    }

    /// Text content, empty when absent
    pub fn text_or_empty(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

/// How a solve attempt ended
#[derive(Debug)]
pub enum Outcome<T> {
    /// Reached a final answer
    Done(T),
    /// Ran out of retry budget; carries the last value seen
    Exhausted(T),
    /// Aborted by a fatal error
    Failed(CohortError),
}

impl<T> Outcome<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done(_))
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Outcome::Exhausted(_))
    }

    /// The carried value for `Done` and `Exhausted`
    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Done(v) | Outcome::Exhausted(v) => Some(v),
            Outcome::Failed(_) => None,
        }
    }

    /// The error for `Failed`
    pub fn error(&self) -> Option<&CohortError> {
        match self {
            Outcome::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Collapse into a `Result`, treating exhaustion as a value
    pub fn into_result(self) -> Result<T, CohortError> {
        match self {
            Outcome::Done(v) | Outcome::Exhausted(v) => Ok(v),
            Outcome::Failed(e) => Err(e),
        }
    }
}

/// Observability record emitted once per agent loop iteration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentEvent {
    /// Name of the agent that produced the event
    pub actor: String,
    /// Capability that was invoked in this iteration, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability: Option<String>,
    /// Capability output, capability error, or the final reply
    pub text: String,
}

/// Callback receiving agent events
pub type EventCallback = Box<dyn Fn(AgentEvent) + Send + Sync>;

/// Persona an agent speaks as
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub role: String,
    pub name: String,
    pub description: String,
}

impl Persona {
    pub fn new(
        role: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            name: name.into(),
            description: description.into(),
        }
    }
}
