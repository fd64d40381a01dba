//! Error types for cohort
//!
//! One error enum shared by every layer. Only some variants are fatal to a
//! `solve()`: provider failures and unknown capabilities abort, while a
//! capability's own failure is folded back into the conversation by the agent.

use thiserror::Error;

/// Main error type for cohort operations
#[derive(Error, Debug)]
pub enum CohortError {
    /// Network, authentication or response-shape failure during a reasoning step
    #[error("Provider error: {0}")]
    Provider(String),

    /// The reasoning provider asked for a capability that is not registered
    #[error("Capability not found: {0}")]
    CapabilityNotFound(String),

    /// A capability's own logic failed
    #[error("Capability '{id}' failed: {message}")]
    Capability { id: String, message: String },

    /// A capability id was registered twice in the same set
    #[error("Capability '{0}' is already registered in this set")]
    DuplicateCapability(String),

    /// A capability or field was built with missing parts
    #[error("Invalid capability: {0}")]
    InvalidCapability(String),

    /// A pipeline exceeded one of its round limits
    #[error("Pipeline stalled after {rounds} round(s): {reason}")]
    Stalled { rounds: usize, reason: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persona profile store errors
    #[error("Profile store error: {0}")]
    Profile(String),

    /// Outbound transport errors
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for cohort operations
pub type Result<T> = std::result::Result<T, CohortError>;

impl CohortError {
    /// Create a provider error
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a capability failure
    pub fn capability(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Capability {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-capability error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidCapability(msg.into())
    }

    /// Create a stall error
    pub fn stalled(rounds: usize, reason: impl Into<String>) -> Self {
        Self::Stalled {
            rounds,
            reason: reason.into(),
        }
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a profile store error
    pub fn profile(msg: impl Into<String>) -> Self {
        Self::Profile(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Whether this error aborts a reasoning step at the provider boundary
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::Http(_) | Self::Json(_))
    }
}
