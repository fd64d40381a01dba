//! Reasoning provider trait and shared wire shapes
//!
//! Every provider adapter turns its own "call function X with arguments Y"
//! convention into the canonical `Answer`. Adapters never retry; the agent
//! owns retry policy.

use async_trait::async_trait;
use reqwest::Response;
use serde::Serialize;
use serde_json::Value;

use crate::capability::CapabilityDeclaration;
use crate::core::{Answer, ChatTurn, CohortError, Result};

/// Trait for reasoning providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send the whole log plus capability declarations and return one answer
    async fn think(
        &self,
        model: &str,
        turns: &[ChatTurn],
        capabilities: &[CapabilityDeclaration],
    ) -> Result<Answer>;

    /// Get the provider name
    fn name(&self) -> &str;
}

/// `{"type": "function", "function": {...}}` as used by OpenAI-style APIs
#[derive(Debug, Clone, Serialize)]
pub(crate) struct FunctionTool<'a> {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: &'a CapabilityDeclaration,
}

impl<'a> FunctionTool<'a> {
    pub(crate) fn wrap(declarations: &'a [CapabilityDeclaration]) -> Option<Vec<Self>> {
        if declarations.is_empty() {
            return None;
        }
        Some(
            declarations
                .iter()
                .map(|function| FunctionTool {
                    tool_type: "function",
                    function,
                })
                .collect(),
        )
    }
}

/// `{"role": ..., "content": ...}` message shape shared by OpenAI and Ollama
#[derive(Debug, Clone, Serialize)]
pub(crate) struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> WireMessage<'a> {
    pub(crate) fn from_turns(turns: &'a [ChatTurn]) -> Vec<Self> {
        turns
            .iter()
            .map(|turn| WireMessage {
                role: turn.role.as_str(),
                content: &turn.content,
            })
            .collect()
    }
}

/// Arguments as a JSON string, whatever shape the provider used
pub(crate) fn arguments_to_string(arguments: Value) -> Result<String> {
    match arguments {
        Value::String(s) if s.trim().is_empty() => Ok("{}".to_string()),
        Value::String(s) => Ok(s),
        Value::Null => Ok("{}".to_string()),
        other => Ok(serde_json::to_string(&other)?),
    }
}

/// Turn a non-2xx HTTP response into a provider error
pub(crate) async fn ensure_success(provider: &str, response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(CohortError::provider(format!(
        "{} API error ({}): {}",
        provider, status, body
    )))
}

/// Map a transport failure, naming the endpoint on connection errors
pub(crate) fn request_error(provider: &str, endpoint: &str, error: reqwest::Error) -> CohortError {
    if error.is_connect() {
        CohortError::provider(format!("Cannot connect to {} at {}", provider, endpoint))
    } else if error.is_timeout() {
        CohortError::provider(format!("{} request to {} timed out", provider, endpoint))
    } else {
        CohortError::from(error)
    }
}
