//! Ollama client implementation
//!
//! Async HTTP client for the Ollama chat API with tool calling. Ollama reports
//! tool arguments as a structured JSON value, so they are serialized back into
//! a string for the canonical answer.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::capability::CapabilityDeclaration;
use crate::core::{Answer, ChatTurn, CohortError, Config, Invocation, Result};
use crate::llm::traits::{
    arguments_to_string, ensure_success, request_error, FunctionTool, LlmProvider, WireMessage,
};

/// Ollama API client
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

/// Ollama chat request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<FunctionTool<'a>>>,
    stream: bool,
}

/// Ollama chat response (non-streaming)
#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    message: OllamaMessage,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

/// Ollama message format
#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Option<Vec<OllamaToolCall>>,
}

/// Ollama tool call format
#[derive(Debug, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunction,
}

/// Ollama function in tool call
#[derive(Debug, Deserialize)]
struct OllamaFunction {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

impl OllamaClient {
    /// Create a new Ollama client from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::build(config.ollama_url(), config.ollama.timeout_secs)
    }

    /// Create a client with custom base URL
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Self::build(base_url.into(), 120)
    }

    fn build(base_url: String, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Convert an Ollama response into the canonical answer.
    ///
    /// Only the first tool call is honored.
    pub(crate) fn canonicalize(response: ChatResponse) -> Result<Answer> {
        let invocation = match response
            .message
            .tool_calls
            .and_then(|calls| calls.into_iter().next())
        {
            Some(call) => Some(Invocation::new(
                call.function.name,
                arguments_to_string(call.function.arguments)?,
            )),
            None => None,
        };

        let usage = response.prompt_eval_count.unwrap_or(0) + response.eval_count.unwrap_or(0);
        let content = Some(response.message.content).filter(|c| !c.is_empty());

        Ok(Answer {
            content,
            invocation,
            usage,
        })
    }
}

#[async_trait]
impl LlmProvider for OllamaClient {
    async fn think(
        &self,
        model: &str,
        turns: &[ChatTurn],
        capabilities: &[CapabilityDeclaration],
    ) -> Result<Answer> {
        let request = ChatRequest {
            model,
            messages: WireMessage::from_turns(turns),
            tools: FunctionTool::wrap(capabilities),
            stream: false,
        };

        let endpoint = format!("{}/api/chat", self.base_url);
        let response = self
            .client
            .post(&endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| request_error("Ollama", &self.base_url, e))?;

        let response = ensure_success("Ollama", response).await?;
        let response_text = response.text().await?;

        let chat_response: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| CohortError::provider(format!("Failed to parse Ollama response: {}", e)))?;

        Self::canonicalize(chat_response)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Answer {
        OllamaClient::canonicalize(serde_json::from_str(body).unwrap()).unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = OllamaClient::from_config(&Config::default()).unwrap();
        assert!(client.base_url.starts_with("http://"));
    }

    #[test]
    fn test_structured_arguments_are_serialized() {
        let answer = parse(
            r#"{
                "model": "qwen3:8b",
                "message": {
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [
                        {"function": {"name": "fetch", "arguments": {"url": "https://example.com"}}},
                        {"function": {"name": "other", "arguments": {}}}
                    ]
                },
                "prompt_eval_count": 12,
                "eval_count": 30
            }"#,
        );
        let invocation = answer.invocation.unwrap();
        assert_eq!(invocation.id, "fetch");
        assert_eq!(invocation.arguments, r#"{"url":"https://example.com"}"#);
        assert_eq!(answer.usage, 42);
        assert!(answer.content.is_none());
    }

    #[test]
    fn test_plain_text_without_usage() {
        let answer = parse(r#"{"message": {"role": "assistant", "content": "hello"}}"#);
        assert_eq!(answer.content.as_deref(), Some("hello"));
        assert!(answer.invocation.is_none());
        assert_eq!(answer.usage, 0);
    }
}
