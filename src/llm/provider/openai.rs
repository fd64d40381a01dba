//! OpenAI-compatible provider
//!
//! Chat completions with function tools. The response carries a list of tool
//! calls; only the first one is honored. The legacy single `function_call`
//! field is still accepted for older compatible servers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::capability::CapabilityDeclaration;
use crate::core::{Answer, ChatTurn, CohortError, Config, Invocation, Result};
use crate::llm::traits::{
    arguments_to_string, ensure_success, request_error, FunctionTool, LlmProvider, WireMessage,
};

pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<FunctionTool<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
    #[serde(default)]
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    total_tokens: Option<u64>,
}

impl OpenAiProvider {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.openai.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.openai.base_url.trim_end_matches('/').to_string(),
            api_key: config.openai.api_key.clone(),
        })
    }

    pub(crate) fn canonicalize(response: CompletionResponse) -> Result<Answer> {
        let usage = response
            .usage
            .and_then(|u| u.total_tokens)
            .unwrap_or(0);

        let message = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| CohortError::provider("OpenAI response contained no choices"))?;

        let call = message
            .tool_calls
            .and_then(|calls| calls.into_iter().next())
            .map(|tool_call| tool_call.function)
            .or(message.function_call);

        let invocation = match call {
            Some(call) => Some(Invocation::new(call.name, arguments_to_string(call.arguments)?)),
            None => None,
        };

        Ok(Answer {
            content: message.content.filter(|c| !c.is_empty()),
            invocation,
            usage,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn think(
        &self,
        model: &str,
        turns: &[ChatTurn],
        capabilities: &[CapabilityDeclaration],
    ) -> Result<Answer> {
        let tools = FunctionTool::wrap(capabilities);
        let request = CompletionRequest {
            model,
            messages: WireMessage::from_turns(turns),
            tool_choice: tools.as_ref().map(|_| "auto"),
            tools,
        };

        let endpoint = format!("{}/chat/completions", self.base_url);
        let mut builder = self.client.post(&endpoint).json(&request);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| request_error("OpenAI", &self.base_url, e))?;
        let response = ensure_success("OpenAI", response).await?;

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| CohortError::provider(format!("Failed to parse OpenAI response: {}", e)))?;

        Self::canonicalize(completion)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<Answer> {
        OpenAiProvider::canonicalize(serde_json::from_str(body).unwrap())
    }

    #[test]
    fn test_first_tool_call_wins() {
        let answer = parse(
            r#"{
                "choices": [{"message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        {"id": "call_1", "type": "function",
                         "function": {"name": "7198573d-bb7d", "arguments": "{\"task\":\"x\"}"}},
                        {"id": "call_2", "type": "function",
                         "function": {"name": "ignored", "arguments": "{}"}}
                    ]
                }}],
                "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
            }"#,
        )
        .unwrap();

        let invocation = answer.invocation.unwrap();
        assert_eq!(invocation.id, "7198573d-bb7d");
        assert_eq!(invocation.arguments, r#"{"task":"x"}"#);
        assert_eq!(answer.usage, 15);
        assert!(answer.content.is_none());
    }

    #[test]
    fn test_legacy_function_call() {
        let answer = parse(
            r#"{"choices": [{"message": {"content": "",
                "function_call": {"name": "echo", "arguments": "{}"}}}]}"#,
        )
        .unwrap();
        assert_eq!(answer.invocation.unwrap().id, "echo");
        assert_eq!(answer.usage, 0);
    }

    #[test]
    fn test_text_reply() {
        let answer = parse(r#"{"choices": [{"message": {"content": "done"}}]}"#).unwrap();
        assert_eq!(answer.content.as_deref(), Some("done"));
        assert!(!answer.is_invocation());
    }

    #[test]
    fn test_no_choices_is_provider_error() {
        let err = parse(r#"{"choices": []}"#).unwrap_err();
        assert!(err.is_provider_failure());
    }
}
