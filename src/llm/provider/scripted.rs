//! Scripted provider
//!
//! Replays canned answers in order, then an optional fallback. Every request
//! is recorded so callers can inspect what the agent actually sent.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::capability::CapabilityDeclaration;
use crate::core::{Answer, ChatTurn, CohortError, Result};
use crate::llm::traits::LlmProvider;

#[derive(Debug, Clone)]
enum Step {
    Reply(Answer),
    Fail(String),
}

/// A request as seen by the scripted provider
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub model: String,
    pub turns: Vec<ChatTurn>,
    pub capabilities: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ScriptedProvider {
    steps: Mutex<VecDeque<Step>>,
    fallback: Option<Answer>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider that answers the same thing forever
    pub fn repeating(answer: Answer) -> Self {
        Self::new().otherwise(answer)
    }

    /// Queue an answer
    pub fn then(self, answer: Answer) -> Self {
        self.push(Step::Reply(answer));
        self
    }

    /// Queue a provider failure
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.push(Step::Fail(message.into()));
        self
    }

    /// Answer returned once the queue is empty
    pub fn otherwise(mut self, answer: Answer) -> Self {
        self.fallback = Some(answer);
        self
    }

    fn push(&self, step: Step) {
        self.steps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(step);
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn think(
        &self,
        model: &str,
        turns: &[ChatTurn],
        capabilities: &[CapabilityDeclaration],
    ) -> Result<Answer> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedRequest {
                model: model.to_string(),
                turns: turns.to_vec(),
                capabilities: capabilities.iter().map(|d| d.name.clone()).collect(),
            });

        let step = self
            .steps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        match step {
            Some(Step::Reply(answer)) => Ok(answer),
            Some(Step::Fail(message)) => Err(CohortError::provider(message)),
            None => self
                .fallback
                .clone()
                .ok_or_else(|| CohortError::provider("script exhausted")),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_then_falls_back() {
        let provider = ScriptedProvider::new()
            .then(Answer::invoke("echo", "{}"))
            .then_fail("boom")
            .otherwise(Answer::text("fallback"));

        let first = provider.think("m", &[], &[]).await.unwrap();
        assert!(first.is_invocation());
        assert!(provider.think("m", &[], &[]).await.is_err());
        let third = provider.think("m", &[], &[]).await.unwrap();
        assert_eq!(third.text_or_empty(), "fallback");
        assert_eq!(provider.request_count(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_script_errors() {
        let provider = ScriptedProvider::new();
        let err = provider.think("m", &[], &[]).await.unwrap_err();
        assert!(err.to_string().contains("script exhausted"));
    }
}
