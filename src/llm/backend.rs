//! Reasoning backend
//!
//! Pairs a provider with the conversation log it reasons over. The log is
//! exclusively owned here; the agent only appends through this type.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::capability::CapabilitySet;
use crate::core::{Answer, ChatTurn, Result};
use crate::llm::conversation::Conversation;
use crate::llm::traits::LlmProvider;

/// Provider + model + running conversation
pub struct ReasoningBackend {
    provider: Arc<dyn LlmProvider>,
    model: String,
    conversation: Conversation,
}

impl fmt::Debug for ReasoningBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReasoningBackend")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("turns", &self.conversation.len())
            .finish()
    }
}

impl ReasoningBackend {
    /// Create a backend with an empty log
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            conversation: Conversation::new(),
        }
    }

    /// Create a backend whose log starts with a system prompt
    pub fn seeded(
        provider: Arc<dyn LlmProvider>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            conversation: Conversation::with_system_prompt(system_prompt),
        }
    }

    pub fn append_system(&mut self, text: impl Into<String>) {
        self.conversation.add_system(text);
    }

    pub fn append_user(&mut self, text: impl Into<String>) {
        self.conversation.add_user(text);
    }

    pub fn append_assistant(&mut self, text: impl Into<String>) {
        self.conversation.add_assistant(text);
    }

    /// Run one reasoning step.
    ///
    /// `prompt` is appended as a user turn only when present; follow-up steps
    /// pass `None` and rely on the log alone. Provider failures propagate.
    pub async fn think_about(
        &mut self,
        prompt: Option<&str>,
        capabilities: &CapabilitySet,
    ) -> Result<Answer> {
        if let Some(prompt) = prompt {
            self.conversation.add_user(prompt);
        }

        let declarations = capabilities.declarations();
        debug!(
            provider = self.provider.name(),
            model = %self.model,
            turns = self.conversation.len(),
            capabilities = declarations.len(),
            "reasoning request"
        );

        let answer = self
            .provider
            .think(&self.model, self.conversation.turns(), &declarations)
            .await?;

        info!(
            provider = self.provider.name(),
            usage = answer.usage,
            invocation = answer.invocation.as_ref().map(|i| i.id.as_str()),
            "reasoning response"
        );
        Ok(answer)
    }

    pub fn turns(&self) -> &[ChatTurn] {
        self.conversation.turns()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}
