//! Agent construction
//!
//! Every agent starts with exactly one system turn carrying its persona and
//! its name, so the reasoning provider knows who it is speaking as.

use std::sync::Arc;

use crate::agent::orchestrator::Agent;
use crate::capability::CapabilitySet;
use crate::core::{CohortError, Persona, Result};
use crate::llm::{LlmProvider, ReasoningBackend};

/// Default retry budget for a solve
pub const DEFAULT_MAX_RETRIES: usize = 10;

/// Builder for creating Agents
pub struct AgentBuilder {
    name: String,
    role: Option<String>,
    avatar: Option<String>,
    persona_prompt: Option<String>,
    provider: Option<(Arc<dyn LlmProvider>, String)>,
    capabilities: Option<Arc<CapabilitySet>>,
    max_retries: usize,
}

impl AgentBuilder {
    /// Create a new builder with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: None,
            avatar: None,
            persona_prompt: None,
            provider: None,
            capabilities: None,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Take role, name and description from a persona record
    pub fn persona(mut self, persona: &Persona) -> Self {
        self.name = persona.name.clone();
        self.role = Some(persona.role.clone());
        self.persona_prompt = Some(persona.description.clone());
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    /// Text placed ahead of the name line in the seeding system turn
    pub fn persona_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.persona_prompt = Some(prompt.into());
        self
    }

    /// Set the provider and model the backend will use
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        self.provider = Some((provider, model.into()));
        self
    }

    pub fn capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.capabilities = Some(Arc::new(capabilities));
        self
    }

    /// Share an existing capability set
    pub fn shared_capabilities(mut self, capabilities: Arc<CapabilitySet>) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// The system turn the agent's log starts with
    fn seed_prompt(&self) -> String {
        match self.persona_prompt.as_deref() {
            Some(prompt) if !prompt.trim().is_empty() => {
                format!("{}\nYOUR NAME IS: {}", prompt, self.name)
            }
            _ => format!("YOUR NAME IS: {}", self.name),
        }
    }

    /// Build the Agent
    pub fn build(self) -> Result<Agent> {
        if self.name.trim().is_empty() {
            return Err(CohortError::invalid("agent name must not be empty"));
        }
        let seed = self.seed_prompt();
        let (provider, model) = self
            .provider
            .ok_or_else(|| CohortError::invalid(format!("agent '{}' has no provider", self.name)))?;

        Ok(Agent {
            role: self.role.unwrap_or_else(|| "assistant".to_string()),
            avatar: self.avatar,
            capabilities: self.capabilities.unwrap_or_default(),
            backend: ReasoningBackend::seeded(provider, model, seed),
            usage: 0,
            max_retries: self.max_retries,
            name: self.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Answer, ChatTurn};
    use crate::llm::ScriptedProvider;

    fn provider() -> Arc<dyn LlmProvider> {
        Arc::new(ScriptedProvider::repeating(Answer::text("ok")))
    }

    #[test]
    fn test_single_seed_turn() {
        let agent = AgentBuilder::new("Iara")
            .persona_prompt("You write code.")
            .provider(provider(), "m")
            .build()
            .unwrap();
        assert_eq!(
            agent.log(),
            &[ChatTurn::system("You write code.\nYOUR NAME IS: Iara")]
        );
        assert_eq!(agent.role(), "assistant");
        assert_eq!(agent.max_retries(), DEFAULT_MAX_RETRIES);
        assert!(agent.capabilities().is_empty());
    }

    #[test]
    fn test_name_only_seed() {
        let agent = AgentBuilder::new("Bo").provider(provider(), "m").build().unwrap();
        assert_eq!(agent.log()[0].content, "YOUR NAME IS: Bo");
    }

    #[test]
    fn test_persona_fills_fields() {
        let persona = Persona::new("reviewer", "Rita", "You review drafts.");
        let agent = AgentBuilder::new("ignored")
            .persona(&persona)
            .provider(provider(), "m")
            .build()
            .unwrap();
        assert_eq!(agent.name(), "Rita");
        assert_eq!(agent.role(), "reviewer");
        assert!(agent.log()[0].content.starts_with("You review drafts."));
    }

    #[test]
    fn test_missing_provider_is_rejected() {
        assert!(AgentBuilder::new("x").build().is_err());
        assert!(AgentBuilder::new("  ").provider(provider(), "m").build().is_err());
    }
}
