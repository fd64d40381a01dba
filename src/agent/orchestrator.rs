//! Agent
//!
//! One persona = one reasoning backend + one capability set + a bounded
//! think/act loop (Think → Invoke → Observe, repeated until a free-text answer
//! or the retry budget runs out).

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::agent::builder::AgentBuilder;
use crate::agent::loop_state::{LoopState, Observation};
use crate::capability::{CapabilitySet, CapabilitySpec};
use crate::core::{AgentEvent, Answer, ChatTurn, CohortError, EventCallback, Outcome, Result};
use crate::llm::ReasoningBackend;

/// Agent driving one reasoning backend through the capability loop
#[derive(Debug)]
pub struct Agent {
    pub(crate) name: String,
    pub(crate) role: String,
    pub(crate) avatar: Option<String>,
    /// Shared so that replacing it never disturbs a holder of the old set
    pub(crate) capabilities: Arc<CapabilitySet>,
    pub(crate) backend: ReasoningBackend,
    /// Cumulative tokens over the agent's lifetime
    pub(crate) usage: u64,
    pub(crate) max_retries: usize,
}

impl Agent {
    /// Start building an agent
    pub fn builder(name: impl Into<String>) -> AgentBuilder {
        AgentBuilder::new(name)
    }

    /// Solve a task.
    ///
    /// The task is sent on the first iteration only; later iterations rely on
    /// the observations already folded into the log. Capability failures are
    /// recovered in-loop; provider failures and unknown capabilities end the
    /// solve with `Outcome::Failed`.
    pub async fn solve(&mut self, task: &str, on_event: Option<&EventCallback>) -> Outcome<Answer> {
        let mut state = LoopState::new(self.max_retries);
        // Held for the whole solve so a mid-loop registration can't change what we resolve against
        let capabilities = Arc::clone(&self.capabilities);

        debug!(agent = %self.name, max_iterations = state.max_iterations, "solve started");

        while state.should_continue() {
            let prompt = state.is_first().then_some(task);
            let answer = match self.backend.think_about(prompt, &capabilities).await {
                Ok(answer) => answer,
                Err(e) => {
                    warn!(agent = %self.name, error = %e, "reasoning step failed");
                    return Outcome::Failed(e);
                }
            };
            self.usage += answer.usage;
            state.next_iteration();

            let invocation = match answer.invocation.clone() {
                Some(invocation) => invocation,
                None => {
                    let content = answer.text_or_empty().to_string();
                    state.record_answer(answer.clone());
                    self.emit(on_event, None, &content);
                    self.backend.append_assistant(content);
                    info!(
                        agent = %self.name,
                        iterations = state.iteration,
                        invocations = state.observations.len(),
                        "solve done"
                    );
                    return Outcome::Done(answer);
                }
            };
            state.record_answer(answer);

            let Some(spec) = capabilities.get(&invocation.id) else {
                warn!(agent = %self.name, capability = %invocation.id, "unknown capability requested");
                return Outcome::Failed(CohortError::CapabilityNotFound(invocation.id));
            };

            let observation = match spec.invoke(&invocation.arguments).await {
                Ok(output) => {
                    info!(agent = %self.name, capability = %spec.id(), "capability invoked");
                    Observation::success(spec.id(), output)
                }
                Err(e) => {
                    warn!(agent = %self.name, capability = %spec.id(), error = %e, "capability failed");
                    Observation::error(spec.id(), e.to_string())
                }
            };

            self.backend.append_system(observation.as_system_turn());
            self.emit(on_event, Some(spec.id()), &observation.output);
            state.record_observation(observation);
        }

        state.mark_exhausted();
        warn!(
            agent = %self.name,
            iterations = state.iteration,
            "retry budget exhausted"
        );
        self.backend
            .append_system(format!("Retry budget exhausted while solving: {}", task));

        Outcome::Exhausted(state.last_answer.unwrap_or_default())
    }

    fn emit(&self, on_event: Option<&EventCallback>, capability: Option<&str>, text: &str) {
        if let Some(callback) = on_event {
            callback(AgentEvent {
                actor: self.name.clone(),
                capability: capability.map(str::to_string),
                text: text.to_string(),
            });
        }
    }

    /// Add one capability; copies the set if someone else still holds it
    pub fn add_capability(&mut self, spec: CapabilitySpec) -> Result<()> {
        Arc::make_mut(&mut self.capabilities).register(spec)
    }

    /// Swap the whole capability set; takes effect on the next iteration
    pub fn replace_capabilities(&mut self, capabilities: Arc<CapabilitySet>) {
        self.capabilities = capabilities;
    }

    /// Swap the reasoning backend (and with it the conversation log)
    pub fn replace_backend(&mut self, backend: ReasoningBackend) {
        self.backend = backend;
    }

    /// Record a reply written on the agent's behalf
    pub fn append_assistant(&mut self, text: impl Into<String>) {
        self.backend.append_assistant(text);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn avatar(&self) -> Option<&str> {
        self.avatar.as_deref()
    }

    pub fn capabilities(&self) -> &Arc<CapabilitySet> {
        &self.capabilities
    }

    pub fn backend(&self) -> &ReasoningBackend {
        &self.backend
    }

    /// The conversation log
    pub fn log(&self) -> &[ChatTurn] {
        self.backend.turns()
    }

    /// Tokens used over the agent's lifetime
    pub fn usage(&self) -> u64 {
        self.usage
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::builtin;
    use crate::core::Role;
    use crate::llm::ScriptedProvider;
    use std::sync::Mutex;

    fn agent_with(provider: Arc<ScriptedProvider>, max_retries: usize) -> Agent {
        let capabilities = builtin::builtin_set().unwrap();
        Agent::builder("Iara")
            .role("assistant")
            .provider(provider, "test-model")
            .capabilities(capabilities)
            .max_retries(max_retries)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_task_prompt_sent_once() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .then(Answer::invoke("echo", r#"{"text":"a"}"#))
                .then(Answer::invoke("echo", r#"{"text":"b"}"#))
                .then(Answer::text("done")),
        );
        let mut agent = agent_with(provider.clone(), 10);
        let outcome = agent.solve("say things", None).await;
        assert!(outcome.is_done());

        for request in provider.requests() {
            let users = request.turns.iter().filter(|t| t.role == Role::User).count();
            assert_eq!(users, 1);
        }
        assert_eq!(agent.log().last().unwrap(), &ChatTurn::assistant("done"));
    }

    #[tokio::test]
    async fn test_capability_error_is_folded_into_log() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .then(Answer::invoke("broken", "{}"))
                .then(Answer::text("recovered")),
        );
        let mut agent = agent_with(provider, 10);
        agent
            .add_capability(
                CapabilitySpec::builder()
                    .with_id("broken")
                    .with_name("Broken")
                    .with_description("always fails")
                    .with_fn(|_| Err(CohortError::capability("broken", "disk on fire")))
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let outcome = agent.solve("try it", None).await;
        assert_eq!(outcome.value().unwrap().text_or_empty(), "recovered");
        assert!(agent
            .log()
            .iter()
            .any(|t| t.role == Role::System && t.content.starts_with("[broken] error:")));
    }

    #[tokio::test]
    async fn test_events_fire_per_iteration() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .then(Answer::invoke("echo", "hello"))
                .then(Answer::text("bye")),
        );
        let mut agent = agent_with(provider, 10);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: EventCallback = Box::new(move |event| sink.lock().unwrap().push(event));

        agent.solve("go", Some(&callback)).await;

        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].capability.as_deref(), Some("echo"));
        assert_eq!(events[0].text, "hello");
        assert_eq!(events[1].capability, None);
        assert_eq!(events[1].text, "bye");
        assert!(events.iter().all(|e| e.actor == "Iara"));
    }

    #[tokio::test]
    async fn test_usage_accumulates() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .then(Answer::invoke("echo", "{}").with_usage(10))
                .then(Answer::text("ok").with_usage(5)),
        );
        let mut agent = agent_with(provider, 10);
        agent.solve("count", None).await;
        assert_eq!(agent.usage(), 15);
    }

    #[tokio::test]
    async fn test_replaced_capabilities_apply_next_solve() {
        let provider = Arc::new(ScriptedProvider::repeating(Answer::text("ok")));
        let mut agent = agent_with(provider.clone(), 0);
        agent.solve("first", None).await;

        let only_echo = builtin::builtin_set().unwrap().filtered(&[builtin::ECHO_ID]);
        agent.replace_capabilities(Arc::new(only_echo));
        agent.solve("second", None).await;

        let requests = provider.requests();
        assert_eq!(requests[0].capabilities.len(), 2);
        assert_eq!(requests[1].capabilities, vec![builtin::ECHO_ID.to_string()]);
    }
}
