//! Three-role review pipeline
//!
//! An author drafts, a reviewer critiques and an approver either accepts the
//! work through a pipeline-bound capability or sends it around again. Both
//! loops are bounded by [`PipelineLimits`].

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::agent::orchestrator::Agent;
use crate::capability::{CapabilitySpec, FieldSpec};
use crate::core::config::PipelineConfig;
use crate::core::{AgentEvent, Answer, CohortError, EventCallback, Outcome, Result};

pub const ACCEPT_CAPABILITY_ID: &str = "accept-task";

const ACCEPT_REPLY: &str = "all task is done.";

/// Round limits for one pipeline solve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineLimits {
    pub max_rounds: usize,
    pub max_reviewer_repeats: usize,
}

impl Default for PipelineLimits {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for PipelineLimits {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            max_rounds: config.max_rounds,
            max_reviewer_repeats: config.max_reviewer_repeats,
        }
    }
}

/// Tokens spent by one member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentUsage {
    pub name: String,
    pub role: String,
    pub usage: u64,
}

/// Result of an accepted pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub final_text: String,
    pub total_usage: u64,
    pub per_agent: Vec<AgentUsage>,
}

#[derive(Deserialize)]
struct AcceptArgs {
    task: String,
}

type AcceptSlot = Arc<Mutex<Option<String>>>;

fn accept_capability(slot: AcceptSlot) -> Result<CapabilitySpec> {
    CapabilitySpec::builder()
        .with_id(ACCEPT_CAPABILITY_ID)
        .with_name("Accept task")
        .with_description("Use this capability to accept the task once it is complete")
        .with_field(FieldSpec::string("task", "The complete, final task text"))
        .with_fn(move |arguments| {
            let args: AcceptArgs = serde_json::from_str(arguments).map_err(|e| {
                CohortError::capability(ACCEPT_CAPABILITY_ID, format!("expected {{\"task\": string}}: {}", e))
            })?;
            *slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(args.task);
            Ok(ACCEPT_REPLY.to_string())
        })
        .build()
}

/// Author, reviewer and approver bound to one task
#[derive(Debug)]
pub struct Pipeline {
    name: String,
    author: Agent,
    reviewer: Agent,
    approver: Agent,
    limits: PipelineLimits,
    accepted: AcceptSlot,
}

impl Pipeline {
    /// Assemble a pipeline; the approver receives the accept capability
    pub fn new(
        name: impl Into<String>,
        author: Agent,
        reviewer: Agent,
        mut approver: Agent,
        limits: PipelineLimits,
    ) -> Result<Self> {
        let accepted: AcceptSlot = Arc::new(Mutex::new(None));
        approver.add_capability(accept_capability(Arc::clone(&accepted))?)?;

        Ok(Self {
            name: name.into(),
            author,
            reviewer,
            approver,
            limits,
            accepted,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Give one capability to every member
    pub fn add_capability_for_all(&mut self, spec: CapabilitySpec) -> Result<()> {
        self.author.add_capability(spec.clone())?;
        self.reviewer.add_capability(spec.clone())?;
        self.approver.add_capability(spec)
    }

    fn prepare_task(&self, task: &str) -> String {
        let team = [&self.author, &self.reviewer, &self.approver]
            .iter()
            .map(|agent| format!("{} ({})", agent.name(), agent.role()))
            .collect::<Vec<_>>()
            .join(",\n");

        format!(
            "============ [PIPELINE INFORMATION] ============\n\
             PIPELINE_NAME: {}\n\
             PIPELINE_TEAM: [\n{}\n]\n\
             DATE_TIME: {}\n\n\
             ============ [ORIGINAL TASK] ============\n\
             {}\n",
            self.name,
            team,
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            task
        )
    }

    fn accepted(&self) -> Option<String> {
        self.accepted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Run the review protocol until the approver accepts.
    ///
    /// The pipeline is consumed: it serves exactly one task.
    pub async fn solve(
        mut self,
        task: &str,
        on_event: Option<&EventCallback>,
    ) -> Outcome<PipelineReport> {
        let mut current = self.prepare_task(task);
        let start = [self.author.usage(), self.reviewer.usage(), self.approver.usage()];
        debug!(pipeline = %self.name, "pipeline ready");

        for round in 1..=self.limits.max_rounds {
            info!(pipeline = %self.name, round, "round started");
            let critique = match self.review_round(round, &mut current, on_event).await {
                Ok(critique) => critique,
                Err(e) => return Outcome::Failed(e),
            };

            let verdict = match self.approver.solve(critique.text_or_empty(), on_event).await {
                Outcome::Failed(e) => return Outcome::Failed(e),
                outcome => outcome.into_result().unwrap_or_default(),
            };
            current.push_str("\n\n");
            current.push_str(verdict.text_or_empty());
            current.push('\n');

            // Exhausted approvers may still be holding an invocation
            if self.accepted().is_none() {
                if let Some(invocation) = verdict.invocation.as_ref() {
                    let capabilities = Arc::clone(self.approver.capabilities());
                    let Some(spec) = capabilities.get(&invocation.id) else {
                        return Outcome::Failed(CohortError::CapabilityNotFound(
                            invocation.id.clone(),
                        ));
                    };
                    let output = run_capability(spec, &invocation.arguments).await;
                    emit(on_event, self.approver.name(), spec.id(), &output);
                    current.push_str(&format!("\n{}\n", output));
                }
            }

            if let Some(final_text) = self.accepted() {
                let report = self.report(final_text, start);
                info!(
                    pipeline = %self.name,
                    rounds = round,
                    total_usage = report.total_usage,
                    "pipeline accepted"
                );
                return Outcome::Done(report);
            }
            info!(pipeline = %self.name, round, "approver reopened the task");
        }

        error!(pipeline = %self.name, rounds = self.limits.max_rounds, "approver never accepted");
        Outcome::Failed(CohortError::stalled(
            self.limits.max_rounds,
            "approver never accepted the task",
        ))
    }

    /// Draft and critique. Capabilities the reviewer leaves pending are run
    /// here, their output is appended to the task, and the pair goes again.
    async fn review_round(
        &mut self,
        round: usize,
        current: &mut String,
        on_event: Option<&EventCallback>,
    ) -> Result<Answer> {
        let mut repeats = 0;
        loop {
            let draft = self.author.solve(current.as_str(), on_event).await.into_result()?;
            let critique = self
                .reviewer
                .solve(draft.text_or_empty(), on_event)
                .await
                .into_result()?;

            let Some(invocation) = critique.invocation.clone() else {
                return Ok(critique);
            };
            if repeats >= self.limits.max_reviewer_repeats {
                error!(pipeline = %self.name, round, repeats, "reviewer repeat limit reached");
                return Err(CohortError::stalled(
                    round,
                    format!("reviewer repeated more than {} time(s)", self.limits.max_reviewer_repeats),
                ));
            }
            repeats += 1;

            let capabilities = Arc::clone(self.reviewer.capabilities());
            let spec = capabilities
                .get(&invocation.id)
                .ok_or_else(|| CohortError::CapabilityNotFound(invocation.id.clone()))?;
            let output = run_capability(spec, &invocation.arguments).await;
            emit(on_event, self.reviewer.name(), spec.id(), &output);
            current.push_str(&format!("\n{}\n", output));
        }
    }

    fn report(&self, final_text: String, start: [u64; 3]) -> PipelineReport {
        let per_agent: Vec<AgentUsage> = [&self.author, &self.reviewer, &self.approver]
            .into_iter()
            .zip(start)
            .map(|(agent, before)| AgentUsage {
                name: agent.name().to_string(),
                role: agent.role().to_string(),
                usage: agent.usage().saturating_sub(before),
            })
            .collect();

        PipelineReport {
            final_text,
            total_usage: per_agent.iter().map(|a| a.usage).sum(),
            per_agent,
        }
    }
}

async fn run_capability(spec: &CapabilitySpec, arguments: &str) -> String {
    match spec.invoke(arguments).await {
        Ok(output) => output,
        Err(e) => {
            warn!(capability = %spec.id(), error = %e, "pipeline capability failed");
            e.to_string()
        }
    }
}

fn emit(on_event: Option<&EventCallback>, actor: &str, capability: &str, text: &str) {
    if let Some(callback) = on_event {
        callback(AgentEvent {
            actor: actor.to_string(),
            capability: Some(capability.to_string()),
            text: text.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedProvider;

    fn agent(name: &str, role: &str, provider: ScriptedProvider) -> Agent {
        Agent::builder(name)
            .role(role)
            .provider(Arc::new(provider), "m")
            .max_retries(2)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_accept_capability_parses_task() {
        let slot: AcceptSlot = Arc::new(Mutex::new(None));
        let spec = accept_capability(Arc::clone(&slot)).unwrap();

        assert_eq!(spec.invoke(r#"{"task":"ship it"}"#).await.unwrap(), ACCEPT_REPLY);
        assert_eq!(slot.lock().unwrap().as_deref(), Some("ship it"));
        assert!(spec.invoke("not json").await.is_err());
    }

    #[test]
    fn test_prepare_task_lists_team() {
        let pipeline = Pipeline::new(
            "docs",
            agent("Ana", "writer", ScriptedProvider::new()),
            agent("Rui", "reviewer", ScriptedProvider::new()),
            agent("Lia", "lead", ScriptedProvider::new()),
            PipelineLimits::default(),
        )
        .unwrap();

        let task = pipeline.prepare_task("write a README");
        assert!(task.contains("PIPELINE_NAME: docs"));
        assert!(task.contains("Ana (writer),\nRui (reviewer),\nLia (lead)"));
        assert!(task.ends_with("write a README\n"));
    }

    #[test]
    fn test_approver_gets_accept_capability() {
        let pipeline = Pipeline::new(
            "p",
            agent("a", "author", ScriptedProvider::new()),
            agent("r", "reviewer", ScriptedProvider::new()),
            agent("l", "approver", ScriptedProvider::new()),
            PipelineLimits::default(),
        )
        .unwrap();
        assert!(pipeline.approver.capabilities().contains(ACCEPT_CAPABILITY_ID));
        assert!(!pipeline.author.capabilities().contains(ACCEPT_CAPABILITY_ID));
    }

    #[tokio::test]
    async fn test_reviewer_repeat_limit_stalls() {
        let reviewer = ScriptedProvider::repeating(Answer::invoke("echo", "{}"));
        let mut pipeline = Pipeline::new(
            "p",
            agent("a", "author", ScriptedProvider::repeating(Answer::text("draft"))),
            agent("r", "reviewer", reviewer),
            agent("l", "approver", ScriptedProvider::new()),
            PipelineLimits {
                max_rounds: 3,
                max_reviewer_repeats: 1,
            },
        )
        .unwrap();
        pipeline
            .add_capability_for_all(crate::capability::builtin::echo().unwrap())
            .unwrap();

        let outcome = pipeline.solve("task", None).await;
        assert!(matches!(outcome.error(), Some(CohortError::Stalled { rounds: 1, .. })));
    }
}
