//! Agent loop state management
//!
//! Tracks where one `solve()` is in the THINKING → INVOKING → … → DONE /
//! EXHAUSTED cycle, along with the observations collected from capabilities.

use serde::{Deserialize, Serialize};

use crate::core::Answer;

/// Phase of the agent loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopPhase {
    Thinking,
    Invoking,
    Done,
    Exhausted,
}

/// State of the agent reasoning loop
#[derive(Debug, Clone)]
pub struct LoopState {
    /// Iterations started so far
    pub iteration: usize,
    /// Iterations allowed (retry budget + 1)
    pub max_iterations: usize,
    pub phase: LoopPhase,
    /// Observations collected from capability invocations
    pub observations: Vec<Observation>,
    /// Most recent answer from the backend
    pub last_answer: Option<Answer>,
}

impl LoopState {
    /// Create a new loop state for the given retry budget
    pub fn new(max_retries: usize) -> Self {
        Self {
            iteration: 0,
            max_iterations: max_retries.saturating_add(1),
            phase: LoopPhase::Thinking,
            observations: Vec::new(),
            last_answer: None,
        }
    }

    /// Check if the loop should run another iteration
    pub fn should_continue(&self) -> bool {
        self.iteration < self.max_iterations
            && !matches!(self.phase, LoopPhase::Done | LoopPhase::Exhausted)
    }

    /// Whether this is the first iteration (the task prompt is only sent then)
    pub fn is_first(&self) -> bool {
        self.iteration == 0
    }

    /// Record the answer of a thinking step
    pub fn record_answer(&mut self, answer: Answer) {
        self.phase = if answer.is_invocation() {
            LoopPhase::Invoking
        } else {
            LoopPhase::Done
        };
        self.last_answer = Some(answer);
    }

    /// Record a capability outcome and go back to thinking
    pub fn record_observation(&mut self, observation: Observation) {
        self.observations.push(observation);
        self.phase = LoopPhase::Thinking;
    }

    /// Increment the iteration counter
    pub fn next_iteration(&mut self) {
        self.iteration += 1;
    }

    pub fn mark_exhausted(&mut self) {
        self.phase = LoopPhase::Exhausted;
    }
}

/// An observation from a capability invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// Capability that produced this observation
    pub capability: String,
    /// Whether the invocation succeeded
    pub success: bool,
    /// Output, or the error message on failure
    pub output: String,
}

impl Observation {
    /// Create a successful observation
    pub fn success(capability: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
            success: true,
            output: output.into(),
        }
    }

    /// Create an error observation
    pub fn error(capability: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
            success: false,
            output: error.into(),
        }
    }

    /// The system turn this observation is folded into
    pub fn as_system_turn(&self) -> String {
        if self.success {
            format!("[{}] said: {}", self.capability, self.output)
        } else {
            format!("[{}] error: {}", self.capability, self.output)
        }
    }
}
