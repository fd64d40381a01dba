//! Agent module - the think/invoke loop and multi-agent composition
//!
//! Contains the single agent, its builder and loop bookkeeping, and the
//! three-role review pipeline built on top of it.

pub mod builder;
pub mod loop_state;
pub mod orchestrator;
pub mod pipeline;

pub use builder::{AgentBuilder, DEFAULT_MAX_RETRIES};
pub use loop_state::{LoopPhase, LoopState, Observation};
pub use orchestrator::Agent;
pub use pipeline::{AgentUsage, Pipeline, PipelineLimits, PipelineReport, ACCEPT_CAPABILITY_ID};
