//! cohort - agent orchestration over pluggable reasoning providers
//!
//! An agent pairs a reasoning backend with a set of capabilities and runs a
//! bounded think/invoke loop. Three agents compose into a review pipeline,
//! and a gateway keeps one agent per conversation.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **Capability**: Invocable units and the sets agents draw from
//! - **LLM**: Provider adapters that canonicalize every reply into an `Answer`
//! - **Agent**: The think/invoke loop and the review pipeline
//! - **Gateway**: Agent pool, profile stores, catalog and transport records
//! - **CLI**: Command-line interface and REPL
//!
//! # Usage
//!
//! ```rust,no_run
//! use cohort::{capability::builtin, llm::create_provider, Agent, Config};
//!
//! #[tokio::main]
//! async fn main() -> cohort::Result<()> {
//!     let config = Config::load();
//!     let mut agent = Agent::builder("Iara")
//!         .provider(create_provider(&config)?, config.provider.model.clone())
//!         .capabilities(builtin::builtin_set()?)
//!         .build()?;
//!
//!     let reply = agent.solve("What time is it?", None).await.into_result()?;
//!     println!("{}", reply.text_or_empty());
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod capability;
pub mod cli;
pub mod core;
pub mod gateway;
pub mod llm;

// Re-export commonly used items
pub use agent::{Agent, AgentBuilder, Pipeline, PipelineLimits, PipelineReport};
pub use capability::{CapabilitySet, CapabilitySpec};
pub use cli::Repl;
pub use core::{Answer, CohortError, Config, Outcome, Result};
pub use gateway::{AgentPool, Gateway};
