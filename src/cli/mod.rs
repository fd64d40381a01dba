//! CLI module - command-line interface
//!
//! Contains the chat REPL, its slash commands, and the one-shot `ask` and
//! `review` runs.

pub mod commands;
pub mod repl;

pub use repl::Repl;

use std::sync::Arc;

use crate::agent::{Agent, Pipeline, PipelineLimits, PipelineReport};
use crate::capability::builtin;
use crate::core::{AgentEvent, Config, EventCallback, Outcome, Result};
use crate::llm::create_provider;

fn print_activity() -> EventCallback {
    Box::new(|event: AgentEvent| match event.capability {
        Some(capability) => eprintln!("  · {} used {}: {}", event.actor, capability, event.text),
        None => eprintln!("  · {} said: {}", event.actor, event.text),
    })
}

/// One prompt, one agent, every built-in capability
pub async fn ask(config: &Config, prompt: &str) -> Result<Outcome<String>> {
    let agent = Agent::builder(config.persona.name.clone())
        .persona(&config.persona.to_persona())
        .provider(create_provider(config)?, config.provider.model.clone())
        .capabilities(builtin::builtin_set()?)
        .max_retries(config.agent.max_retries);

    let mut agent = agent.build()?;
    let outcome = match agent.solve(prompt, None).await {
        Outcome::Done(answer) => Outcome::Done(answer.text_or_empty().to_string()),
        Outcome::Exhausted(answer) => Outcome::Exhausted(answer.text_or_empty().to_string()),
        Outcome::Failed(e) => Outcome::Failed(e),
    };
    tracing::debug!(usage = agent.usage(), "ask finished");
    Ok(outcome)
}

/// Run a task through author, reviewer and approver
pub async fn review(config: &Config, task: &str) -> Result<Outcome<PipelineReport>> {
    let provider = create_provider(config)?;
    let member = |name: &str, role: &str, prompt: &str| {
        Agent::builder(name)
            .role(role)
            .persona_prompt(prompt)
            .provider(Arc::clone(&provider), config.provider.model.clone())
            .max_retries(config.agent.max_retries)
            .build()
    };

    let author = member(
        "Ada",
        "author",
        "You write the first complete answer to the task. Rewrite it when feedback arrives.",
    )?;
    let reviewer = member(
        "Rui",
        "reviewer",
        "You review drafts. Point out mistakes and gaps, or say the draft is ready.",
    )?;
    let approver = member(
        "Lia",
        "approver",
        "You have the final word. When the reviewed draft is ready, accept it with the full final text. Otherwise explain what must change.",
    )?;

    let mut pipeline = Pipeline::new(
        "review",
        author,
        reviewer,
        approver,
        PipelineLimits::from(&config.pipeline),
    )?;
    pipeline.add_capability_for_all(builtin::date_time()?)?;

    let on_event = print_activity();
    Ok(pipeline.solve(task, Some(&on_event)).await)
}
