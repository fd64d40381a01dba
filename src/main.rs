//! cohort - agent orchestration from the command line
//!
//! Main entry point for the CLI application.

use anyhow::Context;
use clap::{Parser, Subcommand};
use cohort::core::config::ProviderKind;
use cohort::{Config, Outcome, Repl};
use tracing_subscriber::EnvFilter;

/// cohort - agents, review pipelines and a chat gateway
#[derive(Parser, Debug)]
#[command(name = "cohort")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Reasoning provider (ollama, openai, gemini, scripted)
    #[arg(long, short = 'p', global = true)]
    provider: Option<ProviderKind>,

    /// Model passed to the provider
    #[arg(long, short = 'm', global = true)]
    model: Option<String>,

    /// Enable debug logging
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask a single agent one question
    Ask { prompt: String },
    /// Run a task through an author, a reviewer and an approver
    Review { task: String },
    /// Interactive chat (default)
    Chat,
    /// Show the effective configuration
    Config {
        /// Write it to the config file
        #[arg(long)]
        init: bool,
    },
}

fn init_tracing(config: &Config, debug: bool) -> anyhow::Result<()> {
    let default_level = if debug { "debug" } else { config.logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("invalid log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let result = if config.logging.json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
    result.map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load();
    if let Some(kind) = args.provider {
        config.set_provider(kind);
    }
    if let Some(model) = args.model {
        config.set_model(model);
    }
    init_tracing(&config, args.debug)?;

    match args.command.unwrap_or(Command::Chat) {
        Command::Ask { prompt } => match cohort::cli::ask(&config, &prompt).await? {
            Outcome::Done(reply) => println!("{}", reply),
            Outcome::Exhausted(reply) => {
                eprintln!("(retry budget exhausted)");
                println!("{}", reply);
            }
            Outcome::Failed(e) => return Err(e).context("ask failed"),
        },

        Command::Review { task } => match cohort::cli::review(&config, &task).await? {
            Outcome::Done(report) | Outcome::Exhausted(report) => {
                println!("{}", report.final_text);
                eprintln!();
                for member in &report.per_agent {
                    eprintln!("  {} ({}): {} tokens", member.name, member.role, member.usage);
                }
                eprintln!("  total: {} tokens", report.total_usage);
            }
            Outcome::Failed(e) => return Err(e).context("review failed"),
        },

        Command::Chat => {
            let mut repl = Repl::with_config(config).await?;
            repl.run().await?;
        }

        Command::Config { init } => {
            if init {
                let path = config.save()?;
                println!("Wrote {}", path.display());
            } else {
                println!("{}", config.to_toml()?);
            }
        }
    }

    Ok(())
}
