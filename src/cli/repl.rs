//! Interactive REPL
//!
//! Chats with the gateway's interactive agent and prints agent activity as
//! it happens.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::capability::builtin;
use crate::cli::commands::{handle_command, CommandResult};
use crate::core::{Config, Result};
use crate::gateway::{
    ChannelPublisher, FileProfileStore, Gateway, GatewayEvent, InMemoryCatalog, ProfileStore,
    QueueReply, StaticProfileStore,
};
use crate::llm::create_provider;

/// Interactive REPL (Read-Eval-Print Loop)
pub struct Repl {
    gateway: Gateway,
    config: Config,
    // Keeps the reply channel open; the chat never publishes to the queue
    _replies: mpsc::Receiver<QueueReply>,
}

impl Repl {
    /// Create a REPL with the given configuration
    pub async fn with_config(config: Config) -> Result<Self> {
        let provider = create_provider(&config)?;
        let profiles: Arc<dyn ProfileStore> = match &config.gateway.profiles_file {
            Some(path) => Arc::new(FileProfileStore::new(path)),
            None => Arc::new(StaticProfileStore::default()),
        };
        let (publisher, replies) = ChannelPublisher::channel(16);

        let gateway = Gateway::new(
            &config,
            provider,
            builtin::builtin_set()?,
            Arc::new(InMemoryCatalog::new()),
            profiles,
            Arc::new(publisher),
        )
        .await?;

        Ok(Self {
            gateway,
            config,
            _replies: replies,
        })
    }

    fn spawn_activity_printer(&self) -> JoinHandle<()> {
        let mut events = BroadcastStream::new(self.gateway.subscribe());
        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                match event {
                    Ok(GatewayEvent::Activity(activity)) => {
                        if let Some(capability) = activity.capability {
                            println!("  · {} used {}: {}", activity.actor, capability, activity.text);
                        }
                    }
                    Ok(GatewayEvent::Information(text)) => println!("  ! {}", text),
                    Ok(GatewayEvent::Timeline(_)) => {}
                    Err(e) => tracing::debug!(error = %e, "activity printer lagged"),
                }
            }
        })
    }

    /// Run the REPL
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner();
        let printer = self.spawn_activity_printer();

        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            print!("You: ");
            stdout.flush()?;

            let mut input = String::new();
            match stdin.lock().read_line(&mut input) {
                Ok(0) => {
                    // EOF (Ctrl+D)
                    println!("\nGoodbye!");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("Error reading input: {}", e);
                    continue;
                }
            }

            let input = input.trim();
            if input.is_empty() {
                continue;
            }

            match handle_command(input, &self.gateway, &self.config).await {
                Ok(CommandResult::Exit) => {
                    println!("\nGoodbye!");
                    break;
                }
                Ok(CommandResult::Handled(output)) => {
                    println!("{}\n", output);
                }
                Ok(CommandResult::Continue(text)) => {
                    match self.gateway.handle_client_message(&text).await {
                        Ok(reply) => println!("\n{}:\n{}\n", self.config.persona.name, reply),
                        Err(e) => eprintln!("\nError: {}\n", e),
                    }
                }
                Err(e) => eprintln!("Command error: {}\n", e),
            }
        }

        printer.abort();
        Ok(())
    }

    fn print_banner(&self) {
        println!("cohort {}", env!("CARGO_PKG_VERSION"));
        println!("Provider:   {}", self.config.provider.kind);
        println!("Model:      {}", self.config.provider.model);
        println!("Persona:    {} ({})", self.config.persona.name, self.config.persona.role);
        println!();
        println!("Capabilities start disabled; /tools lists them, /enable <id> turns one on.");
        println!("Commands: /help, /tools, /enable, /disable, /config, /exit");
        println!("─────────────────────────────────────────────");
    }
}
