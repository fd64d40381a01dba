//! CLI commands
//!
//! Slash commands understood by the chat REPL.

use crate::core::{CohortError, Config, Result};
use crate::gateway::{CatalogEntry, Gateway};

/// Result of parsing a command
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// Not a command; send to the agent
    Continue(String),
    /// Command was handled, show output
    Handled(String),
    /// Exit the REPL
    Exit,
}

/// Parse and handle slash commands
pub async fn handle_command(input: &str, gateway: &Gateway, config: &Config) -> Result<CommandResult> {
    let input = input.trim();
    if !input.starts_with('/') {
        return Ok(match input {
            "exit" | "quit" => CommandResult::Exit,
            _ => CommandResult::Continue(input.to_string()),
        });
    }

    let mut parts = input[1..].splitn(2, ' ');
    let cmd = parts.next().unwrap_or_default().to_lowercase();
    let args = parts.next().map(str::trim).unwrap_or("");

    match cmd.as_str() {
        "exit" | "quit" | "q" => Ok(CommandResult::Exit),

        "help" | "?" => Ok(CommandResult::Handled(help_text())),

        "tools" => Ok(CommandResult::Handled(format_catalog(
            &gateway.capabilities().await?,
        ))),

        "enable" | "disable" => {
            if args.is_empty() {
                return Ok(CommandResult::Handled(format!("Usage: /{} <capability-id>", cmd)));
            }
            match gateway.handle_capability_toggle(args, cmd == "enable").await {
                Ok(entries) => Ok(CommandResult::Handled(format_catalog(&entries))),
                Err(CohortError::CapabilityNotFound(id)) => Ok(CommandResult::Handled(format!(
                    "Unknown capability: {}. Type /tools to list them.",
                    id
                ))),
                Err(e) => Err(e),
            }
        }

        "config" => Ok(CommandResult::Handled(config.to_toml()?)),

        _ => Ok(CommandResult::Handled(format!(
            "Unknown command: /{}. Type /help for available commands.",
            cmd
        ))),
    }
}

fn format_catalog(entries: &[CatalogEntry]) -> String {
    if entries.is_empty() {
        return "No capabilities registered.".to_string();
    }
    entries
        .iter()
        .map(|e| {
            format!(
                "  [{}] {:<12} {}",
                if e.enabled { "x" } else { " " },
                e.id,
                e.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Generate help text
fn help_text() -> String {
    r#"Commands:
─────────────────────────────────────────────
  /help              Show this help message
  /tools             List capabilities and whether they are enabled
  /enable <id>       Let the agent use a capability
  /disable <id>      Take a capability away from the agent
  /config            Show the effective configuration
  /exit              Leave the chat

Keyboard Shortcuts:
  Ctrl+D             Exit
─────────────────────────────────────────────"#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_catalog_marks_enabled() {
        let entries = vec![
            CatalogEntry {
                id: "echo".into(),
                name: "Echo".into(),
                description: "Repeats".into(),
                enabled: true,
            },
            CatalogEntry {
                id: "date-time".into(),
                name: "Date".into(),
                description: "Clock".into(),
                enabled: false,
            },
        ];
        let text = format_catalog(&entries);
        assert!(text.contains("[x] echo"));
        assert!(text.contains("[ ] date-time"));
    }

    #[test]
    fn test_help_lists_commands() {
        let help = help_text();
        for cmd in ["/help", "/tools", "/enable", "/disable", "/config", "/exit"] {
            assert!(help.contains(cmd), "missing {}", cmd);
        }
    }
}
