//! Configuration management for cohort
//!
//! Supports environment variables, a config file, and runtime overrides.
//! Nothing here is global: the loaded `Config` is handed to whatever needs it.
//!
//! Config file location: ~/.config/cohort/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use crate::core::error::{CohortError, Result};
use crate::core::types::Persona;

/// Main configuration for cohort
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Which reasoning provider to use
    #[serde(default)]
    pub provider: ProviderConfig,
    /// OpenAI-compatible endpoint
    #[serde(default)]
    pub openai: OpenAiConfig,
    /// Ollama server
    #[serde(default)]
    pub ollama: OllamaConfig,
    /// Gemini endpoint
    #[serde(default)]
    pub gemini: GeminiConfig,
    /// Agent loop behaviour
    #[serde(default)]
    pub agent: AgentConfig,
    /// Review pipeline limits
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Built-in fallback persona
    #[serde(default)]
    pub persona: PersonaConfig,
    /// Gateway behaviour
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Logging output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Supported reasoning providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Ollama,
    Gemini,
    Scripted,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Ollama => write!(f, "ollama"),
            ProviderKind::Gemini => write!(f, "gemini"),
            ProviderKind::Scripted => write!(f, "scripted"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = CohortError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" | "open_ai" => Ok(ProviderKind::OpenAi),
            "ollama" => Ok(ProviderKind::Ollama),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "scripted" => Ok(ProviderKind::Scripted),
            other => Err(CohortError::config(format!("Unknown provider '{}'", other))),
        }
    }
}

/// Provider selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider kind (default: ollama)
    pub kind: ProviderKind,
    /// Model identifier passed to the provider
    pub model: String,
}

/// OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

/// Ollama server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Host address (default: localhost)
    pub host: String,
    /// Port number (default: 11434)
    pub port: u16,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Gemini generateContent endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

/// Agent behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Extra think/invoke iterations after the first
    /// Default: 10
    pub max_retries: usize,
}

/// Review pipeline limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum author/reviewer/approver rounds
    pub max_rounds: usize,
    /// Maximum reviewer re-runs inside one round
    pub max_reviewer_repeats: usize,
}

/// Persona used when no profile is active
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    pub role: String,
    pub name: String,
    pub description: String,
}

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// TOML file holding persona profiles
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profiles_file: Option<PathBuf>,
    /// Reply sent when a reasoning step fails
    pub failure_notice: String,
    /// Avatar for the interactive agent
    pub default_avatar: String,
    /// Avatars drawn for queue-channel agents
    pub avatars: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: env::var("COHORT_PROVIDER")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(ProviderKind::Ollama),
            model: env::var("COHORT_MODEL").unwrap_or_else(|_| "qwen3:8b".to_string()),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            api_key: env::var("OPENAI_API_KEY").ok(),
            timeout_secs: 120,
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: env::var("OLLAMA_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: env::var("OLLAMA_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(11434),
            timeout_secs: 120,
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: env::var("GEMINI_API_KEY").ok(),
            timeout_secs: 120,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { max_retries: 10 }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_rounds: 8,
            max_reviewer_repeats: 3,
        }
    }
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            role: "assistant".to_string(),
            name: "Iara".to_string(),
            description: "You are a friendly, concise assistant. Use the capabilities offered \
                          to you when they help, and answer in the language you are spoken to."
                .to_string(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            profiles_file: env::var("COHORT_PROFILES_FILE").ok().map(PathBuf::from),
            failure_notice: "Sorry, something went wrong while handling your message.".to_string(),
            default_avatar: "iara.png".to_string(),
            avatars: (1..=6).map(|i| format!("avatar{}.webp", i)).collect(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: env::var("COHORT_LOG_JSON")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

impl PersonaConfig {
    /// The configured persona as a value
    pub fn to_persona(&self) -> Persona {
        Persona::new(&self.role, &self.name, &self.description)
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cohort")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load() -> Self {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        if !Self::config_file().exists() {
            tracing::debug!("no config file, using default configuration");
            return Self::default();
        }

        match Self::load_from_file() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring config file, using default configuration");
                Self::default()
            }
        }
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Err(CohortError::config("Config file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| CohortError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text; missing sections take defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| CohortError::config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<PathBuf> {
        let config_dir = Self::config_dir();
        let config_path = Self::config_file();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .map_err(|e| CohortError::config(format!("Failed to create config dir: {}", e)))?;
        }

        fs::write(&config_path, self.to_toml()?)
            .map_err(|e| CohortError::config(format!("Failed to write config: {}", e)))?;

        Ok(config_path)
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CohortError::config(format!("Failed to serialize config: {}", e)))
    }

    /// Generate a default config file content for display
    pub fn default_config_toml() -> String {
        Config::default()
            .to_toml()
            .unwrap_or_else(|_| String::from("# Error generating config"))
    }

    /// Get the full Ollama API URL
    pub fn ollama_url(&self) -> String {
        format!("http://{}:{}", self.ollama.host, self.ollama.port)
    }

    /// Switch provider
    pub fn set_provider(&mut self, kind: ProviderKind) {
        self.provider.kind = kind;
    }

    /// Switch model
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.provider.model = model.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.agent.max_retries, 10);
        assert_eq!(config.pipeline.max_rounds, 8);
        assert_eq!(config.pipeline.max_reviewer_repeats, 3);
        assert!(!config.gateway.avatars.is_empty());
    }

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("google".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert!("groq".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_partial_toml_takes_defaults() {
        let config = Config::from_toml(
            r#"
            [provider]
            kind = "gemini"
            model = "gemini-2.0-flash"

            [agent]
            max_retries = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.provider.kind, ProviderKind::Gemini);
        assert_eq!(config.agent.max_retries, 3);
        assert_eq!(config.pipeline.max_rounds, 8);
    }

    #[test]
    fn test_partial_section_keeps_field_defaults() {
        let config = Config::from_toml(
            r#"
            [provider]
            kind = "gemini"

            [pipeline]
            max_rounds = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.provider.kind, ProviderKind::Gemini);
        assert_eq!(config.provider.model, ProviderConfig::default().model);
        assert_eq!(config.pipeline.max_rounds, 2);
        assert_eq!(config.pipeline.max_reviewer_repeats, 3);
    }

    #[test]
    fn test_config_serialization() {
        let toml_str = Config::default().to_toml().unwrap();
        assert!(toml_str.contains("[provider]"));
        assert!(toml_str.contains("max_retries"));
    }

    #[test]
    fn test_config_dir() {
        let dir = Config::config_dir();
        assert!(dir.to_string_lossy().contains("cohort"));
    }
}
