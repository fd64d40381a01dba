//! LLM module - reasoning provider integrations
//!
//! Provides the provider abstraction, the conversation-owning reasoning
//! backend, and one canonicalizing adapter per provider.

pub mod backend;
pub mod conversation;
pub mod ollama;
pub mod provider;
pub mod traits;

pub use backend::ReasoningBackend;
pub use conversation::Conversation;
pub use ollama::OllamaClient;
pub use provider::create_provider;
pub use provider::scripted::ScriptedProvider;
pub use traits::LlmProvider;
