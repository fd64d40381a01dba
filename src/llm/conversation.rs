//! Conversation log
//!
//! Append-only: turns are never reordered or pruned.

use crate::core::{ChatTurn, Role};

/// Ordered chat log owned by one reasoning backend
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<ChatTurn>,
}

impl Conversation {
    /// Create an empty conversation
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a conversation seeded with a system prompt
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        let mut conversation = Self::new();
        conversation.add_system(prompt);
        conversation
    }

    /// Add a system message
    pub fn add_system(&mut self, content: impl Into<String>) {
        self.turns.push(ChatTurn::system(content));
    }

    /// Add a user message
    pub fn add_user(&mut self, content: impl Into<String>) {
        self.turns.push(ChatTurn::user(content));
    }

    /// Add an assistant message
    pub fn add_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(ChatTurn::assistant(content));
    }

    /// All turns in order
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Most recent turn
    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }

    /// Number of turns with the given role
    pub fn count(&self, role: Role) -> usize {
        self.turns.iter().filter(|t| t.role == role).count()
    }

    /// Get conversation length
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Check if conversation is empty
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_order_is_kept() {
        let mut conv = Conversation::with_system_prompt("be kind");
        conv.add_user("hello");
        conv.add_assistant("hi");
        conv.add_system("[echo] said: hi");

        let roles: Vec<Role> = conv.turns().iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::System]
        );
        assert_eq!(conv.count(Role::System), 2);
        assert_eq!(conv.last().unwrap().content, "[echo] said: hi");
    }

    #[test]
    fn test_no_pruning() {
        let mut conv = Conversation::new();
        for i in 0..2_000 {
            conv.add_user(format!("message {}", i));
        }
        assert_eq!(conv.len(), 2_000);
        assert_eq!(conv.turns()[0].content, "message 0");
    }
}
