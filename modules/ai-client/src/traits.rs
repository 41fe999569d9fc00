use anyhow::Result;
use async_trait::async_trait;

// =============================================================================
// Message Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

// =============================================================================
// ChatModel Trait
// =============================================================================

/// A model that can turn a system prompt plus a user prompt into text.
/// Pipeline agents depend on this trait rather than a concrete provider so
/// tests can swap in scripted models.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat_completion(&self, system: &str, user: &str) -> Result<String>;

    /// Provider model identifier, used for logging only.
    fn model_id(&self) -> &str;
}
