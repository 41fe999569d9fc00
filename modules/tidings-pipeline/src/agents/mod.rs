//! Stage agents.
//!
//! Every agent implements one operation, `process`, taking the shared state
//! read-only and returning a patch. The orchestrator resolves a model handle
//! for the agent's declared capability and passes it in; `None` means "use
//! the template fallback," never an error.

pub mod analyst;
pub mod discussion_writer;
pub mod editor;
pub mod enrichment;
pub mod formatter;
pub mod opinion;
pub mod research;

pub use analyst::AnalystAgent;
pub use discussion_writer::DiscussionWriterAgent;
pub use editor::EditorAgent;
pub use enrichment::EnrichmentAgent;
pub use formatter::FormatterAgent;
pub use opinion::OpinionAgent;
pub use research::ResearchAgent;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use ai_client::ChatModel;
use tidings_common::{FaultKind, Stage};

use crate::capability::ModelCapability;
use crate::state::{PipelineState, StagePatch};

/// A fault raised inside a stage. Carries the kind so the orchestrator can
/// append a machine-checkable entry to the run's error list.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AgentFault {
    pub kind: FaultKind,
    pub message: String,
}

impl AgentFault {
    pub fn model(err: impl std::fmt::Display) -> Self {
        Self {
            kind: FaultKind::ModelInvocation,
            message: err.to_string(),
        }
    }

    pub fn lookup(err: impl std::fmt::Display) -> Self {
        Self {
            kind: FaultKind::Lookup,
            message: err.to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::Internal,
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait StageAgent: Send + Sync {
    fn stage(&self) -> Stage;

    /// Capability the orchestrator resolves before calling `process`.
    fn capability(&self) -> ModelCapability;

    async fn process(
        &self,
        state: &PipelineState,
        model: Option<Arc<dyn ChatModel>>,
    ) -> Result<StagePatch, AgentFault>;
}

/// Truncate at a char boundary, appending an ellipsis when cut.
pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

/// First http(s) URL found in free text, if any.
pub(crate) fn first_url(text: &str) -> Option<String> {
    text.split_whitespace()
        .find(|token| token.starts_with("http://") || token.starts_with("https://"))
        .map(|token| token.trim_end_matches([')', ',', '.', '>']).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_preserves_short_text() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 5), "hello...");
    }

    #[test]
    fn first_url_strips_trailing_punctuation() {
        assert_eq!(
            first_url("see https://example.org/post. for details"),
            Some("https://example.org/post".to_string())
        );
        assert_eq!(first_url("no links here"), None);
    }
}
