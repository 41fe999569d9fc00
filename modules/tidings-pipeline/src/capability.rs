//! Capability-to-model routing.
//!
//! Stages declare an abstract capability; the router maps it to a concrete
//! model handle. Resolution failure is never fatal: a `None` handle tells
//! the agent to use its template fallback.

use std::sync::Arc;

use ai_client::{ChatModel, Claude};
use tidings_common::Config;
use tracing::{info, warn};

/// Abstract task label a stage resolves to a model handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelCapability {
    Research,
    Analysis,
    Writing,
    Commentary,
    Editing,
    Formatting,
}

impl std::fmt::Display for ModelCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelCapability::Research => write!(f, "research"),
            ModelCapability::Analysis => write!(f, "analysis"),
            ModelCapability::Writing => write!(f, "writing"),
            ModelCapability::Commentary => write!(f, "commentary"),
            ModelCapability::Editing => write!(f, "editing"),
            ModelCapability::Formatting => write!(f, "formatting"),
        }
    }
}

/// Maps capabilities onto the two configured model tiers. Writing-heavy
/// capabilities get the larger model, mechanical ones the cheaper tier.
#[derive(Clone, Default)]
pub struct ModelRouter {
    writing: Option<Arc<dyn ChatModel>>,
    editing: Option<Arc<dyn ChatModel>>,
}

impl ModelRouter {
    pub fn new(
        writing: Option<Arc<dyn ChatModel>>,
        editing: Option<Arc<dyn ChatModel>>,
    ) -> Self {
        Self { writing, editing }
    }

    /// Build from config. With no API key configured, every capability
    /// resolves to `None` and the pipeline runs entirely on fallbacks.
    pub fn from_config(config: &Config) -> Self {
        if config.anthropic_api_key.is_empty() {
            warn!("No Anthropic API key configured; all stages will use template fallbacks");
            return Self::default();
        }

        let writing: Arc<dyn ChatModel> = Arc::new(Claude::new(
            &config.anthropic_api_key,
            &config.writing_model,
        ));
        let editing: Arc<dyn ChatModel> = Arc::new(Claude::new(
            &config.anthropic_api_key,
            &config.editing_model,
        ));

        info!(
            writing_model = %config.writing_model,
            editing_model = %config.editing_model,
            "Model router configured"
        );

        Self {
            writing: Some(writing),
            editing: Some(editing),
        }
    }

    pub fn resolve(&self, capability: ModelCapability) -> Option<Arc<dyn ChatModel>> {
        let handle = match capability {
            ModelCapability::Writing | ModelCapability::Commentary | ModelCapability::Analysis => {
                self.writing.clone()
            }
            ModelCapability::Research | ModelCapability::Editing | ModelCapability::Formatting => {
                self.editing.clone()
            }
        };

        if handle.is_none() {
            tracing::debug!(%capability, "Capability unresolved, agent will fall back");
        }
        handle
    }
}
