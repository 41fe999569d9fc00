//! Pipeline state and the patches that mutate it.
//!
//! `PipelineState` is the one mutable record for a generation run. Agents
//! never touch it directly: each returns a `StagePatch` and the orchestrator
//! applies it in `apply()`, so every mutation path is visible in one place.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use tidings_common::{
    Discussion, DigestKind, Draft, EngagementMetrics, QualityMetrics, RenderedFormats, Section,
    Stage, StageFault, TopicCategory,
};

/// One finding produced by the research stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchFinding {
    pub topic: String,
    pub findings: String,
    pub sources: Vec<String>,
    pub relevance_score: f64,
}

/// Per-category analysis produced by the content-analysis stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryAnalysis {
    pub category: TopicCategory,
    pub summary: String,
    pub themes: Vec<String>,
    pub discussion_ids: Vec<String>,
}

/// Auxiliary content gathered by the enrichment stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichedContent {
    pub news: Option<NewsItem>,
    pub events: Vec<String>,
    pub meme_url: Option<String>,
    pub merch_idea_urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub summary: String,
    pub url: Option<String>,
    pub source_link: Option<String>,
    pub discussion_id: String,
}

/// Commentary on one featured discussion, written by the opinion stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commentary {
    pub discussion_id: String,
    pub headline: String,
    pub body: String,
}

// ---------------------------------------------------------------------------
// PipelineState
// ---------------------------------------------------------------------------

/// Mutable state for one generation run. Created at run start, exclusively
/// owned by one orchestrator, handed to the persistence layer at run end.
pub struct PipelineState {
    /// What is being generated.
    pub kind: DigestKind,
    pub target_date: NaiveDate,

    /// Input discussions, read-only to the pipeline.
    pub discussions: Vec<Discussion>,

    /// Engagement metrics keyed by discussion id.
    pub metrics: HashMap<String, EngagementMetrics>,

    /// Research stage output.
    pub research_topics: Vec<String>,
    pub research_findings: Vec<ResearchFinding>,

    /// Content-analysis stage output.
    pub analysis: Vec<CategoryAnalysis>,

    /// Draft sections. Rebuilt by discussion-writing, rewritten in place by
    /// editing; other stages only read them.
    pub sections: Vec<Section>,

    /// Enrichment stage output.
    pub enrichment: EnrichedContent,

    /// Opinion stage output: featured commentary plus per-section intros
    /// keyed by section title.
    pub commentary: Vec<Commentary>,
    pub section_intros: HashMap<String, String>,

    /// Editing stage output; `overall_score` feeds the quality gate.
    pub quality_metrics: QualityMetrics,

    /// Formatting stage output.
    pub draft: Option<Draft>,
    pub formats: Option<RenderedFormats>,

    /// Append-only: never cleared for the life of the run.
    pub errors: Vec<StageFault>,
    pub warnings: Vec<String>,

    pub current_stage: Stage,
    pub iteration_count: u32,
}

impl PipelineState {
    pub fn new(
        kind: DigestKind,
        target_date: NaiveDate,
        discussions: Vec<Discussion>,
        metrics: HashMap<String, EngagementMetrics>,
    ) -> Self {
        Self {
            kind,
            target_date,
            discussions,
            metrics,
            research_topics: Vec::new(),
            research_findings: Vec::new(),
            analysis: Vec::new(),
            sections: Vec::new(),
            enrichment: EnrichedContent::default(),
            commentary: Vec::new(),
            section_intros: HashMap::new(),
            // Starts above the gate threshold; a run where editing never
            // scores anything (no sections) should not loop on quality alone.
            quality_metrics: QualityMetrics {
                overall_score: 0.8,
                ..QualityMetrics::default()
            },
            draft: None,
            formats: None,
            errors: Vec::new(),
            warnings: Vec::new(),
            current_stage: Stage::Research,
            iteration_count: 0,
        }
    }

    /// Engagement score for one discussion, 0.0 when metrics are missing.
    pub fn engagement_score(&self, discussion_id: &str) -> f64 {
        self.metrics
            .get(discussion_id)
            .map(|m| m.engagement_score)
            .unwrap_or(0.0)
    }

    /// Merge a stage's patch. Per-stage semantics:
    /// research / analysis / enrichment / opinion outputs overwrite their
    /// fields (iterations regenerate them), sections are replaced wholesale
    /// by their producing stage, errors and warnings are append-only.
    pub fn apply(&mut self, patch: StagePatch) {
        tracing::debug!(
            stage = %patch.stage,
            action = %patch.action,
            confidence = patch.confidence,
            "Merging stage patch"
        );

        match patch.output {
            StageOutput::Empty => {}
            StageOutput::Research { topics, findings } => {
                self.research_topics = topics;
                self.research_findings = findings;
            }
            StageOutput::Analysis(analysis) => {
                self.analysis = analysis;
            }
            StageOutput::Sections(sections) => {
                self.sections = sections;
            }
            StageOutput::Enrichment(enriched) => {
                self.enrichment = enriched;
            }
            StageOutput::Opinion {
                commentary,
                section_intros,
            } => {
                self.commentary = commentary;
                self.section_intros = section_intros;
            }
            StageOutput::Edited { sections, metrics } => {
                self.sections = sections;
                self.quality_metrics = metrics;
            }
            StageOutput::Formatted { draft, formats } => {
                self.draft = Some(draft);
                self.formats = Some(formats);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// StagePatch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageAction {
    /// Required input was missing; the stage contributed nothing.
    Skip,
    Complete,
}

impl std::fmt::Display for StageAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageAction::Skip => write!(f, "skip"),
            StageAction::Complete => write!(f, "complete"),
        }
    }
}

/// Typed stage output. One variant per producing stage so `apply()` can
/// give each field category explicit merge semantics.
#[derive(Debug, Clone)]
pub enum StageOutput {
    Empty,
    Research {
        topics: Vec<String>,
        findings: Vec<ResearchFinding>,
    },
    Analysis(Vec<CategoryAnalysis>),
    Sections(Vec<Section>),
    Enrichment(EnrichedContent),
    Opinion {
        commentary: Vec<Commentary>,
        section_intros: HashMap<String, String>,
    },
    Edited {
        sections: Vec<Section>,
        metrics: QualityMetrics,
    },
    Formatted {
        draft: Draft,
        formats: RenderedFormats,
    },
}

/// What every stage agent returns. Consumed by `PipelineState::apply`,
/// never retained.
#[derive(Debug, Clone)]
pub struct StagePatch {
    pub stage: Stage,
    pub action: StageAction,
    pub output: StageOutput,
    /// Agent's confidence in its output, in [0, 1].
    pub confidence: f64,
    pub reasoning: String,
    pub model_used: Option<String>,
}

impl StagePatch {
    pub fn skip(stage: Stage, reasoning: impl Into<String>) -> Self {
        Self {
            stage,
            action: StageAction::Skip,
            output: StageOutput::Empty,
            confidence: 0.0,
            reasoning: reasoning.into(),
            model_used: None,
        }
    }

    pub fn complete(stage: Stage, output: StageOutput, confidence: f64) -> Self {
        Self {
            stage,
            action: StageAction::Complete,
            output,
            confidence,
            reasoning: String::new(),
            model_used: None,
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model_used = model;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidings_common::{SectionKind, Stage};

    fn empty_state() -> PipelineState {
        PipelineState::new(
            DigestKind::Daily,
            NaiveDate::from_ymd_opt(2026, 8, 28).unwrap(),
            Vec::new(),
            HashMap::new(),
        )
    }

    #[test]
    fn sections_are_replaced_not_appended() {
        let mut state = empty_state();
        state.apply(StagePatch::complete(
            Stage::DiscussionWriting,
            StageOutput::Sections(vec![Section::new(SectionKind::General, "A", "one")]),
            0.9,
        ));
        state.apply(StagePatch::complete(
            Stage::DiscussionWriting,
            StageOutput::Sections(vec![Section::new(SectionKind::General, "B", "two")]),
            0.9,
        ));
        assert_eq!(state.sections.len(), 1);
        assert_eq!(state.sections[0].title, "B");
    }

    #[test]
    fn skip_patch_changes_nothing() {
        let mut state = empty_state();
        state.research_topics = vec!["existing".to_string()];
        state.apply(StagePatch::skip(Stage::Research, "no discussions"));
        assert_eq!(state.research_topics, vec!["existing".to_string()]);
    }
}
