//! Editing stage: copy cleanup plus the quality metrics the gate reads.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use ai_client::ChatModel;
use tidings_common::{word_count, QualityMetrics, Section, Stage};

use crate::capability::ModelCapability;
use crate::state::{PipelineState, StageOutput, StagePatch};

use super::{AgentFault, StageAgent};

const MIN_SECTION_WORDS: usize = 50;
const MAX_SECTION_WORDS: usize = 500;
const MAX_AVG_SENTENCE_WORDS: usize = 25;
const WORDS_PER_MINUTE: usize = 200;

const TECHNICAL_TERMS: &[&str] = &[
    "langchain", "langgraph", "agent", "llm", "rag", "vector", "embedding", "api", "python",
    "javascript", "ai", "ml",
];

pub struct EditorAgent;

impl EditorAgent {
    pub fn new() -> Self {
        Self
    }

    /// Mechanical cleanup applied when no model handle is available:
    /// whitespace normalization and terminal punctuation per paragraph.
    fn basic_edit(text: &str) -> String {
        text.lines()
            .map(|line| {
                let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
                if collapsed.is_empty()
                    || collapsed.ends_with(['.', '!', '?', ':', ')'])
                    || collapsed.ends_with("**")
                {
                    collapsed
                } else {
                    format!("{collapsed}.")
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    async fn edit_section(
        &self,
        model: &Option<Arc<dyn ChatModel>>,
        section: &Section,
    ) -> Result<Section, AgentFault> {
        let body = match model {
            Some(model) => model
                .chat_completion(
                    "You are a copy editor. Tighten the text for clarity and flow \
                     without changing facts, names, or links. Return only the \
                     edited text.",
                    &section.body,
                )
                .await
                .map_err(AgentFault::model)?,
            None => Self::basic_edit(&section.body),
        };

        let mut edited = section.clone();
        edited.word_count = word_count(&body);
        edited.body = body;
        Ok(edited)
    }

    /// Quality metrics over the edited sections. The overall score starts at
    /// 1.0 and loses 0.1 per issue, clamped to [0.5, 1.0].
    fn quality_checks(sections: &[Section]) -> QualityMetrics {
        let mut metrics = QualityMetrics::default();
        let mut total_words = 0usize;

        for section in sections {
            let words = section.word_count;
            total_words += words;

            let lower = section.body.to_lowercase();
            for term in TECHNICAL_TERMS {
                metrics.technical_term_count += lower.matches(term).count();
            }

            if words < MIN_SECTION_WORDS {
                metrics
                    .issues
                    .push(format!("Section '{}' is too short", section.title));
            } else if words > MAX_SECTION_WORDS {
                metrics
                    .issues
                    .push(format!("Section '{}' is too long", section.title));
            }

            let sentences: Vec<&str> = section
                .body
                .split(['.', '!', '?'])
                .filter(|s| !s.trim().is_empty())
                .collect();
            if !sentences.is_empty() {
                let avg =
                    sentences.iter().map(|s| word_count(s)).sum::<usize>() / sentences.len();
                if avg > MAX_AVG_SENTENCE_WORDS {
                    metrics
                        .issues
                        .push(format!("Section '{}' has long sentences", section.title));
                }
            }
        }

        metrics.total_word_count = total_words;
        metrics.average_section_words = total_words / sections.len().max(1);
        metrics.overall_score =
            (1.0 - metrics.issues.len() as f64 * 0.1).clamp(0.5, 1.0);
        metrics.estimated_read_time_min = (total_words / WORDS_PER_MINUTE).max(1);
        metrics
    }
}

impl Default for EditorAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StageAgent for EditorAgent {
    fn stage(&self) -> Stage {
        Stage::Editing
    }

    fn capability(&self) -> ModelCapability {
        ModelCapability::Editing
    }

    async fn process(
        &self,
        state: &PipelineState,
        model: Option<Arc<dyn ChatModel>>,
    ) -> Result<StagePatch, AgentFault> {
        if state.sections.is_empty() {
            return Ok(StagePatch::skip(Stage::Editing, "No sections to edit"));
        }

        let mut edited = Vec::with_capacity(state.sections.len());
        for section in &state.sections {
            edited.push(self.edit_section(&model, section).await?);
        }

        let metrics = Self::quality_checks(&edited);
        info!(
            sections = edited.len(),
            word_count = metrics.total_word_count,
            issues = metrics.issues.len(),
            overall_score = metrics.overall_score,
            "Editing complete"
        );

        let confidence = metrics.overall_score;
        let reasoning = format!(
            "Edited {} sections; {} quality issues found",
            edited.len(),
            metrics.issues.len()
        );
        Ok(StagePatch::complete(
            Stage::Editing,
            StageOutput::Edited {
                sections: edited,
                metrics,
            },
            confidence,
        )
        .with_reasoning(reasoning)
        .with_model(model.map(|m| m.model_id().to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidings_common::SectionKind;

    fn section(title: &str, words: usize) -> Section {
        let body = vec!["word"; words].join(" ") + ".";
        Section::new(SectionKind::General, title, body)
    }

    #[test]
    fn short_section_is_flagged() {
        let metrics = EditorAgent::quality_checks(&[section("Tiny", 10)]);
        assert_eq!(metrics.issues.len(), 1);
        assert!(metrics.issues[0].contains("too short"));
        assert!((metrics.overall_score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn overall_score_clamps_at_half() {
        let sections: Vec<Section> = (0..10).map(|i| section(&format!("S{i}"), 5)).collect();
        let metrics = EditorAgent::quality_checks(&sections);
        assert_eq!(metrics.overall_score, 0.5);
    }

    #[test]
    fn clean_sections_score_full() {
        let metrics = EditorAgent::quality_checks(&[section("Good", 100)]);
        // 100 words in one sentence trips the long-sentence check; split it.
        let body = (0..10)
            .map(|_| vec!["word"; 10].join(" ") + ".")
            .collect::<Vec<_>>()
            .join(" ");
        let clean = Section::new(SectionKind::General, "Good", body);
        let clean_metrics = EditorAgent::quality_checks(&[clean]);
        assert!(clean_metrics.overall_score > metrics.overall_score);
        assert_eq!(clean_metrics.overall_score, 1.0);
        assert_eq!(clean_metrics.estimated_read_time_min, 1);
    }

    #[test]
    fn basic_edit_normalizes_whitespace_and_punctuation() {
        let edited = EditorAgent::basic_edit("hello   world\nalready done.");
        assert_eq!(edited, "hello world.\nalready done.");
    }
}
