//! Content-analysis stage: per-category summaries feeding the writers.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use ai_client::ChatModel;
use tidings_common::{Discussion, Stage, TopicCategory};

use crate::capability::ModelCapability;
use crate::state::{CategoryAnalysis, PipelineState, StageOutput, StagePatch};

use super::{truncate, AgentFault, StageAgent};

/// Discussions included verbatim in each category prompt.
const PROMPT_SAMPLE: usize = 5;

pub struct AnalystAgent {
    community_name: String,
}

impl AnalystAgent {
    pub fn new(community_name: impl Into<String>) -> Self {
        Self {
            community_name: community_name.into(),
        }
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are a technical content analyst for the {} community digest. \
             Summarize chat discussions clearly, extract the main themes, and keep \
             a professional but approachable tone. Respond with 2-3 sentences.",
            self.community_name
        )
    }

    fn category_prompt(
        &self,
        category: TopicCategory,
        discussions: &[&Discussion],
        state: &PipelineState,
    ) -> String {
        let mut lines = vec![format!(
            "Analyze these {} discussions:",
            category.section_title()
        )];
        for d in discussions.iter().take(PROMPT_SAMPLE) {
            lines.push(format!(
                "- {} (score {:.2}, {} replies, keywords: {})",
                truncate(&d.content, 300),
                state.engagement_score(&d.id),
                d.reply_count,
                d.keywords.join(", ")
            ));
        }

        let relevant: Vec<&str> = state
            .research_findings
            .iter()
            .filter(|r| {
                r.topic
                    .to_lowercase()
                    .contains(&category.to_string().replace('-', " "))
                    || category == TopicCategory::AiMl
            })
            .take(2)
            .map(|r| r.findings.as_str())
            .collect();
        if !relevant.is_empty() {
            lines.push(format!("Research context: {}", relevant.join(" | ")));
        }

        lines.push("Summarize the key themes and takeaways in 2-3 sentences.".to_string());
        lines.join("\n")
    }

    /// Template summary used when no model handle is available.
    fn fallback_summary(
        category: TopicCategory,
        discussions: &[&Discussion],
        state: &PipelineState,
    ) -> String {
        let Some(top) = discussions.first() else {
            return format!("No activity in {} this period.", category.section_title());
        };
        format!(
            "{} active discussions in {}, led by {}. Top thread (engagement {:.2}): {}",
            discussions.len(),
            category.section_title(),
            top.author,
            state.engagement_score(&top.id),
            truncate(&top.content, 120)
        )
    }

    fn top_themes(discussions: &[&Discussion]) -> Vec<String> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for d in discussions {
            for kw in &d.keywords {
                *counts.entry(kw.as_str()).or_default() += 1;
            }
        }
        let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        ranked
            .into_iter()
            .take(3)
            .map(|(kw, _)| kw.to_string())
            .collect()
    }
}

#[async_trait]
impl StageAgent for AnalystAgent {
    fn stage(&self) -> Stage {
        Stage::ContentAnalysis
    }

    fn capability(&self) -> ModelCapability {
        ModelCapability::Analysis
    }

    async fn process(
        &self,
        state: &PipelineState,
        model: Option<Arc<dyn ChatModel>>,
    ) -> Result<StagePatch, AgentFault> {
        if state.discussions.is_empty() {
            return Ok(StagePatch::skip(
                Stage::ContentAnalysis,
                "No discussions to analyze",
            ));
        }

        // Group by primary category, highest engagement first. BTreeMap keeps
        // category order stable across runs.
        let mut grouped: BTreeMap<TopicCategory, Vec<&Discussion>> = BTreeMap::new();
        for d in &state.discussions {
            grouped.entry(d.primary_category()).or_default().push(d);
        }
        for group in grouped.values_mut() {
            group.sort_by(|a, b| {
                state
                    .engagement_score(&b.id)
                    .total_cmp(&state.engagement_score(&a.id))
            });
        }

        let mut analysis = Vec::with_capacity(grouped.len());
        for (category, discussions) in &grouped {
            let summary = match &model {
                Some(model) => model
                    .chat_completion(
                        &self.system_prompt(),
                        &self.category_prompt(*category, discussions, state),
                    )
                    .await
                    .map_err(AgentFault::model)?,
                None => Self::fallback_summary(*category, discussions, state),
            };

            analysis.push(CategoryAnalysis {
                category: *category,
                summary,
                themes: Self::top_themes(discussions),
                discussion_ids: discussions.iter().map(|d| d.id.clone()).collect(),
            });
        }

        info!(
            categories = analysis.len(),
            discussions = state.discussions.len(),
            "Content analysis complete"
        );

        let reasoning = format!(
            "Analyzed {} discussions across {} categories",
            state.discussions.len(),
            analysis.len()
        );
        Ok(StagePatch::complete(
            Stage::ContentAnalysis,
            StageOutput::Analysis(analysis),
            0.9,
        )
        .with_reasoning(reasoning)
        .with_model(model.map(|m| m.model_id().to_string())))
    }
}
