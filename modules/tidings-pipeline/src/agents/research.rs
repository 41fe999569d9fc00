//! Research stage: derive topics from the selected discussions and look
//! them up against an external research source.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{stream, StreamExt};
use tracing::{info, warn};

use ai_client::ChatModel;
use tidings_common::{Discussion, Stage};

use crate::capability::ModelCapability;
use crate::research::ResearchSource;
use crate::state::{PipelineState, ResearchFinding, StageOutput, StagePatch};

use super::{AgentFault, StageAgent};

/// How many topics get a live lookup per run.
const MAX_LOOKUPS: usize = 5;
const LOOKUP_CONCURRENCY: usize = 3;

pub struct ResearchAgent {
    source: Option<Arc<dyn ResearchSource>>,
    community_name: String,
}

impl ResearchAgent {
    pub fn new(source: Option<Arc<dyn ResearchSource>>, community_name: impl Into<String>) -> Self {
        Self {
            source,
            community_name: community_name.into(),
        }
    }

    /// Topics worth a lookup, derived from discussion keywords. Sorted and
    /// deduplicated so runs are deterministic.
    fn identify_topics(&self, discussions: &[Discussion]) -> Vec<String> {
        let mut topics = BTreeSet::new();

        for discussion in discussions {
            let content = discussion.content.to_lowercase();
            let has = |kw: &str| discussion.keywords.iter().any(|k| k == kw);

            if has("langchain") && content.contains("update") {
                topics.insert("Latest LangChain updates and releases".to_string());
            }
            if has("langgraph") {
                topics.insert("LangGraph best practices and patterns".to_string());
            }
            if has("agent")
                && ["build", "create", "implement"].iter().any(|w| content.contains(w))
            {
                topics.insert("AI agent implementation techniques".to_string());
            }
            if has("rag") || has("retrieval") {
                topics.insert("RAG (Retrieval Augmented Generation) advancements".to_string());
            }
        }

        // Standing community topics included in every run.
        topics.insert(format!("{} events this week", self.community_name));
        topics.insert("AI/ML industry news and trends".to_string());

        topics.into_iter().collect()
    }

    fn build_query(&self, topic: &str) -> String {
        let mut parts = vec![topic.to_string()];
        let lower = topic.to_lowercase();

        if lower.contains("update") || lower.contains("latest") {
            parts.push("recent releases".to_string());
        }
        if lower.contains("events") || lower.contains("community") {
            parts.push(format!("{} tech community", self.community_name));
        }
        if lower.contains("langchain") || lower.contains("langgraph") {
            parts.push("LangChain LangGraph LangSmith".to_string());
        }

        parts.join(" ")
    }
}

#[async_trait]
impl StageAgent for ResearchAgent {
    fn stage(&self) -> Stage {
        Stage::Research
    }

    fn capability(&self) -> ModelCapability {
        ModelCapability::Research
    }

    async fn process(
        &self,
        state: &PipelineState,
        _model: Option<Arc<dyn ChatModel>>,
    ) -> Result<StagePatch, AgentFault> {
        if state.discussions.is_empty() {
            return Ok(StagePatch::skip(
                Stage::Research,
                "No discussions provided for research",
            ));
        }

        let topics = self.identify_topics(&state.discussions);

        let findings: Vec<ResearchFinding> = match &self.source {
            None => Vec::new(),
            Some(source) => {
                // Bounded fan-out; per-topic failures are logged and dropped
                // rather than failing the stage.
                let results: Vec<_> = stream::iter(topics.iter().take(MAX_LOOKUPS).cloned())
                    .map(|topic| {
                        let query = self.build_query(&topic);
                        let source = source.clone();
                        async move {
                            match source.research(&query, &topic).await {
                                Ok(finding) => Some(finding),
                                Err(e) => {
                                    warn!(topic = %topic, error = %e, "Research lookup failed");
                                    None
                                }
                            }
                        }
                    })
                    .buffer_unordered(LOOKUP_CONCURRENCY)
                    .collect()
                    .await;
                results.into_iter().flatten().collect()
            }
        };

        info!(
            topics = topics.len(),
            findings = findings.len(),
            "Research stage complete"
        );

        let confidence = if findings.is_empty() { 0.5 } else { 0.9 };
        let reasoning = format!(
            "Researched {} of {} topics from {} discussions",
            findings.len(),
            topics.len(),
            state.discussions.len()
        );

        Ok(StagePatch::complete(
            Stage::Research,
            StageOutput::Research { topics, findings },
            confidence,
        )
        .with_reasoning(reasoning))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tidings_common::TopicCategory;

    fn discussion(content: &str, keywords: &[&str]) -> Discussion {
        Discussion {
            id: "m1".to_string(),
            content: content.to_string(),
            author: "ada".to_string(),
            channel: "general".to_string(),
            channel_id: "c1".to_string(),
            created_at: Utc::now(),
            reply_count: 1,
            reaction_count: 1,
            unique_reactor_count: 1,
            participant_count: 2,
            thread_depth: 1,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            categories: vec![TopicCategory::General],
            has_attachments: false,
            attachment_urls: Vec::new(),
            link: None,
        }
    }

    #[test]
    fn derives_topics_from_keywords() {
        let agent = ResearchAgent::new(None, "Austin");
        let topics = agent.identify_topics(&[
            discussion("how to build an agent with langgraph", &["agent", "langgraph"]),
            discussion("rag pipelines", &["rag"]),
        ]);
        assert!(topics.iter().any(|t| t.contains("LangGraph")));
        assert!(topics.iter().any(|t| t.contains("agent implementation")));
        assert!(topics.iter().any(|t| t.contains("Retrieval Augmented")));
        // Standing topics always present.
        assert!(topics.iter().any(|t| t.contains("Austin events")));
    }

    #[tokio::test]
    async fn skips_without_discussions() {
        let agent = ResearchAgent::new(None, "Austin");
        let state = PipelineState::new(
            tidings_common::DigestKind::Daily,
            chrono::NaiveDate::from_ymd_opt(2026, 8, 28).unwrap(),
            Vec::new(),
            Default::default(),
        );
        let patch = agent.process(&state, None).await.unwrap();
        assert_eq!(patch.action, crate::state::StageAction::Skip);
    }
}
