//! Opinion-writing stage: commentary on featured discussions and short
//! intros for each planned section.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use ai_client::ChatModel;
use tidings_common::{Discussion, Stage, TopicCategory};

use crate::capability::ModelCapability;
use crate::state::{Commentary, PipelineState, StageOutput, StagePatch};

use super::{truncate, AgentFault, StageAgent};

/// How many discussions get individual commentary.
const FEATURED_COUNT: usize = 3;

pub struct OpinionAgent {
    community_name: String,
}

impl OpinionAgent {
    pub fn new(community_name: impl Into<String>) -> Self {
        Self {
            community_name: community_name.into(),
        }
    }

    /// Top discussions by engagement, preferring ids the analysis marked.
    fn select_featured<'a>(state: &'a PipelineState) -> Vec<&'a Discussion> {
        let mut ranked: Vec<&Discussion> = state.discussions.iter().collect();
        ranked.sort_by(|a, b| {
            state
                .engagement_score(&b.id)
                .total_cmp(&state.engagement_score(&a.id))
        });
        ranked.truncate(FEATURED_COUNT);
        ranked
    }

    fn fallback_commentary(discussion: &Discussion) -> String {
        match discussion.primary_category() {
            TopicCategory::AiMl => format!(
                "This thread captures where the community's AI work is heading. \
                 {} sparked {} replies digging into the practical details.",
                discussion.author, discussion.reply_count
            ),
            TopicCategory::Programming => format!(
                "A hands-on engineering exchange: {} and {} others compared notes \
                 on tooling and implementation tradeoffs.",
                discussion.author,
                discussion.participant_count.saturating_sub(1)
            ),
            TopicCategory::Community => format!(
                "Community energy on display. {}'s post drew {} reactions and kept \
                 the conversation going.",
                discussion.author, discussion.reaction_count
            ),
            _ => format!(
                "Worth a read: {}'s discussion in #{} drew sustained engagement \
                 across {} participants.",
                discussion.author, discussion.channel, discussion.participant_count
            ),
        }
    }

    fn section_intros(&self, state: &PipelineState) -> HashMap<String, String> {
        let mut intros = HashMap::new();
        for section in &state.sections {
            let title = section.title.clone();
            let intro = if title.contains("Trending") {
                format!(
                    "These topics lit up multiple channels in the {} community this period.",
                    self.community_name
                )
            } else if title.contains("AI") {
                "The AI and ML threads our members kept coming back to.".to_string()
            } else if title.contains("Development") {
                "Tooling, code, and engineering practice from the trenches.".to_string()
            } else if title.contains("Community") {
                "What's happening around the community.".to_string()
            } else if title.contains("Learning") {
                "Resources and guides members found worth sharing.".to_string()
            } else {
                "Highlights from the wider conversation.".to_string()
            };
            intros.insert(title, intro);
        }
        intros
    }
}

#[async_trait]
impl StageAgent for OpinionAgent {
    fn stage(&self) -> Stage {
        Stage::OpinionWriting
    }

    fn capability(&self) -> ModelCapability {
        ModelCapability::Commentary
    }

    async fn process(
        &self,
        state: &PipelineState,
        model: Option<Arc<dyn ChatModel>>,
    ) -> Result<StagePatch, AgentFault> {
        if state.discussions.is_empty() {
            return Ok(StagePatch::skip(
                Stage::OpinionWriting,
                "No discussions to comment on",
            ));
        }

        let featured = Self::select_featured(state);
        let mut commentary = Vec::with_capacity(featured.len());

        for discussion in &featured {
            let body = match &model {
                Some(model) => model
                    .chat_completion(
                        &format!(
                            "You are an opinion columnist for the {} community digest. \
                             Offer a balanced 2-3 sentence technical perspective on the \
                             discussion, noting why it matters.",
                            self.community_name
                        ),
                        &format!(
                            "Discussion by {} in #{} ({} replies):\n{}",
                            discussion.author,
                            discussion.channel,
                            discussion.reply_count,
                            truncate(&discussion.content, 600)
                        ),
                    )
                    .await
                    .map_err(AgentFault::model)?,
                None => Self::fallback_commentary(discussion),
            };

            commentary.push(Commentary {
                discussion_id: discussion.id.clone(),
                headline: truncate(discussion.content.lines().next().unwrap_or(""), 60),
                body,
            });
        }

        let section_intros = self.section_intros(state);

        info!(
            featured = commentary.len(),
            intros = section_intros.len(),
            "Opinion writing complete"
        );

        let reasoning = format!(
            "Wrote commentary for {} featured discussions and {} section intros",
            commentary.len(),
            section_intros.len()
        );
        Ok(StagePatch::complete(
            Stage::OpinionWriting,
            StageOutput::Opinion {
                commentary,
                section_intros,
            },
            0.85,
        )
        .with_reasoning(reasoning)
        .with_model(model.map(|m| m.model_id().to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use tidings_common::{DigestKind, EngagementMetrics};

    fn discussion(id: &str) -> Discussion {
        Discussion {
            id: id.to_string(),
            content: format!("topic {id}\nmore detail"),
            author: "ada".to_string(),
            channel: "general".to_string(),
            channel_id: "c1".to_string(),
            created_at: Utc::now(),
            reply_count: 3,
            reaction_count: 2,
            unique_reactor_count: 2,
            participant_count: 4,
            thread_depth: 2,
            keywords: vec!["langchain".to_string()],
            categories: vec![TopicCategory::AiMl],
            has_attachments: false,
            attachment_urls: Vec::new(),
            link: None,
        }
    }

    #[tokio::test]
    async fn features_top_three_by_engagement() {
        let discussions: Vec<Discussion> = (0..5).map(|i| discussion(&format!("d{i}"))).collect();
        let metrics: HashMap<String, EngagementMetrics> = (0..5)
            .map(|i| {
                (
                    format!("d{i}"),
                    EngagementMetrics {
                        reply_count: 0,
                        reaction_count: 0,
                        unique_reactor_count: 0,
                        participant_count: 0,
                        thread_depth: 0,
                        engagement_score: i as f64,
                        trending_score: 0.0,
                        topic_categories: Vec::new(),
                        last_activity: Utc::now(),
                    },
                )
            })
            .collect();
        let state = PipelineState::new(
            DigestKind::Daily,
            chrono::NaiveDate::from_ymd_opt(2026, 8, 28).unwrap(),
            discussions,
            metrics,
        );

        let patch = OpinionAgent::new("Austin").process(&state, None).await.unwrap();
        let StageOutput::Opinion { commentary, .. } = patch.output else {
            panic!("expected opinion output");
        };
        assert_eq!(commentary.len(), 3);
        assert_eq!(commentary[0].discussion_id, "d4");
    }
}
