//! Discussion-writing stage: cross-channel topic detection plus per-category
//! sections with written summaries.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use ai_client::ChatModel;
use tidings_common::{Discussion, Section, SectionKind, Stage, TopicCategory};

use crate::capability::ModelCapability;
use crate::state::{PipelineState, StageOutput, StagePatch};

use super::{truncate, AgentFault, StageAgent};

/// Category sections carry at most this many discussions.
const MAX_PER_SECTION: usize = 10;

/// A keyword cluster spanning multiple channels.
#[derive(Debug)]
struct CrossChannelTopic<'a> {
    keyword: String,
    channels: Vec<String>,
    discussions: Vec<&'a Discussion>,
}

pub struct DiscussionWriterAgent {
    community_name: String,
}

impl DiscussionWriterAgent {
    pub fn new(community_name: impl Into<String>) -> Self {
        Self {
            community_name: community_name.into(),
        }
    }

    /// Cluster discussions on their top-3 keywords, keeping clusters that
    /// span at least 2 distinct channels and 2 discussions.
    fn cross_channel_topics<'a>(discussions: &'a [Discussion]) -> Vec<CrossChannelTopic<'a>> {
        let mut by_keyword: BTreeMap<String, Vec<&'a Discussion>> = BTreeMap::new();
        for discussion in discussions {
            for keyword in discussion.keywords.iter().take(3) {
                by_keyword
                    .entry(keyword.to_lowercase())
                    .or_default()
                    .push(discussion);
            }
        }

        by_keyword
            .into_iter()
            .filter_map(|(keyword, cluster)| {
                if cluster.len() < 2 {
                    return None;
                }
                let channels: HashSet<&str> =
                    cluster.iter().map(|d| d.channel.as_str()).collect();
                if channels.len() < 2 {
                    return None;
                }
                let mut channels: Vec<String> =
                    channels.into_iter().map(String::from).collect();
                channels.sort();
                Some(CrossChannelTopic {
                    keyword,
                    channels,
                    discussions: cluster,
                })
            })
            .collect()
    }

    /// Template summary for one discussion; the model path replaces this.
    fn fallback_summary(discussion: &Discussion, state: &PipelineState) -> String {
        format!(
            "**{}** — {} in #{}: {} ({} replies, {} reactions, engagement {:.2})",
            Self::headline(discussion),
            discussion.author,
            discussion.channel,
            truncate(&discussion.content, 160),
            discussion.reply_count,
            discussion.reaction_count,
            state.engagement_score(&discussion.id),
        )
    }

    fn headline(discussion: &Discussion) -> String {
        if let Some(keyword) = discussion.keywords.first() {
            let mut chars = keyword.chars();
            if let Some(first) = chars.next() {
                return format!("{}{}", first.to_uppercase(), chars.as_str());
            }
        }
        truncate(&discussion.content, 40)
    }

    async fn write_summaries(
        &self,
        model: &Option<Arc<dyn ChatModel>>,
        discussions: &[&Discussion],
        state: &PipelineState,
    ) -> Result<Vec<String>, AgentFault> {
        let Some(model) = model else {
            return Ok(discussions
                .iter()
                .map(|d| Self::fallback_summary(d, state))
                .collect());
        };

        let mut summaries = Vec::with_capacity(discussions.len());
        for discussion in discussions {
            let system = format!(
                "You are a technical writer for the {} community digest. Summarize one \
                 chat discussion in 50-100 words: the main question or point, key tools \
                 mentioned, and the takeaway. Start with a bolded topic headline.",
                self.community_name
            );
            let user = format!(
                "Author: {}\nChannel: #{}\nReplies: {}\nKeywords: {}\n\n{}",
                discussion.author,
                discussion.channel,
                discussion.reply_count,
                discussion.keywords.join(", "),
                truncate(&discussion.content, 800),
            );
            let summary = model
                .chat_completion(&system, &user)
                .await
                .map_err(AgentFault::model)?;
            summaries.push(summary);
        }
        Ok(summaries)
    }

    fn sort_by_engagement<'a>(discussions: &mut [&'a Discussion], state: &PipelineState) {
        discussions.sort_by(|a, b| {
            state
                .engagement_score(&b.id)
                .total_cmp(&state.engagement_score(&a.id))
        });
    }
}

#[async_trait]
impl StageAgent for DiscussionWriterAgent {
    fn stage(&self) -> Stage {
        Stage::DiscussionWriting
    }

    fn capability(&self) -> ModelCapability {
        ModelCapability::Writing
    }

    async fn process(
        &self,
        state: &PipelineState,
        model: Option<Arc<dyn ChatModel>>,
    ) -> Result<StagePatch, AgentFault> {
        if state.discussions.is_empty() {
            return Ok(StagePatch::skip(
                Stage::DiscussionWriting,
                "No discussions to write about",
            ));
        }

        let mut sections = Vec::new();
        let mut placed: HashSet<&str> = HashSet::new();

        // Cross-channel topics first: these become one trending section
        // ahead of everything else.
        let topics = Self::cross_channel_topics(&state.discussions);
        if !topics.is_empty() {
            let mut trending: Vec<&Discussion> = Vec::new();
            let mut topic_notes = Vec::new();
            for topic in &topics {
                topic_notes.push(format!(
                    "\"{}\" across {}",
                    topic.keyword,
                    topic.channels.join(", ")
                ));
                for discussion in &topic.discussions {
                    if placed.insert(discussion.id.as_str()) {
                        trending.push(discussion);
                    }
                }
            }
            Self::sort_by_engagement(&mut trending, state);

            let summaries = self.write_summaries(&model, &trending, state).await?;
            let body = format!(
                "Topics spanning channels: {}.\n\n{}",
                topic_notes.join("; "),
                summaries.join("\n\n")
            );
            sections.push(
                Section::new(SectionKind::Trending, "Trending Across Channels", body)
                    .with_discussions(trending.iter().map(|d| d.id.clone()).collect()),
            );
        }

        // Remaining discussions grouped by category, engagement-desc,
        // capped per section.
        let mut grouped: BTreeMap<TopicCategory, Vec<&Discussion>> = BTreeMap::new();
        for discussion in &state.discussions {
            if !placed.contains(discussion.id.as_str()) {
                grouped
                    .entry(discussion.primary_category())
                    .or_default()
                    .push(discussion);
            }
        }

        for (category, mut group) in grouped {
            Self::sort_by_engagement(&mut group, state);
            group.truncate(MAX_PER_SECTION);

            let summaries = self.write_summaries(&model, &group, state).await?;
            sections.push(
                Section::new(
                    SectionKind::Category,
                    category.section_title(),
                    summaries.join("\n\n"),
                )
                .with_discussions(group.iter().map(|d| d.id.clone()).collect()),
            );
        }

        info!(
            sections = sections.len(),
            cross_channel = topics.len(),
            "Discussion writing complete"
        );

        let reasoning = format!(
            "Wrote {} sections covering {} discussions ({} cross-channel topics)",
            sections.len(),
            state.discussions.len(),
            topics.len()
        );
        Ok(StagePatch::complete(
            Stage::DiscussionWriting,
            StageOutput::Sections(sections),
            0.9,
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

    fn discussion(id: &str, channel: &str, keywords: &[&str], category: TopicCategory) -> Discussion {
        Discussion {
            id: id.to_string(),
            content: format!("content for {id}"),
            author: "ada".to_string(),
            channel: channel.to_string(),
            channel_id: format!("{channel}-id"),
            created_at: Utc::now(),
            reply_count: 1,
            reaction_count: 1,
            unique_reactor_count: 1,
            participant_count: 2,
            thread_depth: 1,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            categories: vec![category],
            has_attachments: false,
            attachment_urls: Vec::new(),
            link: None,
        }
    }

    fn metrics_for(ids_scores: &[(&str, f64)]) -> HashMap<String, EngagementMetrics> {
        ids_scores
            .iter()
            .map(|(id, score)| {
                (
                    id.to_string(),
                    EngagementMetrics {
                        reply_count: 0,
                        reaction_count: 0,
                        unique_reactor_count: 0,
                        participant_count: 0,
                        thread_depth: 0,
                        engagement_score: *score,
                        trending_score: 0.0,
                        topic_categories: Vec::new(),
                        last_activity: Utc::now(),
                    },
                )
            })
            .collect()
    }

    fn state_with(discussions: Vec<Discussion>, metrics: HashMap<String, EngagementMetrics>) -> PipelineState {
        PipelineState::new(
            DigestKind::Daily,
            chrono::NaiveDate::from_ymd_opt(2026, 8, 28).unwrap(),
            discussions,
            metrics,
        )
    }

    #[tokio::test]
    async fn cross_channel_keyword_lands_in_trending_section() {
        let discussions = vec![
            discussion("1", "general", &["langgraph"], TopicCategory::AiMl),
            discussion("2", "help", &["langgraph"], TopicCategory::AiMl),
            discussion("3", "general", &["python"], TopicCategory::Programming),
        ];
        let metrics = metrics_for(&[("1", 3.0), ("2", 2.0), ("3", 1.0)]);
        let state = state_with(discussions, metrics);

        let agent = DiscussionWriterAgent::new("Austin");
        let patch = agent.process(&state, None).await.unwrap();
        let StageOutput::Sections(sections) = patch.output else {
            panic!("expected sections");
        };

        assert_eq!(sections[0].kind, SectionKind::Trending);
        assert_eq!(
            sections[0].discussion_ids,
            vec!["1".to_string(), "2".to_string()]
        );
        // The third discussion lands in its own category section.
        assert!(sections[1..]
            .iter()
            .any(|s| s.discussion_ids == vec!["3".to_string()]));
    }

    #[tokio::test]
    async fn same_channel_cluster_is_not_trending() {
        let discussions = vec![
            discussion("1", "general", &["langgraph"], TopicCategory::AiMl),
            discussion("2", "general", &["langgraph"], TopicCategory::AiMl),
        ];
        let state = state_with(discussions, HashMap::new());

        let agent = DiscussionWriterAgent::new("Austin");
        let patch = agent.process(&state, None).await.unwrap();
        let StageOutput::Sections(sections) = patch.output else {
            panic!("expected sections");
        };
        assert!(sections.iter().all(|s| s.kind != SectionKind::Trending));
    }

    #[tokio::test]
    async fn category_sections_cap_at_ten_sorted_descending() {
        let mut discussions = Vec::new();
        let mut scores = Vec::new();
        for i in 0..15 {
            let id = format!("d{i}");
            discussions.push(discussion(&id, "general", &["python"], TopicCategory::Programming));
            scores.push((id, i as f64));
        }
        let metrics = metrics_for(
            &scores
                .iter()
                .map(|(id, s)| (id.as_str(), *s))
                .collect::<Vec<_>>(),
        );
        let state = state_with(discussions, metrics);

        let agent = DiscussionWriterAgent::new("Austin");
        let patch = agent.process(&state, None).await.unwrap();
        let StageOutput::Sections(sections) = patch.output else {
            panic!("expected sections");
        };

        // Single channel, so no trending promotion despite shared keywords.
        let section = sections
            .iter()
            .find(|s| s.kind == SectionKind::Category)
            .unwrap();
        assert_eq!(section.discussion_ids.len(), 10);
        assert_eq!(section.discussion_ids[0], "d14");
        assert_eq!(section.discussion_ids[9], "d5");
    }
}
