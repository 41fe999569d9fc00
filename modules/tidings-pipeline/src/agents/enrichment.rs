//! Content-enrichment stage: news pick, events, and lighter community
//! content pulled from special-purpose channels.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use ai_client::ChatModel;
use tidings_common::{DigestKind, Discussion, Stage};

use crate::capability::ModelCapability;
use crate::state::{EnrichedContent, NewsItem, PipelineState, StageOutput, StagePatch};

use super::{first_url, truncate, AgentFault, StageAgent};

const MAX_EVENTS: usize = 3;
const MAX_MERCH_IDEAS: usize = 3;

pub struct EnrichmentAgent;

impl EnrichmentAgent {
    pub fn new() -> Self {
        Self
    }

    fn channel_matches(discussion: &Discussion, needle: &str) -> bool {
        discussion.channel.to_lowercase().contains(needle)
    }

    fn top_by_engagement<'a>(
        state: &PipelineState,
        mut candidates: Vec<&'a Discussion>,
    ) -> Vec<&'a Discussion> {
        candidates.sort_by(|a, b| {
            state
                .engagement_score(&b.id)
                .total_cmp(&state.engagement_score(&a.id))
        });
        candidates
    }

    async fn pick_news(
        &self,
        state: &PipelineState,
        model: &Option<Arc<dyn ChatModel>>,
    ) -> Result<Option<NewsItem>, AgentFault> {
        let candidates: Vec<&Discussion> = state
            .discussions
            .iter()
            .filter(|d| Self::channel_matches(d, "news"))
            .collect();
        let ranked = Self::top_by_engagement(state, candidates);
        let Some(top) = ranked.first() else {
            debug!("No news discussions found");
            return Ok(None);
        };

        let summary = match model {
            Some(model) => model
                .chat_completion(
                    "Summarize this news item in 1-2 sentences (max 50 words). \
                     Focus on the key point and why it matters to an AI/ML community.",
                    &truncate(&top.content, 500),
                )
                .await
                .map_err(AgentFault::model)?,
            None => truncate(&top.content, 150),
        };

        Ok(Some(NewsItem {
            title: truncate(top.content.lines().next().unwrap_or(""), 80),
            summary,
            url: first_url(&top.content),
            source_link: top.link.clone(),
            discussion_id: top.id.clone(),
        }))
    }

    fn pick_events(state: &PipelineState) -> Vec<String> {
        let candidates: Vec<&Discussion> = state
            .discussions
            .iter()
            .filter(|d| Self::channel_matches(d, "event"))
            .collect();
        Self::top_by_engagement(state, candidates)
            .into_iter()
            .take(MAX_EVENTS)
            .map(|d| truncate(&d.content, 200))
            .collect()
    }

    fn pick_meme(state: &PipelineState) -> Option<String> {
        let candidates: Vec<&Discussion> = state
            .discussions
            .iter()
            .filter(|d| Self::channel_matches(d, "meme") && d.has_attachments)
            .collect();
        Self::top_by_engagement(state, candidates)
            .first()
            .and_then(|d| d.attachment_urls.first().cloned())
    }

    fn pick_merch_ideas(state: &PipelineState) -> Vec<String> {
        state
            .discussions
            .iter()
            .filter(|d| {
                (Self::channel_matches(d, "merch") || Self::channel_matches(d, "tshirt"))
                    && d.has_attachments
            })
            .flat_map(|d| d.attachment_urls.iter().cloned())
            .take(MAX_MERCH_IDEAS)
            .collect()
    }
}

impl Default for EnrichmentAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StageAgent for EnrichmentAgent {
    fn stage(&self) -> Stage {
        Stage::ContentEnrichment
    }

    fn capability(&self) -> ModelCapability {
        ModelCapability::Editing
    }

    async fn process(
        &self,
        state: &PipelineState,
        model: Option<Arc<dyn ChatModel>>,
    ) -> Result<StagePatch, AgentFault> {
        let enriched = EnrichedContent {
            news: self.pick_news(state, &model).await?,
            // Events only appear in the monthly digest.
            events: if state.kind == DigestKind::Monthly {
                Self::pick_events(state)
            } else {
                Vec::new()
            },
            meme_url: Self::pick_meme(state),
            merch_idea_urls: Self::pick_merch_ideas(state),
        };

        let parts = enriched.news.is_some() as usize
            + (!enriched.events.is_empty()) as usize
            + enriched.meme_url.is_some() as usize
            + (!enriched.merch_idea_urls.is_empty()) as usize;
        info!(parts, "Content enrichment complete");

        let reasoning = format!("Enriched digest with {parts} additional content parts");
        Ok(StagePatch::complete(
            Stage::ContentEnrichment,
            StageOutput::Enrichment(enriched),
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
    use tidings_common::TopicCategory;

    fn discussion(id: &str, channel: &str, content: &str) -> Discussion {
        Discussion {
            id: id.to_string(),
            content: content.to_string(),
            author: "ada".to_string(),
            channel: channel.to_string(),
            channel_id: format!("{channel}-id"),
            created_at: Utc::now(),
            reply_count: 0,
            reaction_count: 0,
            unique_reactor_count: 0,
            participant_count: 1,
            thread_depth: 0,
            keywords: Vec::new(),
            categories: vec![TopicCategory::General],
            has_attachments: false,
            attachment_urls: Vec::new(),
            link: None,
        }
    }

    #[tokio::test]
    async fn picks_top_news_with_url() {
        let discussions = vec![
            discussion("1", "news-and-polls", "Big release https://example.org/x today"),
            discussion("2", "general", "not news"),
        ];
        let state = PipelineState::new(
            DigestKind::Weekly,
            chrono::NaiveDate::from_ymd_opt(2026, 8, 28).unwrap(),
            discussions,
            HashMap::new(),
        );

        let patch = EnrichmentAgent::new().process(&state, None).await.unwrap();
        let StageOutput::Enrichment(enriched) = patch.output else {
            panic!("expected enrichment");
        };
        let news = enriched.news.unwrap();
        assert_eq!(news.discussion_id, "1");
        assert_eq!(news.url, Some("https://example.org/x".to_string()));
        // Weekly digests carry no events section.
        assert!(enriched.events.is_empty());
    }

    #[tokio::test]
    async fn monthly_digest_collects_events() {
        let discussions = vec![discussion("1", "events", "Meetup next Tuesday at 7pm")];
        let state = PipelineState::new(
            DigestKind::Monthly,
            chrono::NaiveDate::from_ymd_opt(2026, 8, 28).unwrap(),
            discussions,
            HashMap::new(),
        );

        let patch = EnrichmentAgent::new().process(&state, None).await.unwrap();
        let StageOutput::Enrichment(enriched) = patch.output else {
            panic!("expected enrichment");
        };
        assert_eq!(enriched.events.len(), 1);
    }
}
