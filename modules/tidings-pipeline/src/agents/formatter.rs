//! Formatting stage: assemble the final `Draft` and materialize the three
//! render targets from it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tracing::info;

use ai_client::ChatModel;
use tidings_common::{DigestKind, Draft, Section, SectionKind, Stage};

use crate::capability::ModelCapability;
use crate::render;
use crate::state::{PipelineState, StageOutput, StagePatch};

use super::{AgentFault, StageAgent};

const WORDS_PER_MINUTE: usize = 200;

pub struct FormatterAgent {
    community_name: String,
    community_url: String,
}

impl FormatterAgent {
    pub fn new(community_name: impl Into<String>, community_url: impl Into<String>) -> Self {
        Self {
            community_name: community_name.into(),
            community_url: community_url.into(),
        }
    }

    fn title_and_subtitle(&self, kind: DigestKind, target_date: NaiveDate) -> (String, String) {
        let date = target_date.format("%B %d, %Y");
        match kind {
            DigestKind::Daily => (
                format!("{} Daily - {}", self.community_name, date),
                format!("Today's highlights from the {} community", self.community_name),
            ),
            DigestKind::Weekly => (
                format!("{} Weekly - Week of {}", self.community_name, date),
                "This week's top discussions and insights".to_string(),
            ),
            DigestKind::Monthly => (
                format!("{} Monthly - {}", self.community_name, date),
                "Community highlights and technical insights".to_string(),
            ),
        }
    }

    /// Final section order: the written sections (trending first) with the
    /// news pick inserted at index 1, then commentary, events, and lighter
    /// content appended.
    fn assemble_sections(&self, state: &PipelineState) -> Vec<Section> {
        let mut sections: Vec<Section> = state
            .sections
            .iter()
            .map(|section| {
                // Prepend the opinion stage's intro when one exists.
                match state.section_intros.get(&section.title) {
                    Some(intro) => {
                        let mut s = section.clone();
                        s.body = format!("{}\n\n{}", intro, s.body);
                        s.word_count = tidings_common::word_count(&s.body);
                        s
                    }
                    None => section.clone(),
                }
            })
            .collect();

        if let Some(news) = &state.enrichment.news {
            let mut body = format!("**{}**\n\n{}", news.title, news.summary);
            if let Some(url) = &news.url {
                body.push_str(&format!("\n\nRead more: {url}"));
            }
            let section = Section::new(SectionKind::News, "In the News", body)
                .with_discussions(vec![news.discussion_id.clone()]);
            let index = sections.len().min(1);
            sections.insert(index, section);
        }

        if !state.commentary.is_empty() {
            let body = state
                .commentary
                .iter()
                .map(|c| format!("**{}**\n\n{}", c.headline, c.body))
                .collect::<Vec<_>>()
                .join("\n\n");
            sections.push(
                Section::new(SectionKind::Featured, "Featured Conversations", body)
                    .with_discussions(
                        state
                            .commentary
                            .iter()
                            .map(|c| c.discussion_id.clone())
                            .collect(),
                    ),
            );
        }

        if !state.enrichment.events.is_empty() {
            let body = state
                .enrichment
                .events
                .iter()
                .map(|e| format!("- {e}"))
                .collect::<Vec<_>>()
                .join("\n");
            sections.push(Section::new(SectionKind::Events, "Upcoming Events", body));
        }

        if let Some(meme) = &state.enrichment.meme_url {
            sections.push(Section::new(
                SectionKind::Meme,
                "Meme of the Week",
                format!("![meme]({meme})"),
            ));
        }

        if !state.enrichment.merch_idea_urls.is_empty() {
            let body = state
                .enrichment
                .merch_idea_urls
                .iter()
                .map(|url| format!("![design]({url})"))
                .collect::<Vec<_>>()
                .join("\n");
            sections.push(Section::new(SectionKind::Merch, "Community Designs", body));
        }

        sections
    }
}

#[async_trait]
impl StageAgent for FormatterAgent {
    fn stage(&self) -> Stage {
        Stage::Formatting
    }

    fn capability(&self) -> ModelCapability {
        ModelCapability::Formatting
    }

    async fn process(
        &self,
        state: &PipelineState,
        model: Option<Arc<dyn ChatModel>>,
    ) -> Result<StagePatch, AgentFault> {
        let (title, subtitle) = self.title_and_subtitle(state.kind, state.target_date);
        let sections = self.assemble_sections(state);

        let total_word_count: usize = sections.iter().map(|s| s.word_count).sum();
        let featured_discussion_ids = state
            .commentary
            .iter()
            .map(|c| c.discussion_id.clone())
            .collect();

        let draft = Draft {
            title,
            subtitle,
            sections,
            total_word_count,
            estimated_read_time_min: (total_word_count / WORDS_PER_MINUTE).max(1),
            featured_discussion_ids,
            generated_at: Utc::now(),
        };

        let formats = render::render(&draft, &self.community_name, &self.community_url);

        info!(
            sections = draft.sections.len(),
            word_count = draft.total_word_count,
            "Formatting complete"
        );

        let reasoning = format!(
            "Assembled {} sections into html/markdown/text renders",
            draft.sections.len()
        );
        Ok(StagePatch::complete(
            Stage::Formatting,
            StageOutput::Formatted { draft, formats },
            0.9,
        )
        .with_reasoning(reasoning)
        .with_model(model.map(|m| m.model_id().to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Commentary, NewsItem};
    use std::collections::HashMap;
    use tidings_common::Section;

    fn base_state() -> PipelineState {
        PipelineState::new(
            DigestKind::Weekly,
            NaiveDate::from_ymd_opt(2026, 8, 28).unwrap(),
            Vec::new(),
            HashMap::new(),
        )
    }

    #[tokio::test]
    async fn news_inserts_after_first_section() {
        let mut state = base_state();
        state.sections = vec![
            Section::new(SectionKind::Trending, "Trending Across Channels", "hot stuff"),
            Section::new(SectionKind::Category, "Development & Tools", "code talk"),
        ];
        state.enrichment.news = Some(NewsItem {
            title: "Big release".to_string(),
            summary: "Something shipped".to_string(),
            url: None,
            source_link: None,
            discussion_id: "n1".to_string(),
        });

        let agent = FormatterAgent::new("Austin", "https://example.org");
        let patch = agent.process(&state, None).await.unwrap();
        let StageOutput::Formatted { draft, .. } = patch.output else {
            panic!("expected formatted output");
        };
        assert_eq!(draft.sections[0].kind, SectionKind::Trending);
        assert_eq!(draft.sections[1].kind, SectionKind::News);
        assert_eq!(draft.sections[2].kind, SectionKind::Category);
    }

    #[tokio::test]
    async fn zero_sections_still_produces_a_draft() {
        let state = base_state();
        let agent = FormatterAgent::new("Austin", "https://example.org");
        let patch = agent.process(&state, None).await.unwrap();
        let StageOutput::Formatted { draft, formats } = patch.output else {
            panic!("expected formatted output");
        };
        assert!(draft.sections.is_empty());
        assert!(formats.markdown.contains("Austin Weekly"));
    }

    #[tokio::test]
    async fn intro_is_prepended_without_discarding_the_body() {
        let mut state = base_state();
        state.sections = vec![Section::new(
            SectionKind::Category,
            "Development & Tools",
            "the written summary",
        )];
        state.section_intros.insert(
            "Development & Tools".to_string(),
            "A short intro.".to_string(),
        );

        let agent = FormatterAgent::new("Austin", "https://example.org");
        let patch = agent.process(&state, None).await.unwrap();
        let StageOutput::Formatted { draft, .. } = patch.output else {
            panic!("expected formatted output");
        };
        assert_eq!(draft.sections[0].body, "A short intro.\n\nthe written summary");
        // Word count reflects the combined body.
        assert_eq!(draft.sections[0].word_count, 6);
    }

    #[tokio::test]
    async fn commentary_becomes_featured_section_with_ids() {
        let mut state = base_state();
        state.sections = vec![Section::new(SectionKind::Category, "Dev", "body text")];
        state.commentary = vec![Commentary {
            discussion_id: "d1".to_string(),
            headline: "Hot take".to_string(),
            body: "Worth reading.".to_string(),
        }];

        let agent = FormatterAgent::new("Austin", "https://example.org");
        let patch = agent.process(&state, None).await.unwrap();
        let StageOutput::Formatted { draft, .. } = patch.output else {
            panic!("expected formatted output");
        };
        assert_eq!(draft.featured_discussion_ids, vec!["d1".to_string()]);
        let featured = draft
            .sections
            .iter()
            .find(|s| s.kind == SectionKind::Featured)
            .unwrap();
        assert_eq!(featured.discussion_ids, vec!["d1".to_string()]);
    }
}
