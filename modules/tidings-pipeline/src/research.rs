//! External research lookup used by the research stage.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::state::ResearchFinding;

/// A source that can answer a research query with cited findings.
#[async_trait]
pub trait ResearchSource: Send + Sync {
    async fn research(&self, query: &str, topic: &str) -> Result<ResearchFinding>;
}

/// Perplexity Sonar search adapter.
pub struct SonarSearcher {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct SonarRequest {
    model: String,
    messages: Vec<SonarMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct SonarMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct SonarResponse {
    choices: Vec<SonarChoice>,
    #[serde(default)]
    citations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SonarChoice {
    message: SonarChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct SonarChoiceMessage {
    content: String,
}

impl SonarSearcher {
    pub fn new(api_key: String, client: reqwest::Client) -> Self {
        Self {
            api_key,
            client,
            base_url: "https://api.perplexity.ai".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl ResearchSource for SonarSearcher {
    async fn research(&self, query: &str, topic: &str) -> Result<ResearchFinding> {
        let request = SonarRequest {
            model: "sonar".to_string(),
            messages: vec![
                SonarMessage {
                    role: "system".to_string(),
                    content: "You are a technical research assistant. Answer concisely \
                              with current, factual information."
                        .to_string(),
                },
                SonarMessage {
                    role: "user".to_string(),
                    content: query.to_string(),
                },
            ],
            max_tokens: 1024,
            temperature: 0.2,
        };

        let resp: SonarResponse = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let findings = resp
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(ResearchFinding {
            topic: topic.to_string(),
            findings,
            sources: resp.citations,
            relevance_score: 0.8,
        })
    }
}
