use std::env;

use tracing::info;

/// Application configuration loaded from environment variables.
///
/// API keys are optional: a missing key disables the corresponding client
/// and the pipeline degrades to its template fallbacks instead of failing.
#[derive(Debug, Clone)]
pub struct Config {
    // AI providers
    pub anthropic_api_key: String,
    pub research_api_key: String,

    // Publishing
    pub buttondown_api_key: String,

    // Model ids per capability tier
    pub writing_model: String,
    pub editing_model: String,

    // Selection
    pub min_engagement_score: f64,

    // Quality gate tuning. These are plain configuration, not business
    // logic; the orchestrator reads them once at run start.
    pub quality_threshold: f64,
    pub max_stage_errors: usize,
    pub max_iterations: u32,

    // Community identity used in rendered output
    pub community_name: String,
    pub community_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            research_api_key: env::var("PERPLEXITY_API_KEY").unwrap_or_default(),
            buttondown_api_key: env::var("BUTTONDOWN_API_KEY").unwrap_or_default(),
            writing_model: env::var("WRITING_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string()),
            editing_model: env::var("EDITING_MODEL")
                .unwrap_or_else(|_| "claude-haiku-4-5-20251001".to_string()),
            min_engagement_score: parse_env("MIN_ENGAGEMENT_SCORE", 0.5),
            quality_threshold: parse_env("QUALITY_THRESHOLD", 0.7),
            max_stage_errors: parse_env("MAX_STAGE_ERRORS", 2),
            max_iterations: parse_env("MAX_ITERATIONS", 2),
            community_name: env::var("COMMUNITY_NAME")
                .unwrap_or_else(|_| "Community Digest".to_string()),
            community_url: env::var("COMMUNITY_URL")
                .unwrap_or_else(|_| "https://example.org".to_string()),
        }
    }

    /// Log which integrations are configured without leaking key material.
    pub fn log_redacted(&self) {
        info!(
            anthropic = !self.anthropic_api_key.is_empty(),
            research = !self.research_api_key.is_empty(),
            buttondown = !self.buttondown_api_key.is_empty(),
            writing_model = %self.writing_model,
            quality_threshold = self.quality_threshold,
            max_iterations = self.max_iterations,
            "Config loaded"
        );
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            anthropic_api_key: String::new(),
            research_api_key: String::new(),
            buttondown_api_key: String::new(),
            writing_model: "claude-sonnet-4-20250514".to_string(),
            editing_model: "claude-haiku-4-5-20251001".to_string(),
            min_engagement_score: 0.5,
            quality_threshold: 0.7,
            max_stage_errors: 2,
            max_iterations: 2,
            community_name: "Community Digest".to_string(),
            community_url: "https://example.org".to_string(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
