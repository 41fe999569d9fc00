//! Engagement scoring for community discussions.
//!
//! The scorer is pure: no I/O, no clock reads. Callers pass the message age
//! explicitly so ranking stays deterministic and testable. The same score is
//! used to select discussions for a digest run and, via the trending variant,
//! to surface recent activity spikes.

use chrono::{DateTime, Utc};

use crate::types::{Discussion, EngagementMetrics, TopicCategory};

/// Full decay horizon for the recency term: 7 days.
pub const MAX_AGE_HOURS: f64 = 168.0;

/// Activity window for the trending variant. Anything older scores 0.0.
pub const TRENDING_WINDOW_HOURS: f64 = 24.0;

/// Weight set for the engagement score. The defaults are the tuned
/// production values; tests construct custom sets to probe edge behavior.
#[derive(Debug, Clone, Copy)]
pub struct EngagementWeights {
    pub reply: f64,
    pub reaction: f64,
    pub unique_reactors: f64,
    pub thread_depth: f64,
    pub recency: f64,
    pub keyword_bonus: f64,
    /// Per-participant boost above the 3-person baseline.
    pub participant_step: f64,
    /// Hard cap on the participant multiplier.
    pub participant_cap: f64,
}

impl Default for EngagementWeights {
    fn default() -> Self {
        Self {
            reply: 0.35,
            reaction: 0.20,
            unique_reactors: 0.25,
            thread_depth: 0.10,
            recency: 0.10,
            keyword_bonus: 0.05,
            participant_step: 0.1,
            participant_cap: 1.5,
        }
    }
}

/// Weighted engagement score for one discussion. Always >= 0 for valid
/// (non-negative) inputs; rounded to 2 decimals.
pub fn score(
    reply_count: u32,
    reaction_count: u32,
    unique_reactors: u32,
    participant_count: u32,
    thread_depth: u32,
    age_hours: f64,
    matched_keyword_count: usize,
) -> f64 {
    score_weighted(
        &EngagementWeights::default(),
        reply_count,
        reaction_count,
        unique_reactors,
        participant_count,
        thread_depth,
        age_hours,
        matched_keyword_count,
    )
}

#[allow(clippy::too_many_arguments)]
pub fn score_weighted(
    weights: &EngagementWeights,
    reply_count: u32,
    reaction_count: u32,
    unique_reactors: u32,
    participant_count: u32,
    thread_depth: u32,
    age_hours: f64,
    matched_keyword_count: usize,
) -> f64 {
    // Linear recency decay with a 0.1 floor: a week-old message still
    // carries a tenth of the recency credit, never zero or negative.
    let recency_multiplier = (1.0 - age_hours / MAX_AGE_HOURS).max(0.1);

    let reply_score = reply_count as f64 * weights.reply;
    let reaction_score = reaction_count as f64 * weights.reaction;
    let reactor_score = unique_reactors as f64 * weights.unique_reactors;
    let thread_score = thread_depth.min(10) as f64 * weights.thread_depth;
    let recency_score = recency_multiplier * weights.recency * 10.0;
    let keyword_bonus = matched_keyword_count as f64 * weights.keyword_bonus;

    let mut total =
        reply_score + reaction_score + reactor_score + thread_score + recency_score + keyword_bonus;

    // Larger conversations get a boost, capped at 1.5x.
    if participant_count > 3 {
        let multiplier = (1.0 + (participant_count - 3) as f64 * weights.participant_step)
            .min(weights.participant_cap);
        total *= multiplier;
    }

    round2(total)
}

/// Trending variant: the engagement score boosted by recent-activity
/// recency, decaying to exactly 0.0 once activity is older than the
/// 24-hour window.
pub fn trending_score(
    engagement_score: f64,
    recent_activity_hours: f64,
    velocity_factor: f64,
) -> f64 {
    if recent_activity_hours > TRENDING_WINDOW_HOURS {
        return 0.0;
    }
    let recency_boost = (1.0 - recent_activity_hours / TRENDING_WINDOW_HOURS).max(0.1);
    round2(engagement_score * recency_boost * velocity_factor)
}

/// Derive full metrics for a discussion at a given instant.
pub fn compute_metrics(discussion: &Discussion, now: DateTime<Utc>) -> EngagementMetrics {
    let age_hours = (now - discussion.created_at).num_seconds() as f64 / 3600.0;
    let matched = matched_domain_keywords(&discussion.keywords);

    let engagement_score = score(
        discussion.reply_count,
        discussion.reaction_count,
        discussion.unique_reactor_count,
        discussion.participant_count,
        discussion.thread_depth,
        age_hours.max(0.0),
        matched,
    );

    EngagementMetrics {
        reply_count: discussion.reply_count,
        reaction_count: discussion.reaction_count,
        unique_reactor_count: discussion.unique_reactor_count,
        participant_count: discussion.participant_count,
        thread_depth: discussion.thread_depth,
        engagement_score,
        trending_score: trending_score(engagement_score, age_hours.max(0.0), 1.0),
        topic_categories: categorize(&discussion.content, &discussion.keywords),
        last_activity: discussion.created_at,
    }
}

// --- Keywords and categorization ---

/// Domain keywords eligible for the scorer's keyword bonus and for topic
/// categorization.
pub const DOMAIN_KEYWORDS: &[&str] = &[
    // AI / ML
    "langchain", "langgraph", "llm", "gpt", "claude", "openai", "anthropic", "vector",
    "embedding", "rag", "retrieval", "agent", "workflow", "chain", "prompt", "fine-tune",
    "model", "inference", "training", "dataset",
    // Programming
    "python", "javascript", "typescript", "react", "node", "api", "rest", "graphql",
    "database", "sql", "nosql", "mongodb", "postgres", "redis", "docker", "kubernetes",
    "aws", "azure", "gcp", "serverless", "microservices",
    // Community / local
    "meetup", "conference", "hackathon", "local",
    // General tech
    "startup", "venture", "funding", "saas", "platform", "framework", "library", "tool",
    "integration", "automation", "deployment", "ci/cd",
];

/// Extract domain keywords present in the content, capped at 10.
pub fn extract_keywords(content: &str) -> Vec<String> {
    if content.is_empty() {
        return Vec::new();
    }
    let lower = content.to_lowercase();
    DOMAIN_KEYWORDS
        .iter()
        .filter(|kw| lower.contains(*kw))
        .take(10)
        .map(|kw| kw.to_string())
        .collect()
}

/// How many of a discussion's keywords are recognized domain keywords.
pub fn matched_domain_keywords(keywords: &[String]) -> usize {
    keywords
        .iter()
        .filter(|k| DOMAIN_KEYWORDS.contains(&k.to_lowercase().as_str()))
        .count()
}

/// Categorize content from its keywords and body text. Always returns at
/// least one category (`General` when nothing matches).
pub fn categorize(content: &str, keywords: &[String]) -> Vec<TopicCategory> {
    if content.is_empty() || keywords.is_empty() {
        return vec![TopicCategory::General];
    }

    let mut categories = Vec::new();
    let content_lower = content.to_lowercase();
    let has_kw = |terms: &[&str]| keywords.iter().any(|k| terms.contains(&k.as_str()));

    if has_kw(&[
        "langchain", "langgraph", "llm", "gpt", "claude", "agent", "rag", "model", "embedding",
    ]) {
        categories.push(TopicCategory::AiMl);
    }
    if has_kw(&["python", "javascript", "typescript", "api", "react", "node"]) {
        categories.push(TopicCategory::Programming);
    }
    if has_kw(&["docker", "kubernetes", "aws", "azure", "gcp", "deployment", "serverless"]) {
        categories.push(TopicCategory::Infrastructure);
    }
    if ["meetup", "event", "conference", "presentation", "talk"]
        .iter()
        .any(|t| content_lower.contains(t))
    {
        categories.push(TopicCategory::Community);
    }
    if ["tutorial", "learn", "course", "guide", "documentation", "how to"]
        .iter()
        .any(|t| content_lower.contains(t))
    {
        categories.push(TopicCategory::Learning);
    }

    if categories.is_empty() {
        categories.push(TopicCategory::General);
    }
    categories
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_is_non_negative_for_zero_inputs() {
        let s = score(0, 0, 0, 0, 0, 0.0, 0);
        assert!(s >= 0.0);
        // Fresh message with nothing else still earns the full recency term.
        assert!((s - 1.0).abs() < f64::EPSILON, "recency term: {s}");
    }

    #[test]
    fn more_replies_never_lower_the_score() {
        let base = score(5, 3, 2, 2, 1, 12.0, 2);
        for replies in 6..30 {
            let s = score(replies, 3, 2, 2, 1, 12.0, 2);
            assert!(s >= base, "replies={replies} scored {s} < {base}");
        }
    }

    #[test]
    fn recency_floor_applies_at_week_boundary() {
        // At exactly 168h the multiplier hits the 0.1 floor:
        // recency term = 0.1 * 0.10 * 10 = 0.1.
        let at_week = score(0, 0, 0, 0, 0, 168.0, 0);
        assert!((at_week - 0.1).abs() < 1e-9, "at 168h: {at_week}");

        // Older than a week clamps to the same floor, never negative.
        let past_week = score(0, 0, 0, 0, 0, 500.0, 0);
        assert!((past_week - at_week).abs() < 1e-9);
    }

    #[test]
    fn thread_depth_is_capped_at_ten() {
        let deep = score(0, 0, 0, 0, 10, 0.0, 0);
        let deeper = score(0, 0, 0, 0, 50, 0.0, 0);
        assert!((deep - deeper).abs() < 1e-9);
    }

    #[test]
    fn participant_multiplier_caps_at_one_point_five() {
        let small = score(10, 0, 0, 3, 0, 0.0, 0);
        let eight = score(10, 0, 0, 8, 0, 0.0, 0); // 1 + 0.5 = cap
        let huge = score(10, 0, 0, 100, 0, 0.0, 0);
        assert!(eight > small);
        assert!((eight - huge).abs() < 1e-9, "cap not applied: {eight} vs {huge}");
    }

    #[test]
    fn score_matches_hand_computed_example() {
        // 4 replies, 6 reactions, 3 reactors, 5 participants, depth 2,
        // 24h old, 2 matched keywords:
        // 4*0.35 + 6*0.20 + 3*0.25 + 2*0.10 + (1-24/168)*0.10*10 + 2*0.05
        // = 1.4 + 1.2 + 0.75 + 0.2 + 0.857... + 0.1 = 4.507...
        // * (1 + 0.1*2) = 1.2 -> 5.408... -> 5.41
        let s = score(4, 6, 3, 5, 2, 24.0, 2);
        assert!((s - 5.41).abs() < 1e-9, "got {s}");
    }

    #[test]
    fn trending_zeroes_past_the_window() {
        assert_eq!(trending_score(10.0, 25.0, 1.0), 0.0);
        assert!(trending_score(10.0, 24.0, 1.0) > 0.0);
        assert!(trending_score(10.0, 2.0, 1.0) > trending_score(10.0, 20.0, 1.0));
    }

    #[test]
    fn extract_keywords_caps_at_ten() {
        let content = "langchain langgraph llm gpt claude openai anthropic vector \
                       embedding rag retrieval agent workflow";
        let kws = extract_keywords(content);
        assert_eq!(kws.len(), 10);
        assert!(kws.contains(&"langchain".to_string()));
    }

    #[test]
    fn categorize_defaults_to_general() {
        let cats = categorize("hello there", &["hello".to_string()]);
        assert_eq!(cats, vec![TopicCategory::General]);
    }

    #[test]
    fn categorize_detects_ai_and_community() {
        let kws = vec!["langgraph".to_string()];
        let cats = categorize("Great talk about langgraph at the meetup", &kws);
        assert!(cats.contains(&TopicCategory::AiMl));
        assert!(cats.contains(&TopicCategory::Community));
    }
}
