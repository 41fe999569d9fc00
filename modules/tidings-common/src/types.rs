use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Digest identity ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestKind {
    Daily,
    Weekly,
    Monthly,
}

impl DigestKind {
    /// How far back the selector looks for discussions.
    pub fn window_days(&self) -> i64 {
        match self {
            DigestKind::Daily => 1,
            DigestKind::Weekly => 7,
            DigestKind::Monthly => 30,
        }
    }

    /// Cap on selected discussions per run.
    pub fn selection_limit(&self) -> usize {
        match self {
            DigestKind::Daily => 10,
            DigestKind::Weekly => 20,
            DigestKind::Monthly => 50,
        }
    }

    /// Monthly digests use a higher engagement floor than the configured default.
    pub fn min_score(&self, default_min: f64) -> f64 {
        match self {
            DigestKind::Monthly => 1.5,
            _ => default_min,
        }
    }
}

impl std::fmt::Display for DigestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DigestKind::Daily => write!(f, "daily"),
            DigestKind::Weekly => write!(f, "weekly"),
            DigestKind::Monthly => write!(f, "monthly"),
        }
    }
}

/// Identity of one generation run: at most one digest exists per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenerationKey {
    pub kind: DigestKind,
    pub target_date: NaiveDate,
}

impl std::fmt::Display for GenerationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.kind, self.target_date)
    }
}

// --- Pipeline stages ---

/// Fixed stage enumeration for the generation pipeline.
/// `PipelineState.current_stage` is always one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Research,
    ContentAnalysis,
    DiscussionWriting,
    ContentEnrichment,
    OpinionWriting,
    Editing,
    Formatting,
    QualityCheck,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Research => write!(f, "research"),
            Stage::ContentAnalysis => write!(f, "content_analysis"),
            Stage::DiscussionWriting => write!(f, "discussion_writing"),
            Stage::ContentEnrichment => write!(f, "content_enrichment"),
            Stage::OpinionWriting => write!(f, "opinion_writing"),
            Stage::Editing => write!(f, "editing"),
            Stage::Formatting => write!(f, "formatting"),
            Stage::QualityCheck => write!(f, "quality_check"),
            Stage::Done => write!(f, "done"),
        }
    }
}

// --- Topic categories ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TopicCategory {
    AiMl,
    Programming,
    Infrastructure,
    Community,
    Learning,
    General,
}

impl TopicCategory {
    /// Human section title for category sections of the digest.
    pub fn section_title(&self) -> &'static str {
        match self {
            TopicCategory::AiMl => "AI & Machine Learning",
            TopicCategory::Programming => "Development & Tools",
            TopicCategory::Infrastructure => "Infrastructure & Ops",
            TopicCategory::Community => "Community & Events",
            TopicCategory::Learning => "Learning Resources",
            TopicCategory::General => "Technical Discussions",
        }
    }
}

impl std::fmt::Display for TopicCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopicCategory::AiMl => write!(f, "ai-ml"),
            TopicCategory::Programming => write!(f, "programming"),
            TopicCategory::Infrastructure => write!(f, "infrastructure"),
            TopicCategory::Community => write!(f, "community"),
            TopicCategory::Learning => write!(f, "learning"),
            TopicCategory::General => write!(f, "general"),
        }
    }
}

// --- Discussions ---

/// One ranked community conversation. Immutable once fetched; the pipeline
/// only reads these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discussion {
    pub id: String,
    pub content: String,
    pub author: String,
    pub channel: String,
    pub channel_id: String,
    pub created_at: DateTime<Utc>,
    pub reply_count: u32,
    pub reaction_count: u32,
    pub unique_reactor_count: u32,
    pub participant_count: u32,
    pub thread_depth: u32,
    pub keywords: Vec<String>,
    pub categories: Vec<TopicCategory>,
    pub has_attachments: bool,
    pub attachment_urls: Vec<String>,
    /// Deep link back to the source conversation, when the platform provides one.
    pub link: Option<String>,
}

impl Discussion {
    pub fn primary_category(&self) -> TopicCategory {
        self.categories
            .first()
            .copied()
            .unwrap_or(TopicCategory::General)
    }
}

/// Derived engagement numbers for one discussion. Recomputed whenever the
/// underlying counts change; `engagement_score` is the only ranking signal
/// used downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementMetrics {
    pub reply_count: u32,
    pub reaction_count: u32,
    pub unique_reactor_count: u32,
    pub participant_count: u32,
    pub thread_depth: u32,
    pub engagement_score: f64,
    pub trending_score: f64,
    pub topic_categories: Vec<TopicCategory>,
    pub last_activity: DateTime<Utc>,
}

// --- Draft model ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Featured,
    Trending,
    News,
    Category,
    Events,
    Meme,
    Merch,
    General,
}

/// One section of the digest, built incrementally across stages and
/// finalized by Formatting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub kind: SectionKind,
    pub title: String,
    pub body: String,
    pub discussion_ids: Vec<String>,
    pub word_count: usize,
}

impl Section {
    pub fn new(kind: SectionKind, title: impl Into<String>, body: impl Into<String>) -> Self {
        let body = body.into();
        let word_count = word_count(&body);
        Self {
            kind,
            title: title.into(),
            body,
            discussion_ids: Vec::new(),
            word_count,
        }
    }

    pub fn with_discussions(mut self, ids: Vec<String>) -> Self {
        self.discussion_ids = ids;
        self
    }
}

/// The assembled digest draft. All three render targets derive from this
/// one object so the formats can never drift apart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    pub title: String,
    pub subtitle: String,
    pub sections: Vec<Section>,
    pub total_word_count: usize,
    pub estimated_read_time_min: usize,
    pub featured_discussion_ids: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// The three parallel render targets, all derived from the same `Draft`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedFormats {
    pub html: String,
    pub markdown: String,
    pub text: String,
}

// --- Quality ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub total_word_count: usize,
    pub average_section_words: usize,
    pub technical_term_count: usize,
    pub issues: Vec<String>,
    /// Overall editorial quality in [0.0, 1.0]; the quality gate reads this.
    pub overall_score: f64,
    pub estimated_read_time_min: usize,
}

// --- Persisted record ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestStatus {
    Generated,
    GeneratedWithWarnings,
    Failed,
}

/// What the store keeps after a run completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestRecord {
    pub id: Uuid,
    pub kind: DigestKind,
    pub target_date: NaiveDate,
    pub title: String,
    pub subtitle: String,
    pub draft: Option<Draft>,
    pub formats: Option<RenderedFormats>,
    pub quality_score: f64,
    pub status: DigestStatus,
    pub warnings: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl DigestRecord {
    pub fn key(&self) -> GenerationKey {
        GenerationKey {
            kind: self.kind,
            target_date: self.target_date,
        }
    }
}

/// Whitespace-delimited word count, used for section and draft totals.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
