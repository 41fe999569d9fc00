//! Digest service facade: selection, locking, orchestration, persistence,
//! and optional publishing behind one `generate` call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use buttondown_client::ButtondownClient;
use tidings_common::{
    Config, DigestKind, DigestRecord, DigestStatus, Discussion, EngagementMetrics, GenerationKey,
    TidingsError,
};

use crate::lock::GenerationLocks;
use crate::orchestrator::Orchestrator;
use crate::state::PipelineState;

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// Supplies the ranked, thresholded discussion list for a window. Owned by
/// the ingestion side; the pipeline only consumes it.
#[async_trait]
pub trait DiscussionSelector: Send + Sync {
    async fn select(
        &self,
        kind: DigestKind,
        target_date: NaiveDate,
        min_score: f64,
        limit: usize,
    ) -> Result<Vec<(Discussion, EngagementMetrics)>, TidingsError>;
}

/// Persists completed digests, keyed by `(kind, target_date)`.
#[async_trait]
pub trait DigestStore: Send + Sync {
    async fn find(&self, key: &GenerationKey) -> Result<Option<DigestRecord>, TidingsError>;
    async fn save(&self, record: &DigestRecord) -> Result<(), TidingsError>;
}

/// In-memory store used by tests and single-process deployments.
#[derive(Default)]
pub struct InMemoryDigestStore {
    records: StdMutex<HashMap<GenerationKey, DigestRecord>>,
}

impl InMemoryDigestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DigestStore for InMemoryDigestStore {
    async fn find(&self, key: &GenerationKey) -> Result<Option<DigestRecord>, TidingsError> {
        let records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(records.get(key).cloned())
    }

    async fn save(&self, record: &DigestRecord) -> Result<(), TidingsError> {
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        records.insert(record.key(), record.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DigestService
// ---------------------------------------------------------------------------

pub struct DigestService {
    config: Config,
    selector: Arc<dyn DiscussionSelector>,
    store: Arc<dyn DigestStore>,
    orchestrator: Orchestrator,
    locks: GenerationLocks,
    publisher: Option<ButtondownClient>,
}

impl DigestService {
    pub fn new(
        config: Config,
        selector: Arc<dyn DiscussionSelector>,
        store: Arc<dyn DigestStore>,
        orchestrator: Orchestrator,
    ) -> Self {
        let publisher = if config.buttondown_api_key.is_empty() {
            None
        } else {
            Some(ButtondownClient::new(config.buttondown_api_key.clone()))
        };
        Self {
            config,
            selector,
            store,
            orchestrator,
            locks: GenerationLocks::new(),
            publisher,
        }
    }

    /// Generate one digest. `force=true` bypasses the stored-result
    /// short-circuit; with `force=false` a second call for the same key
    /// returns the already-materialized record.
    pub async fn generate(
        &self,
        kind: DigestKind,
        force: bool,
        target_date: Option<NaiveDate>,
    ) -> Result<DigestRecord, TidingsError> {
        let target_date = target_date.unwrap_or_else(|| Utc::now().date_naive());
        let key = GenerationKey { kind, target_date };

        // Held for the whole run; released on every exit path by drop.
        let _guard = self.locks.acquire(key).await;

        if !force {
            if let Some(existing) = self.store.find(&key).await? {
                info!(%key, "Returning existing digest");
                return Ok(existing);
            }
        }

        info!(%key, force, "Starting digest generation");

        let selected = self
            .selector
            .select(
                kind,
                target_date,
                kind.min_score(self.config.min_engagement_score),
                kind.selection_limit(),
            )
            .await?;

        let mut metrics = HashMap::with_capacity(selected.len());
        let mut discussions = Vec::with_capacity(selected.len());
        for (discussion, metric) in selected {
            metrics.insert(discussion.id.clone(), metric);
            discussions.push(discussion);
        }

        let mut state = PipelineState::new(kind, target_date, discussions, metrics);
        if state.discussions.is_empty() {
            warn!(%key, "No discussions met the selection filter");
            state
                .warnings
                .push("no discussions met the selection filter".to_string());
        }

        self.orchestrator.run(&mut state).await;

        let record = self.record_from_state(key, state);
        self.store.save(&record).await?;

        if record.status != DigestStatus::Failed {
            self.publish(&record).await;
        }

        Ok(record)
    }

    fn record_from_state(&self, key: GenerationKey, state: PipelineState) -> DigestRecord {
        let status = if state.draft.is_none() {
            DigestStatus::Failed
        } else if state.errors.is_empty() && state.warnings.is_empty() {
            DigestStatus::Generated
        } else {
            DigestStatus::GeneratedWithWarnings
        };

        let (title, subtitle) = state
            .draft
            .as_ref()
            .map(|d| (d.title.clone(), d.subtitle.clone()))
            .unwrap_or_else(|| (format!("{} digest {}", key.kind, key.target_date), String::new()));

        let mut warnings = state.warnings;
        warnings.extend(state.errors.iter().map(|e| e.to_string()));

        DigestRecord {
            id: Uuid::new_v4(),
            kind: key.kind,
            target_date: key.target_date,
            title,
            subtitle,
            draft: state.draft,
            formats: state.formats,
            quality_score: state.quality_metrics.overall_score,
            status,
            warnings,
            generated_at: Utc::now(),
        }
    }

    /// Best-effort: publishing failures are logged, never fail the run.
    async fn publish(&self, record: &DigestRecord) {
        let Some(publisher) = &self.publisher else {
            return;
        };
        let Some(formats) = &record.formats else {
            return;
        };

        let mut metadata = HashMap::new();
        metadata.insert("digest_kind".to_string(), record.kind.to_string());
        metadata.insert(
            "generated_at".to_string(),
            record.generated_at.to_rfc3339(),
        );
        if let Some(draft) = &record.draft {
            metadata.insert(
                "word_count".to_string(),
                draft.total_word_count.to_string(),
            );
        }

        match publisher
            .create_draft(
                &record.title,
                &formats.markdown,
                vec![record.kind.to_string()],
                metadata,
            )
            .await
        {
            Ok(email) => info!(email_id = %email.id, "Published digest draft"),
            Err(e) => error!(error = %e, "Failed to publish digest draft"),
        }
    }
}
