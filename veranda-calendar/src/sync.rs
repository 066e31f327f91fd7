//! Pull-based sync of external calendar sources.
//!
//! Each source is serialized against itself; different sources may
//! sync concurrently. A source failing repeatedly is disabled rather
//! than retried forever.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;
use veranda_core::{FeedFetcher, WorkflowError, WorkflowResult};
use veranda_shared::events::CalendarSyncedEvent;

use crate::models::{CalendarBlock, CalendarSource, SourceKind};
use crate::repository::{BlockRepository, SourceRepository};

/// Per-source outcome of one sync pass.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SyncOutcome {
    pub source_id: Uuid,
    pub property_id: Uuid,
    pub added: usize,
    pub updated: usize,
    pub cancelled: usize,
    /// Feed events dropped by per-event validation.
    pub skipped: usize,
    pub error: Option<String>,
}

impl SyncOutcome {
    fn success(source: &CalendarSource, counts: DiffCounts) -> Self {
        Self {
            source_id: source.id,
            property_id: source.property_id,
            added: counts.added,
            updated: counts.updated,
            cancelled: counts.cancelled,
            skipped: counts.skipped,
            error: None,
        }
    }

    fn failure(source_id: Uuid, property_id: Uuid, error: String) -> Self {
        Self {
            source_id,
            property_id,
            added: 0,
            updated: 0,
            cancelled: 0,
            skipped: 0,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct DiffCounts {
    added: usize,
    updated: usize,
    cancelled: usize,
    skipped: usize,
}

/// Pulls configured sources and reconciles their feeds into calendar
/// blocks through an external-id diff.
pub struct SyncEngine {
    sources: Arc<dyn SourceRepository>,
    blocks: Arc<dyn BlockRepository>,
    fetcher: Arc<dyn FeedFetcher>,
    /// Serializes sync per source id.
    in_flight: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl SyncEngine {
    pub fn new(
        sources: Arc<dyn SourceRepository>,
        blocks: Arc<dyn BlockRepository>,
        fetcher: Arc<dyn FeedFetcher>,
    ) -> Self {
        Self {
            sources,
            blocks,
            fetcher,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Sync one source now, regardless of schedule. Feed and transport
    /// failures are recorded on the source (feeding its circuit
    /// breaker) and reported in the outcome instead of propagating.
    pub async fn sync_source(&self, source_id: Uuid) -> WorkflowResult<SyncOutcome> {
        let guard = self.source_guard(source_id).await;
        let _serialized = guard.lock().await;

        let mut source = self
            .sources
            .get(source_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("calendar source {source_id}")))?;

        if source.kind == SourceKind::Manual {
            return Err(WorkflowError::ValidationFailed(
                "manual sources have no feed to sync".to_string(),
            ));
        }

        let now = Utc::now();
        match self.run_feed_sync(&source).await {
            Ok(counts) => {
                source.record_success(now);
                self.sources.update(&source).await?;

                let event = CalendarSyncedEvent {
                    source_id: source.id,
                    property_id: source.property_id,
                    added: counts.added,
                    updated: counts.updated,
                    cancelled: counts.cancelled,
                    occurred_at: now,
                };
                info!(
                    source = %source.name,
                    added = counts.added,
                    updated = counts.updated,
                    cancelled = counts.cancelled,
                    skipped = counts.skipped,
                    payload = %serde_json::to_string(&event).unwrap_or_default(),
                    "Calendar source synced"
                );
                Ok(SyncOutcome::success(&source, counts))
            }
            Err(err) => {
                let message = err.to_string();
                source.record_failure(now, &message);
                self.sources.update(&source).await?;
                warn!(
                    source = %source.name,
                    failures = source.consecutive_failures,
                    status = ?source.status,
                    "Calendar sync failed: {message}"
                );
                Ok(SyncOutcome::failure(source.id, source.property_id, message))
            }
        }
    }

    /// Bulk driver: sync every schedulable source that is due. One bad
    /// source never aborts the others.
    pub async fn sync_all_due(&self) -> Vec<SyncOutcome> {
        let now = Utc::now();
        let sources = match self.sources.list_schedulable().await {
            Ok(sources) => sources,
            Err(err) => {
                error!("Could not list calendar sources: {err}");
                return Vec::new();
            }
        };

        let mut outcomes = Vec::new();
        for source in sources.into_iter().filter(|s| s.is_due(now)) {
            match self.sync_source(source.id).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    error!(source = %source.name, "Sync aborted: {err}");
                    outcomes.push(SyncOutcome::failure(source.id, source.property_id, err.to_string()));
                }
            }
        }
        outcomes
    }

    async fn source_guard(&self, source_id: Uuid) -> Arc<Mutex<()>> {
        let mut table = self.in_flight.lock().await;
        table.entry(source_id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Download, parse, and diff one source's feed against its stored
    /// blocks by external id.
    async fn run_feed_sync(
        &self,
        source: &CalendarSource,
    ) -> Result<DiffCounts, Box<dyn std::error::Error + Send + Sync>> {
        let url = source
            .url
            .as_deref()
            .ok_or_else(|| format!("source {} has no feed url", source.id))?;

        let raw = self.fetcher.fetch(url).await?;
        let parsed = source.kind.parse_feed(&raw)?;

        let existing = self.blocks.for_source(source.id).await?;
        let mut by_ref: HashMap<String, CalendarBlock> = existing
            .into_iter()
            .filter_map(|b| b.external_ref.clone().map(|r| (r, b)))
            .collect();

        let mut counts = DiffCounts { skipped: parsed.dropped, ..Default::default() };
        let mut seen: HashSet<String> = HashSet::new();

        for event in parsed.events {
            seen.insert(event.uid.clone());
            match by_ref.get_mut(&event.uid) {
                None => {
                    let block = CalendarBlock::external(
                        source.property_id,
                        source.id,
                        event.uid,
                        event.range,
                        event.summary,
                    );
                    self.blocks.insert(&block).await?;
                    counts.added += 1;
                }
                Some(block) if !block.is_active() => {
                    // A previously-seen id came back: late correction
                    block.reactivate(event.range, event.summary);
                    self.blocks.update(block).await?;
                    counts.updated += 1;
                }
                Some(block) => {
                    if block.range != event.range || block.summary != event.summary {
                        block.reschedule(event.range, event.summary);
                        self.blocks.update(block).await?;
                        counts.updated += 1;
                    }
                }
            }
        }

        // Previously-seen ids absent from the new feed are
        // soft-cancelled, never hard-deleted.
        for (uid, block) in by_ref.iter_mut() {
            if block.is_active() && !seen.contains(uid) {
                block.cancel();
                self.blocks.update(block).await?;
                counts.cancelled += 1;
            }
        }

        Ok(counts)
    }
}
