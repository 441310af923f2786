//! In-memory publish history.
//!
//! Records are kept newest-first in a single deque behind a mutex, so
//! sequence assignment, insertion, pruning and eviction happen atomically.
//! Expired records are pruned lazily on every publish and lookup; there is
//! no background sweep.

use super::ValidatedPublish;
use crate::grading::{ActivityProgress, GradingProgress, ScoreResult};
use crate::observability::metrics::{record_grade_lookup, set_sync_cache_size};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::instrument;

/// Default retention for published records (1 hour).
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(3600);

/// Default maximum number of retained records.
pub const DEFAULT_CAPACITY: usize = 50;

/// A published grade. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRecord {
    pub mock_sync_id: u64,
    pub course_id: String,
    pub line_item_id: String,
    pub result_ids: Vec<String>,
    pub synced_count: usize,
    pub checkpoint_id: String,
    pub score_given: f64,
    pub score_maximum: f64,
    pub activity_progress: ActivityProgress,
    pub grading_progress: GradingProgress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip)]
    pub expires_at: DateTime<Utc>,
}

/// Cache tuning.
#[derive(Debug, Clone)]
pub struct SyncCacheSettings {
    pub retention: Duration,
    pub capacity: usize,
    pub redact_comments: bool,
}

impl Default for SyncCacheSettings {
    fn default() -> Self {
        Self {
            retention: DEFAULT_RETENTION,
            capacity: DEFAULT_CAPACITY,
            redact_comments: true,
        }
    }
}

struct History {
    records: VecDeque<SyncRecord>,
    next_sync_id: u64,
}

impl History {
    fn prune(&mut self, now: DateTime<Utc>) {
        self.records.retain(|record| record.expires_at >= now);
    }
}

/// Bounded, TTL-expiring history of published grades.
///
/// Built once at startup and shared through application state.
pub struct GradeSyncCache {
    settings: SyncCacheSettings,
    retention: chrono::Duration,
    history: Mutex<History>,
}

impl GradeSyncCache {
    pub fn new(settings: SyncCacheSettings) -> Self {
        let retention = chrono::Duration::from_std(settings.retention)
            .unwrap_or_else(|_| chrono::Duration::seconds(3600));

        Self {
            settings,
            retention,
            history: Mutex::new(History {
                records: VecDeque::new(),
                next_sync_id: 1,
            }),
        }
    }

    /// Whether comments are dropped outright by [`super::validate_publish`].
    pub fn redact_comments(&self) -> bool {
        self.settings.redact_comments
    }

    /// Record a validated publish at the current time.
    pub async fn publish(&self, score: &ScoreResult, validated: ValidatedPublish) -> SyncRecord {
        self.publish_at(score, validated, Utc::now()).await
    }

    /// Record a validated publish as of `now`.
    ///
    /// Ids are derived before the history is locked; under the lock the
    /// history is pruned, the record gets the next sequence id, and the
    /// oldest records are evicted past capacity.
    #[instrument(skip_all)]
    pub async fn publish_at(
        &self,
        score: &ScoreResult,
        validated: ValidatedPublish,
        now: DateTime<Utc>,
    ) -> SyncRecord {
        let line_item_id = validated
            .line_item_id
            .unwrap_or_else(|| format!("mock-lineitem-{}", validated.checkpoint_id));
        let result_ids: Vec<String> = validated
            .recipients
            .ids()
            .into_iter()
            .map(|id| format!("mock-result-{id}"))
            .collect();

        let mut history = self.history.lock().await;
        history.prune(now);

        let mock_sync_id = history.next_sync_id;
        history.next_sync_id += 1;

        let record = SyncRecord {
            mock_sync_id,
            course_id: validated.course_id,
            line_item_id,
            synced_count: result_ids.len(),
            result_ids,
            checkpoint_id: validated.checkpoint_id,
            score_given: score.score_given,
            score_maximum: score.score_maximum,
            activity_progress: score.activity_progress,
            grading_progress: score.grading_progress,
            comment: validated.comment,
            timestamp: validated.timestamp.unwrap_or(now),
            expires_at: now + self.retention,
        };

        history.records.push_front(record.clone());
        while history.records.len() > self.settings.capacity {
            history.records.pop_back();
        }
        set_sync_cache_size(history.records.len());

        tracing::info!(
            target: "gs.sync.cache",
            mock_sync_id = record.mock_sync_id,
            course_id = %record.course_id,
            synced_count = record.synced_count,
            "Grade sync recorded"
        );

        record
    }

    /// Most recent unexpired record for `course_id`, as of now.
    pub async fn lookup_latest_by_course(&self, course_id: &str) -> Option<SyncRecord> {
        self.lookup_latest_by_course_at(course_id, Utc::now()).await
    }

    /// Most recent unexpired record for `course_id`, as of `now`.
    ///
    /// `None` is an expected outcome and is not logged as an error.
    #[instrument(skip_all)]
    pub async fn lookup_latest_by_course_at(
        &self,
        course_id: &str,
        now: DateTime<Utc>,
    ) -> Option<SyncRecord> {
        let mut history = self.history.lock().await;
        history.prune(now);
        set_sync_cache_size(history.records.len());

        let found = history
            .records
            .iter()
            .find(|record| record.course_id == course_id)
            .cloned();

        if found.is_some() {
            record_grade_lookup("hit");
        } else {
            tracing::debug!(target: "gs.sync.cache", "No sync record for course");
            record_grade_lookup("miss");
        }

        found
    }

    /// Number of retained records, including any not yet pruned.
    pub async fn len(&self) -> usize {
        self.history.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
