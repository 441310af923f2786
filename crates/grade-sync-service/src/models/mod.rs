//! Grade sync service models.
//!
//! Wire types for the HTTP surface. Request types keep every field optional
//! so that absent or null values are resolved in one place (`ingest`) and
//! reported as validation failures rather than JSON rejections.

use crate::grading::{
    ActivityProgress, Checkpoint, CheckpointState, FallbackScore, GradingProgress,
};
use crate::sync::{PublishMeta, SyncRecord};
use chrono::{DateTime, Utc};
use common::secret::SecretString;
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always "healthy" while the process is serving.
    pub status: &'static str,

    pub grade_sync_enabled: bool,
}

/// Launch request body.
#[derive(Debug, Deserialize)]
pub struct LaunchRequest {
    /// The platform-signed `id_token`. Redacted in Debug output.
    #[serde(rename = "idToken")]
    pub id_token: SecretString,

    /// Nonce issued for this launch, if the caller tracks one.
    #[serde(default)]
    pub nonce: Option<String>,
}

/// Launch context returned after a successful launch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchResponse {
    pub issuer: String,
    pub deployment_id: String,
    pub message_type: String,
    pub version: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,

    /// Whether the launch carries the Instructor role.
    pub instructor: bool,
}

/// One checkpoint as sent by the client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointInput {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub weight: Option<f64>,

    #[serde(default)]
    pub required: Option<bool>,

    #[serde(default)]
    pub state: Option<CheckpointState>,
}

/// Grade publish request body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    #[serde(default)]
    pub course_id: Option<String>,

    /// Checkpoint group id.
    #[serde(default)]
    pub checkpoint_id: Option<String>,

    #[serde(default)]
    pub user_ids: Option<Vec<String>>,

    #[serde(default)]
    pub group_id: Option<String>,

    #[serde(default)]
    pub checkpoints: Option<Vec<CheckpointInput>>,

    /// Unclamped; clamped during scoring.
    #[serde(default)]
    pub late_multiplier: Option<f64>,

    #[serde(default)]
    pub comment: Option<String>,

    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(default)]
    pub line_item_id: Option<String>,

    // Legacy fields, used when no checkpoints are sent.
    #[serde(default)]
    pub score_given: Option<f64>,

    #[serde(default)]
    pub score_maximum: Option<f64>,

    #[serde(default)]
    pub activity_progress: Option<ActivityProgress>,

    #[serde(default)]
    pub grading_progress: Option<GradingProgress>,
}

/// A publish request with defaults resolved.
#[derive(Debug, Clone)]
pub struct PublishInput {
    pub checkpoints: Vec<Checkpoint>,
    pub late_multiplier: Option<f64>,
    pub fallback: FallbackScore,
    pub meta: PublishMeta,
}

impl PublishRequest {
    /// Resolve the request into scoring input and publish metadata.
    ///
    /// Checkpoints without a state are dropped; weights and required flags
    /// get their defaults here and nowhere else.
    pub fn ingest(self) -> PublishInput {
        let checkpoints = self
            .checkpoints
            .unwrap_or_default()
            .into_iter()
            .filter_map(|input| {
                input
                    .state
                    .map(|state| Checkpoint::resolve(input.id, input.weight, input.required, state))
            })
            .collect();

        PublishInput {
            checkpoints,
            late_multiplier: self.late_multiplier,
            fallback: FallbackScore {
                score_given: self.score_given,
                score_maximum: self.score_maximum,
                activity_progress: self.activity_progress,
                grading_progress: self.grading_progress,
            },
            meta: PublishMeta {
                course_id: self.course_id,
                checkpoint_id: self.checkpoint_id,
                user_ids: self.user_ids,
                group_id: self.group_id,
                comment: self.comment,
                timestamp: self.timestamp,
                line_item_id: self.line_item_id,
            },
        }
    }
}

/// Grade publish response: the stored record plus status markers.
#[derive(Debug, Clone, Serialize)]
pub struct PublishResponse {
    /// Always "synced".
    pub status: &'static str,

    /// Records are not sent to a real grading platform.
    pub mock: bool,

    #[serde(flatten)]
    pub record: SyncRecord,
}

impl From<SyncRecord> for PublishResponse {
    fn from(record: SyncRecord) -> Self {
        Self {
            status: "synced",
            mock: true,
            record,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::ExposeSecret;
    use serde_json::json;

    #[test]
    fn test_launch_request_redacts_token() {
        let req: LaunchRequest =
            serde_json::from_value(json!({"idToken": "eyJ.secret.sig", "nonce": "n-1"})).unwrap();

        assert_eq!(req.id_token.expose_secret(), "eyJ.secret.sig");
        assert!(!format!("{req:?}").contains("eyJ.secret.sig"));
    }

    #[test]
    fn test_ingest_resolves_defaults_and_drops_null_states() {
        let req: PublishRequest = serde_json::from_value(json!({
            "courseId": "C1",
            "checkpointId": "cp1",
            "userIds": ["u1"],
            "checkpoints": [
                {"id": "a", "state": "Passed"},
                {"id": "b", "state": null, "weight": 4},
                {"id": "c", "state": "Returned", "weight": -1, "required": false}
            ],
            "lateMultiplier": 0.5
        }))
        .unwrap();

        let input = req.ingest();

        assert_eq!(input.checkpoints.len(), 2);
        let first = input.checkpoints.first().unwrap();
        assert_eq!(first.weight, 1.0);
        assert!(first.required);
        let last = input.checkpoints.last().unwrap();
        assert_eq!(last.state, CheckpointState::Returned);
        assert_eq!(last.weight, 1.0);
        assert!(!last.required);

        assert_eq!(input.late_multiplier, Some(0.5));
        assert_eq!(input.meta.course_id.as_deref(), Some("C1"));
    }

    #[test]
    fn test_ingest_carries_fallback_fields() {
        let req: PublishRequest = serde_json::from_value(json!({
            "scoreGiven": 3,
            "scoreMaximum": 4,
            "activityProgress": "Completed",
            "gradingProgress": "FullyGraded",
            "timestamp": "2024-09-01T12:00:00Z"
        }))
        .unwrap();

        let input = req.ingest();

        assert!(input.checkpoints.is_empty());
        assert_eq!(input.fallback.score_given, Some(3.0));
        assert_eq!(input.fallback.score_maximum, Some(4.0));
        assert_eq!(input.fallback.activity_progress, Some(ActivityProgress::Completed));
        assert!(input.meta.timestamp.is_some());
    }

    #[test]
    fn test_unknown_state_is_rejected_by_deserialization() {
        let result: Result<PublishRequest, _> = serde_json::from_value(json!({
            "checkpoints": [{"state": "Graded"}]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_publish_response_flattens_record() {
        let record = SyncRecord {
            mock_sync_id: 1,
            course_id: "C1".to_string(),
            line_item_id: "mock-lineitem-cp1".to_string(),
            result_ids: vec!["mock-result-u1".to_string()],
            synced_count: 1,
            checkpoint_id: "cp1".to_string(),
            score_given: 1.0,
            score_maximum: 1.0,
            activity_progress: ActivityProgress::Completed,
            grading_progress: GradingProgress::FullyGraded,
            comment: None,
            timestamp: Utc::now(),
            expires_at: Utc::now(),
        };

        let value = serde_json::to_value(PublishResponse::from(record)).unwrap();

        assert_eq!(value["status"], "synced");
        assert_eq!(value["mock"], true);
        assert_eq!(value["courseId"], "C1");
        assert_eq!(value["mockSyncId"], 1);
    }
}
