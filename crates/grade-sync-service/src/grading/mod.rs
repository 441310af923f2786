//! Checkpoint-based grade aggregation.
//!
//! Turns per-checkpoint completion states (or the legacy numeric score
//! fields) into a normalized [`ScoreResult`]. Everything here is pure and
//! synchronous.

pub mod aggregator;

pub use aggregator::compute_from;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Weight used when a checkpoint's weight is absent, non-positive, or not finite.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Completion state of a single checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckpointState {
    NotStarted,
    InProgress,
    Returned,
    Passed,
    Exempt,
}

/// Activity progress reported to the grading platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityProgress {
    InProgress,
    Completed,
}

/// Grading progress reported to the grading platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradingProgress {
    Pending,
    FullyGraded,
}

/// A fully resolved checkpoint. Defaults are applied before construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub id: Option<String>,
    pub weight: f64,
    pub required: bool,
    pub state: CheckpointState,
}

impl Checkpoint {
    /// Resolve optional wire values into a checkpoint.
    ///
    /// A missing, non-positive or non-finite weight becomes [`DEFAULT_WEIGHT`];
    /// a missing `required` flag becomes `true`.
    pub fn resolve(
        id: Option<String>,
        weight: Option<f64>,
        required: Option<bool>,
        state: CheckpointState,
    ) -> Self {
        let weight = weight
            .filter(|w| w.is_finite() && *w > 0.0)
            .unwrap_or(DEFAULT_WEIGHT);

        Self {
            id,
            weight,
            required: required.unwrap_or(true),
            state,
        }
    }
}

/// Legacy numeric score fields, used when no checkpoints are supplied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FallbackScore {
    pub score_given: Option<f64>,
    pub score_maximum: Option<f64>,
    pub activity_progress: Option<ActivityProgress>,
    pub grading_progress: Option<GradingProgress>,
}

/// Normalized grade. Never mutated after computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreResult {
    pub score_given: f64,
    pub score_maximum: f64,
    pub activity_progress: ActivityProgress,
    pub grading_progress: GradingProgress,
}

/// Grade computation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GradingError {
    #[error("{0}")]
    ValidationFailure(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_applies_defaults() {
        let cp = Checkpoint::resolve(None, None, None, CheckpointState::Passed);
        assert_eq!(cp.weight, DEFAULT_WEIGHT);
        assert!(cp.required);
    }

    #[test]
    fn test_resolve_replaces_unusable_weights() {
        for weight in [0.0, -2.0, f64::NAN, f64::INFINITY] {
            let cp = Checkpoint::resolve(None, Some(weight), Some(false), CheckpointState::Exempt);
            assert_eq!(cp.weight, DEFAULT_WEIGHT, "weight {weight} should default");
            assert!(!cp.required);
        }
    }

    #[test]
    fn test_resolve_keeps_positive_weight() {
        let cp = Checkpoint::resolve(Some("a".to_string()), Some(2.5), None, CheckpointState::Returned);
        assert_eq!(cp.weight, 2.5);
        assert_eq!(cp.id.as_deref(), Some("a"));
    }

    #[test]
    fn test_state_wire_names() {
        let state: CheckpointState = serde_json::from_str("\"NotStarted\"").unwrap_or(CheckpointState::Exempt);
        assert_eq!(state, CheckpointState::NotStarted);
        assert_eq!(
            serde_json::to_string(&GradingProgress::FullyGraded).unwrap_or_default(),
            "\"FullyGraded\""
        );
    }
}
