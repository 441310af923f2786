//! Score aggregation.
//!
//! Accumulation rule: `score_maximum` sums the weights of required,
//! non-exempt checkpoints; `score_given` sums the weights of those that are
//! also `Passed`. Any checkpoint still `NotStarted`, `InProgress` or
//! `Returned` keeps the set from being reported complete.

use super::{
    ActivityProgress, Checkpoint, CheckpointState, FallbackScore, GradingError, GradingProgress,
    ScoreResult,
};

/// Compute a grade from checkpoint states, or from the fallback fields when
/// `checkpoints` is empty.
///
/// The late multiplier is clamped to `[0, 1]` (NaN counts as absent) and
/// applied to the checkpoint-derived earned score only. Scores are rounded
/// to two decimal places, half-up.
///
/// # Errors
///
/// Returns `GradingError::ValidationFailure` when falling back and
/// `score_maximum` is missing or not positive, or `score_given` is missing or
/// outside `[0, score_maximum]`.
pub fn compute_from(
    checkpoints: &[Checkpoint],
    late_multiplier: Option<f64>,
    fallback: &FallbackScore,
) -> Result<ScoreResult, GradingError> {
    if checkpoints.is_empty() {
        return from_fallback(fallback);
    }

    let mut earned = 0.0;
    let mut max = 0.0;
    let mut not_done = false;

    for checkpoint in checkpoints {
        match checkpoint.state {
            CheckpointState::Exempt => {}
            CheckpointState::Passed => {
                if checkpoint.required {
                    max += checkpoint.weight;
                    earned += checkpoint.weight;
                }
            }
            CheckpointState::Returned | CheckpointState::InProgress | CheckpointState::NotStarted => {
                if checkpoint.required {
                    max += checkpoint.weight;
                }
                not_done = true;
            }
        }
    }

    let multiplier = clamp_late_multiplier(late_multiplier);

    let (activity_progress, grading_progress) = if not_done {
        (ActivityProgress::InProgress, GradingProgress::Pending)
    } else {
        (ActivityProgress::Completed, GradingProgress::FullyGraded)
    };

    Ok(ScoreResult {
        score_given: round2(earned * multiplier),
        score_maximum: round2(max),
        activity_progress,
        grading_progress,
    })
}

fn from_fallback(fallback: &FallbackScore) -> Result<ScoreResult, GradingError> {
    let max = fallback
        .score_maximum
        .filter(|m| m.is_finite() && *m > 0.0)
        .ok_or_else(|| {
            GradingError::ValidationFailure(
                "scoreMaximum must be greater than 0 when no checkpoints are provided".to_string(),
            )
        })?;

    let given = fallback
        .score_given
        .filter(|g| (0.0..=max).contains(g))
        .ok_or_else(|| {
            GradingError::ValidationFailure(
                "scoreGiven must be between 0 and scoreMaximum".to_string(),
            )
        })?;

    Ok(ScoreResult {
        score_given: given,
        score_maximum: max,
        activity_progress: fallback
            .activity_progress
            .unwrap_or(ActivityProgress::InProgress),
        grading_progress: fallback.grading_progress.unwrap_or(GradingProgress::Pending),
    })
}

fn clamp_late_multiplier(late_multiplier: Option<f64>) -> f64 {
    match late_multiplier {
        Some(m) if !m.is_nan() => m.clamp(0.0, 1.0),
        _ => 1.0,
    }
}

/// Round to two decimals, half away from zero.
///
/// Works on the shortest decimal form of `value`, so a tie such as `1.005`
/// (stored in binary just below it) still rounds up.
fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }

    let text = value.abs().to_string();
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));

    let mut fraction_digits = fraction.chars().chain(std::iter::repeat('0'));
    let cents_text: String = whole
        .chars()
        .chain(fraction_digits.by_ref().take(2))
        .collect();
    let round_up = fraction_digits.next().is_some_and(|digit| digit >= '5');

    let Ok(mut cents) = cents_text.parse::<f64>() else {
        return value;
    };
    if round_up {
        cents += 1.0;
    }

    (cents / 100.0).copysign(value)
}
