//! Grade publishing.
//!
//! A publish is validated in full before the history is touched; see
//! [`validate_publish`]. Accepted publishes become [`SyncRecord`]s held in
//! the bounded, TTL-expiring [`GradeSyncCache`].

pub mod cache;

pub use cache::{GradeSyncCache, SyncCacheSettings, SyncRecord};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Maximum retained comment length, in characters.
pub const MAX_COMMENT_CHARS: usize = 120;

/// Publish rejection. Nothing is stored when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    /// Missing or malformed field.
    #[error("{0}")]
    Validation(String),

    /// Recipients not given in exactly one form.
    #[error("{0}")]
    Recipients(String),
}

/// Request metadata accompanying a score, as received.
#[derive(Debug, Clone, Default)]
pub struct PublishMeta {
    pub course_id: Option<String>,
    pub checkpoint_id: Option<String>,
    pub user_ids: Option<Vec<String>>,
    pub group_id: Option<String>,
    pub comment: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub line_item_id: Option<String>,
}

/// Who a grade is published for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipients {
    Users(Vec<String>),
    /// A group counts as a single recipient.
    Group(String),
}

impl Recipients {
    /// Identifiers a result is synthesized for.
    pub fn ids(&self) -> Vec<&str> {
        match self {
            Recipients::Users(ids) => ids.iter().map(String::as_str).collect(),
            Recipients::Group(id) => vec![id.as_str()],
        }
    }
}

/// Publish metadata that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPublish {
    pub course_id: String,
    pub checkpoint_id: String,
    pub recipients: Recipients,
    pub comment: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub line_item_id: Option<String>,
}

/// Validate publish metadata. First failure wins:
///
/// 1. course id and checkpoint id are non-blank
/// 2. exactly one of a non-empty user id list or a non-blank group id
/// 3. no recipient identifier is email-shaped
/// 4. the comment is sanitized (see [`sanitize_comment`])
///
/// # Errors
///
/// `PublishError::Recipients` for step 2, `PublishError::Validation` otherwise.
pub fn validate_publish(
    meta: PublishMeta,
    redact_comments: bool,
) -> Result<ValidatedPublish, PublishError> {
    let course_id = non_blank(meta.course_id, "courseId")?;
    let checkpoint_id = non_blank(meta.checkpoint_id, "checkpointId")?;

    let user_ids = meta.user_ids.filter(|ids| !ids.is_empty());
    let group_id = meta.group_id.filter(|id| !id.trim().is_empty());

    let recipients = match (user_ids, group_id) {
        (Some(ids), None) => Recipients::Users(ids),
        (None, Some(id)) => Recipients::Group(id),
        (Some(_), Some(_)) => {
            return Err(PublishError::Recipients(
                "provide either userIds or groupId, not both".to_string(),
            ))
        }
        (None, None) => {
            return Err(PublishError::Recipients(
                "one of userIds or groupId is required".to_string(),
            ))
        }
    };

    for id in recipients.ids() {
        if id.trim().is_empty() {
            return Err(PublishError::Validation(
                "recipient identifiers must not be blank".to_string(),
            ));
        }
        if is_email_shaped(id) {
            return Err(PublishError::Validation(
                "recipient identifiers must not be email addresses".to_string(),
            ));
        }
    }

    Ok(ValidatedPublish {
        course_id,
        checkpoint_id,
        recipients,
        comment: sanitize_comment(meta.comment, redact_comments),
        timestamp: meta.timestamp,
        line_item_id: meta.line_item_id.filter(|id| !id.trim().is_empty()),
    })
}

fn non_blank(value: Option<String>, field: &str) -> Result<String, PublishError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| PublishError::Validation(format!("{field} is required")))
}

/// Apply the comment policy.
///
/// With redaction on, comments are always dropped. Otherwise a comment that
/// contains an email-shaped string is dropped, and any other comment is cut
/// to [`MAX_COMMENT_CHARS`] characters.
pub fn sanitize_comment(comment: Option<String>, redact: bool) -> Option<String> {
    if redact {
        return None;
    }

    let comment = comment?;
    if comment.trim().is_empty() || contains_email_shaped(&comment) {
        return None;
    }

    Some(comment.chars().take(MAX_COMMENT_CHARS).collect())
}

/// Whether `value` looks like an email address: `local@domain.tld` with no
/// whitespace.
pub fn is_email_shaped(value: &str) -> bool {
    let value = value.trim();
    if value.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    let mut labels = domain.split('.');
    let has_dot = domain.contains('.');
    has_dot && labels.all(|label| !label.is_empty())
}

/// Whether any whitespace-separated word of `text` is email-shaped.
pub fn contains_email_shaped(text: &str) -> bool {
    text.split_whitespace().any(|word| {
        let word = word.trim_matches(|c: char| {
            matches!(c, '<' | '>' | '(' | ')' | '[' | ']' | ',' | ';' | ':' | '"' | '\'' | '.')
        });
        is_email_shaped(word)
    })
}
