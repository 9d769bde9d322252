//! Error types for the content API client, the item store and the sync engine.

use crate::validator::CountReport;
use thiserror::Error;

/// Failure of a single Content API call.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Content API error ({status}): {body}")]
    Http { status: u16, body: String },

    #[error("Content API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode Content API response: {0}")]
    Decode(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl ApiError {
    /// Transport failures, rate limiting and server errors are worth retrying.
    /// Client errors (4xx) are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Http { status, .. } => *status == 429 || *status >= 500,
            ApiError::Transport(_) => true,
            ApiError::Decode(_) | ApiError::NotFound(_) => false,
        }
    }
}

/// Rejected mutation of the working item set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Unknown language: '{0}'")]
    UnknownLanguage(String),

    #[error("Item {index} does not exist for language '{language}' ({len} items)")]
    IndexOutOfRange {
        language: String,
        index: usize,
        len: usize,
    },

    #[error("At least one item must remain for language '{0}'")]
    LastItem(String),
}

/// Failure of a whole save or delete attempt.
///
/// Per-element failures are not represented here; they are collected in the
/// save and delete reports and the operation carries on.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Item counts differ between languages: {0}")]
    CountMismatch(CountReport),

    #[error("Invalid fields: {}", .0.join("; "))]
    InvalidFields(Vec<String>),

    #[error("Missing precondition: {0}")]
    Precondition(String),

    #[error("Failed to create subsection: {0}")]
    SubsectionCreate(#[source] ApiError),

    #[error("Failed to upsert translations: {0}")]
    TranslationUpsert(#[source] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl SyncError {
    /// Validation errors are raised before any network call is made.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SyncError::CountMismatch(_) | SyncError::InvalidFields(_) | SyncError::Store(_)
        )
    }
}
