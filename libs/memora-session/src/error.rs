//! Error types for study sessions.

use memora_core::CoreError;
use thiserror::Error;

/// Boxed error coming back from the store.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Session errors. None of them end the session: the queue is left as it was.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    InvalidRating(#[from] CoreError),

    #[error("no card to rate: the session is complete")]
    NoCurrentCard,

    #[error("card {got} is not the current card (expected {expected})")]
    CardMismatch { expected: i64, got: i64 },

    #[error("card {0} no longer exists and was dropped from the session")]
    CardMissing(i64),

    #[error("persistence failed: {0}")]
    Persistence(#[source] StoreError),

    #[error("store lock poisoned by a panicked writer")]
    StorePoisoned,

    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl SessionError {
    /// Whether retrying the same rating may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::Persistence(_) | SessionError::Task(_))
    }
}

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
