//! Error types for memora-core.

use thiserror::Error;

/// Result type alias using CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by the pure scheduling domain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid rating {0}: expected a value from 1 to 4")]
    InvalidRating(u8),
}
