//! Asynchronous study sessions.
//!
//! A [`StudySession`] assembles the cards due in a deck plus a capped number
//! of new cards, presents them one at a time and applies each rating through
//! the scheduler and the store before moving on.

pub mod error;
pub mod session;

pub use error::{Result, SessionError, StoreError};
pub use memora_core::{Advance, HistoryEntry};
pub use session::{shared, SharedStore, StudySession};
