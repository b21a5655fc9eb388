//! Contract the study session needs from persistent storage.

use crate::types::{Card, CardState, ReviewLog, DEFAULT_NEW_CARD_CAP};
use chrono::{DateTime, Utc};

/// Persistent store of cards and review logs.
pub trait StudyStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// All non-new cards of the deck with `due <= now`, followed by at most
    /// `new_card_cap` cards still in the `new` state.
    fn get_cards_due_or_new(
        &self,
        deck_id: i64,
        now: DateTime<Utc>,
        new_card_cap: usize,
    ) -> Result<Vec<Card>, Self::Error>;

    /// Write the card's new state and append the log entry atomically.
    ///
    /// Either both records are written or neither is. Returns the id
    /// assigned to the log entry.
    fn apply_rating(&self, card_id: i64, state: &CardState, log: &ReviewLog) -> Result<i64, Self::Error>;

    fn get_card(&self, card_id: i64) -> Result<Option<Card>, Self::Error>;

    /// How many new cards a session on this deck may admit.
    fn new_card_cap(&self, _deck_id: i64) -> Result<usize, Self::Error> {
        Ok(DEFAULT_NEW_CARD_CAP)
    }
}
