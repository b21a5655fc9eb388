//! Core spaced repetition library shared by the store and session crates.
//!
//! Provides:
//! - The SM-2 scheduler and lifecycle state derivation
//! - Pure rating application (new card state plus review log)
//! - The in-memory study queue with rating history
//! - The storage contract a study session runs against
//! - Shared types (Card, CardState, Rating, ReviewLog, settings)

pub mod algorithm;
pub mod error;
pub mod queue;
pub mod review;
pub mod store;
pub mod types;

pub use algorithm::{next_status, SchedulingResult, SpacedRepetitionAlgorithm};
pub use error::{CoreError, Result};
pub use queue::{Advance, HistoryEntry, StudyQueue};
pub use review::{review_card, ReviewOutcome};
pub use store::StudyStore;
pub use types::{
    Card, CardState, CardStatus, Deck, DeckSettings, DeckSummary, EffectiveSettings,
    GlobalSettings, NewCard, Rating, ReviewLog, DEFAULT_EASE, DEFAULT_NEW_CARD_CAP,
};
