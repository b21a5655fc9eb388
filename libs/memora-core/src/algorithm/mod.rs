//! Spaced repetition scheduling.
//!
//! Scheduling is split in two pure steps: an algorithm maps the prior memory
//! state and a rating to new numbers (interval, ease, due), then
//! [`next_status`] derives the lifecycle label from the prior label, the
//! rating and the new interval.

pub mod sm2;

use crate::types::{CardState, CardStatus, Rating};
use chrono::{DateTime, Utc};

/// Numeric result of scheduling a card after review.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulingResult {
    pub interval_days: u32,
    pub ease_factor: f64,
    pub next_due: DateTime<Utc>,
}

/// Trait for spaced repetition algorithms.
pub trait SpacedRepetitionAlgorithm: Send + Sync {
    /// Algorithm identifier.
    fn name(&self) -> &'static str;

    /// Calculate the next interval, ease and due time after a review.
    ///
    /// Must be deterministic: the same inputs always give the same result.
    fn schedule(&self, state: &CardState, rating: Rating, now: DateTime<Utc>) -> SchedulingResult;
}

/// Derive the lifecycle label a rating moves a card into.
///
/// `Again` always sends the card to relearning. Everything else lands in
/// review once it has a whole-day interval, except cards rated from `new`,
/// which enter learning.
///
/// One deliberate exception: `Easy` on a `new` card graduates it straight to
/// review with the four-day easy interval, instead of parking a card that
/// is already scheduled days out in learning.
pub fn next_status(prior: CardStatus, rating: Rating, interval_days: u32) -> CardStatus {
    match (rating, prior) {
        (Rating::Again, _) => CardStatus::Relearning,
        (Rating::Easy, CardStatus::New) => CardStatus::Review,
        (_, CardStatus::New) => CardStatus::Learning,
        _ if interval_days >= 1 => CardStatus::Review,
        _ => CardStatus::Learning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn again_always_relearns() {
        for prior in [
            CardStatus::New,
            CardStatus::Learning,
            CardStatus::Review,
            CardStatus::Relearning,
        ] {
            assert_eq!(next_status(prior, Rating::Again, 0), CardStatus::Relearning);
        }
    }

    #[test]
    fn new_card_enters_learning_unless_easy() {
        assert_eq!(next_status(CardStatus::New, Rating::Hard, 0), CardStatus::Learning);
        assert_eq!(next_status(CardStatus::New, Rating::Good, 1), CardStatus::Learning);
        assert_eq!(next_status(CardStatus::New, Rating::Easy, 4), CardStatus::Review);
    }

    #[test]
    fn graduation_requires_whole_day_interval() {
        assert_eq!(next_status(CardStatus::Learning, Rating::Good, 1), CardStatus::Review);
        assert_eq!(next_status(CardStatus::Learning, Rating::Hard, 0), CardStatus::Learning);
        assert_eq!(next_status(CardStatus::Relearning, Rating::Easy, 4), CardStatus::Review);
        assert_eq!(next_status(CardStatus::Relearning, Rating::Hard, 0), CardStatus::Learning);
        assert_eq!(next_status(CardStatus::Review, Rating::Hard, 1), CardStatus::Review);
    }
}
