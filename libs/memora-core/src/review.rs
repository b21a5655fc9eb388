//! Applying a rating to a card.

use crate::algorithm::{next_status, SpacedRepetitionAlgorithm};
use crate::types::{Card, CardState, CardStatus, Rating, ReviewLog};
use chrono::{DateTime, Utc};

/// Everything a single rating changes, ready to be persisted together.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewOutcome {
    pub state: CardState,
    pub log: ReviewLog,
}

/// Schedule `card` for `rating` and compute the updated state and its log entry.
///
/// Pure: nothing is written anywhere. `log.id` is 0 until the store assigns one.
pub fn review_card(
    algorithm: &dyn SpacedRepetitionAlgorithm,
    card: &Card,
    rating: Rating,
    now: DateTime<Utc>,
    time_taken_ms: Option<i64>,
) -> ReviewOutcome {
    let prior = &card.state;
    let result = algorithm.schedule(prior, rating, now);
    let status = next_status(prior.status, rating, result.interval_days);

    let lapsed = rating == Rating::Again && prior.status == CardStatus::Review;

    let state = CardState {
        status,
        due: result.next_due,
        interval_days: result.interval_days,
        ease_factor: result.ease_factor,
        reps: prior.reps + 1,
        lapses: if lapsed { prior.lapses + 1 } else { prior.lapses },
        last_review: Some(now),
    };

    let log = ReviewLog {
        id: 0,
        card_id: card.id,
        rating,
        status: prior.status,
        due: state.due,
        interval_days: state.interval_days,
        ease_factor: state.ease_factor,
        time_taken_ms,
        reviewed_at: now,
    };

    ReviewOutcome { state, log }
}
