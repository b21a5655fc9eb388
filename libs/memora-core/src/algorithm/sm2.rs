//! SM-2 spaced repetition algorithm.
//!
//! Short-term cards (`new`, `learning`, `relearning`) move through fixed
//! steps and never touch the ease factor. Cards in `review` grow their
//! interval multiplicatively by the ease factor.

use super::{SchedulingResult, SpacedRepetitionAlgorithm};
use crate::types::{CardState, Rating};
use chrono::{DateTime, Duration, Utc};

/// SM-2 algorithm with configurable parameters.
#[derive(Debug, Clone)]
pub struct Sm2 {
    pub minimum_ease: f64,
    pub lapse_ease_penalty: f64,
    pub hard_ease_penalty: f64,
    pub easy_ease_bonus: f64,
    pub hard_multiplier: f64,
    pub easy_bonus: f64,
    pub again_step: Duration,
    pub hard_step: Duration,
    pub graduating_interval: u32,
    pub easy_interval: u32,
    pub maximum_interval: u32,
}

impl Default for Sm2 {
    fn default() -> Self {
        Self {
            minimum_ease: 1.3,
            lapse_ease_penalty: 0.2,
            hard_ease_penalty: 0.15,
            easy_ease_bonus: 0.15,
            hard_multiplier: 1.2,
            easy_bonus: 1.3,
            again_step: Duration::minutes(1),
            hard_step: Duration::minutes(5),
            graduating_interval: 1,
            easy_interval: 4,
            maximum_interval: 36500,
        }
    }
}

impl SpacedRepetitionAlgorithm for Sm2 {
    fn name(&self) -> &'static str {
        "sm2"
    }

    fn schedule(&self, state: &CardState, rating: Rating, now: DateTime<Utc>) -> SchedulingResult {
        if state.status.is_short_term() {
            self.schedule_learning(state, rating, now)
        } else {
            self.schedule_review(state, rating, now)
        }
    }
}

impl Sm2 {
    fn schedule_learning(&self, state: &CardState, rating: Rating, now: DateTime<Utc>) -> SchedulingResult {
        let (interval_days, next_due) = match rating {
            Rating::Again => (0, now + self.again_step),
            Rating::Hard => (0, now + self.hard_step),
            Rating::Good => (
                self.graduating_interval,
                now + Duration::days(self.graduating_interval as i64),
            ),
            Rating::Easy => (
                self.easy_interval,
                now + Duration::days(self.easy_interval as i64),
            ),
        };

        SchedulingResult {
            interval_days,
            ease_factor: state.ease_factor,
            next_due,
        }
    }

    fn schedule_review(&self, state: &CardState, rating: Rating, now: DateTime<Utc>) -> SchedulingResult {
        let interval = state.interval_days as f64;
        let ease = state.ease_factor;

        let (raw_interval, new_ease) = match rating {
            Rating::Again => {
                // Lapse: back to a one-minute relearning step
                return SchedulingResult {
                    interval_days: 0,
                    ease_factor: (ease - self.lapse_ease_penalty).max(self.minimum_ease),
                    next_due: now + self.again_step,
                };
            }
            Rating::Hard => (
                interval * self.hard_multiplier,
                (ease - self.hard_ease_penalty).max(self.minimum_ease),
            ),
            Rating::Good => (interval * ease, ease),
            Rating::Easy => (interval * ease * self.easy_bonus, ease + self.easy_ease_bonus),
        };

        let interval_days = raw_interval
            .max(1.0)
            .round()
            .min(self.maximum_interval as f64) as u32;

        SchedulingResult {
            interval_days,
            ease_factor: new_ease,
            next_due: now + Duration::days(interval_days as i64),
        }
    }
}
