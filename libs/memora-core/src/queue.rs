//! In-memory study queue for a single session.

use crate::types::{Card, Rating};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A card that was rated during the session, as it was after the rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub card: Card,
    pub rating: Rating,
}

/// What happened to the queue after the head card was rated.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    /// The queue still has cards; this is the new head.
    Next(Card),
    /// The last card was rated.
    Completed,
}

/// Ordered cards still to study plus the cards already rated.
#[derive(Debug, Clone, Default)]
pub struct StudyQueue {
    pending: VecDeque<Card>,
    history: Vec<HistoryEntry>,
}

impl StudyQueue {
    /// Concatenate due and new cards and shuffle them uniformly.
    pub fn assemble<R: Rng + ?Sized>(due: Vec<Card>, new: Vec<Card>, rng: &mut R) -> Self {
        let mut cards = due;
        cards.extend(new);
        cards.shuffle(rng);

        Self {
            pending: cards.into(),
            history: Vec::new(),
        }
    }

    /// Head of the queue.
    pub fn current(&self) -> Option<&Card> {
        self.pending.front()
    }

    /// Up to `n` cards after the current one.
    pub fn upcoming(&self, n: usize) -> Vec<&Card> {
        self.pending.iter().skip(1).take(n).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Most recently rated card.
    pub fn previous(&self) -> Option<&HistoryEntry> {
        self.history.last()
    }

    /// Drop the head without rating it, e.g. when the card no longer exists.
    pub fn skip_current(&mut self) -> Option<Card> {
        self.pending.pop_front()
    }

    /// Pop the head and record `updated` in the history.
    ///
    /// Returns `None` when there is nothing to advance past.
    pub fn advance(&mut self, updated: Card, rating: Rating) -> Option<Advance> {
        self.pending.pop_front()?;
        self.history.push(HistoryEntry {
            card: updated,
            rating,
        });

        Some(match self.pending.front() {
            Some(next) => Advance::Next(next.clone()),
            None => Advance::Completed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CardState, CardStatus};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn card(id: i64, status: CardStatus) -> Card {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Card {
            id,
            deck_id: 1,
            front: format!("front {id}"),
            back: format!("back {id}"),
            note: None,
            created_at: created,
            state: CardState {
                status,
                ..CardState::new(created)
            },
        }
    }

    fn ids(queue: &StudyQueue) -> Vec<i64> {
        queue.pending.iter().map(|c| c.id).collect()
    }

    #[test]
    fn assemble_keeps_every_card() {
        let mut rng = StdRng::seed_from_u64(7);
        let due = (1..=5).map(|id| card(id, CardStatus::Review)).collect();
        let new = (6..=9).map(|id| card(id, CardStatus::New)).collect();
        let queue = StudyQueue::assemble(due, new, &mut rng);

        let mut got = ids(&queue);
        got.sort();
        assert_eq!(got, (1..=9).collect::<Vec<_>>());
        assert!(queue.history().is_empty());
    }

    #[test]
    fn same_seed_gives_same_order() {
        let build = || {
            let mut rng = StdRng::seed_from_u64(42);
            let due = (1..=20).map(|id| card(id, CardStatus::Review)).collect();
            StudyQueue::assemble(due, Vec::new(), &mut rng)
        };
        assert_eq!(ids(&build()), ids(&build()));
    }

    #[test]
    fn empty_queue_has_no_current_card() {
        let mut queue = StudyQueue::default();
        assert!(queue.current().is_none());
        assert!(queue.is_empty());
        assert_eq!(queue.advance(card(1, CardStatus::New), Rating::Good), None);
        assert!(queue.history().is_empty());
    }

    #[test]
    fn advancing_drains_in_order_and_completes_once() {
        let mut rng = StdRng::seed_from_u64(1);
        let due = (1..=3).map(|id| card(id, CardStatus::Review)).collect();
        let mut queue = StudyQueue::assemble(due, Vec::new(), &mut rng);
        let order = ids(&queue);

        let mut completions = 0;
        let mut steps = 0;
        while let Some(head) = queue.current().cloned() {
            steps += 1;
            match queue.advance(head, Rating::Good) {
                Some(Advance::Completed) => completions += 1,
                Some(Advance::Next(next)) => assert_eq!(Some(&next), queue.current()),
                None => unreachable!("head was present"),
            }
        }

        assert_eq!(steps, 3);
        assert_eq!(completions, 1);
        let rated: Vec<i64> = queue.history().iter().map(|h| h.card.id).collect();
        assert_eq!(rated, order);
        assert_eq!(queue.previous().map(|h| h.card.id), order.last().copied());
    }

    #[test]
    fn skipping_leaves_no_history() {
        let mut rng = StdRng::seed_from_u64(5);
        let due = (1..=2).map(|id| card(id, CardStatus::Review)).collect();
        let mut queue = StudyQueue::assemble(due, Vec::new(), &mut rng);
        let order = ids(&queue);

        let skipped = queue.skip_current().map(|c| c.id);
        assert_eq!(skipped, Some(order[0]));
        assert_eq!(queue.current().map(|c| c.id), Some(order[1]));
        assert!(queue.history().is_empty());

        queue.skip_current();
        assert_eq!(queue.skip_current(), None);
    }

    #[test]
    fn upcoming_skips_the_current_card() {
        let mut rng = StdRng::seed_from_u64(3);
        let due = (1..=4).map(|id| card(id, CardStatus::Review)).collect();
        let queue = StudyQueue::assemble(due, Vec::new(), &mut rng);
        let order = ids(&queue);

        let upcoming: Vec<i64> = queue.upcoming(2).into_iter().map(|c| c.id).collect();
        assert_eq!(upcoming, order[1..3].to_vec());
        assert_eq!(queue.upcoming(10).len(), 3);
    }
}
