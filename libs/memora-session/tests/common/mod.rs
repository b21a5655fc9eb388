//! Shared fixtures for session tests.
//!
//! Sessions run against a real in-memory SQLite store. [`FlakyStore`] wraps it
//! to make rating writes fail on demand.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};
use memora_core::algorithm::sm2::Sm2;
use memora_core::{review_card, Card, CardState, NewCard, Rating, ReviewLog, StudyStore};
use memora_session::{shared, SharedStore};
use memora_store::{CardRepository, DbError, DeckRepository, ReviewRepository, SqliteRepository};

static TRACING: Once = Once::new();

/// Route session logs to the test output, filtered by `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 11, 4, 18, 0, 0).unwrap()
}

/// A deck with `new` unseen cards and `due` review cards due yesterday.
pub struct Fixture {
    pub repo: SqliteRepository,
    pub deck_id: i64,
    pub new_ids: Vec<i64>,
    pub due_ids: Vec<i64>,
}

impl Fixture {
    pub fn new(new: usize, due: usize) -> Self {
        init_tracing();

        let repo = SqliteRepository::open_in_memory().unwrap();
        let created = now() - Duration::days(10);
        let deck = repo.create_deck("Capitals", None, created).unwrap();

        let cards: Vec<NewCard> = (0..new + due)
            .map(|i| NewCard::new(format!("country {i}"), format!("capital {i}")))
            .collect();
        let added = repo.add_cards(deck.id, &cards, created).unwrap();
        let (due_cards, new_cards) = added.split_at(due);

        // Easy five days ago: review state, four day interval, due yesterday
        for card in due_cards {
            review(&repo, card.id, Rating::Easy, now() - Duration::days(5));
        }

        Self {
            repo,
            deck_id: deck.id,
            new_ids: new_cards.iter().map(|c| c.id).collect(),
            due_ids: due_cards.iter().map(|c| c.id).collect(),
        }
    }

    pub fn shared(self) -> (SharedStore<SqliteRepository>, i64) {
        (shared(self.repo), self.deck_id)
    }
}

/// Rate a card directly against the repository.
pub fn review(repo: &SqliteRepository, card_id: i64, rating: Rating, at: DateTime<Utc>) {
    let card = CardRepository::get_card(repo, card_id).unwrap().unwrap();
    let outcome = review_card(&Sm2::default(), &card, rating, at, None);
    repo.apply_review(card_id, &outcome.state, &outcome.log).unwrap();
}

pub fn stored_card(repo: &SqliteRepository, card_id: i64) -> Card {
    CardRepository::get_card(repo, card_id).unwrap().unwrap()
}

/// Store whose rating writes fail while `fail_writes` is set, and take
/// `write_delay` to complete.
pub struct FlakyStore {
    pub inner: SqliteRepository,
    pub fail_writes: Arc<AtomicBool>,
    pub write_delay: StdDuration,
}

impl FlakyStore {
    pub fn new(inner: SqliteRepository) -> Self {
        Self {
            inner,
            fail_writes: Arc::new(AtomicBool::new(false)),
            write_delay: StdDuration::ZERO,
        }
    }

    pub fn with_write_delay(mut self, delay: StdDuration) -> Self {
        self.write_delay = delay;
        self
    }
}

impl StudyStore for FlakyStore {
    type Error = DbError;

    fn get_cards_due_or_new(
        &self,
        deck_id: i64,
        now: DateTime<Utc>,
        new_card_cap: usize,
    ) -> Result<Vec<Card>, DbError> {
        self.inner.get_cards_due_or_new(deck_id, now, new_card_cap)
    }

    fn apply_rating(&self, card_id: i64, state: &CardState, log: &ReviewLog) -> Result<i64, DbError> {
        std::thread::sleep(self.write_delay);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DbError::InvalidData("database is locked".to_string()));
        }
        self.inner.apply_rating(card_id, state, log)
    }

    fn get_card(&self, card_id: i64) -> Result<Option<Card>, DbError> {
        StudyStore::get_card(&self.inner, card_id)
    }

    fn new_card_cap(&self, deck_id: i64) -> Result<usize, DbError> {
        self.inner.new_card_cap(deck_id)
    }
}
