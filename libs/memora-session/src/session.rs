//! Study session: the queue of cards for one sitting, driven against a store.

use crate::error::{Result, SessionError};
use chrono::{DateTime, Utc};
use memora_core::algorithm::sm2::Sm2;
use memora_core::{
    review_card, Advance, Card, CardStatus, HistoryEntry, Rating, SpacedRepetitionAlgorithm,
    StudyQueue, StudyStore,
};
use rand::Rng;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

/// Store shared between sessions and the caller.
///
/// Store calls are blocking and run on tokio's blocking pool.
pub type SharedStore<S> = Arc<Mutex<S>>;

/// Wrap a store so sessions can share it.
pub fn shared<S>(store: S) -> SharedStore<S> {
    Arc::new(Mutex::new(store))
}

/// One study sitting over a single deck.
///
/// Ratings are serialized per session: the queue lock is held from the check
/// of the current card until the store write has either advanced the queue
/// or failed, so a second rating always sees the outcome of the first.
pub struct StudySession<S> {
    store: SharedStore<S>,
    algorithm: Arc<dyn SpacedRepetitionAlgorithm>,
    deck_id: i64,
    queue: Arc<AsyncMutex<StudyQueue>>,
}

impl<S> StudySession<S>
where
    S: StudyStore + Send + 'static,
{
    /// Start a session with the SM-2 scheduler and a thread-local shuffle.
    pub async fn start(store: SharedStore<S>, deck_id: i64, now: DateTime<Utc>) -> Result<Self> {
        let (due, new) = load_candidates(&store, deck_id, now).await?;
        let queue = StudyQueue::assemble(due, new, &mut rand::thread_rng());
        Ok(Self::from_queue(store, Arc::new(Sm2::default()), deck_id, queue))
    }

    /// Start a session with an explicit scheduler and shuffle source.
    pub async fn start_with<R>(
        store: SharedStore<S>,
        algorithm: Arc<dyn SpacedRepetitionAlgorithm>,
        deck_id: i64,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        let (due, new) = load_candidates(&store, deck_id, now).await?;
        let queue = StudyQueue::assemble(due, new, rng);
        Ok(Self::from_queue(store, algorithm, deck_id, queue))
    }

    fn from_queue(
        store: SharedStore<S>,
        algorithm: Arc<dyn SpacedRepetitionAlgorithm>,
        deck_id: i64,
        queue: StudyQueue,
    ) -> Self {
        info!(
            deck_id,
            cards = queue.len(),
            algorithm = algorithm.name(),
            "study session started"
        );
        Self {
            store,
            algorithm,
            deck_id,
            queue: Arc::new(AsyncMutex::new(queue)),
        }
    }

    pub fn deck_id(&self) -> i64 {
        self.deck_id
    }

    pub fn store(&self) -> SharedStore<S> {
        Arc::clone(&self.store)
    }

    /// The card to show now, or `None` once the session is complete.
    pub async fn current_card(&self) -> Option<Card> {
        self.queue.lock().await.current().cloned()
    }

    /// Cards left, the current one included.
    pub async fn remaining(&self) -> usize {
        self.queue.lock().await.len()
    }

    pub async fn is_complete(&self) -> bool {
        self.queue.lock().await.is_empty()
    }

    /// Up to `n` cards queued after the current one.
    pub async fn upcoming(&self, n: usize) -> Vec<Card> {
        self.queue
            .lock()
            .await
            .upcoming(n)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Cards rated so far, oldest first, as they were after their rating.
    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.queue.lock().await.history().to_vec()
    }

    /// The most recently rated card.
    pub async fn previous(&self) -> Option<HistoryEntry> {
        self.queue.lock().await.previous().cloned()
    }

    /// Rate the current card and advance the queue.
    ///
    /// `card_id` must be the current card. The new card state and its review
    /// log are written in one store call; if that fails the queue does not
    /// move and the same rating can be submitted again. A card deleted from
    /// the store since the session started is dropped from the queue instead.
    ///
    /// The write and the queue update run on their own task, so dropping the
    /// returned future (a timeout, a caller navigating away) does not leave
    /// the queue behind the store: the rating still lands exactly once.
    pub async fn rate(
        &self,
        card_id: i64,
        rating: Rating,
        now: DateTime<Utc>,
        time_taken_ms: Option<i64>,
    ) -> Result<Advance> {
        let mut queue = Arc::clone(&self.queue).lock_owned().await;

        let card = queue.current().cloned().ok_or(SessionError::NoCurrentCard)?;
        if card.id != card_id {
            return Err(SessionError::CardMismatch {
                expected: card.id,
                got: card_id,
            });
        }

        let outcome = review_card(self.algorithm.as_ref(), &card, rating, now, time_taken_ms);
        let store = Arc::clone(&self.store);
        let deck_id = self.deck_id;

        tokio::spawn(async move {
            let (state, log) = (outcome.state.clone(), outcome.log);
            let persisted =
                run_blocking(&store, move |store| store.apply_rating(card_id, &state, &log)).await;

            let log_id = match persisted {
                Ok(log_id) => log_id,
                Err(error) => {
                    if card_is_gone(&store, card_id).await {
                        queue.skip_current();
                        warn!(deck_id, card_id, "card deleted during session, skipped");
                        return Err(SessionError::CardMissing(card_id));
                    }
                    warn!(deck_id, card_id, %error, "rating not applied");
                    return Err(error);
                }
            };

            let mut card = card;
            card.state = outcome.state;
            debug!(
                card_id,
                log_id,
                rating = rating.to_value(),
                status = card.state.status.as_str(),
                interval_days = card.state.interval_days,
                "rating applied"
            );

            let advance = queue.advance(card, rating).ok_or(SessionError::NoCurrentCard)?;
            if advance == Advance::Completed {
                info!(deck_id, rated = queue.history().len(), "study session complete");
            }

            Ok(advance)
        })
        .await?
    }

    /// [`StudySession::rate`] with a raw 1-4 rating value.
    pub async fn rate_value(
        &self,
        card_id: i64,
        value: u8,
        now: DateTime<Utc>,
        time_taken_ms: Option<i64>,
    ) -> Result<Advance> {
        let rating = Rating::try_from(value)?;
        self.rate(card_id, rating, now, time_taken_ms).await
    }
}

/// Due cards and new cards for the deck, as two lists.
async fn load_candidates<S>(
    store: &SharedStore<S>,
    deck_id: i64,
    now: DateTime<Utc>,
) -> Result<(Vec<Card>, Vec<Card>)>
where
    S: StudyStore + Send + 'static,
{
    let cards = run_blocking(store, move |store| {
        let cap = store.new_card_cap(deck_id)?;
        store.get_cards_due_or_new(deck_id, now, cap)
    })
    .await?;

    let (new, due): (Vec<Card>, Vec<Card>) = cards
        .into_iter()
        .partition(|card| card.state.status == CardStatus::New);
    debug!(deck_id, due = due.len(), new = new.len(), "loaded session candidates");

    Ok((due, new))
}

/// Whether the store positively reports the card as gone.
async fn card_is_gone<S>(store: &SharedStore<S>, card_id: i64) -> bool
where
    S: StudyStore + Send + 'static,
{
    matches!(
        run_blocking(store, move |store| store.get_card(card_id)).await,
        Ok(None)
    )
}

async fn run_blocking<S, T, F>(store: &SharedStore<S>, f: F) -> Result<T>
where
    S: StudyStore + Send + 'static,
    T: Send + 'static,
    F: FnOnce(&S) -> std::result::Result<T, S::Error> + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || {
        let guard = store.lock().map_err(|_| SessionError::StorePoisoned)?;
        f(&guard).map_err(|e| SessionError::Persistence(Box::new(e)))
    })
    .await?
}
