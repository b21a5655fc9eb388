//! Repository pattern for database access.

use crate::config::StoreConfig;
use crate::date_utils::{get_adjusted_today, study_day_bounds};
use crate::error::DbError;
use chrono::{DateTime, TimeZone, Utc};
use memora_core::types::{
    Card, CardState, CardStatus, Deck, DeckSettings, DeckSummary, EffectiveSettings,
    GlobalSettings, NewCard, Rating, ReviewLog,
};
use memora_core::StudyStore;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::{debug, info};

type Result<T> = std::result::Result<T, DbError>;

const CARD_COLUMNS: &str = "id, deck_id, front, back, note, created_at, status, due, \
    interval_days, ease_factor, reps, lapses, last_review";

const LOG_COLUMNS: &str =
    "id, card_id, rating, status, due, interval_days, ease_factor, time_taken_ms, reviewed_at";

/// Repository for deck operations.
pub trait DeckRepository {
    fn create_deck(&self, name: &str, description: Option<&str>, now: DateTime<Utc>) -> Result<Deck>;
    fn get_deck(&self, id: i64) -> Result<Option<Deck>>;
    fn list_decks(&self, now: DateTime<Utc>) -> Result<Vec<DeckSummary>>;
    /// Remove the deck together with its cards, their review logs and its settings.
    fn delete_deck(&self, id: i64) -> Result<()>;
}

/// Repository for card operations.
pub trait CardRepository {
    fn add_card(&self, deck_id: i64, card: &NewCard, now: DateTime<Utc>) -> Result<Card>;
    fn add_cards(&self, deck_id: i64, cards: &[NewCard], now: DateTime<Utc>) -> Result<Vec<Card>>;
    fn get_card(&self, id: i64) -> Result<Option<Card>>;
    fn get_cards_by_deck(&self, deck_id: i64) -> Result<Vec<Card>>;
    /// Replace front, back and note. Scheduling fields are untouched.
    fn update_card_content(&self, id: i64, content: &NewCard) -> Result<Card>;
    fn delete_card(&self, id: i64) -> Result<()>;
    fn get_new_cards(&self, deck_id: i64, limit: usize) -> Result<Vec<Card>>;
    fn get_due_cards(&self, deck_id: i64, now: DateTime<Utc>) -> Result<Vec<Card>>;
}

/// Repository for rating history.
pub trait ReviewRepository {
    /// Update the card and insert the log in one transaction.
    fn apply_review(&self, card_id: i64, state: &CardState, log: &ReviewLog) -> Result<i64>;
    fn get_review_logs(&self, card_id: i64) -> Result<Vec<ReviewLog>>;
}

/// Repository for settings operations.
pub trait SettingsRepository {
    fn get_global_settings(&self) -> Result<GlobalSettings>;
    fn save_global_settings(&self, settings: &GlobalSettings) -> Result<()>;
    fn get_deck_settings(&self, deck_id: i64) -> Result<Option<DeckSettings>>;
    fn save_deck_settings(&self, settings: &DeckSettings) -> Result<()>;
    fn delete_deck_settings(&self, deck_id: i64) -> Result<()>;
    fn get_effective_settings(&self, deck_id: Option<i64>) -> Result<EffectiveSettings>;
}

/// Deck statistics.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DeckStats {
    pub total_cards: usize,
    pub new_cards: usize,
    pub learning_cards: usize,
    pub relearning_cards: usize,
    pub review_cards: usize,
    /// 0 when there are no cards.
    pub average_ease: f64,
    pub average_interval: f64,
}

/// Overall study statistics.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StudyStats {
    pub reviews_today: usize,
    pub new_today: usize,
    pub streak_days: usize,
    pub retention_rate: f64,
    pub total_reviews: usize,
}

/// Repository for statistics operations.
pub trait StatsRepository {
    /// Stats for one deck, or for every card when `deck_id` is `None`.
    fn get_deck_stats(&self, deck_id: Option<i64>) -> Result<DeckStats>;
    fn get_study_stats<Tz: TimeZone>(&self, now: &DateTime<Tz>, daily_reset_hour: u32) -> Result<StudyStats>;
}

/// SQLite implementation of repositories.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Open database at path, creating if necessary.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let repo = Self { conn };
        repo.initialize()?;
        Ok(repo)
    }

    /// Open the database described by `config`, creating its directory.
    pub fn open_with_config(config: &StoreConfig) -> Result<Self> {
        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        info!(path = %config.db_path.display(), "opening study database");
        Self::open(&config.db_path)
    }

    /// Open in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let repo = Self { conn };
        repo.initialize()?;
        Ok(repo)
    }

    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(crate::schema::SCHEMA)?;
        self.conn.execute_batch(crate::schema::INIT_GLOBAL_SETTINGS)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
            params![crate::schema::SCHEMA_VERSION],
        )?;
        Ok(())
    }

    fn require_deck(&self, deck_id: i64) -> Result<()> {
        match self.get_deck(deck_id)? {
            Some(_) => Ok(()),
            None => Err(DbError::DeckNotFound(deck_id)),
        }
    }

    fn count_reviews_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<usize> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM review_logs WHERE reviewed_at >= ?1 AND reviewed_at < ?2",
                params![start.timestamp_millis(), end.timestamp_millis()],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }
}

fn validate_content(card: &NewCard) -> Result<()> {
    if card.front.trim().is_empty() || card.back.trim().is_empty() {
        return Err(DbError::InvalidData(
            "card front and back must not be blank".to_string(),
        ));
    }
    Ok(())
}

fn insert_card(conn: &Connection, deck_id: i64, card: &NewCard, now: DateTime<Utc>) -> Result<Card> {
    let state = CardState::new(now);
    conn.execute(
        "INSERT INTO cards (deck_id, front, back, note, created_at, status, due, interval_days, ease_factor, reps, lapses)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            deck_id,
            card.front,
            card.back,
            card.note,
            now.timestamp_millis(),
            state.status.as_str(),
            state.due.timestamp_millis(),
            state.interval_days,
            state.ease_factor,
            state.reps,
            state.lapses,
        ],
    )?;

    Ok(Card {
        id: conn.last_insert_rowid(),
        deck_id,
        front: card.front.clone(),
        back: card.back.clone(),
        note: card.note.clone(),
        created_at: now,
        state,
    })
}

fn millis_to_datetime(idx: usize, millis: i64) -> rusqlite::Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, millis))
}

fn timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    millis_to_datetime(idx, row.get(idx)?)
}

fn status_column(row: &Row, idx: usize) -> rusqlite::Result<CardStatus> {
    let label: String = row.get(idx)?;
    CardStatus::from_str(&label).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unknown card status: {label}").into(),
        )
    })
}

fn rating_column(row: &Row, idx: usize) -> rusqlite::Result<Rating> {
    let value: u8 = row.get(idx)?;
    Rating::try_from(value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

impl SqliteRepository {
    fn row_to_card(row: &Row) -> rusqlite::Result<Card> {
        Ok(Card {
            id: row.get(0)?,
            deck_id: row.get(1)?,
            front: row.get(2)?,
            back: row.get(3)?,
            note: row.get(4)?,
            created_at: timestamp_column(row, 5)?,
            state: CardState {
                status: status_column(row, 6)?,
                due: timestamp_column(row, 7)?,
                interval_days: row.get(8)?,
                ease_factor: row.get(9)?,
                reps: row.get(10)?,
                lapses: row.get(11)?,
                last_review: row
                    .get::<_, Option<i64>>(12)?
                    .map(|ms| millis_to_datetime(12, ms))
                    .transpose()?,
            },
        })
    }

    fn row_to_deck(row: &Row) -> rusqlite::Result<Deck> {
        Ok(Deck {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            created_at: timestamp_column(row, 3)?,
        })
    }

    fn row_to_log(row: &Row) -> rusqlite::Result<ReviewLog> {
        Ok(ReviewLog {
            id: row.get(0)?,
            card_id: row.get(1)?,
            rating: rating_column(row, 2)?,
            status: status_column(row, 3)?,
            due: timestamp_column(row, 4)?,
            interval_days: row.get(5)?,
            ease_factor: row.get(6)?,
            time_taken_ms: row.get(7)?,
            reviewed_at: timestamp_column(row, 8)?,
        })
    }
}

impl DeckRepository for SqliteRepository {
    fn create_deck(&self, name: &str, description: Option<&str>, now: DateTime<Utc>) -> Result<Deck> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DbError::InvalidData("deck name must not be blank".to_string()));
        }
        let description = description.map(str::trim).filter(|d| !d.is_empty());

        self.conn.execute(
            "INSERT INTO decks (name, description, created_at) VALUES (?1, ?2, ?3)",
            params![name, description, now.timestamp_millis()],
        )?;

        Ok(Deck {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at: now,
        })
    }

    fn get_deck(&self, id: i64) -> Result<Option<Deck>> {
        self.conn
            .query_row(
                "SELECT id, name, description, created_at FROM decks WHERE id = ?1",
                params![id],
                Self::row_to_deck,
            )
            .optional()
            .map_err(Into::into)
    }

    fn list_decks(&self, now: DateTime<Utc>) -> Result<Vec<DeckSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT d.id, d.name, d.description, d.created_at,
                COUNT(c.id) as total,
                COALESCE(SUM(CASE WHEN c.status = 'new' THEN 1 ELSE 0 END), 0) as new_count,
                COALESCE(SUM(CASE WHEN c.status != 'new' AND c.due <= ?1 THEN 1 ELSE 0 END), 0) as due_count
            FROM decks d
            LEFT JOIN cards c ON c.deck_id = d.id
            GROUP BY d.id
            ORDER BY d.created_at, d.id",
        )?;

        let decks = stmt
            .query_map(params![now.timestamp_millis()], |row| {
                Ok(DeckSummary {
                    deck: Self::row_to_deck(row)?,
                    card_count: row.get(4)?,
                    new_count: row.get(5)?,
                    due_count: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(decks)
    }

    fn delete_deck(&self, id: i64) -> Result<()> {
        self.require_deck(id)?;

        let tx = self.conn.unchecked_transaction()?;
        let logs = tx.execute(
            "DELETE FROM review_logs WHERE card_id IN (SELECT id FROM cards WHERE deck_id = ?1)",
            params![id],
        )?;
        let cards = tx.execute("DELETE FROM cards WHERE deck_id = ?1", params![id])?;
        tx.execute("DELETE FROM deck_settings WHERE deck_id = ?1", params![id])?;
        tx.execute("DELETE FROM decks WHERE id = ?1", params![id])?;
        tx.commit()?;

        info!(deck_id = id, cards, logs, "deleted deck");
        Ok(())
    }
}

impl CardRepository for SqliteRepository {
    fn add_card(&self, deck_id: i64, card: &NewCard, now: DateTime<Utc>) -> Result<Card> {
        validate_content(card)?;
        self.require_deck(deck_id)?;
        insert_card(&self.conn, deck_id, card, now)
    }

    fn add_cards(&self, deck_id: i64, cards: &[NewCard], now: DateTime<Utc>) -> Result<Vec<Card>> {
        for card in cards {
            validate_content(card)?;
        }
        self.require_deck(deck_id)?;

        let tx = self.conn.unchecked_transaction()?;
        let mut added = Vec::with_capacity(cards.len());
        for card in cards {
            added.push(insert_card(&tx, deck_id, card, now)?);
        }
        tx.commit()?;

        debug!(deck_id, count = added.len(), "added cards");
        Ok(added)
    }

    fn get_card(&self, id: i64) -> Result<Option<Card>> {
        self.conn
            .query_row(
                &format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = ?1"),
                params![id],
                Self::row_to_card,
            )
            .optional()
            .map_err(Into::into)
    }

    fn get_cards_by_deck(&self, deck_id: i64) -> Result<Vec<Card>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {CARD_COLUMNS} FROM cards WHERE deck_id = ?1 ORDER BY id"))?;

        let cards = stmt
            .query_map(params![deck_id], Self::row_to_card)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(cards)
    }

    fn update_card_content(&self, id: i64, content: &NewCard) -> Result<Card> {
        validate_content(content)?;

        let updated = self.conn.execute(
            "UPDATE cards SET front = ?1, back = ?2, note = ?3 WHERE id = ?4",
            params![content.front, content.back, content.note, id],
        )?;
        if updated == 0 {
            return Err(DbError::CardNotFound(id));
        }

        CardRepository::get_card(self, id)?.ok_or(DbError::CardNotFound(id))
    }

    fn delete_card(&self, id: i64) -> Result<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM cards WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(DbError::CardNotFound(id));
        }
        Ok(())
    }

    fn get_new_cards(&self, deck_id: i64, limit: usize) -> Result<Vec<Card>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CARD_COLUMNS} FROM cards
             WHERE deck_id = ?1 AND status = 'new'
             ORDER BY id
             LIMIT ?2"
        ))?;

        let cards = stmt
            .query_map(params![deck_id, limit as i64], Self::row_to_card)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(cards)
    }

    fn get_due_cards(&self, deck_id: i64, now: DateTime<Utc>) -> Result<Vec<Card>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CARD_COLUMNS} FROM cards
             WHERE deck_id = ?1 AND status != 'new' AND due <= ?2
             ORDER BY due"
        ))?;

        let cards = stmt
            .query_map(params![deck_id, now.timestamp_millis()], Self::row_to_card)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(cards)
    }
}

impl ReviewRepository for SqliteRepository {
    fn apply_review(&self, card_id: i64, state: &CardState, log: &ReviewLog) -> Result<i64> {
        if log.card_id != card_id {
            return Err(DbError::InvalidData(format!(
                "review log for card {} applied to card {card_id}",
                log.card_id
            )));
        }

        let tx = self.conn.unchecked_transaction()?;
        let updated = tx.execute(
            "UPDATE cards SET status = ?1, due = ?2, interval_days = ?3, ease_factor = ?4,
                reps = ?5, lapses = ?6, last_review = ?7
             WHERE id = ?8",
            params![
                state.status.as_str(),
                state.due.timestamp_millis(),
                state.interval_days,
                state.ease_factor,
                state.reps,
                state.lapses,
                state.last_review.map(|t| t.timestamp_millis()),
                card_id,
            ],
        )?;
        if updated == 0 {
            // Dropping the transaction rolls it back
            return Err(DbError::CardNotFound(card_id));
        }

        tx.execute(
            "INSERT INTO review_logs (card_id, rating, status, due, interval_days, ease_factor, time_taken_ms, reviewed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                card_id,
                log.rating.to_value(),
                log.status.as_str(),
                log.due.timestamp_millis(),
                log.interval_days,
                log.ease_factor,
                log.time_taken_ms,
                log.reviewed_at.timestamp_millis(),
            ],
        )?;
        let log_id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(log_id)
    }

    fn get_review_logs(&self, card_id: i64) -> Result<Vec<ReviewLog>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LOG_COLUMNS} FROM review_logs WHERE card_id = ?1 ORDER BY reviewed_at, id"
        ))?;

        let logs = stmt
            .query_map(params![card_id], Self::row_to_log)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(logs)
    }
}

impl SettingsRepository for SqliteRepository {
    fn get_global_settings(&self) -> Result<GlobalSettings> {
        self.conn
            .query_row(
                "SELECT new_cards_per_session, daily_reset_hour FROM global_settings WHERE id = 1",
                [],
                |row| {
                    Ok(GlobalSettings {
                        new_cards_per_session: row.get(0)?,
                        daily_reset_hour: row.get(1)?,
                    })
                },
            )
            .map_err(Into::into)
    }

    fn save_global_settings(&self, settings: &GlobalSettings) -> Result<()> {
        if settings.daily_reset_hour > 23 {
            return Err(DbError::InvalidData(format!(
                "daily reset hour must be 0-23, got {}",
                settings.daily_reset_hour
            )));
        }

        self.conn.execute(
            "UPDATE global_settings SET new_cards_per_session = ?1, daily_reset_hour = ?2 WHERE id = 1",
            params![settings.new_cards_per_session, settings.daily_reset_hour],
        )?;

        Ok(())
    }

    fn get_deck_settings(&self, deck_id: i64) -> Result<Option<DeckSettings>> {
        self.conn
            .query_row(
                "SELECT deck_id, new_cards_per_session FROM deck_settings WHERE deck_id = ?1",
                params![deck_id],
                |row| {
                    Ok(DeckSettings {
                        deck_id: row.get(0)?,
                        new_cards_per_session: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    fn save_deck_settings(&self, settings: &DeckSettings) -> Result<()> {
        self.require_deck(settings.deck_id)?;

        self.conn.execute(
            "INSERT OR REPLACE INTO deck_settings (deck_id, new_cards_per_session) VALUES (?1, ?2)",
            params![settings.deck_id, settings.new_cards_per_session],
        )?;

        Ok(())
    }

    fn delete_deck_settings(&self, deck_id: i64) -> Result<()> {
        self.conn.execute(
            "DELETE FROM deck_settings WHERE deck_id = ?1",
            params![deck_id],
        )?;
        Ok(())
    }

    fn get_effective_settings(&self, deck_id: Option<i64>) -> Result<EffectiveSettings> {
        let global = self.get_global_settings()?;
        let deck = match deck_id {
            Some(id) => self.get_deck_settings(id)?,
            None => None,
        };
        Ok(EffectiveSettings::merge(&global, deck.as_ref()))
    }
}

impl StatsRepository for SqliteRepository {
    fn get_deck_stats(&self, deck_id: Option<i64>) -> Result<DeckStats> {
        self.conn
            .query_row(
                "SELECT
                    COUNT(*) as total,
                    COALESCE(SUM(CASE WHEN status = 'new' THEN 1 ELSE 0 END), 0) as new_count,
                    COALESCE(SUM(CASE WHEN status = 'learning' THEN 1 ELSE 0 END), 0) as learning_count,
                    COALESCE(SUM(CASE WHEN status = 'relearning' THEN 1 ELSE 0 END), 0) as relearning_count,
                    COALESCE(SUM(CASE WHEN status = 'review' THEN 1 ELSE 0 END), 0) as review_count,
                    COALESCE(AVG(ease_factor), 0.0) as avg_ease,
                    COALESCE(AVG(CASE WHEN interval_days > 0 THEN interval_days END), 0.0) as avg_interval
                FROM cards
                WHERE ?1 IS NULL OR deck_id = ?1",
                params![deck_id],
                |row| {
                    Ok(DeckStats {
                        total_cards: row.get(0)?,
                        new_cards: row.get(1)?,
                        learning_cards: row.get(2)?,
                        relearning_cards: row.get(3)?,
                        review_cards: row.get(4)?,
                        average_ease: row.get(5)?,
                        average_interval: row.get(6)?,
                    })
                },
            )
            .map_err(Into::into)
    }

    fn get_study_stats<Tz: TimeZone>(&self, now: &DateTime<Tz>, daily_reset_hour: u32) -> Result<StudyStats> {
        let tz = now.timezone();
        let today = get_adjusted_today(now, daily_reset_hour);
        let (start, end) = study_day_bounds(&tz, today, daily_reset_hour);

        let reviews_today = self.count_reviews_between(start, end)?;

        // Cards seen for the first time today
        let new_today: usize = self.conn.query_row(
            "SELECT COUNT(DISTINCT card_id) FROM review_logs
             WHERE status = 'new' AND reviewed_at >= ?1 AND reviewed_at < ?2",
            params![start.timestamp_millis(), end.timestamp_millis()],
            |row| row.get(0),
        )?;

        let total_reviews: usize =
            self.conn
                .query_row("SELECT COUNT(*) FROM review_logs", [], |row| row.get(0))?;

        // Consecutive study days ending today (or yesterday if today is still empty)
        let mut streak_days = 0usize;
        let mut current = today;
        loop {
            let (start, end) = study_day_bounds(&tz, current, daily_reset_hour);
            if self.count_reviews_between(start, end)? > 0 {
                streak_days += 1;
            } else if !(streak_days == 0 && current == today) {
                break;
            }

            match current.pred_opt() {
                Some(previous) => current = previous,
                None => break,
            }

            // Safety limit
            if streak_days > 365 {
                break;
            }
        }

        let retention_rate: f64 = self.conn.query_row(
            "SELECT COALESCE(
                CAST(SUM(CASE WHEN rating >= 3 THEN 1 ELSE 0 END) AS REAL) /
                NULLIF(COUNT(*), 0),
                0.0
            ) FROM review_logs",
            [],
            |row| row.get(0),
        )?;

        Ok(StudyStats {
            reviews_today,
            new_today,
            streak_days,
            retention_rate,
            total_reviews,
        })
    }
}

impl StudyStore for SqliteRepository {
    type Error = DbError;

    fn get_cards_due_or_new(
        &self,
        deck_id: i64,
        now: DateTime<Utc>,
        new_card_cap: usize,
    ) -> Result<Vec<Card>> {
        let mut cards = self.get_due_cards(deck_id, now)?;
        let due = cards.len();
        cards.extend(self.get_new_cards(deck_id, new_card_cap)?);
        debug!(deck_id, due, new = cards.len() - due, "loaded study candidates");
        Ok(cards)
    }

    fn apply_rating(&self, card_id: i64, state: &CardState, log: &ReviewLog) -> Result<i64> {
        self.apply_review(card_id, state, log)
    }

    fn get_card(&self, card_id: i64) -> Result<Option<Card>> {
        CardRepository::get_card(self, card_id)
    }

    fn new_card_cap(&self, deck_id: i64) -> Result<usize> {
        Ok(self.get_effective_settings(Some(deck_id))?.new_cards_per_session as usize)
    }
}
