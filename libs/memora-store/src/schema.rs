//! SQLite schema definitions.

/// Current schema version for migrations.
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema for the study database.
///
/// Timestamps are integer milliseconds since the Unix epoch.
pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- Decks
CREATE TABLE IF NOT EXISTS decks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT,
    created_at INTEGER NOT NULL
);

-- Cards with their scheduling state
CREATE TABLE IF NOT EXISTS cards (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    deck_id INTEGER NOT NULL REFERENCES decks(id),
    front TEXT NOT NULL,
    back TEXT NOT NULL,
    note TEXT,
    created_at INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'new'
        CHECK (status IN ('new', 'learning', 'review', 'relearning')),
    due INTEGER NOT NULL,
    interval_days INTEGER NOT NULL DEFAULT 0 CHECK (interval_days >= 0),
    ease_factor REAL NOT NULL DEFAULT 2.5,
    reps INTEGER NOT NULL DEFAULT 0,
    lapses INTEGER NOT NULL DEFAULT 0,
    last_review INTEGER
);

-- Append-only rating history (no foreign key: logs outlive single card deletes)
CREATE TABLE IF NOT EXISTS review_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    card_id INTEGER NOT NULL,
    rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 4),
    status TEXT NOT NULL,
    due INTEGER NOT NULL,
    interval_days INTEGER NOT NULL,
    ease_factor REAL NOT NULL,
    time_taken_ms INTEGER,
    reviewed_at INTEGER NOT NULL
);

-- Deck settings overrides
CREATE TABLE IF NOT EXISTS deck_settings (
    deck_id INTEGER PRIMARY KEY REFERENCES decks(id),
    new_cards_per_session INTEGER
);

-- Global settings
CREATE TABLE IF NOT EXISTS global_settings (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    new_cards_per_session INTEGER NOT NULL DEFAULT 20,
    daily_reset_hour INTEGER NOT NULL DEFAULT 0
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_cards_deck_status ON cards(deck_id, status);
CREATE INDEX IF NOT EXISTS idx_cards_deck_due ON cards(deck_id, due);
CREATE INDEX IF NOT EXISTS idx_review_logs_card ON review_logs(card_id);
CREATE INDEX IF NOT EXISTS idx_review_logs_reviewed ON review_logs(reviewed_at);
"#;

/// Initialize global settings if not exists.
pub const INIT_GLOBAL_SETTINGS: &str = r#"
INSERT OR IGNORE INTO global_settings (id) VALUES (1);
"#;
