//! SQLite-backed storage for decks, cards, review logs and settings.

pub mod config;
pub mod date_utils;
pub mod error;
pub mod repository;
pub mod schema;

pub use config::StoreConfig;
pub use error::DbError;
pub use repository::{
    CardRepository, DeckRepository, DeckStats, ReviewRepository, SettingsRepository,
    SqliteRepository, StatsRepository, StudyStats,
};
