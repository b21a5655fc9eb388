//! Core types for the study domain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Ease factor given to every freshly created card.
pub const DEFAULT_EASE: f64 = 2.5;

/// Number of `new` cards admitted into a single study session.
pub const DEFAULT_NEW_CARD_CAP: usize = 20;

/// Card lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    New,
    Learning,
    Review,
    Relearning,
}

impl Default for CardStatus {
    fn default() -> Self {
        Self::New
    }
}

impl CardStatus {
    /// Storage label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Learning => "learning",
            Self::Review => "review",
            Self::Relearning => "relearning",
        }
    }

    /// Parse a storage label.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Self::New),
            "learning" => Some(Self::Learning),
            "review" => Some(Self::Review),
            "relearning" => Some(Self::Relearning),
            _ => None,
        }
    }

    /// Whether the card is still in the short-term acquisition phase.
    pub fn is_short_term(&self) -> bool {
        !matches!(self, Self::Review)
    }
}

/// Recall quality given by the user for a single review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Self::Again, Self::Hard, Self::Good, Self::Easy];

    /// Convert to 4-point numeric value (1-4).
    pub fn to_value(self) -> u8 {
        match self {
            Self::Again => 1,
            Self::Hard => 2,
            Self::Good => 3,
            Self::Easy => 4,
        }
    }

    /// Create from 4-point numeric value.
    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Again),
            2 => Some(Self::Hard),
            3 => Some(Self::Good),
            4 => Some(Self::Easy),
            _ => None,
        }
    }
}

impl TryFrom<u8> for Rating {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_value(value).ok_or(CoreError::InvalidRating(value))
    }
}

/// Memory state of a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardState {
    pub status: CardStatus,
    /// Earliest moment the card may be shown again.
    pub due: DateTime<Utc>,
    /// Whole days; 0 while in short-term steps.
    pub interval_days: u32,
    pub ease_factor: f64,
    pub reps: u32,
    pub lapses: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_review: Option<DateTime<Utc>>,
}

impl CardState {
    /// State of a card that has never been rated.
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            status: CardStatus::New,
            due: created_at,
            interval_days: 0,
            ease_factor: DEFAULT_EASE,
            reps: 0,
            lapses: 0,
            last_review: None,
        }
    }

    /// Whether the card belongs in a session assembled at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status != CardStatus::New && self.due <= now
    }
}

/// Content for a card that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCard {
    pub front: String,
    pub back: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl NewCard {
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
            note: None,
        }
    }
}

/// A learnable fact with its scheduling state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: i64,
    pub deck_id: i64,
    pub front: String,
    pub back: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub state: CardState,
}

/// Deck of cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Deck with card counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckSummary {
    pub deck: Deck,
    pub card_count: usize,
    pub new_count: usize,
    pub due_count: usize,
}

/// Append-only record of a single rating.
///
/// `status` is the state the card was in when it was rated; `due`,
/// `interval_days` and `ease_factor` are the values the rating produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewLog {
    pub id: i64,
    pub card_id: i64,
    pub rating: Rating,
    pub status: CardStatus,
    pub due: DateTime<Utc>,
    pub interval_days: u32,
    pub ease_factor: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_taken_ms: Option<i64>,
    pub reviewed_at: DateTime<Utc>,
}

/// Global settings configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSettings {
    pub new_cards_per_session: u32,
    pub daily_reset_hour: u32,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            new_cards_per_session: DEFAULT_NEW_CARD_CAP as u32,
            daily_reset_hour: 0,
        }
    }
}

/// Per-deck settings (all fields optional for overrides).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckSettings {
    pub deck_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_cards_per_session: Option<u32>,
}

impl DeckSettings {
    /// Create new deck settings with no overrides.
    pub fn new(deck_id: i64) -> Self {
        Self {
            deck_id,
            new_cards_per_session: None,
        }
    }
}

/// Effective settings (global merged with deck overrides).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveSettings {
    pub new_cards_per_session: u32,
    pub daily_reset_hour: u32,
}

impl EffectiveSettings {
    /// Merge global settings with optional deck settings.
    pub fn merge(global: &GlobalSettings, deck: Option<&DeckSettings>) -> Self {
        Self {
            new_cards_per_session: deck
                .and_then(|d| d.new_cards_per_session)
                .unwrap_or(global.new_cards_per_session),
            daily_reset_hour: global.daily_reset_hour,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    #[test]
    fn rating_rejects_out_of_range_values() {
        assert_eq!(Rating::try_from(0), Err(CoreError::InvalidRating(0)));
        assert_eq!(Rating::try_from(5), Err(CoreError::InvalidRating(5)));
        assert_eq!(Rating::try_from(3), Ok(Rating::Good));
    }

    #[test]
    fn rating_values_round_trip() {
        for rating in Rating::ALL {
            assert_eq!(Rating::from_value(rating.to_value()), Some(rating));
        }
    }

    #[test]
    fn status_labels_parse() {
        assert_eq!(CardStatus::from_str("relearning"), Some(CardStatus::Relearning));
        assert_eq!(CardStatus::from_str("suspended"), None);
        assert_eq!(CardStatus::Review.as_str(), "review");
    }

    #[test]
    fn only_review_is_long_term() {
        assert!(CardStatus::New.is_short_term());
        assert!(CardStatus::Learning.is_short_term());
        assert!(CardStatus::Relearning.is_short_term());
        assert!(!CardStatus::Review.is_short_term());
    }

    #[test]
    fn new_state_is_never_due() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let state = CardState::new(now - Duration::days(3));
        assert!(!state.is_due(now));

        let review = CardState {
            status: CardStatus::Review,
            ..state
        };
        assert!(review.is_due(now));
    }

    #[test]
    fn card_serializes_flat_with_snake_case_status() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let card = Card {
            id: 1,
            deck_id: 2,
            front: "hola".into(),
            back: "hello".into(),
            note: None,
            created_at: now,
            state: CardState::new(now),
        };
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["status"], "new");
        assert_eq!(json["ease_factor"], 2.5);
        assert!(json.get("note").is_none());
    }

    #[test]
    fn deck_settings_override_global() {
        let global = GlobalSettings::default();
        let deck = DeckSettings {
            deck_id: 1,
            new_cards_per_session: Some(5),
        };
        assert_eq!(EffectiveSettings::merge(&global, Some(&deck)).new_cards_per_session, 5);
        assert_eq!(
            EffectiveSettings::merge(&global, Some(&DeckSettings::new(1))).new_cards_per_session,
            20
        );
        assert_eq!(EffectiveSettings::merge(&global, None).daily_reset_hour, 0);
    }
}
