use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SchedulerConfig;
use crate::error::{Error, Result};

pub const INITIAL_EASINESS: f64 = 2.5;
pub const MIN_EASINESS: f64 = 1.3;
pub const MAX_QUALITY: u8 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shelf {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    pub id: i64,
    pub shelf_id: i64,
    pub name: String,
    pub position: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: i64,
    pub deck_id: i64,
    pub question: String,
    pub answer: String,
}

/// Recall quality on the SuperMemo scale, 0 (blackout) to 5 (perfect).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64")]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: i64) -> Result<Self> {
        if (0..=MAX_QUALITY as i64).contains(&value) {
            Ok(Quality(value as u8))
        } else {
            Err(Error::InvalidQuality(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Quality {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        Quality::new(value)
    }
}

// The two answers offered while training
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Answer {
    Good,
    Bad,
}

impl Answer {
    pub fn quality(self) -> Quality {
        match self {
            Answer::Good => Quality(5),
            Answer::Bad => Quality(0),
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "good" | "g" | "yes" | "y" | "5" => Some(Answer::Good),
            "bad" | "b" | "no" | "n" | "0" => Some(Answer::Bad),
            _ => None,
        }
    }
}

/// Memorization strength of one card inside one training pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardState {
    pub id: i64,
    pub pool_id: i64,
    pub card_id: i64,
    /// Consecutive successful recalls since the last failure.
    pub repetitions: u32,
    pub easiness: f64,
    pub interval_days: f64,
    pub due_at: DateTime<Utc>,
}

impl CardState {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at <= now
    }

    /// SuperMemo-2 variant. Failures reset the streak but keep easiness and
    /// interval; only answers at or above the good threshold move `due_at`.
    pub fn update_interval(
        &mut self,
        quality: Quality,
        config: &SchedulerConfig,
        now: DateTime<Utc>,
    ) {
        let q = quality.value();

        if q >= config.success_threshold {
            let miss = (MAX_QUALITY - q) as f64;
            self.easiness = (self.easiness + (0.1 - miss * (0.08 + miss * 0.02))).max(MIN_EASINESS);
            self.repetitions += 1;
            self.interval_days = match self.repetitions {
                1 => 1.0,
                2 => 6.0,
                _ => self.interval_days * self.easiness,
            };
        } else {
            self.repetitions = 0;
        }

        if q >= config.good_threshold {
            let seconds = (self.interval_days * config.interval_unit_seconds as f64) as i64;
            self.due_at = now + Duration::seconds(seconds);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingPool {
    pub id: i64,
    pub user_id: i64,
    pub deck_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Ordered sample of card states drawn from a pool, with a cursor that only
/// moves forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingSession {
    pub id: i64,
    pub user_id: i64,
    pub deck_id: i64,
    pub card_state_ids: Vec<i64>,
    pub cursor: usize,
}

impl TrainingSession {
    pub fn current_state_id(&self) -> Option<i64> {
        self.card_state_ids.get(self.cursor).copied()
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.card_state_ids.len()
    }
}

/// What the presentation layer shows for the current card of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub session_id: i64,
    pub card_id: i64,
    pub card_state_id: i64,
    pub question: String,
    pub answer: String,
    /// 1-based position within the session.
    pub position: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NextState {
    Question(Question),
    Finished { shelf_id: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckOverview {
    pub deck: Deck,
    pub card_count: i64,
    /// None when the user has never trained this deck.
    pub due_count: Option<i64>,
    pub session_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardProgress {
    pub card: Card,
    pub state: CardState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "up" | "u" => Some(Direction::Up),
            "down" | "d" => Some(Direction::Down),
            _ => None,
        }
    }
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
