//! SQLite storage.
//!
//! `catalog` holds users, shelves, decks and cards. `pool` and `session`
//! hold the training state and expose free functions over a `Connection` so
//! several of them can share one transaction.

pub mod catalog;
pub mod pool;
pub mod session;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, Transaction, TransactionBehavior};
use std::path::Path;

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};

pub struct Database {
    conn: Connection,
    clock: Box<dyn Clock>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn,
            clock: Box::new(SystemClock),
        })
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Starts a write transaction up front so concurrent writers queue on the
    /// database lock instead of failing halfway through.
    pub fn transaction(&self) -> Result<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Immediate,
        )?)
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS shelves (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            -- Shelves a user has started to learn
            CREATE TABLE IF NOT EXISTS user_shelves (
                user_id INTEGER NOT NULL,
                shelf_id INTEGER NOT NULL,
                PRIMARY KEY (user_id, shelf_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (shelf_id) REFERENCES shelves(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS decks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                shelf_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                position INTEGER NOT NULL,
                FOREIGN KEY (shelf_id) REFERENCES shelves(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS cards (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                deck_id INTEGER NOT NULL,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                UNIQUE (deck_id, question),
                FOREIGN KEY (deck_id) REFERENCES decks(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS training_pools (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                deck_id INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                UNIQUE (user_id, deck_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (deck_id) REFERENCES decks(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS card_states (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                pool_id INTEGER NOT NULL,
                card_id INTEGER NOT NULL,
                repetitions INTEGER NOT NULL DEFAULT 0,
                easiness REAL NOT NULL DEFAULT 2.5 CHECK (easiness >= 1.3),
                interval_days REAL NOT NULL DEFAULT 0,
                due_at INTEGER NOT NULL,
                UNIQUE (pool_id, card_id),
                FOREIGN KEY (pool_id) REFERENCES training_pools(id) ON DELETE CASCADE,
                FOREIGN KEY (card_id) REFERENCES cards(id) ON DELETE CASCADE
            );

            -- card_state_ids is a JSON array, cursor indexes into it
            CREATE TABLE IF NOT EXISTS training_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                deck_id INTEGER NOT NULL,
                card_state_ids TEXT NOT NULL,
                cursor INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                UNIQUE (user_id, deck_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (deck_id) REFERENCES decks(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_decks_shelf ON decks(shelf_id, position);
            CREATE INDEX IF NOT EXISTS idx_cards_deck ON cards(deck_id);
            CREATE INDEX IF NOT EXISTS idx_pools_deck ON training_pools(deck_id);
            CREATE INDEX IF NOT EXISTS idx_card_states_pool_due ON card_states(pool_id, due_at);
            CREATE INDEX IF NOT EXISTS idx_card_states_card ON card_states(card_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_deck ON training_sessions(deck_id);
            "#,
        )?;

        Ok(())
    }
}

pub(crate) fn to_timestamp(dt: DateTime<Utc>) -> i64 {
    dt.timestamp()
}

/// Reads a unix-seconds column. Values chrono cannot represent are an error.
pub(crate) fn timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let secs: i64 = row.get(idx)?;
    DateTime::from_timestamp(secs, 0).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, secs))
}

pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Trims a display name and rejects blank or overlong ones.
pub(crate) fn clean_name(name: &str, what: &str) -> Result<String> {
    const MAX_NAME_LEN: usize = 128;

    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation(format!("{} name cannot be blank", what)));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::Validation(format!(
            "{} name longer than {} characters",
            what, MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

pub(crate) fn require_text(text: &str, what: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::Validation(format!("{} cannot be blank", what)));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    fn count(db: &Database, table: &str) -> i64 {
        db.conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })
            .unwrap_or_else(|_| panic!("{} table should exist", table))
    }

    #[test]
    fn init_creates_tables() {
        let (db, _) = setup_db();
        for table in [
            "users",
            "shelves",
            "user_shelves",
            "decks",
            "cards",
            "training_pools",
            "card_states",
            "training_sessions",
        ] {
            assert_eq!(count(&db, table), 0);
        }
    }

    #[test]
    fn init_is_idempotent() {
        let (db, _) = setup_db();
        db.add_shelf("Kept").unwrap();

        db.init().expect("Re-init should succeed");

        assert_eq!(db.list_shelves().unwrap().len(), 1);
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let (db, _) = setup_db();
        let result = db.conn.execute(
            "INSERT INTO decks (shelf_id, name, position) VALUES (999, 'orphan', 0)",
            [],
        );
        assert!(result.is_err());
    }

    fn read_timestamp(db: &Database, secs: i64) -> rusqlite::Result<DateTime<Utc>> {
        db.conn
            .query_row("SELECT ?1", [secs], |row| timestamp_column(row, 0))
    }

    #[test]
    fn timestamps_round_trip_to_the_second() {
        let (db, _) = setup_db();
        let t = t0();
        assert_eq!(read_timestamp(&db, to_timestamp(t)).unwrap(), t);
    }

    #[test]
    fn out_of_range_timestamp_is_an_error() {
        let (db, _) = setup_db();
        assert!(matches!(
            read_timestamp(&db, i64::MAX),
            Err(rusqlite::Error::IntegralValueOutOfRange(0, i64::MAX))
        ));
    }

    #[test]
    fn unique_violation_is_told_apart_from_other_constraints() {
        let (db, _) = setup_db();
        db.add_shelf("Languages").unwrap();

        let duplicate = db
            .conn
            .execute("INSERT INTO shelves (name) VALUES ('Languages')", [])
            .unwrap_err();
        assert!(is_unique_violation(&duplicate));

        let orphan = db
            .conn
            .execute(
                "INSERT INTO decks (shelf_id, name, position) VALUES (999, 'orphan', 0)",
                [],
            )
            .unwrap_err();
        assert!(!is_unique_violation(&orphan));
    }

    #[test]
    fn clean_name_trims() {
        assert_eq!(clean_name("  Shelf  ", "shelf").unwrap(), "Shelf");
    }

    #[test]
    fn clean_name_rejects_whitespace_only() {
        assert!(matches!(
            clean_name(" \t ", "shelf"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn clean_name_rejects_long_names() {
        let long = "x".repeat(129);
        assert!(clean_name(&long, "deck").is_err());
        assert!(clean_name(&"x".repeat(128), "deck").is_ok());
    }

    #[test]
    fn transaction_rolls_back_on_drop() {
        let (db, _) = setup_db();
        {
            let tx = db.transaction().unwrap();
            tx.execute("INSERT INTO shelves (name) VALUES ('temp')", [])
                .unwrap();
        }
        assert_eq!(count(&db, "shelves"), 0);
    }
}
