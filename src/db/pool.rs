//! Training pools: the durable per-(user, deck) set of card states.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::catalog::card_from_row;
use super::{session, timestamp_column, to_timestamp};
use crate::error::{Error, Result};
use crate::models::{CardProgress, CardState, TrainingPool, INITIAL_EASINESS};

const STATE_COLUMNS: &str = "id, pool_id, card_id, repetitions, easiness, interval_days, due_at";

fn pool_from_row(row: &Row) -> rusqlite::Result<TrainingPool> {
    Ok(TrainingPool {
        id: row.get(0)?,
        user_id: row.get(1)?,
        deck_id: row.get(2)?,
        created_at: timestamp_column(row, 3)?,
    })
}

fn state_from_row(row: &Row) -> rusqlite::Result<CardState> {
    state_from_row_at(row, 0)
}

fn state_from_row_at(row: &Row, offset: usize) -> rusqlite::Result<CardState> {
    Ok(CardState {
        id: row.get(offset)?,
        pool_id: row.get(offset + 1)?,
        card_id: row.get(offset + 2)?,
        repetitions: row.get(offset + 3)?,
        easiness: row.get(offset + 4)?,
        interval_days: row.get(offset + 5)?,
        due_at: timestamp_column(row, offset + 6)?,
    })
}

pub fn get(conn: &Connection, user_id: i64, deck_id: i64) -> Result<Option<TrainingPool>> {
    Ok(conn
        .query_row(
            "SELECT id, user_id, deck_id, created_at FROM training_pools
             WHERE user_id = ?1 AND deck_id = ?2",
            params![user_id, deck_id],
            pool_from_row,
        )
        .optional()?)
}

/// Returns the user's pool for the deck, creating it with one due-now state
/// per card on first use. The unique (user, deck) constraint decides which
/// writer creates it; only that writer seeds the states.
pub fn get_or_create(
    conn: &Connection,
    user_id: i64,
    deck_id: i64,
    now: DateTime<Utc>,
) -> Result<TrainingPool> {
    let inserted = conn.execute(
        "INSERT INTO training_pools (user_id, deck_id, created_at) VALUES (?1, ?2, ?3)
         ON CONFLICT (user_id, deck_id) DO NOTHING",
        params![user_id, deck_id, to_timestamp(now)],
    )?;

    if inserted > 0 {
        let pool_id = conn.last_insert_rowid();
        let seeded = conn.execute(
            "INSERT INTO card_states (pool_id, card_id, repetitions, easiness, interval_days, due_at)
             SELECT ?1, id, 0, ?2, 0, ?3 FROM cards WHERE deck_id = ?4",
            params![pool_id, INITIAL_EASINESS, to_timestamp(now), deck_id],
        )?;
        log::info!(
            "Created training pool {} for user {} deck {} with {} cards",
            pool_id,
            user_id,
            deck_id,
            seeded
        );
    }

    get(conn, user_id, deck_id)?
        .ok_or_else(|| Error::NotFound(format!("pool for user {} deck {}", user_id, deck_id)))
}

/// Gives every pool of the deck a fresh, due-now state for the new card.
pub fn on_card_added(
    conn: &Connection,
    deck_id: i64,
    card_id: i64,
    now: DateTime<Utc>,
) -> Result<usize> {
    let attached = conn.execute(
        "INSERT OR IGNORE INTO card_states (pool_id, card_id, repetitions, easiness, interval_days, due_at)
         SELECT id, ?1, 0, ?2, 0, ?3 FROM training_pools WHERE deck_id = ?4",
        params![card_id, INITIAL_EASINESS, to_timestamp(now), deck_id],
    )?;
    if attached > 0 {
        log::debug!("Card {} added to {} pools of deck {}", card_id, attached, deck_id);
    }
    Ok(attached)
}

/// Removes the card's state from every pool of the deck and from the
/// unanswered part of any open session.
pub fn on_card_removed(conn: &Connection, deck_id: i64, card_id: i64) -> Result<usize> {
    let state_ids = {
        let mut stmt = conn.prepare(
            "SELECT cs.id FROM card_states cs
             JOIN training_pools p ON p.id = cs.pool_id
             WHERE p.deck_id = ?1 AND cs.card_id = ?2",
        )?;
        let ids = stmt
            .query_map(params![deck_id, card_id], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        ids
    };

    for &state_id in &state_ids {
        session::drop_state(conn, deck_id, state_id)?;
    }

    let removed = conn.execute(
        "DELETE FROM card_states WHERE card_id = ?1
         AND pool_id IN (SELECT id FROM training_pools WHERE deck_id = ?2)",
        params![card_id, deck_id],
    )?;
    if removed > 0 {
        log::debug!("Card {} removed from {} pools of deck {}", card_id, removed, deck_id);
    }
    Ok(removed)
}

pub fn due_states(conn: &Connection, pool_id: i64, now: DateTime<Utc>) -> Result<Vec<CardState>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM card_states WHERE pool_id = ?1 AND due_at <= ?2 ORDER BY id",
        STATE_COLUMNS
    ))?;
    let states = stmt
        .query_map(params![pool_id, to_timestamp(now)], state_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(states)
}

/// Due counts per deck of a shelf, for decks the user has a pool for.
/// Number of states in the pool due at or before `now`.
pub fn due_count(conn: &Connection, pool_id: i64, now: DateTime<Utc>) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM card_states WHERE pool_id = ?1 AND due_at <= ?2",
        params![pool_id, to_timestamp(now)],
        |row| row.get(0),
    )?)
}

pub fn due_counts_for_shelf(
    conn: &Connection,
    user_id: i64,
    shelf_id: i64,
    now: DateTime<Utc>,
) -> Result<Vec<(i64, i64)>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT p.deck_id, COUNT(cs.id)
        FROM training_pools p
        JOIN decks d ON d.id = p.deck_id
        LEFT JOIN card_states cs ON cs.pool_id = p.id AND cs.due_at <= ?3
        WHERE p.user_id = ?1 AND d.shelf_id = ?2
        GROUP BY p.deck_id
        ORDER BY d.position
        "#,
    )?;
    let counts = stmt
        .query_map(params![user_id, shelf_id, to_timestamp(now)], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(counts)
}

pub fn get_state(conn: &Connection, id: i64) -> Result<Option<CardState>> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM card_states WHERE id = ?1", STATE_COLUMNS),
            params![id],
            state_from_row,
        )
        .optional()?)
}

pub fn save_state(conn: &Connection, state: &CardState) -> Result<()> {
    let changed = conn.execute(
        "UPDATE card_states
         SET repetitions = ?1, easiness = ?2, interval_days = ?3, due_at = ?4
         WHERE id = ?5",
        params![
            state.repetitions,
            state.easiness,
            state.interval_days,
            to_timestamp(state.due_at),
            state.id
        ],
    )?;
    if changed == 0 {
        return Err(Error::not_found("card state", state.id));
    }
    Ok(())
}

/// The pool's states with their cards, soonest due first.
pub fn states_with_cards(conn: &Connection, pool_id: i64) -> Result<Vec<CardProgress>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT c.id, c.deck_id, c.question, c.answer,
               cs.id, cs.pool_id, cs.card_id, cs.repetitions, cs.easiness, cs.interval_days, cs.due_at
        FROM card_states cs
        JOIN cards c ON c.id = cs.card_id
        WHERE cs.pool_id = ?1
        ORDER BY cs.due_at ASC, cs.id ASC
        "#,
    )?;
    let rows = stmt
        .query_map(params![pool_id], |row| {
            Ok(CardProgress {
                card: card_from_row(row)?,
                state: state_from_row_at(row, 4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Deletes the user's pool for the deck; its states go with it.
pub fn delete_for(conn: &Connection, user_id: i64, deck_id: i64) -> Result<usize> {
    let removed = conn.execute(
        "DELETE FROM training_pools WHERE user_id = ?1 AND deck_id = ?2",
        params![user_id, deck_id],
    )?;
    if removed > 0 {
        log::info!("Deleted training pool of user {} for deck {}", user_id, deck_id);
    }
    Ok(removed)
}
