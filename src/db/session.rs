//! Training sessions: a shuffled sample of due card states with a cursor.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};

use super::{pool, to_timestamp};
use crate::config::SchedulerConfig;
use crate::error::Result;
use crate::models::{CardState, Quality, TrainingPool, TrainingSession};

const SESSION_COLUMNS: &str = "id, user_id, deck_id, card_state_ids, cursor";

type SessionRow = (i64, i64, i64, String, i64);

fn raw_from_row(row: &rusqlite::Row) -> rusqlite::Result<SessionRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn decode((id, user_id, deck_id, ids, cursor): SessionRow) -> Result<TrainingSession> {
    Ok(TrainingSession {
        id,
        user_id,
        deck_id,
        card_state_ids: serde_json::from_str(&ids)?,
        cursor: cursor.max(0) as usize,
    })
}

pub fn get(conn: &Connection, id: i64) -> Result<Option<TrainingSession>> {
    conn.query_row(
        &format!("SELECT {} FROM training_sessions WHERE id = ?1", SESSION_COLUMNS),
        params![id],
        raw_from_row,
    )
    .optional()?
    .map(decode)
    .transpose()
}

pub fn find(conn: &Connection, user_id: i64, deck_id: i64) -> Result<Option<TrainingSession>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM training_sessions WHERE user_id = ?1 AND deck_id = ?2",
            SESSION_COLUMNS
        ),
        params![user_id, deck_id],
        raw_from_row,
    )
    .optional()?
    .map(decode)
    .transpose()
}

fn list_for_deck(conn: &Connection, deck_id: i64) -> Result<Vec<TrainingSession>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM training_sessions WHERE deck_id = ?1",
        SESSION_COLUMNS
    ))?;
    let rows = stmt
        .query_map(params![deck_id], raw_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(decode).collect()
}

/// Returns the open session for (user, deck), or samples a new one from the
/// pool's due states. `None` when nothing is due; no session is created then.
#[allow(clippy::too_many_arguments)]
pub fn get_or_create<R: Rng + ?Sized>(
    conn: &Connection,
    user_id: i64,
    deck_id: i64,
    pool: &TrainingPool,
    all_cards: bool,
    config: &SchedulerConfig,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Result<Option<TrainingSession>> {
    if let Some(existing) = find(conn, user_id, deck_id)? {
        return Ok(Some(existing));
    }

    let mut ids: Vec<i64> = pool::due_states(conn, pool.id, now)?
        .into_iter()
        .map(|state| state.id)
        .collect();
    if ids.is_empty() {
        log::debug!("Nothing due in pool {}", pool.id);
        return Ok(None);
    }

    ids.shuffle(rng);
    if !all_cards {
        ids.truncate(config.session_size);
    }

    let inserted = conn.execute(
        "INSERT INTO training_sessions (user_id, deck_id, card_state_ids, cursor, created_at)
         VALUES (?1, ?2, ?3, 0, ?4)
         ON CONFLICT (user_id, deck_id) DO NOTHING",
        params![user_id, deck_id, serde_json::to_string(&ids)?, to_timestamp(now)],
    )?;
    if inserted > 0 {
        log::info!(
            "Started session {} for user {} deck {} with {} cards",
            conn.last_insert_rowid(),
            user_id,
            deck_id,
            ids.len()
        );
    }

    find(conn, user_id, deck_id)
}

pub fn current_card(conn: &Connection, session: &TrainingSession) -> Result<Option<CardState>> {
    let Some(state_id) = session.current_state_id() else {
        return Ok(None);
    };
    let state = pool::get_state(conn, state_id)?;
    if state.is_none() {
        log::warn!(
            "Session {} points at missing card state {}",
            session.id,
            state_id
        );
    }
    Ok(state)
}

/// Applies the answer to the current card and moves the cursor. Returns the
/// next card, or `None` once the session is used up, in which case the
/// session row is gone.
pub fn submit_answer(
    conn: &Connection,
    session: &mut TrainingSession,
    quality: Quality,
    config: &SchedulerConfig,
    now: DateTime<Utc>,
) -> Result<Option<CardState>> {
    if let Some(mut state) = current_card(conn, session)? {
        state.update_interval(quality, config, now);
        pool::save_state(conn, &state)?;
        log::debug!(
            "Card state {} answered with quality {}: reps={} ef={:.2} interval={:.2} due={}",
            state.id,
            quality.value(),
            state.repetitions,
            state.easiness,
            state.interval_days,
            state.due_at
        );
        session.cursor += 1;
    }

    match current_card(conn, session)? {
        Some(next) => {
            conn.execute(
                "UPDATE training_sessions SET cursor = ?1 WHERE id = ?2",
                params![session.cursor as i64, session.id],
            )?;
            Ok(Some(next))
        }
        None => {
            delete(conn, session.id)?;
            log::info!("Session {} complete", session.id);
            Ok(None)
        }
    }
}

/// Removes a card state from the unanswered tail of the deck's sessions.
/// Sessions left with nothing to answer are deleted.
pub fn drop_state(conn: &Connection, deck_id: i64, state_id: i64) -> Result<()> {
    for mut session in list_for_deck(conn, deck_id)? {
        let cursor = session.cursor.min(session.card_state_ids.len());
        let Some(offset) = session.card_state_ids[cursor..]
            .iter()
            .position(|&id| id == state_id)
        else {
            continue;
        };

        session.card_state_ids.remove(cursor + offset);
        if session.is_finished() {
            delete(conn, session.id)?;
            log::info!("Session {} emptied by card removal", session.id);
        } else {
            conn.execute(
                "UPDATE training_sessions SET card_state_ids = ?1 WHERE id = ?2",
                params![serde_json::to_string(&session.card_state_ids)?, session.id],
            )?;
            log::info!("Dropped card state {} from session {}", state_id, session.id);
        }
    }
    Ok(())
}

pub fn delete(conn: &Connection, id: i64) -> Result<bool> {
    let removed = conn.execute("DELETE FROM training_sessions WHERE id = ?1", params![id])?;
    Ok(removed > 0)
}

pub fn delete_for(conn: &Connection, user_id: i64, deck_id: i64) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM training_sessions WHERE user_id = ?1 AND deck_id = ?2",
        params![user_id, deck_id],
    )?)
}
