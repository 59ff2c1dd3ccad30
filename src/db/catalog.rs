//! Users, shelves, decks and cards.
//!
//! Card creation and deletion call the pool hooks inside the same
//! transaction, so every pool of a deck always mirrors the deck's cards.

use rusqlite::{params, OptionalExtension, Row};

use super::{clean_name, is_unique_violation, pool, require_text, session, timestamp_column};
use super::{to_timestamp, Database};
use crate::error::{Error, Result};
use crate::models::{Card, Deck, Direction, Shelf, User};

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: timestamp_column(row, 2)?,
    })
}

fn shelf_from_row(row: &Row) -> rusqlite::Result<Shelf> {
    Ok(Shelf {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn deck_from_row(row: &Row) -> rusqlite::Result<Deck> {
    Ok(Deck {
        id: row.get(0)?,
        shelf_id: row.get(1)?,
        name: row.get(2)?,
        position: row.get(3)?,
    })
}

pub(crate) fn card_from_row(row: &Row) -> rusqlite::Result<Card> {
    Ok(Card {
        id: row.get(0)?,
        deck_id: row.get(1)?,
        question: row.get(2)?,
        answer: row.get(3)?,
    })
}

impl Database {
    // User operations
    pub fn add_user(&self, name: &str) -> Result<i64> {
        let name = clean_name(name, "user")?;
        self.conn
            .execute(
                "INSERT INTO users (name, created_at) VALUES (?1, ?2)",
                params![name, to_timestamp(self.now())],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::Validation(format!("user '{}' already exists", name))
                } else {
                    e.into()
                }
            })?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, created_at FROM users WHERE id = ?1",
                params![id],
                user_from_row,
            )
            .optional()?)
    }

    pub fn get_user_by_name(&self, name: &str) -> Result<Option<User>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, created_at FROM users WHERE name = ?1",
                params![name.trim()],
                user_from_row,
            )
            .optional()?)
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM users ORDER BY name")?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    // Shelf operations
    pub fn add_shelf(&self, name: &str) -> Result<i64> {
        let name = clean_name(name, "shelf")?;
        self.conn
            .execute("INSERT INTO shelves (name) VALUES (?1)", params![name])
            .map_err(|e| duplicate_shelf(e, &name))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn rename_shelf(&self, id: i64, name: &str) -> Result<()> {
        let name = clean_name(name, "shelf")?;
        let changed = self
            .conn
            .execute(
                "UPDATE shelves SET name = ?1 WHERE id = ?2",
                params![name, id],
            )
            .map_err(|e| duplicate_shelf(e, &name))?;
        if changed == 0 {
            return Err(Error::not_found("shelf", id));
        }
        Ok(())
    }

    pub fn get_shelf(&self, id: i64) -> Result<Option<Shelf>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name FROM shelves WHERE id = ?1",
                params![id],
                shelf_from_row,
            )
            .optional()?)
    }

    pub fn list_shelves(&self) -> Result<Vec<Shelf>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM shelves ORDER BY id")?;
        let shelves = stmt
            .query_map([], shelf_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(shelves)
    }

    /// Deletes the shelf with its decks, cards and all training state.
    pub fn delete_shelf(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM shelves WHERE id = ?1", params![id])?;
        if affected > 0 {
            log::info!("Deleted shelf {}", id);
        }
        Ok(affected > 0)
    }

    // Deck operations
    pub fn add_deck(&self, shelf_id: i64, name: &str) -> Result<i64> {
        let name = clean_name(name, "deck")?;
        let tx = self.transaction()?;

        let shelf_exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM shelves WHERE id = ?1)",
            params![shelf_id],
            |row| row.get(0),
        )?;
        if !shelf_exists {
            return Err(Error::not_found("shelf", shelf_id));
        }

        // New decks go to the end of the shelf
        let position: i64 = tx.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM decks WHERE shelf_id = ?1",
            params![shelf_id],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO decks (shelf_id, name, position) VALUES (?1, ?2, ?3)",
            params![shelf_id, name, position],
        )?;
        let deck_id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(deck_id)
    }

    pub fn rename_deck(&self, id: i64, name: &str) -> Result<()> {
        let name = clean_name(name, "deck")?;
        let changed = self
            .conn
            .execute("UPDATE decks SET name = ?1 WHERE id = ?2", params![name, id])?;
        if changed == 0 {
            return Err(Error::not_found("deck", id));
        }
        Ok(())
    }

    pub fn get_deck(&self, id: i64) -> Result<Option<Deck>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, shelf_id, name, position FROM decks WHERE id = ?1",
                params![id],
                deck_from_row,
            )
            .optional()?)
    }

    pub fn list_decks(&self, shelf_id: i64) -> Result<Vec<Deck>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, shelf_id, name, position FROM decks WHERE shelf_id = ?1 ORDER BY position",
        )?;
        let decks = stmt
            .query_map(params![shelf_id], deck_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(decks)
    }

    /// Deletes the deck and closes the gap in its shelf's ordering.
    pub fn delete_deck(&self, id: i64) -> Result<bool> {
        let tx = self.transaction()?;
        let Some((shelf_id, position)) = tx
            .query_row(
                "SELECT shelf_id, position FROM decks WHERE id = ?1",
                params![id],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?
        else {
            return Ok(false);
        };

        tx.execute("DELETE FROM decks WHERE id = ?1", params![id])?;
        tx.execute(
            "UPDATE decks SET position = position - 1 WHERE shelf_id = ?1 AND position > ?2",
            params![shelf_id, position],
        )?;
        tx.commit()?;
        log::info!("Deleted deck {} from shelf {}", id, shelf_id);
        Ok(true)
    }

    /// Swaps the deck with its neighbour. `Up` moves towards the start of
    /// the shelf. Returns false at the edges.
    pub fn move_deck(&self, id: i64, direction: Direction) -> Result<bool> {
        let deck = self
            .get_deck(id)?
            .ok_or_else(|| Error::not_found("deck", id))?;
        let target = match direction {
            Direction::Up => deck.position - 1,
            Direction::Down => deck.position + 1,
        };

        let tx = self.transaction()?;
        let neighbour: Option<i64> = tx
            .query_row(
                "SELECT id FROM decks WHERE shelf_id = ?1 AND position = ?2",
                params![deck.shelf_id, target],
                |row| row.get(0),
            )
            .optional()?;
        let Some(neighbour) = neighbour else {
            return Ok(false);
        };

        tx.execute(
            "UPDATE decks SET position = ?1 WHERE id = ?2",
            params![deck.position, neighbour],
        )?;
        tx.execute(
            "UPDATE decks SET position = ?1 WHERE id = ?2",
            params![target, id],
        )?;
        tx.commit()?;
        Ok(true)
    }

    pub fn deck_card_count(&self, deck_id: i64) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM cards WHERE deck_id = ?1",
            params![deck_id],
            |row| row.get(0),
        )?)
    }

    // Card operations
    pub fn add_card(&self, deck_id: i64, question: &str, answer: &str) -> Result<i64> {
        require_text(question, "question")?;
        require_text(answer, "answer")?;

        let tx = self.transaction()?;
        let deck_exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM decks WHERE id = ?1)",
            params![deck_id],
            |row| row.get(0),
        )?;
        if !deck_exists {
            return Err(Error::not_found("deck", deck_id));
        }

        tx.execute(
            "INSERT INTO cards (deck_id, question, answer) VALUES (?1, ?2, ?3)",
            params![deck_id, question, answer],
        )
        .map_err(|e| duplicate_question(e, deck_id))?;
        let card_id = tx.last_insert_rowid();

        pool::on_card_added(&tx, deck_id, card_id, self.now())?;
        tx.commit()?;
        Ok(card_id)
    }

    /// Edits the card text in place. Training state is kept.
    pub fn edit_card(&self, id: i64, question: Option<&str>, answer: Option<&str>) -> Result<()> {
        let card = self
            .get_card(id)?
            .ok_or_else(|| Error::not_found("card", id))?;
        let question = question.unwrap_or(&card.question);
        let answer = answer.unwrap_or(&card.answer);
        require_text(question, "question")?;
        require_text(answer, "answer")?;

        self.conn
            .execute(
                "UPDATE cards SET question = ?1, answer = ?2 WHERE id = ?3",
                params![question, answer, id],
            )
            .map_err(|e| duplicate_question(e, card.deck_id))?;
        Ok(())
    }

    pub fn get_card(&self, id: i64) -> Result<Option<Card>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, deck_id, question, answer FROM cards WHERE id = ?1",
                params![id],
                card_from_row,
            )
            .optional()?)
    }

    pub fn list_cards(&self, deck_id: i64) -> Result<Vec<Card>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, deck_id, question, answer FROM cards WHERE deck_id = ?1 ORDER BY id",
        )?;
        let cards = stmt
            .query_map(params![deck_id], card_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cards)
    }

    pub fn delete_card(&self, id: i64) -> Result<bool> {
        let tx = self.transaction()?;
        let deck_id: Option<i64> = tx
            .query_row(
                "SELECT deck_id FROM cards WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(deck_id) = deck_id else {
            return Ok(false);
        };

        pool::on_card_removed(&tx, deck_id, id)?;
        tx.execute("DELETE FROM cards WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(true)
    }

    // Started shelves
    /// Returns false when the user had already started the shelf.
    pub fn start_shelf(&self, user_id: i64, shelf_id: i64) -> Result<bool> {
        if self.get_user(user_id)?.is_none() {
            return Err(Error::not_found("user", user_id));
        }
        if self.get_shelf(shelf_id)?.is_none() {
            return Err(Error::not_found("shelf", shelf_id));
        }

        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO user_shelves (user_id, shelf_id) VALUES (?1, ?2)",
            params![user_id, shelf_id],
        )?;
        if inserted > 0 {
            log::info!("User {} started shelf {}", user_id, shelf_id);
        }
        Ok(inserted > 0)
    }

    /// Forgets the user's whole training history for the shelf: its pools
    /// (with their card states) and open sessions.
    pub fn stop_shelf(&self, user_id: i64, shelf_id: i64) -> Result<bool> {
        if self.get_shelf(shelf_id)?.is_none() {
            return Err(Error::not_found("shelf", shelf_id));
        }

        let tx = self.transaction()?;
        let removed = tx.execute(
            "DELETE FROM user_shelves WHERE user_id = ?1 AND shelf_id = ?2",
            params![user_id, shelf_id],
        )?;

        let deck_ids = {
            let mut stmt = tx.prepare("SELECT id FROM decks WHERE shelf_id = ?1")?;
            let ids = stmt
                .query_map(params![shelf_id], |row| row.get::<_, i64>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            ids
        };
        for deck_id in deck_ids {
            session::delete_for(&tx, user_id, deck_id)?;
            pool::delete_for(&tx, user_id, deck_id)?;
        }
        tx.commit()?;

        log::info!("User {} stopped shelf {}", user_id, shelf_id);
        Ok(removed > 0)
    }

    pub fn has_started_shelf(&self, user_id: i64, shelf_id: i64) -> Result<bool> {
        Ok(self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM user_shelves WHERE user_id = ?1 AND shelf_id = ?2)",
            params![user_id, shelf_id],
            |row| row.get(0),
        )?)
    }

    pub fn started_shelves(&self, user_id: i64) -> Result<Vec<Shelf>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT s.id, s.name FROM shelves s
            JOIN user_shelves us ON us.shelf_id = s.id
            WHERE us.user_id = ?1
            ORDER BY s.id
            "#,
        )?;
        let shelves = stmt
            .query_map(params![user_id], shelf_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(shelves)
    }
}

fn duplicate_shelf(err: rusqlite::Error, name: &str) -> Error {
    if is_unique_violation(&err) {
        Error::Validation(format!("shelf '{}' already exists", name))
    } else {
        err.into()
    }
}

fn duplicate_question(err: rusqlite::Error, deck_id: i64) -> Error {
    if is_unique_violation(&err) {
        Error::Validation(format!("deck {} already has a card with this question", deck_id))
    } else {
        err.into()
    }
}
