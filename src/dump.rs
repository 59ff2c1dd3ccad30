//! JSON dump and load of shelf, deck and card content.
//! Training data is per user and never dumped.

use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::db::{clean_name, is_unique_violation, require_text, Database};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataDump {
    pub shelves: Vec<ShelfDump>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShelfDump {
    pub name: String,
    #[serde(default)]
    pub decks: Vec<DeckDump>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckDump {
    pub name: String,
    #[serde(default)]
    pub cards: Vec<CardDump>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDump {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub shelves: usize,
    pub decks: usize,
    pub cards: usize,
}

/// Collects every shelf with its decks (in position order) and cards.
pub fn dump(db: &Database) -> Result<DataDump> {
    let mut shelves = Vec::new();
    for shelf in db.list_shelves()? {
        let mut decks = Vec::new();
        for deck in db.list_decks(shelf.id)? {
            let cards = db
                .list_cards(deck.id)?
                .into_iter()
                .map(|card| CardDump {
                    question: card.question,
                    answer: card.answer,
                })
                .collect();
            decks.push(DeckDump {
                name: deck.name,
                cards,
            });
        }
        shelves.push(ShelfDump {
            name: shelf.name,
            decks,
        });
    }
    Ok(DataDump { shelves })
}

/// Adds the dumped content as new shelves. Either everything is loaded or,
/// on the first bad entry, nothing is.
pub fn load(db: &Database, data: &DataDump) -> Result<LoadStats> {
    let tx = db.transaction()?;
    let mut stats = LoadStats::default();

    for shelf in &data.shelves {
        let shelf_name = clean_name(&shelf.name, "shelf")?;
        tx.execute("INSERT INTO shelves (name) VALUES (?1)", params![shelf_name])
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::Validation(format!("shelf '{}' already exists", shelf_name))
                } else {
                    e.into()
                }
            })?;
        let shelf_id = tx.last_insert_rowid();
        stats.shelves += 1;

        for (position, deck) in shelf.decks.iter().enumerate() {
            let deck_name = clean_name(&deck.name, "deck")?;
            tx.execute(
                "INSERT INTO decks (shelf_id, name, position) VALUES (?1, ?2, ?3)",
                params![shelf_id, deck_name, position as i64],
            )?;
            let deck_id = tx.last_insert_rowid();
            stats.decks += 1;

            for card in &deck.cards {
                require_text(&card.question, "question")?;
                require_text(&card.answer, "answer")?;
                tx.execute(
                    "INSERT INTO cards (deck_id, question, answer) VALUES (?1, ?2, ?3)",
                    params![deck_id, card.question, card.answer],
                )
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        Error::Validation(format!(
                            "deck '{}' has the question '{}' twice",
                            deck_name, card.question
                        ))
                    } else {
                        e.into()
                    }
                })?;
                stats.cards += 1;
            }
        }
    }

    tx.commit()?;
    log::info!(
        "Loaded {} shelves, {} decks, {} cards",
        stats.shelves,
        stats.decks,
        stats.cards
    );
    Ok(stats)
}

pub fn export_to_path(db: &Database, path: &Path) -> Result<DataDump> {
    let data = dump(db)?;
    fs::write(path, serde_json::to_string_pretty(&data)?)?;
    Ok(data)
}

pub fn import_from_path(db: &Database, path: &Path) -> Result<LoadStats> {
    let text = fs::read_to_string(path)?;
    let data: DataDump = serde_json::from_str(&text)?;
    load(db, &data)
}
