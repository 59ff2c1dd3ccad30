mod clock;
mod config;
mod db;
mod dump;
mod error;
mod models;
mod scheduler;
mod tui;

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use config::SchedulerConfig;
use db::Database;
use error::Error;
use models::{Answer, Direction, JsonOutput, NextState, Quality, Question, User};
use scheduler::Scheduler;

const DEFAULT_DB_NAME: &str = "pamietacz.db";
const DB_ENV: &str = "PAMIETACZ_DB";

#[derive(Parser)]
#[command(name = "pamietacz")]
#[command(about = "Flashcards with spaced repetition, organised in shelves and decks")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// User to train as
    #[arg(long, short, global = true, env = "PAMIETACZ_USER")]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Manage users
    #[command(subcommand)]
    User(UserCommands),

    /// Manage shelves
    #[command(subcommand)]
    Shelf(ShelfCommands),

    /// List your started shelves with due cards
    Shelves,

    /// Manage decks
    #[command(subcommand)]
    Deck(DeckCommands),

    /// Manage cards
    #[command(subcommand)]
    Card(CardCommands),

    /// Start or resume training a deck
    Train {
        /// Deck ID
        deck: i64,

        /// Train every due card instead of a sample
        #[arg(long, short)]
        all: bool,
    },

    /// Show the answer to the current question of a session
    Reveal {
        /// Session ID
        session: i64,
    },

    /// Answer the current question of a session
    Answer {
        /// Session ID
        session: i64,

        /// good/bad, or a quality from 0 to 5
        answer: String,
    },

    /// Show due cards per deck of a shelf
    Due {
        /// Shelf ID
        shelf: i64,
    },

    /// Show your card states for a deck, soonest due first
    Progress {
        /// Deck ID
        deck: i64,
    },

    /// Write all shelves, decks and cards to a JSON file
    Export { path: PathBuf },

    /// Load shelves, decks and cards from a JSON file
    Import { path: PathBuf },

    /// Launch interactive terminal UI
    Tui,
}

#[derive(Subcommand)]
enum UserCommands {
    /// Add a user
    Add { name: String },

    /// List users
    List,
}

#[derive(Subcommand)]
enum ShelfCommands {
    /// List all shelves
    List,

    /// Add a shelf
    Add { name: String },

    /// Rename a shelf
    Rename { id: i64, name: String },

    /// Delete a shelf with its decks and cards
    Delete { id: i64 },

    /// Show the decks of a shelf
    Show { id: i64 },

    /// Start learning a shelf
    Start { id: i64 },

    /// Stop learning a shelf, forgetting its training state
    Stop { id: i64 },
}

#[derive(Subcommand)]
enum DeckCommands {
    /// Add a deck to a shelf
    Add {
        /// Shelf ID
        shelf: i64,
        name: String,
    },

    /// Rename a deck
    Rename { id: i64, name: String },

    /// Delete a deck with its cards
    Delete { id: i64 },

    /// Show the cards of a deck
    Show { id: i64 },

    /// Move a deck within its shelf
    Move {
        id: i64,

        /// up or down
        direction: String,
    },
}

#[derive(Subcommand)]
enum CardCommands {
    /// Add a card to a deck
    Add {
        /// Deck ID
        deck: i64,

        #[arg(long, short)]
        question: String,

        #[arg(long, short)]
        answer: String,
    },

    /// Edit a card
    Edit {
        id: i64,

        #[arg(long, short)]
        question: Option<String>,

        #[arg(long, short)]
        answer: Option<String>,
    },

    /// Delete a card
    Delete { id: i64 },
}

fn get_db_path() -> PathBuf {
    if let Ok(path) = std::env::var(DB_ENV) {
        return PathBuf::from(path);
    }

    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pamietacz");

    std::fs::create_dir_all(&config_dir).ok();
    config_dir.join(DEFAULT_DB_NAME)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = run(cli) {
        if json {
            if let Ok(out) = serde_json::to_string(&JsonOutput::<()>::err(e.to_string())) {
                println!("{}", out);
            }
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

fn print_ok<T: Serialize>(data: T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string(&JsonOutput::ok(data))?);
    Ok(())
}

fn require_user(db: &Database, name: Option<&str>) -> Result<User, Error> {
    let name = name.ok_or_else(|| {
        Error::Validation("no user given, pass --user or set PAMIETACZ_USER".to_string())
    })?;
    db.get_user_by_name(name)?
        .ok_or_else(|| Error::NotFound(format!("user '{}'", name)))
}

fn parse_quality(s: &str) -> Result<Quality, Error> {
    if let Some(answer) = Answer::from_str(s) {
        return Ok(answer.quality());
    }
    let value: i64 = s.trim().parse().map_err(|_| {
        Error::Validation(format!("invalid answer '{}'. Use: good, bad or 0-5", s))
    })?;
    Quality::new(value)
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let db_path = get_db_path();
    let db = Database::open(&db_path)?;
    let config = SchedulerConfig::load(&config::config_path())?;
    let scheduler = Scheduler::new(&db, config);
    let user_name = cli.user.as_deref();

    match cli.command {
        Commands::Init => {
            db.init()?;
            if cli.json {
                print_ok(())?;
            } else {
                println!("Database initialized at: {}", db_path.display());
            }
        }

        Commands::User(user_cmd) => match user_cmd {
            UserCommands::Add { name } => {
                let id = db.add_user(&name)?;
                if cli.json {
                    print_ok(serde_json::json!({ "id": id, "name": name.trim() }))?;
                } else {
                    println!("Added user '{}' with ID: {}", name.trim(), id);
                }
            }
            UserCommands::List => {
                let users = db.list_users()?;
                if cli.json {
                    print_ok(&users)?;
                } else if users.is_empty() {
                    println!("No users found.");
                } else {
                    for user in users {
                        println!("{:<5} {}", user.id, user.name);
                    }
                }
            }
        },

        Commands::Shelf(shelf_cmd) => match shelf_cmd {
            ShelfCommands::List => {
                let shelves = db.list_shelves()?;
                if cli.json {
                    print_ok(&shelves)?;
                } else if shelves.is_empty() {
                    println!("No shelves found.");
                } else {
                    println!("{:<5} NAME", "ID");
                    println!("{}", "-".repeat(50));
                    for shelf in shelves {
                        println!("{:<5} {}", shelf.id, truncate(&shelf.name, 44));
                    }
                }
            }

            ShelfCommands::Add { name } => {
                let id = db.add_shelf(&name)?;
                if cli.json {
                    print_ok(serde_json::json!({ "id": id, "name": name.trim() }))?;
                } else {
                    println!("Added shelf '{}' with ID: {}", name.trim(), id);
                }
            }

            ShelfCommands::Rename { id, name } => {
                db.rename_shelf(id, &name)?;
                if cli.json {
                    print_ok(())?;
                } else {
                    println!("Shelf {} renamed.", id);
                }
            }

            ShelfCommands::Delete { id } => {
                if !db.delete_shelf(id)? {
                    return Err(Error::not_found("shelf", id).into());
                }
                if cli.json {
                    print_ok(())?;
                } else {
                    println!("Shelf {} deleted.", id);
                }
            }

            ShelfCommands::Show { id } => {
                let shelf = db
                    .get_shelf(id)?
                    .ok_or_else(|| Error::not_found("shelf", id))?;
                let decks = db.list_decks(id)?;
                if cli.json {
                    print_ok(serde_json::json!({ "shelf": shelf, "decks": decks }))?;
                } else {
                    println!("Shelf: {} (ID: {})", shelf.name, shelf.id);
                    if decks.is_empty() {
                        println!("No decks yet.");
                    } else {
                        println!();
                        println!("{:<5} {:<40} CARDS", "ID", "DECK");
                        println!("{}", "-".repeat(55));
                        for deck in decks {
                            println!(
                                "{:<5} {:<40} {}",
                                deck.id,
                                truncate(&deck.name, 38),
                                db.deck_card_count(deck.id)?
                            );
                        }
                    }
                }
            }

            ShelfCommands::Start { id } => {
                let user = require_user(&db, user_name)?;
                let started = scheduler.start_shelf(user.id, id)?;
                if cli.json {
                    print_ok(serde_json::json!({ "started": started }))?;
                } else if started {
                    println!("Started shelf {}.", id);
                } else {
                    println!("Shelf {} was already started.", id);
                }
            }

            ShelfCommands::Stop { id } => {
                let user = require_user(&db, user_name)?;
                let stopped = scheduler.stop_shelf(user.id, id)?;
                if cli.json {
                    print_ok(serde_json::json!({ "stopped": stopped }))?;
                } else if stopped {
                    println!("Stopped shelf {}. Its training history is gone.", id);
                } else {
                    println!("Shelf {} was not started.", id);
                }
            }
        },

        Commands::Shelves => {
            let user = require_user(&db, user_name)?;
            let totals = scheduler.shelf_due_totals(user.id)?;
            if cli.json {
                let rows: Vec<_> = totals
                    .iter()
                    .map(|(shelf, due)| serde_json::json!({ "shelf": shelf, "due": due }))
                    .collect();
                print_ok(rows)?;
            } else if totals.is_empty() {
                println!("No started shelves. Start one with `pamietacz shelf start <id>`.");
            } else {
                println!("{:<5} {:<40} DUE", "ID", "SHELF");
                println!("{}", "-".repeat(55));
                for (shelf, due) in totals {
                    println!("{:<5} {:<40} {}", shelf.id, truncate(&shelf.name, 38), due);
                }
            }
        }

        Commands::Deck(deck_cmd) => match deck_cmd {
            DeckCommands::Add { shelf, name } => {
                let id = db.add_deck(shelf, &name)?;
                if cli.json {
                    print_ok(serde_json::json!({ "id": id, "name": name.trim() }))?;
                } else {
                    println!("Added deck '{}' with ID: {}", name.trim(), id);
                }
            }

            DeckCommands::Rename { id, name } => {
                db.rename_deck(id, &name)?;
                if cli.json {
                    print_ok(())?;
                } else {
                    println!("Deck {} renamed.", id);
                }
            }

            DeckCommands::Delete { id } => {
                if !db.delete_deck(id)? {
                    return Err(Error::not_found("deck", id).into());
                }
                if cli.json {
                    print_ok(())?;
                } else {
                    println!("Deck {} deleted.", id);
                }
            }

            DeckCommands::Show { id } => {
                let deck = db.get_deck(id)?.ok_or_else(|| Error::not_found("deck", id))?;
                let cards = db.list_cards(id)?;
                if cli.json {
                    print_ok(serde_json::json!({ "deck": deck, "cards": cards }))?;
                } else {
                    println!("Deck: {} (ID: {})", deck.name, deck.id);
                    if cards.is_empty() {
                        println!("No cards yet.");
                    } else {
                        println!();
                        println!("{:<5} {:<35} ANSWER", "ID", "QUESTION");
                        println!("{}", "-".repeat(70));
                        for card in cards {
                            println!(
                                "{:<5} {:<35} {}",
                                card.id,
                                truncate(&card.question, 33),
                                truncate(&card.answer, 30)
                            );
                        }
                    }
                }
            }

            DeckCommands::Move { id, direction } => {
                let dir = Direction::from_str(&direction).ok_or_else(|| {
                    Error::Validation(format!("invalid direction '{}'. Use: up or down", direction))
                })?;
                let moved = db.move_deck(id, dir)?;
                if cli.json {
                    print_ok(serde_json::json!({ "moved": moved }))?;
                } else if moved {
                    println!("Deck {} moved {}.", id, direction.to_lowercase());
                } else {
                    println!("Deck {} is already at the edge.", id);
                }
            }
        },

        Commands::Card(card_cmd) => match card_cmd {
            CardCommands::Add {
                deck,
                question,
                answer,
            } => {
                let id = db.add_card(deck, &question, &answer)?;
                if cli.json {
                    print_ok(serde_json::json!({ "id": id }))?;
                } else {
                    println!("Added card with ID: {}", id);
                }
            }

            CardCommands::Edit {
                id,
                question,
                answer,
            } => {
                db.edit_card(id, question.as_deref(), answer.as_deref())?;
                if cli.json {
                    print_ok(())?;
                } else {
                    println!("Card {} updated.", id);
                }
            }

            CardCommands::Delete { id } => {
                if !db.delete_card(id)? {
                    return Err(Error::not_found("card", id).into());
                }
                if cli.json {
                    print_ok(())?;
                } else {
                    println!("Card {} deleted.", id);
                }
            }
        },

        Commands::Train { deck, all } => {
            let user = require_user(&db, user_name)?;
            match scheduler.start_training(user.id, deck, all)? {
                Some(question) => {
                    if cli.json {
                        print_ok(&question)?;
                    } else {
                        print_question(&question);
                    }
                }
                None => {
                    if cli.json {
                        print_ok(())?;
                    } else {
                        println!("Nothing due in deck {}. Come back later!", deck);
                    }
                }
            }
        }

        Commands::Reveal { session } => {
            let user = require_user(&db, user_name)?;
            let question = scheduler
                .current_question(user.id, session)?
                .ok_or_else(|| Error::not_found("session", session))?;
            if cli.json {
                print_ok(&question)?;
            } else {
                println!("Q: {}", question.question);
                println!("A: {}", question.answer);
            }
        }

        Commands::Answer { session, answer } => {
            let user = require_user(&db, user_name)?;
            let quality = parse_quality(&answer)?;
            let next = scheduler.answer(user.id, session, quality)?;
            if cli.json {
                print_ok(&next)?;
            } else {
                match next {
                    NextState::Question(question) => print_question(&question),
                    NextState::Finished { shelf_id } => {
                        println!("Session complete.");
                        println!("See what else is due with `pamietacz due {}`.", shelf_id);
                    }
                }
            }
        }

        Commands::Due { shelf } => {
            let user = require_user(&db, user_name)?;
            let overview = scheduler.deck_overview(user.id, shelf)?;
            if cli.json {
                print_ok(&overview)?;
            } else if overview.is_empty() {
                println!("Shelf {} has no decks.", shelf);
            } else {
                println!("{:<5} {:<35} {:<7} {:<7} SESSION", "ID", "DECK", "CARDS", "DUE");
                println!("{}", "-".repeat(65));
                for row in overview {
                    let due = row
                        .due_count
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    let session = row
                        .session_id
                        .map(|id| format!("#{} in progress", id))
                        .unwrap_or_default();
                    println!(
                        "{:<5} {:<35} {:<7} {:<7} {}",
                        row.deck.id,
                        truncate(&row.deck.name, 33),
                        row.card_count,
                        due,
                        session
                    );
                }
            }
        }

        Commands::Progress { deck } => {
            let user = require_user(&db, user_name)?;
            let progress = scheduler.deck_progress(user.id, deck)?;
            if cli.json {
                print_ok(&progress)?;
            } else if progress.is_empty() {
                println!("Deck {} has no cards.", deck);
            } else {
                let now = db.now();
                println!(
                    "{:<35} {:>5} {:>6} {:>9}  DUE",
                    "QUESTION", "REPS", "EASE", "INTERVAL"
                );
                println!("{}", "-".repeat(80));
                let total = progress.len();
                for entry in progress {
                    let due = if entry.state.is_due(now) {
                        "now".to_string()
                    } else {
                        entry.state.due_at.format("%Y-%m-%d %H:%M").to_string()
                    };
                    println!(
                        "{:<35} {:>5} {:>6.2} {:>9.2}  {}",
                        truncate(&entry.card.question, 33),
                        entry.state.repetitions,
                        entry.state.easiness,
                        entry.state.interval_days,
                        due
                    );
                }
                println!();
                println!(
                    "{} of {} cards due.",
                    scheduler.deck_due_count(user.id, deck)?,
                    total
                );
            }
        }

        Commands::Export { path } => {
            let data = dump::export_to_path(&db, &path)?;
            if cli.json {
                print_ok(serde_json::json!({ "shelves": data.shelves.len() }))?;
            } else {
                println!("Exported {} shelves to {}", data.shelves.len(), path.display());
            }
        }

        Commands::Import { path } => {
            let stats = dump::import_from_path(&db, &path)?;
            if cli.json {
                print_ok(stats)?;
            } else {
                println!(
                    "Imported {} shelves, {} decks, {} cards from {}",
                    stats.shelves,
                    stats.decks,
                    stats.cards,
                    path.display()
                );
            }
        }

        Commands::Tui => {
            let user = require_user(&db, user_name)?;
            tui::run(&scheduler, user)?;
        }
    }

    Ok(())
}

fn print_question(question: &Question) {
    println!(
        "Session {} ({}/{})",
        question.session_id, question.position, question.total
    );
    println!();
    println!("Q: {}", question.question);
    println!();
    println!("Reveal with:  pamietacz reveal {}", question.session_id);
    println!(
        "Answer with:  pamietacz answer {} <good|bad>",
        question.session_id
    );
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
