mod ui;
mod widgets;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::models::{Answer, DeckOverview, NextState, Question, Shelf, User};
use crate::scheduler::Scheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Shelves,
    Decks,
    Training,
}

pub struct StatefulList<T> {
    pub items: Vec<T>,
    pub selected: Option<usize>,
}

impl<T> StatefulList<T> {
    fn with_items(items: Vec<T>) -> Self {
        let selected = if items.is_empty() { None } else { Some(0) };
        Self { items, selected }
    }

    /// Replaces the items, keeping the selection where it still fits.
    fn replace(&mut self, items: Vec<T>) {
        self.selected = match self.selected {
            _ if items.is_empty() => None,
            Some(i) => Some(i.min(items.len() - 1)),
            None => Some(0),
        };
        self.items = items;
    }

    fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) if i + 1 < self.items.len() => i + 1,
            _ => 0,
        };
        self.selected = Some(i);
    }

    fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(0) | None => self.items.len() - 1,
            Some(i) => i - 1,
        };
        self.selected = Some(i);
    }

    fn first(&mut self) {
        if !self.items.is_empty() {
            self.selected = Some(0);
        }
    }

    fn last(&mut self) {
        if !self.items.is_empty() {
            self.selected = Some(self.items.len() - 1);
        }
    }

    fn selected_item(&self) -> Option<&T> {
        self.selected.and_then(|i| self.items.get(i))
    }
}

/// The card being trained and whether its answer is showing.
pub struct Training {
    pub deck_name: String,
    pub question: Question,
    pub revealed: bool,
}

pub struct App<'a> {
    scheduler: &'a Scheduler<'a>,
    pub user: User,
    pub view: View,
    pub shelves: StatefulList<(Shelf, i64)>,
    pub decks: StatefulList<DeckOverview>,
    pub current_shelf: Option<Shelf>,
    pub training: Option<Training>,
    pub status: Option<String>,
    pub should_quit: bool,
}

impl<'a> App<'a> {
    pub fn new(scheduler: &'a Scheduler<'a>, user: User) -> crate::error::Result<Self> {
        let shelves = scheduler.shelf_due_totals(user.id)?;
        Ok(Self {
            scheduler,
            user,
            view: View::Shelves,
            shelves: StatefulList::with_items(shelves),
            decks: StatefulList::with_items(Vec::new()),
            current_shelf: None,
            training: None,
            status: None,
            should_quit: false,
        })
    }

    pub fn refresh_data(&mut self) -> crate::error::Result<()> {
        self.shelves
            .replace(self.scheduler.shelf_due_totals(self.user.id)?);
        if let Some(shelf) = &self.current_shelf {
            self.decks
                .replace(self.scheduler.deck_overview(self.user.id, shelf.id)?);
        }
        Ok(())
    }

    fn open_shelf(&mut self) -> crate::error::Result<()> {
        let Some((shelf, _)) = self.shelves.selected_item() else {
            return Ok(());
        };
        let shelf = shelf.clone();
        self.decks = StatefulList::with_items(self.scheduler.deck_overview(self.user.id, shelf.id)?);
        self.current_shelf = Some(shelf);
        self.view = View::Decks;
        Ok(())
    }

    fn start_training(&mut self, all_cards: bool) -> crate::error::Result<()> {
        let Some(overview) = self.decks.selected_item() else {
            return Ok(());
        };
        let deck_name = overview.deck.name.clone();
        let deck_id = overview.deck.id;

        match self
            .scheduler
            .start_training(self.user.id, deck_id, all_cards)?
        {
            Some(question) => {
                self.training = Some(Training {
                    deck_name,
                    question,
                    revealed: false,
                });
                self.status = None;
                self.view = View::Training;
            }
            None => {
                self.status = Some(format!("Nothing due in {}", deck_name));
                self.refresh_data()?;
            }
        }
        Ok(())
    }

    fn answer(&mut self, answer: Answer) -> crate::error::Result<()> {
        let Some(training) = &mut self.training else {
            return Ok(());
        };
        if !training.revealed {
            return Ok(());
        }

        let next = self.scheduler.answer_with(
            self.user.id,
            training.question.session_id,
            answer,
        )?;
        match next {
            NextState::Question(question) => {
                training.question = question;
                training.revealed = false;
            }
            NextState::Finished { .. } => {
                self.status = Some(format!("Finished {}", training.deck_name));
                self.training = None;
                self.view = View::Decks;
                self.refresh_data()?;
            }
        }
        Ok(())
    }

    fn leave_training(&mut self) -> crate::error::Result<()> {
        self.training = None;
        self.view = View::Decks;
        self.refresh_data()
    }

    fn back(&mut self) -> crate::error::Result<()> {
        match self.view {
            View::Training => self.leave_training()?,
            View::Decks => {
                self.current_shelf = None;
                self.view = View::Shelves;
                self.refresh_data()?;
            }
            View::Shelves => {}
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) -> crate::error::Result<()> {
        if self.view == View::Training {
            match key {
                KeyCode::Char(' ') | KeyCode::Enter => {
                    if let Some(training) = &mut self.training {
                        training.revealed = true;
                    }
                }
                KeyCode::Char('g') | KeyCode::Char('y') => self.answer(Answer::Good)?,
                KeyCode::Char('b') | KeyCode::Char('n') => self.answer(Answer::Bad)?,
                KeyCode::Char('h') | KeyCode::Left | KeyCode::Esc => self.leave_training()?,
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            }
            return Ok(());
        }

        match key {
            KeyCode::Char('q') => self.should_quit = true,

            KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.refresh_data()?;
            }

            KeyCode::Char('h') | KeyCode::Left | KeyCode::Esc => self.back()?,

            KeyCode::Char('l') | KeyCode::Right | KeyCode::Enter => match self.view {
                View::Shelves => self.open_shelf()?,
                View::Decks => self.start_training(false)?,
                View::Training => {}
            },

            // Train every due card, not just a sample
            KeyCode::Char('a') if self.view == View::Decks => self.start_training(true)?,

            KeyCode::Char('j') | KeyCode::Down => match self.view {
                View::Shelves => self.shelves.next(),
                View::Decks => self.decks.next(),
                View::Training => {}
            },
            KeyCode::Char('k') | KeyCode::Up => match self.view {
                View::Shelves => self.shelves.previous(),
                View::Decks => self.decks.previous(),
                View::Training => {}
            },

            KeyCode::Char('g') => match self.view {
                View::Shelves => self.shelves.first(),
                View::Decks => self.decks.first(),
                View::Training => {}
            },
            KeyCode::Char('G') => match self.view {
                View::Shelves => self.shelves.last(),
                View::Decks => self.decks.last(),
                View::Training => {}
            },

            _ => {}
        }
        Ok(())
    }
}

pub fn run(scheduler: &Scheduler, user: User) -> Result<(), Box<dyn std::error::Error>> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = match App::new(scheduler, user) {
        Ok(mut app) => run_app(&mut terminal, &mut app),
        Err(e) => Err(e.into()),
    };

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key.code, key.modifiers)?;
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
