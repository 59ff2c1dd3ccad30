//! Entry points for training: ties pools, sessions and the strength tracker
//! together and checks who may touch what.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::config::SchedulerConfig;
use crate::db::catalog::card_from_row;
use crate::db::{pool, session, Database};
use crate::error::{Error, Result};
use crate::models::{
    Answer, CardProgress, CardState, DeckOverview, NextState, Quality, Question, Shelf,
    TrainingPool, TrainingSession,
};

pub struct Scheduler<'a> {
    db: &'a Database,
    config: SchedulerConfig,
    rng: RefCell<StdRng>,
}

impl<'a> Scheduler<'a> {
    pub fn new(db: &'a Database, config: SchedulerConfig) -> Self {
        Self {
            db,
            config,
            rng: RefCell::new(StdRng::from_entropy()),
        }
    }

    /// Fixes the shuffle order, for reproducible sessions.
    #[cfg(test)]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = RefCell::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Opens (or resumes) the user's session for the deck and returns its
    /// current question. `None` when nothing in the deck is due.
    pub fn start_training(
        &self,
        user_id: i64,
        deck_id: i64,
        all_cards: bool,
    ) -> Result<Option<Question>> {
        let now = self.db.now();
        let tx = self.db.transaction()?;
        self.require_started_deck(user_id, deck_id)?;
        let pool = pool::get_or_create(&tx, user_id, deck_id, now)?;
        let session = session::get_or_create(
            &tx,
            user_id,
            deck_id,
            &pool,
            all_cards,
            &self.config,
            &mut *self.rng.borrow_mut(),
            now,
        )?;

        let question = match session {
            Some(session) => match session::current_card(&tx, &session)? {
                Some(state) => Some(question_for(&tx, &session, &state)?),
                None => None,
            },
            None => None,
        };
        tx.commit()?;

        Ok(question)
    }

    pub fn current_question(&self, user_id: i64, session_id: i64) -> Result<Option<Question>> {
        let conn = self.db.conn();
        let session = owned_session(conn, user_id, session_id)?;
        match session::current_card(conn, &session)? {
            Some(state) => Ok(Some(question_for(conn, &session, &state)?)),
            None => Ok(None),
        }
    }

    /// Records the answer for the session's current card. The state update and
    /// the cursor move commit together.
    pub fn answer(&self, user_id: i64, session_id: i64, quality: Quality) -> Result<NextState> {
        let now = self.db.now();
        let tx = self.db.transaction()?;
        let mut session = owned_session(&tx, user_id, session_id)?;

        let next = match session::submit_answer(&tx, &mut session, quality, &self.config, now)? {
            Some(state) => NextState::Question(question_for(&tx, &session, &state)?),
            None => NextState::Finished {
                shelf_id: shelf_of(&tx, session.deck_id)?,
            },
        };
        tx.commit()?;

        Ok(next)
    }

    pub fn answer_with(&self, user_id: i64, session_id: i64, answer: Answer) -> Result<NextState> {
        self.answer(user_id, session_id, answer.quality())
    }

    /// Due counts keyed by deck id, for the shelf's decks the user has trained.
    pub fn due_summary(&self, user_id: i64, shelf_id: i64) -> Result<BTreeMap<i64, i64>> {
        if self.db.get_shelf(shelf_id)?.is_none() {
            return Err(Error::not_found("shelf", shelf_id));
        }
        self.require_started(user_id, shelf_id)?;
        let counts = pool::due_counts_for_shelf(self.db.conn(), user_id, shelf_id, self.db.now())?;
        Ok(counts.into_iter().collect())
    }

    /// Started shelves with the number of cards due across their decks.
    pub fn shelf_due_totals(&self, user_id: i64) -> Result<Vec<(Shelf, i64)>> {
        let now = self.db.now();
        self.db
            .started_shelves(user_id)?
            .into_iter()
            .map(|shelf| {
                let due = pool::due_counts_for_shelf(self.db.conn(), user_id, shelf.id, now)?
                    .into_iter()
                    .map(|(_, count)| count)
                    .sum();
                Ok((shelf, due))
            })
            .collect()
    }

    pub fn deck_overview(&self, user_id: i64, shelf_id: i64) -> Result<Vec<DeckOverview>> {
        let due = self.due_summary(user_id, shelf_id)?;
        let conn = self.db.conn();

        self.db
            .list_decks(shelf_id)?
            .into_iter()
            .map(|deck| {
                let card_count = self.db.deck_card_count(deck.id)?;
                let session_id = session::find(conn, user_id, deck.id)?.map(|s| s.id);
                Ok(DeckOverview {
                    due_count: due.get(&deck.id).copied(),
                    card_count,
                    session_id,
                    deck,
                })
            })
            .collect()
    }

    /// Every card state of the user's pool for the deck, soonest due first.
    pub fn deck_progress(&self, user_id: i64, deck_id: i64) -> Result<Vec<CardProgress>> {
        let pool = self.trained_pool(user_id, deck_id)?;
        pool::states_with_cards(self.db.conn(), pool.id)
    }

    /// Cards of the user's pool for the deck that are due now.
    pub fn deck_due_count(&self, user_id: i64, deck_id: i64) -> Result<i64> {
        let pool = self.trained_pool(user_id, deck_id)?;
        pool::due_count(self.db.conn(), pool.id, self.db.now())
    }

    pub fn start_shelf(&self, user_id: i64, shelf_id: i64) -> Result<bool> {
        self.db.start_shelf(user_id, shelf_id)
    }

    pub fn stop_shelf(&self, user_id: i64, shelf_id: i64) -> Result<bool> {
        self.db.stop_shelf(user_id, shelf_id)
    }

    fn trained_pool(&self, user_id: i64, deck_id: i64) -> Result<TrainingPool> {
        self.require_started_deck(user_id, deck_id)?;
        pool::get(self.db.conn(), user_id, deck_id)?.ok_or_else(|| {
            Error::NotFound(format!("no training for user {} in deck {}", user_id, deck_id))
        })
    }

    fn require_started_deck(&self, user_id: i64, deck_id: i64) -> Result<()> {
        let deck = self
            .db
            .get_deck(deck_id)?
            .ok_or_else(|| Error::not_found("deck", deck_id))?;
        self.require_started(user_id, deck.shelf_id)
    }

    fn require_started(&self, user_id: i64, shelf_id: i64) -> Result<()> {
        if self.db.get_user(user_id)?.is_none() {
            return Err(Error::not_found("user", user_id));
        }
        if !self.db.has_started_shelf(user_id, shelf_id)? {
            return Err(Error::NotFound(format!(
                "shelf {} is not started by user {}",
                shelf_id, user_id
            )));
        }
        Ok(())
    }
}

fn owned_session(conn: &Connection, user_id: i64, session_id: i64) -> Result<TrainingSession> {
    let session =
        session::get(conn, session_id)?.ok_or_else(|| Error::not_found("session", session_id))?;
    if session.user_id != user_id {
        log::warn!(
            "User {} tried to use session {} of user {}",
            user_id,
            session_id,
            session.user_id
        );
        return Err(Error::Forbidden);
    }
    Ok(session)
}

fn question_for(conn: &Connection, session: &TrainingSession, state: &CardState) -> Result<Question> {
    let card = conn
        .query_row(
            "SELECT id, deck_id, question, answer FROM cards WHERE id = ?1",
            params![state.card_id],
            card_from_row,
        )
        .optional()?
        .ok_or_else(|| Error::not_found("card", state.card_id))?;

    Ok(Question {
        session_id: session.id,
        card_id: card.id,
        card_state_id: state.id,
        question: card.question,
        answer: card.answer,
        position: session.cursor + 1,
        total: session.card_state_ids.len(),
    })
}

fn shelf_of(conn: &Connection, deck_id: i64) -> Result<i64> {
    conn.query_row(
        "SELECT shelf_id FROM decks WHERE id = ?1",
        params![deck_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| Error::not_found("deck", deck_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::*;
    use chrono::Duration;

    fn scheduler(db: &Database) -> Scheduler<'_> {
        Scheduler::new(db, SchedulerConfig::default()).with_seed(42)
    }

    fn good() -> Quality {
        Answer::Good.quality()
    }

    /// Answers every card of the session with the same quality.
    fn finish(s: &Scheduler, user_id: i64, first: &Question, quality: Quality) -> NextState {
        let mut next = s.answer(user_id, first.session_id, quality).unwrap();
        while let NextState::Question(q) = &next {
            next = s.answer(user_id, q.session_id, quality).unwrap();
        }
        next
    }

    mod training_tests {
        use super::*;

        #[test]
        fn start_training_returns_first_question() {
            let (db, _) = setup_db();
            let f = fixture(&db, 3);
            let s = scheduler(&db);

            let q = s.start_training(f.user_id, f.deck_id, false).unwrap().unwrap();
            assert_eq!(q.position, 1);
            assert_eq!(q.total, 3);
            assert!(f.card_ids.contains(&q.card_id));
            assert!(q.question.starts_with("question "));
        }

        #[test]
        fn start_training_resumes_open_session() {
            let (db, _) = setup_db();
            let f = fixture(&db, 3);
            let s = scheduler(&db);

            let first = s.start_training(f.user_id, f.deck_id, false).unwrap().unwrap();
            s.answer(f.user_id, first.session_id, good()).unwrap();

            let resumed = s.start_training(f.user_id, f.deck_id, true).unwrap().unwrap();
            assert_eq!(resumed.session_id, first.session_id);
            assert_eq!(resumed.position, 2);
        }

        #[test]
        fn session_capped_unless_all_cards() {
            let (db, _) = setup_db();
            let f = fixture(&db, 20);
            let bob = db.add_user("bob").unwrap();
            db.start_shelf(bob, f.shelf_id).unwrap();
            let s = scheduler(&db);

            let capped = s.start_training(f.user_id, f.deck_id, false).unwrap().unwrap();
            assert_eq!(capped.total, 10);

            let all = s.start_training(bob, f.deck_id, true).unwrap().unwrap();
            assert_eq!(all.total, 20);
        }

        #[test]
        fn empty_deck_has_nothing_to_train() {
            let (db, _) = setup_db();
            let f = fixture(&db, 0);
            let s = scheduler(&db);

            assert!(s.start_training(f.user_id, f.deck_id, false).unwrap().is_none());
            assert!(session::find(db.conn(), f.user_id, f.deck_id).unwrap().is_none());
            assert!(pool::get(db.conn(), f.user_id, f.deck_id).unwrap().is_some());
        }

        #[test]
        fn missing_deck_is_not_found() {
            let (db, _) = setup_db();
            let f = fixture(&db, 1);
            let s = scheduler(&db);
            assert!(matches!(
                s.start_training(f.user_id, 999, false),
                Err(Error::NotFound(_))
            ));
        }

        #[test]
        fn unstarted_shelf_is_not_found() {
            let (db, _) = setup_db();
            let f = fixture(&db, 1);
            let bob = db.add_user("bob").unwrap();
            let s = scheduler(&db);

            assert!(matches!(
                s.start_training(bob, f.deck_id, false),
                Err(Error::NotFound(_))
            ));
            assert!(pool::get(db.conn(), bob, f.deck_id).unwrap().is_none());
        }

        #[test]
        fn answering_every_card_finishes_with_shelf() {
            let (db, _) = setup_db();
            let f = fixture(&db, 4);
            let s = scheduler(&db);

            let first = s.start_training(f.user_id, f.deck_id, false).unwrap().unwrap();
            let end = finish(&s, f.user_id, &first, good());
            assert_eq!(end, NextState::Finished { shelf_id: f.shelf_id });

            assert!(matches!(
                s.current_question(f.user_id, first.session_id),
                Err(Error::NotFound(_))
            ));
            assert!(matches!(
                s.answer(f.user_id, first.session_id, good()),
                Err(Error::NotFound(_))
            ));
        }

        #[test]
        fn positions_count_up_through_session() {
            let (db, _) = setup_db();
            let f = fixture(&db, 3);
            let s = scheduler(&db);

            let first = s.start_training(f.user_id, f.deck_id, false).unwrap().unwrap();
            let NextState::Question(second) = s.answer(f.user_id, first.session_id, good()).unwrap()
            else {
                panic!("expected a second question");
            };
            assert_eq!(second.position, 2);
            assert_ne!(second.card_id, first.card_id);
            assert_eq!(
                s.current_question(f.user_id, first.session_id).unwrap(),
                Some(second)
            );
        }

        #[test]
        fn answered_cards_are_not_due_again_right_away() {
            let (db, _) = setup_db();
            let f = fixture(&db, 3);
            let s = scheduler(&db);

            let first = s.start_training(f.user_id, f.deck_id, false).unwrap().unwrap();
            finish(&s, f.user_id, &first, good());

            assert!(s.start_training(f.user_id, f.deck_id, false).unwrap().is_none());
            assert_eq!(s.due_summary(f.user_id, f.shelf_id).unwrap()[&f.deck_id], 0);
        }

        #[test]
        fn bad_answers_stay_due() {
            let (db, _) = setup_db();
            let f = fixture(&db, 2);
            let s = scheduler(&db);

            let first = s.start_training(f.user_id, f.deck_id, false).unwrap().unwrap();
            finish(&s, f.user_id, &first, Answer::Bad.quality());

            let again = s.start_training(f.user_id, f.deck_id, false).unwrap().unwrap();
            assert_eq!(again.total, 2);
            assert_ne!(again.session_id, first.session_id);
        }

        #[test]
        fn one_card_twice_at_same_instant() {
            let (db, _) = setup_db();
            let f = fixture(&db, 1);
            let s = scheduler(&db);

            let q = s.start_training(f.user_id, f.deck_id, false).unwrap().unwrap();
            s.answer(f.user_id, q.session_id, good()).unwrap();
            let progress = s.deck_progress(f.user_id, f.deck_id).unwrap();
            assert_eq!(progress[0].state.due_at, t0() + Duration::seconds(1440));

            // Not due yet, so train the whole deck through a fresh session
            // built by hand from the pool.
            let state_id = progress[0].state.id;
            db.conn()
                .execute(
                    "INSERT INTO training_sessions (user_id, deck_id, card_state_ids, cursor, created_at)
                     VALUES (?1, ?2, ?3, 0, 0)",
                    params![f.user_id, f.deck_id, format!("[{}]", state_id)],
                )
                .unwrap();
            let session_id = db.conn().last_insert_rowid();

            s.answer(f.user_id, session_id, good()).unwrap();
            let progress = s.deck_progress(f.user_id, f.deck_id).unwrap();
            assert_eq!(progress[0].state.due_at, t0() + Duration::seconds(8640));
        }

        #[test]
        fn card_due_again_after_interval() {
            let (db, clock) = setup_db();
            let f = fixture(&db, 1);
            let s = scheduler(&db);

            let q = s.start_training(f.user_id, f.deck_id, false).unwrap().unwrap();
            s.answer(f.user_id, q.session_id, good()).unwrap();

            clock.advance(Duration::seconds(1439));
            assert!(s.start_training(f.user_id, f.deck_id, false).unwrap().is_none());

            clock.advance(Duration::seconds(1));
            assert!(s.start_training(f.user_id, f.deck_id, false).unwrap().is_some());
        }

        #[test]
        fn out_of_range_quality_is_rejected_before_storage() {
            assert!(matches!(Quality::new(7), Err(Error::InvalidQuality(7))));
        }
    }

    mod ownership_tests {
        use super::*;

        #[test]
        fn other_users_session_is_forbidden() {
            let (db, _) = setup_db();
            let f = fixture(&db, 2);
            let bob = db.add_user("bob").unwrap();
            let s = scheduler(&db);

            let q = s.start_training(f.user_id, f.deck_id, false).unwrap().unwrap();

            assert!(matches!(
                s.current_question(bob, q.session_id),
                Err(Error::Forbidden)
            ));
            assert!(matches!(
                s.answer(bob, q.session_id, good()),
                Err(Error::Forbidden)
            ));
            // Nothing moved
            assert_eq!(
                s.current_question(f.user_id, q.session_id).unwrap().unwrap().position,
                1
            );
        }

        #[test]
        fn unknown_session_is_not_found() {
            let (db, _) = setup_db();
            let f = fixture(&db, 1);
            let s = scheduler(&db);
            assert!(matches!(
                s.current_question(f.user_id, 77),
                Err(Error::NotFound(_))
            ));
        }
    }

    mod summary_tests {
        use super::*;

        #[test]
        fn due_summary_lists_trained_decks_only() {
            let (db, _) = setup_db();
            let f = fixture(&db, 3);
            let other = db.add_deck(f.shelf_id, "Untrained").unwrap();
            db.add_card(other, "q", "a").unwrap();
            let s = scheduler(&db);

            s.start_training(f.user_id, f.deck_id, false).unwrap();

            let summary = s.due_summary(f.user_id, f.shelf_id).unwrap();
            assert_eq!(summary.len(), 1);
            assert_eq!(summary[&f.deck_id], 3);
        }

        #[test]
        fn shelf_views_require_a_started_shelf() {
            let (db, _) = setup_db();
            let f = fixture(&db, 2);
            let bob = db.add_user("bob").unwrap();
            let s = scheduler(&db);

            assert!(matches!(
                s.due_summary(bob, f.shelf_id),
                Err(Error::NotFound(_))
            ));
            assert!(matches!(
                s.deck_overview(bob, f.shelf_id),
                Err(Error::NotFound(_))
            ));

            db.start_shelf(bob, f.shelf_id).unwrap();
            assert_eq!(s.deck_overview(bob, f.shelf_id).unwrap().len(), 1);
        }

        #[test]
        fn deck_progress_after_stop_is_not_found() {
            let (db, _) = setup_db();
            let f = fixture(&db, 1);
            let s = scheduler(&db);
            s.start_training(f.user_id, f.deck_id, false).unwrap();

            db.conn()
                .execute(
                    "DELETE FROM user_shelves WHERE user_id = ?1",
                    params![f.user_id],
                )
                .unwrap();

            assert!(pool::get(db.conn(), f.user_id, f.deck_id).unwrap().is_some());
            assert!(matches!(
                s.deck_progress(f.user_id, f.deck_id),
                Err(Error::NotFound(_))
            ));
            assert!(matches!(
                s.deck_due_count(f.user_id, f.deck_id),
                Err(Error::NotFound(_))
            ));
        }

        #[test]
        fn deck_due_count_follows_answers() {
            let (db, clock) = setup_db();
            let f = fixture(&db, 2);
            let s = scheduler(&db);
            let q = s.start_training(f.user_id, f.deck_id, false).unwrap().unwrap();
            assert_eq!(s.deck_due_count(f.user_id, f.deck_id).unwrap(), 2);

            s.answer(f.user_id, q.session_id, good()).unwrap();
            assert_eq!(s.deck_due_count(f.user_id, f.deck_id).unwrap(), 1);

            clock.advance(Duration::seconds(1440));
            assert_eq!(s.deck_due_count(f.user_id, f.deck_id).unwrap(), 2);
        }

        #[test]
        fn failed_start_leaves_no_pool() {
            let (db, _) = setup_db();
            let f = fixture(&db, 1);
            let bob = db.add_user("bob").unwrap();
            let s = scheduler(&db);

            assert!(matches!(
                s.start_training(bob, f.deck_id, false),
                Err(Error::NotFound(_))
            ));
            assert!(pool::get(db.conn(), bob, f.deck_id).unwrap().is_none());
        }

        #[test]
        fn due_summary_for_missing_shelf() {
            let (db, _) = setup_db();
            let f = fixture(&db, 1);
            let s = scheduler(&db);
            assert!(matches!(
                s.due_summary(f.user_id, 404),
                Err(Error::NotFound(_))
            ));
        }

        #[test]
        fn shelf_totals_sum_decks() {
            let (db, _) = setup_db();
            let f = fixture(&db, 2);
            let second = db.add_deck(f.shelf_id, "Czech").unwrap();
            for i in 0..3 {
                db.add_card(second, &format!("q{}", i), "a").unwrap();
            }
            let s = scheduler(&db);
            s.start_training(f.user_id, f.deck_id, false).unwrap();
            s.start_training(f.user_id, second, false).unwrap();

            let totals = s.shelf_due_totals(f.user_id).unwrap();
            assert_eq!(totals.len(), 1);
            assert_eq!(totals[0].0.id, f.shelf_id);
            assert_eq!(totals[0].1, 5);
        }

        #[test]
        fn deck_overview_marks_open_sessions() {
            let (db, _) = setup_db();
            let f = fixture(&db, 2);
            let other = db.add_deck(f.shelf_id, "Czech").unwrap();
            let s = scheduler(&db);
            let q = s.start_training(f.user_id, f.deck_id, false).unwrap().unwrap();

            let overview = s.deck_overview(f.user_id, f.shelf_id).unwrap();
            assert_eq!(overview.len(), 2);
            assert_eq!(overview[0].deck.id, f.deck_id);
            assert_eq!(overview[0].card_count, 2);
            assert_eq!(overview[0].due_count, Some(2));
            assert_eq!(overview[0].session_id, Some(q.session_id));
            assert_eq!(overview[1].deck.id, other);
            assert_eq!(overview[1].due_count, None);
            assert_eq!(overview[1].session_id, None);
        }

        #[test]
        fn deck_progress_without_training_is_not_found() {
            let (db, _) = setup_db();
            let f = fixture(&db, 1);
            let s = scheduler(&db);
            assert!(matches!(
                s.deck_progress(f.user_id, f.deck_id),
                Err(Error::NotFound(_))
            ));
        }
    }

    mod shelf_tests {
        use super::*;

        #[test]
        fn stop_shelf_forgets_training() {
            let (db, _) = setup_db();
            let f = fixture(&db, 2);
            let s = scheduler(&db);
            let q = s.start_training(f.user_id, f.deck_id, false).unwrap().unwrap();

            assert!(s.stop_shelf(f.user_id, f.shelf_id).unwrap());

            assert!(pool::get(db.conn(), f.user_id, f.deck_id).unwrap().is_none());
            assert!(session::get(db.conn(), q.session_id).unwrap().is_none());
            assert!(s.shelf_due_totals(f.user_id).unwrap().is_empty());
            assert!(matches!(
                s.start_training(f.user_id, f.deck_id, false),
                Err(Error::NotFound(_))
            ));
        }

        #[test]
        fn restarting_shelf_starts_fresh() {
            let (db, _) = setup_db();
            let f = fixture(&db, 1);
            let s = scheduler(&db);
            let q = s.start_training(f.user_id, f.deck_id, false).unwrap().unwrap();
            s.answer(f.user_id, q.session_id, good()).unwrap();

            s.stop_shelf(f.user_id, f.shelf_id).unwrap();
            assert!(s.start_shelf(f.user_id, f.shelf_id).unwrap());

            let again = s.start_training(f.user_id, f.deck_id, false).unwrap().unwrap();
            assert_eq!(again.total, 1);
            let progress = s.deck_progress(f.user_id, f.deck_id).unwrap();
            assert_eq!(progress[0].state.repetitions, 0);
        }

        #[test]
        fn stop_shelf_leaves_other_users_alone() {
            let (db, _) = setup_db();
            let f = fixture(&db, 1);
            let bob = db.add_user("bob").unwrap();
            db.start_shelf(bob, f.shelf_id).unwrap();
            let s = scheduler(&db);
            s.start_training(f.user_id, f.deck_id, false).unwrap();
            s.start_training(bob, f.deck_id, false).unwrap();

            s.stop_shelf(f.user_id, f.shelf_id).unwrap();

            assert!(pool::get(db.conn(), bob, f.deck_id).unwrap().is_some());
            assert!(session::find(db.conn(), bob, f.deck_id).unwrap().is_some());
        }
    }

    mod catalog_sync_tests {
        use super::*;

        #[test]
        fn new_card_is_due_in_existing_pool() {
            let (db, clock) = setup_db();
            let f = fixture(&db, 1);
            let s = scheduler(&db);
            let q = s.start_training(f.user_id, f.deck_id, false).unwrap().unwrap();
            finish(&s, f.user_id, &q, good());

            clock.advance(Duration::minutes(1));
            db.add_card(f.deck_id, "fresh", "card").unwrap();

            let next = s.start_training(f.user_id, f.deck_id, false).unwrap().unwrap();
            assert_eq!(next.question, "fresh");
            assert_eq!(next.total, 1);
        }

        #[test]
        fn deleting_queued_card_shortens_open_session() {
            let (db, _) = setup_db();
            let f = fixture(&db, 3);
            let s = scheduler(&db);
            let q = s.start_training(f.user_id, f.deck_id, false).unwrap().unwrap();

            let queued = f
                .card_ids
                .iter()
                .copied()
                .find(|&id| id != q.card_id)
                .unwrap();
            db.delete_card(queued).unwrap();

            let current = s.current_question(f.user_id, q.session_id).unwrap().unwrap();
            assert_eq!(current.card_id, q.card_id);
            assert_eq!(current.total, 2);
            let end = finish(&s, f.user_id, &current, good());
            assert_eq!(end, NextState::Finished { shelf_id: f.shelf_id });
        }
    }
}
