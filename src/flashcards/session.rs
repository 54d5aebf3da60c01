//! Memorization sessions
//!
//! A session works on detached copies of a set's due cards, shuffled into a
//! queue. Each card has to be recalled correctly twice in a row within the
//! sitting:
//!
//! ```text
//! NotSeen --success--> SeenOnce --success--> Mastered (leaves the queue)
//!    ^                    |
//!    +------failure-------+
//! ```
//!
//! The queue is split into a head segment of cards still being learned and a
//! tail segment of cards answered correctly once. A correct first answer
//! sends the card somewhere into the tail segment; a miss sends it back into
//! the head segment so it comes around again sooner.
//!
//! Mastered cards are committed to the store one by one as they leave the
//! queue. The set rollup is committed once, when the last card is mastered.
//! Abandoning a session keeps the per-card commits already made.

use std::fmt;

use chrono::NaiveDate;
use rand::Rng;
use thiserror::Error;
use uuid::Uuid;

use super::algorithm::{ScheduleError, SpacedRepetitionPolicy};
use super::collection::{CardCollection, CollectionError, NodeId};
use super::models::{Card, CardSet, SessionState, SetRollup};
use super::storage::{FlashcardStorageError, Result as StoreResult};

/// User action applied to the current card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    RecallSuccess,
    RecallFailure,
}

impl fmt::Display for SessionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RecallSuccess => "recall",
            Self::RecallFailure => "forget",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Cannot {action} card {card} in state {state:?}")]
    InvalidTransition {
        card: Uuid,
        state: SessionState,
        action: SessionAction,
    },

    #[error("Session is already finished")]
    Finished,

    #[error("Set {0} rollup not committed yet, finalize the session")]
    RollupPending(Uuid),

    #[error("No cards due in set {0}")]
    NothingDue(Uuid),

    #[error("Collection error: {0}")]
    Collection(#[from] CollectionError),

    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("Storage error: {0}")]
    Storage(#[from] FlashcardStorageError),
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Persistence the session commits through
pub trait ScheduleStore {
    fn load_set_rollup(&self, set_id: Uuid) -> StoreResult<SetRollup>;

    /// Cards of the set with `memorization_date <= today` that are not finished
    fn load_due_cards(&self, set_id: Uuid, today: NaiveDate) -> StoreResult<Vec<Card>>;

    fn commit_card_schedule(
        &self,
        card_id: Uuid,
        box_level: u8,
        memorization_date: NaiveDate,
    ) -> StoreResult<()>;

    fn commit_set_rollup(
        &self,
        set_id: Uuid,
        last_modified: NaiveDate,
        await_date: NaiveDate,
    ) -> StoreResult<()>;
}

impl<T: ScheduleStore + ?Sized> ScheduleStore for &T {
    fn load_set_rollup(&self, set_id: Uuid) -> StoreResult<SetRollup> {
        (**self).load_set_rollup(set_id)
    }

    fn load_due_cards(&self, set_id: Uuid, today: NaiveDate) -> StoreResult<Vec<Card>> {
        (**self).load_due_cards(set_id, today)
    }

    fn commit_card_schedule(
        &self,
        card_id: Uuid,
        box_level: u8,
        memorization_date: NaiveDate,
    ) -> StoreResult<()> {
        (**self).commit_card_schedule(card_id, box_level, memorization_date)
    }

    fn commit_set_rollup(
        &self,
        set_id: Uuid,
        last_modified: NaiveDate,
        await_date: NaiveDate,
    ) -> StoreResult<()> {
        (**self).commit_set_rollup(set_id, last_modified, await_date)
    }
}

/// Within-sitting spacing of repeats. Unrelated to the across-days interval
/// table: it only decides where in the queue a card re-enters.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionPacing;

impl SessionPacing {
    /// Insertion range for a card just answered correctly for the first time:
    /// `[len - once_seen - 1, len - 1]`, the tail segment.
    ///
    /// `queue_len` counts the card itself; `once_seen` does not.
    pub fn seen_once_range(queue_len: usize, once_seen: usize) -> (usize, usize) {
        let end = queue_len.saturating_sub(1);
        (end.saturating_sub(once_seen), end)
    }

    /// Insertion range for a missed card: `[0, len - once_seen - 1]`, the head
    /// segment. `once_seen` is the count after the miss has been applied.
    pub fn relearn_range(queue_len: usize, once_seen: usize) -> (usize, usize) {
        (0, queue_len.saturating_sub(once_seen + 1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    /// Every card is mastered but the set rollup has not been committed yet.
    /// Only `finalize` leaves this state.
    PendingRollup,
    Completed,
}

/// What a successful transition led to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Another card is up
    Advanced,
    /// The last card was mastered and the set rollup committed
    Completed,
    /// The last card was mastered but the rollup commit failed; retry with
    /// `finalize`
    RollupPending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub set_id: Uuid,
    pub completed: bool,
    pub mastered: usize,
    pub total: usize,
    pub await_date: NaiveDate,
}

pub struct MemorizationSession<S, R> {
    set_id: Uuid,
    store: S,
    rng: R,
    policy: SpacedRepetitionPolicy,
    today: NaiveDate,
    queue: CardCollection,
    current: Option<NodeId>,
    once_seen: usize,
    total: usize,
    mastered: Vec<Card>,
    rollup: SetRollup,
    status: SessionStatus,
}

impl<S, R> MemorizationSession<S, R>
where
    S: ScheduleStore,
    R: Rng,
{
    /// Load the set's due cards from `store` and shuffle them into a queue
    pub fn start(
        set_id: Uuid,
        store: S,
        policy: SpacedRepetitionPolicy,
        rng: R,
        today: NaiveDate,
    ) -> Result<Self> {
        let rollup = store.load_set_rollup(set_id)?;
        let cards = store.load_due_cards(set_id, today)?;
        Self::with_cards(set_id, cards, rollup, store, policy, rng, today)
    }

    /// Start from a set already loaded in memory. The set itself is not
    /// touched; the session works on copies of its due cards.
    pub fn from_set(
        set: &CardSet,
        store: S,
        policy: SpacedRepetitionPolicy,
        rng: R,
        today: NaiveDate,
    ) -> Result<Self> {
        let cards = set.due_cards(today);
        Self::with_cards(set.id, cards, set.rollup, store, policy, rng, today)
    }

    fn with_cards(
        set_id: Uuid,
        cards: Vec<Card>,
        rollup: SetRollup,
        store: S,
        policy: SpacedRepetitionPolicy,
        mut rng: R,
        today: NaiveDate,
    ) -> Result<Self> {
        let mut queue = CardCollection::new();
        for card in cards.iter().filter(|c| c.is_eligible(today)) {
            let end = queue.len();
            queue.random_insert(card.detached(), 0, end, &mut rng)?;
        }

        if queue.is_empty() {
            return Err(SessionError::NothingDue(set_id));
        }

        let total = queue.len();
        log::info!("Starting session for set {} with {} due cards", set_id, total);

        Ok(Self {
            set_id,
            store,
            rng,
            policy,
            today,
            current: queue.head(),
            queue,
            once_seen: 0,
            total,
            mastered: Vec::new(),
            rollup,
            status: SessionStatus::Active,
        })
    }

    pub fn set_id(&self) -> Uuid {
        self.set_id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn queue(&self) -> &CardCollection {
        &self.queue
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn once_seen_count(&self) -> usize {
        self.once_seen
    }

    pub fn rollup(&self) -> SetRollup {
        self.rollup
    }

    /// Cards mastered so far, in the order they left the queue
    pub fn mastered(&self) -> &[Card] {
        &self.mastered
    }

    pub fn current_card(&self) -> Option<&Card> {
        self.current.and_then(|id| self.queue.get(id))
    }

    /// `(mastered, total)`
    pub fn progress(&self) -> (usize, usize) {
        (self.mastered.len(), self.total)
    }

    /// Definition of the current card. Changes nothing.
    pub fn reveal(&self) -> Result<&str> {
        if self.status == SessionStatus::PendingRollup {
            return Err(SessionError::RollupPending(self.set_id));
        }
        self.current_card()
            .map(|card| card.definition.as_str())
            .ok_or(SessionError::Finished)
    }

    pub fn recall_success(&mut self) -> Result<Transition> {
        let (id, card) = self.active_card()?;
        let state = card.session_state;
        match state {
            SessionState::NotSeen => {
                let (start, end) = SessionPacing::seen_once_range(self.queue.len(), self.once_seen);
                let next = self.queue.next(id);
                let placed = self.reposition(id, start, end, |card| {
                    card.session_state = SessionState::SeenOnce;
                })?;
                self.once_seen += 1;
                self.current = next.or(self.queue.head());
                log::debug!(
                    "card {} seen once, moved to {:?} in [{}, {}], once seen {}",
                    card.id,
                    self.queue.position_of(placed),
                    start,
                    end,
                    self.once_seen
                );
                Ok(Transition::Advanced)
            }
            SessionState::SeenOnce => self.master(id, card),
            SessionState::Mastered => Err(SessionError::InvalidTransition {
                card: card.id,
                state,
                action: SessionAction::RecallSuccess,
            }),
        }
    }

    pub fn recall_failure(&mut self) -> Result<Transition> {
        let (id, card) = self.active_card()?;
        let once_seen = match card.session_state {
            SessionState::NotSeen => self.once_seen,
            SessionState::SeenOnce => self.once_seen.saturating_sub(1),
            SessionState::Mastered => {
                return Err(SessionError::InvalidTransition {
                    card: card.id,
                    state: card.session_state,
                    action: SessionAction::RecallFailure,
                })
            }
        };

        let (start, end) = SessionPacing::relearn_range(self.queue.len(), once_seen);
        let next = self.queue.next(id);
        let placed = self.reposition(id, start, end, |card| {
            card.forgot = true;
            card.session_state = SessionState::NotSeen;
        })?;
        self.once_seen = once_seen;
        self.current = next.or(self.queue.head());
        log::debug!(
            "card {} missed, moved to {:?} in [{}, {}], once seen {}",
            card.id,
            self.queue.position_of(placed),
            start,
            end,
            self.once_seen
        );
        Ok(Transition::Advanced)
    }

    /// Commit the set rollup once every card is mastered. Called
    /// automatically when the last card is mastered; call again while the
    /// status is `PendingRollup`. A failed commit changes nothing.
    pub fn finalize(&mut self) -> Result<Transition> {
        match self.status {
            SessionStatus::Completed => return Err(SessionError::Finished),
            SessionStatus::Active => {
                let (_, card) = self.active_card()?;
                return Err(SessionError::InvalidTransition {
                    card: card.id,
                    state: card.session_state,
                    action: SessionAction::RecallSuccess,
                });
            }
            SessionStatus::PendingRollup => {}
        }

        let mut rollup = self.rollup;
        rollup.last_modified = self.today;
        self.store
            .commit_set_rollup(self.set_id, rollup.last_modified, rollup.await_date)?;
        self.rollup = rollup;
        self.status = SessionStatus::Completed;
        log::info!(
            "Session for set {} completed, {} cards mastered, next due {}",
            self.set_id,
            self.mastered.len(),
            self.rollup.await_date
        );
        Ok(Transition::Completed)
    }

    /// Leave the session without committing the set rollup. Cards already
    /// mastered stay committed.
    pub fn abandon(self) -> SessionSummary {
        log::info!(
            "Session for set {} abandoned with {} of {} cards mastered",
            self.set_id,
            self.mastered.len(),
            self.total
        );
        self.summary()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            set_id: self.set_id,
            completed: self.status == SessionStatus::Completed,
            mastered: self.mastered.len(),
            total: self.total,
            await_date: self.rollup.await_date,
        }
    }

    // -- Internal helpers --

    fn active_card(&self) -> Result<(NodeId, Card)> {
        match self.status {
            SessionStatus::Completed => return Err(SessionError::Finished),
            SessionStatus::PendingRollup => return Err(SessionError::RollupPending(self.set_id)),
            SessionStatus::Active => {}
        }
        let id = self.current.ok_or(SessionError::Finished)?;
        let card = self
            .queue
            .get(id)
            .cloned()
            .ok_or(CollectionError::NodeNotFound(id))?;
        Ok((id, card))
    }

    /// Take a card out of the queue and put it back at a random position in
    /// `[start, end]` of the shortened queue. The range is checked before
    /// anything moves.
    fn reposition<F>(&mut self, id: NodeId, start: usize, end: usize, update: F) -> Result<NodeId>
    where
        F: FnOnce(&mut Card),
    {
        let len_after = self.queue.len().saturating_sub(1);
        if start > end || end > len_after {
            return Err(CollectionError::RangeError {
                start,
                end,
                len: len_after,
            }
            .into());
        }

        let mut card = self.queue.remove(id)?;
        update(&mut card);
        Ok(self.queue.random_insert(card, start, end, &mut self.rng)?)
    }

    /// Second correct answer in a row: schedule the card, commit it, and drop
    /// it from the queue. Nothing changes if the commit fails.
    fn master(&mut self, id: NodeId, mut card: Card) -> Result<Transition> {
        let mut rollup = self.rollup;
        self.policy
            .advance_box(&mut card, true, self.today, &mut rollup)?;
        self.store
            .commit_card_schedule(card.id, card.box_level, card.memorization_date)?;

        let next = self.queue.next(id);
        self.queue.remove(id)?;
        card.session_state = SessionState::Mastered;
        log::debug!(
            "card {} mastered into box {}, due {}",
            card.id,
            card.box_level,
            card.memorization_date
        );

        self.rollup = rollup;
        self.once_seen = self.once_seen.saturating_sub(1);
        self.mastered.push(card);

        if self.queue.is_empty() {
            self.current = None;
            self.status = SessionStatus::PendingRollup;
            match self.finalize() {
                Ok(transition) => Ok(transition),
                Err(e) => {
                    log::warn!("Failed to commit rollup for set {}: {}", self.set_id, e);
                    Ok(Transition::RollupPending)
                }
            }
        } else {
            self.current = next.or(self.queue.head());
            Ok(Transition::Advanced)
        }
    }
}
