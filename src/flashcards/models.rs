//! Data models for the flashcard system

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::algorithm::{ScheduleError, SpacedRepetitionPolicy, TERMINAL_BOX};
use super::collection::CardCollection;

/// Where a card stands within the current memorization session.
///
/// Only meaningful while a session is running; every card copied into a
/// session queue starts as `NotSeen`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    NotSeen,
    SeenOnce,
    Mastered,
}

/// A term/definition pair together with its Leitner scheduling state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: Uuid,
    pub term: String,
    pub definition: String,
    /// Position in the interval ladder, `0..=TERMINAL_BOX`
    #[serde(rename = "box", default)]
    pub box_level: u8,
    /// Day the card becomes eligible for memorization again
    pub memorization_date: NaiveDate,
    /// Graduated past the last box; never scheduled again
    #[serde(default)]
    pub finished: bool,
    #[serde(skip)]
    pub session_state: SessionState,
    /// Sticky "missed during this session" marker
    #[serde(skip)]
    pub forgot: bool,
}

impl Card {
    pub fn new(term: String, definition: String, today: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            term,
            definition,
            box_level: 0,
            memorization_date: today,
            finished: false,
            session_state: SessionState::NotSeen,
            forgot: false,
        }
    }

    /// `memorization_date + interval(box)`.
    ///
    /// A finished card has no next date and yields `ScheduleError::Finished`.
    pub fn compute_due_date(
        &self,
        policy: &SpacedRepetitionPolicy,
    ) -> Result<NaiveDate, ScheduleError> {
        if self.finished {
            return Err(ScheduleError::Finished(self.id));
        }
        let days = policy.interval(self.box_level)?;
        Ok(self.memorization_date + chrono::Duration::days(i64::from(days)))
    }

    /// Whether the card is still inside its review window on `today`.
    ///
    /// Graduation is discovered lazily here: a card sitting in the terminal
    /// box is flipped to `finished` on its first check.
    pub fn is_due(&mut self, today: NaiveDate, policy: &SpacedRepetitionPolicy) -> bool {
        if self.finished {
            return false;
        }
        if self.box_level >= TERMINAL_BOX {
            self.finished = true;
            return false;
        }
        match self.compute_due_date(policy) {
            Ok(due) => today <= due,
            Err(_) => false,
        }
    }

    /// Unfinished and `memorization_date <= today`: the cards a session
    /// picks up.
    pub fn is_eligible(&self, today: NaiveDate) -> bool {
        !self.finished && self.memorization_date <= today
    }

    /// Clamp `box_level` to `0..=TERMINAL_BOX` and derive `finished` from it.
    /// Returns true if anything changed.
    pub fn normalize(&mut self) -> bool {
        let box_level = self.box_level.min(TERMINAL_BOX);
        let finished = box_level >= TERMINAL_BOX;
        let changed = box_level != self.box_level || finished != self.finished;
        self.box_level = box_level;
        self.finished = finished;
        changed
    }

    /// Copy of this card with per-session state cleared
    pub fn detached(&self) -> Self {
        Self {
            session_state: SessionState::NotSeen,
            forgot: false,
            ..self.clone()
        }
    }
}

/// Set-level dates that are committed together at the end of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRollup {
    pub last_modified: NaiveDate,
    /// Latest due date handed out to any card of the set
    pub await_date: NaiveDate,
}

impl SetRollup {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            last_modified: today,
            await_date: today,
        }
    }

    /// Push `await_date` forward when a card is scheduled past it.
    /// Returns true if the date moved.
    pub fn raise_await_date(&mut self, due: NaiveDate) -> bool {
        if due > self.await_date {
            self.await_date = due;
            true
        } else {
            false
        }
    }
}

/// A titled collection of cards
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSet {
    pub id: Uuid,
    pub title: String,
    #[serde(flatten)]
    pub rollup: SetRollup,
    pub created_at: NaiveDate,
    #[serde(skip)]
    pub cards: CardCollection,
}

impl CardSet {
    pub fn new(title: String, today: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            rollup: SetRollup::new(today),
            created_at: today,
            cards: CardCollection::new(),
        }
    }

    pub fn await_date(&self) -> NaiveDate {
        self.rollup.await_date
    }

    pub fn last_modified(&self) -> NaiveDate {
        self.rollup.last_modified
    }

    /// True once some card of the set has come due
    pub fn is_awaiting(&self, today: NaiveDate) -> bool {
        today >= self.rollup.await_date
    }

    /// Cards eligible for a session on `today`, as detached copies
    pub fn due_cards(&self, today: NaiveDate) -> Vec<Card> {
        self.cards
            .iter()
            .filter(|(_, card)| card.is_eligible(today))
            .map(|(_, card)| card.detached())
            .collect()
    }
}

/// Ordering strategy used when inserting a card into a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsertMode {
    /// New head
    Front,
    /// New tail
    Append,
    /// Descending by term
    Alphabetical,
    /// Due cards first, each partition descending by term
    #[default]
    DueAware,
}

/// Ordering for lists of card sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortMode {
    /// By `(await_date, title)`
    Chronological,
    /// By `(title, await_date)`
    Alphabetical,
    /// Awaiting sets first, then the rest, each group by title
    #[default]
    Awaiting,
}

/// Sort card sets in place. The sort is stable: sets that compare equal keep
/// their input order.
pub fn sort_card_sets(sets: &mut [CardSet], mode: SortMode, today: NaiveDate) {
    match mode {
        SortMode::Chronological => sets.sort_by(|a, b| {
            a.await_date()
                .cmp(&b.await_date())
                .then_with(|| a.title.cmp(&b.title))
        }),
        SortMode::Alphabetical => sets.sort_by(|a, b| {
            a.title
                .cmp(&b.title)
                .then_with(|| a.await_date().cmp(&b.await_date()))
        }),
        SortMode::Awaiting => sets.sort_by(|a, b| {
            match (a.is_awaiting(today), b.is_awaiting(today)) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => a.title.cmp(&b.title),
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn set_with(title: &str, await_date: NaiveDate) -> CardSet {
        let mut set = CardSet::new(title.to_string(), day(2024, 1, 1));
        set.rollup.await_date = await_date;
        set
    }

    #[test]
    fn test_new_card_defaults() {
        let card = Card::new("Apple".to_string(), "red fruit".to_string(), day(2024, 3, 1));
        assert_eq!(card.box_level, 0);
        assert_eq!(card.session_state, SessionState::NotSeen);
        assert!(!card.forgot);
        assert!(!card.finished);
        assert_eq!(card.memorization_date, day(2024, 3, 1));
    }

    #[test]
    fn test_compute_due_date() {
        let policy = SpacedRepetitionPolicy::default();
        let mut card = Card::new("a".to_string(), "b".to_string(), day(2024, 3, 1));
        card.box_level = 3;
        assert_eq!(card.compute_due_date(&policy).unwrap(), day(2024, 3, 8));
    }

    #[test]
    fn test_compute_due_date_finished_fails() {
        let policy = SpacedRepetitionPolicy::default();
        let mut card = Card::new("a".to_string(), "b".to_string(), day(2024, 3, 1));
        card.box_level = TERMINAL_BOX;
        card.finished = true;
        assert!(matches!(
            card.compute_due_date(&policy),
            Err(ScheduleError::Finished(_))
        ));
    }

    #[test]
    fn test_is_due_graduates_terminal_box() {
        let policy = SpacedRepetitionPolicy::default();
        let mut card = Card::new("a".to_string(), "b".to_string(), day(2024, 3, 1));
        card.box_level = TERMINAL_BOX;

        assert!(!card.is_due(day(2024, 3, 1), &policy));
        assert!(card.finished);
    }

    #[test]
    fn test_is_due_window() {
        let policy = SpacedRepetitionPolicy::default();
        let card = Card::new("a".to_string(), "b".to_string(), day(2024, 3, 1));

        // box 0 interval is one day
        assert!(card.clone().is_due(day(2024, 3, 2), &policy));
        assert!(!card.clone().is_due(day(2024, 3, 3), &policy));
    }

    #[test]
    fn test_normalize_box_and_finished() {
        let mut card = Card::new("a".to_string(), "b".to_string(), day(2024, 3, 1));
        assert!(!card.normalize());

        card.box_level = TERMINAL_BOX;
        assert!(card.normalize());
        assert!(card.finished);

        card.box_level = 12;
        card.finished = false;
        assert!(card.normalize());
        assert_eq!(card.box_level, TERMINAL_BOX);
        assert!(card.finished);

        card.box_level = 3;
        assert!(card.normalize());
        assert!(!card.finished);
    }

    #[test]
    fn test_persisted_fields_skip_session_state() {
        let mut card = Card::new("a".to_string(), "b".to_string(), day(2024, 3, 1));
        card.session_state = SessionState::SeenOnce;
        card.forgot = true;

        let json = serde_json::to_string(&card).unwrap();
        assert!(json.contains("\"box\":0"));
        assert!(!json.contains("forgot"));

        let back: Card = serde_json::from_str(&json).unwrap();
        assert_eq!(back.session_state, SessionState::NotSeen);
        assert!(!back.forgot);
    }

    #[test]
    fn test_raise_await_date_only_forward() {
        let mut rollup = SetRollup::new(day(2024, 3, 10));
        assert!(!rollup.raise_await_date(day(2024, 3, 5)));
        assert_eq!(rollup.await_date, day(2024, 3, 10));
        assert!(rollup.raise_await_date(day(2024, 3, 12)));
        assert_eq!(rollup.await_date, day(2024, 3, 12));
    }

    #[test]
    fn test_sort_chronological() {
        let mut sets = vec![
            set_with("b", day(2024, 3, 2)),
            set_with("a", day(2024, 3, 2)),
            set_with("c", day(2024, 3, 1)),
        ];
        sort_card_sets(&mut sets, SortMode::Chronological, day(2024, 3, 1));
        let titles: Vec<&str> = sets.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_sort_alphabetical() {
        let mut sets = vec![
            set_with("b", day(2024, 3, 1)),
            set_with("a", day(2024, 3, 9)),
            set_with("a", day(2024, 3, 2)),
        ];
        sort_card_sets(&mut sets, SortMode::Alphabetical, day(2024, 3, 1));
        let keys: Vec<(&str, NaiveDate)> =
            sets.iter().map(|s| (s.title.as_str(), s.await_date())).collect();
        assert_eq!(
            keys,
            vec![("a", day(2024, 3, 2)), ("a", day(2024, 3, 9)), ("b", day(2024, 3, 1))]
        );
    }

    #[test]
    fn test_sort_awaiting_first() {
        let today = day(2024, 3, 5);
        let mut sets = vec![
            set_with("alpha", day(2024, 3, 9)),
            set_with("zulu", day(2024, 3, 1)),
            set_with("mike", day(2024, 3, 5)),
        ];
        sort_card_sets(&mut sets, SortMode::Awaiting, today);
        let titles: Vec<&str> = sets.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["mike", "zulu", "alpha"]);
    }

    #[test]
    fn test_sort_is_stable() {
        let a1 = set_with("same", day(2024, 3, 1));
        let a2 = set_with("same", day(2024, 3, 1));
        let ids = (a1.id, a2.id);
        let mut sets = vec![a1, a2];
        sort_card_sets(&mut sets, SortMode::Chronological, day(2024, 3, 1));
        assert_eq!((sets[0].id, sets[1].id), ids);
    }
}
