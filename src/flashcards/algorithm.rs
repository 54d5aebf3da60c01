//! Leitner box scheduling
//!
//! Each card sits in a box `0..=TERMINAL_BOX`. Boxes `0..TERMINAL_BOX` map to
//! an interval in days through a fixed table; reaching `TERMINAL_BOX`
//! graduates the card.
//!
//! Default ladder (days): 1, 2, 4, 7, 15, 30, 90, 180
//!
//! This table drives persisted, across-days scheduling only. Spacing of
//! repeats within a single sitting is handled by the session queue.

use chrono::{Duration, NaiveDate};
use thiserror::Error;
use uuid::Uuid;

use super::models::{Card, SetRollup};

/// Default interval table, indexed by box
pub const LEITNER_SCHEDULE: [u32; 8] = [1, 2, 4, 7, 15, 30, 90, 180];

/// Box at which a card is graduated and no longer scheduled
pub const TERMINAL_BOX: u8 = LEITNER_SCHEDULE.len() as u8;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Box {0} is outside the interval table")]
    OutOfRange(u8),

    #[error("Card {0} is finished and has no next date")]
    Finished(Uuid),
}

/// Outcome of committing a session result to a card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxAdvance {
    pub box_level: u8,
    /// Next due date, `None` once the card graduates
    pub due_date: Option<NaiveDate>,
    pub finished: bool,
}

/// Long-run box-to-interval policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpacedRepetitionPolicy {
    schedule: [u32; 8],
}

impl Default for SpacedRepetitionPolicy {
    fn default() -> Self {
        Self {
            schedule: LEITNER_SCHEDULE,
        }
    }
}

impl SpacedRepetitionPolicy {
    pub fn new(schedule: [u32; 8]) -> Self {
        Self { schedule }
    }

    pub fn schedule(&self) -> &[u32; 8] {
        &self.schedule
    }

    /// Interval in days for a box
    pub fn interval(&self, box_level: u8) -> Result<u32, ScheduleError> {
        self.schedule
            .get(box_level as usize)
            .copied()
            .ok_or(ScheduleError::OutOfRange(box_level))
    }

    /// Commit the outcome of a session to `card`.
    ///
    /// A card missed at any point during the session (`forgot`) drops back to
    /// box 0 whatever its last answer was; so does a card that was not
    /// recalled correctly. Otherwise it moves up one box. The new due date is
    /// `today + interval(box)` and pushes the set's `await_date` forward when
    /// it lands later. Reaching `TERMINAL_BOX` graduates the card instead.
    ///
    /// The card is left untouched on error.
    pub fn advance_box(
        &self,
        card: &mut Card,
        recalled_correctly: bool,
        today: NaiveDate,
        rollup: &mut SetRollup,
    ) -> Result<BoxAdvance, ScheduleError> {
        if card.finished {
            return Err(ScheduleError::Finished(card.id));
        }

        let box_level = if card.forgot || !recalled_correctly {
            0
        } else {
            card.box_level.saturating_add(1).min(TERMINAL_BOX)
        };

        if box_level >= TERMINAL_BOX {
            card.box_level = box_level;
            card.finished = true;
            log::debug!("card {} graduated", card.id);
            return Ok(BoxAdvance {
                box_level,
                due_date: None,
                finished: true,
            });
        }

        let interval = self.interval(box_level)?;
        let due_date = today + Duration::days(i64::from(interval));

        card.box_level = box_level;
        card.memorization_date = due_date;
        if rollup.raise_await_date(due_date) {
            log::debug!("set await date raised to {}", due_date);
        }

        Ok(BoxAdvance {
            box_level,
            due_date: Some(due_date),
            finished: false,
        })
    }
}

/// Format an interval in days to a human-readable string
pub fn format_interval(days: u32) -> String {
    if days == 0 {
        "now".to_string()
    } else if days < 7 {
        format!("{}d", days)
    } else if days < 30 {
        format!("{}w", days / 7)
    } else if days < 365 {
        format!("{}mo", days / 30)
    } else {
        format!("{}y", days / 365)
    }
}
