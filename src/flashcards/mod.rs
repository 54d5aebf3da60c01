//! Flashcards with Leitner-box spaced repetition
//!
//! This module provides:
//! - Card sets and cards with their scheduling state
//! - An ordered card collection with several insertion strategies
//! - The box-to-interval policy
//! - Memorization sessions that drill due cards until each is mastered

pub mod algorithm;
pub mod collection;
pub mod models;
pub mod session;
pub mod storage;

pub use algorithm::{
    format_interval, ScheduleError, SpacedRepetitionPolicy, LEITNER_SCHEDULE, TERMINAL_BOX,
};
pub use collection::{CardCollection, CollectionError, NodeId};
pub use models::*;
pub use session::{
    MemorizationSession, ScheduleStore, SessionError, SessionStatus, SessionSummary, Transition,
};
pub use storage::{FlashcardStorage, FlashcardStorageError};
