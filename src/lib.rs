//! Memora: Leitner-box flashcards with spaced repetition.
//!
//! Card sets live as JSON files under a data directory. The `flashcards`
//! module holds the card model, the ordered card collection, the scheduling
//! policy and memorization sessions; `config` reads user settings.

pub mod config;
pub mod flashcards;
