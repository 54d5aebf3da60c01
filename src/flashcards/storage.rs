//! Storage operations for flashcards
//!
//! Directory structure under the data dir:
//! ```text
//! card_sets.json          # Array of all card set headers
//! cards/
//! └── {set-id}.json       # Cards of one set, in insertion order
//! ```

use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use super::algorithm::TERMINAL_BOX;
use super::collection::CardCollection;
use super::models::*;
use super::session::ScheduleStore;

#[derive(Error, Debug)]
pub enum FlashcardStorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Card set not found: {0}")]
    SetNotFound(Uuid),

    #[error("Card not found: {0}")]
    CardNotFound(Uuid),

    #[error("Invalid card: {0}")]
    InvalidCard(String),

    #[error("Data directory not found")]
    DataDirNotFound,
}

pub type Result<T> = std::result::Result<T, FlashcardStorageError>;

/// Storage manager for card sets and their cards
pub struct FlashcardStorage {
    data_dir: PathBuf,
}

impl FlashcardStorage {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Get the default data directory
    pub fn default_data_dir() -> Result<PathBuf> {
        dirs::data_local_dir()
            .map(|p| p.join("memora"))
            .ok_or(FlashcardStorageError::DataDirNotFound)
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    fn sets_path(&self) -> PathBuf {
        self.data_dir.join("card_sets.json")
    }

    fn cards_dir(&self) -> PathBuf {
        self.data_dir.join("cards")
    }

    fn cards_path(&self, set_id: Uuid) -> PathBuf {
        self.cards_dir().join(format!("{}.json", set_id))
    }

    /// Initialize storage directories
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(self.cards_dir())?;

        let sets_path = self.sets_path();
        if !sets_path.exists() {
            let empty: Vec<CardSet> = Vec::new();
            fs::write(&sets_path, serde_json::to_string_pretty(&empty)?)?;
        }

        Ok(())
    }

    // ==================== Card Set Operations ====================

    /// List all card set headers. Cards are not loaded.
    pub fn list_sets(&self) -> Result<Vec<CardSet>> {
        let sets_path = self.sets_path();
        if !sets_path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&sets_path)?;
        let sets: Vec<CardSet> = serde_json::from_str(&content)?;
        Ok(sets)
    }

    /// Get a card set header
    pub fn get_set(&self, set_id: Uuid) -> Result<CardSet> {
        self.list_sets()?
            .into_iter()
            .find(|s| s.id == set_id)
            .ok_or(FlashcardStorageError::SetNotFound(set_id))
    }

    /// Get a card set with its cards ordered by `mode`
    pub fn load_set(&self, set_id: Uuid, mode: InsertMode, today: NaiveDate) -> Result<CardSet> {
        let mut set = self.get_set(set_id)?;
        let cards = self.list_cards(set_id)?;
        set.cards = CardCollection::from_cards(cards, mode, today);
        Ok(set)
    }

    pub fn create_set(&self, title: String, today: NaiveDate) -> Result<CardSet> {
        self.init()?;
        let title = non_blank(title, "title")?;

        let set = CardSet::new(title, today);
        let mut sets = self.list_sets()?;
        sets.push(set.clone());
        self.write_sets(&sets)?;
        self.write_cards(set.id, &[])?;

        log::info!("Created card set {} ({})", set.title, set.id);
        Ok(set)
    }

    pub fn rename_set(&self, set_id: Uuid, title: String) -> Result<CardSet> {
        let title = non_blank(title, "title")?;
        self.update_set(set_id, |set| set.title = title)
    }

    /// Delete a card set and all its cards
    pub fn delete_set(&self, set_id: Uuid) -> Result<()> {
        let mut sets = self.list_sets()?;
        let len_before = sets.len();
        sets.retain(|s| s.id != set_id);
        if sets.len() == len_before {
            return Err(FlashcardStorageError::SetNotFound(set_id));
        }
        self.write_sets(&sets)?;

        let cards_path = self.cards_path(set_id);
        if cards_path.exists() {
            fs::remove_file(&cards_path)?;
        }

        log::info!("Deleted card set {}", set_id);
        Ok(())
    }

    fn update_set<F>(&self, set_id: Uuid, apply: F) -> Result<CardSet>
    where
        F: FnOnce(&mut CardSet),
    {
        let mut sets = self.list_sets()?;
        let set = sets
            .iter_mut()
            .find(|s| s.id == set_id)
            .ok_or(FlashcardStorageError::SetNotFound(set_id))?;
        apply(set);
        let updated = set.clone();
        self.write_sets(&sets)?;
        Ok(updated)
    }

    fn write_sets(&self, sets: &[CardSet]) -> Result<()> {
        fs::write(self.sets_path(), serde_json::to_string_pretty(sets)?)?;
        Ok(())
    }

    // ==================== Card Operations ====================

    /// List the cards of a set in insertion order
    pub fn list_cards(&self, set_id: Uuid) -> Result<Vec<Card>> {
        let cards_path = self.cards_path(set_id);
        if !cards_path.exists() {
            // Distinguish an empty set from a missing one
            self.get_set(set_id)?;
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&cards_path)?;
        let mut cards: Vec<Card> = serde_json::from_str(&content)?;
        for card in &mut cards {
            if card.normalize() {
                log::warn!(
                    "Card {} in set {} had inconsistent box state, now box {}",
                    card.id,
                    set_id,
                    card.box_level
                );
            }
        }
        Ok(cards)
    }

    pub fn add_card(
        &self,
        set_id: Uuid,
        term: String,
        definition: String,
        today: NaiveDate,
    ) -> Result<Card> {
        let term = non_blank(term, "term")?;
        let definition = non_blank(definition, "definition")?;

        let mut cards = self.list_cards(set_id)?;
        let card = Card::new(term, definition, today);
        cards.push(card.clone());
        self.write_cards(set_id, &cards)?;

        // A new card is due today, so the set is awaiting again
        self.update_set(set_id, |set| {
            set.rollup.last_modified = today;
            if set.rollup.await_date > today {
                set.rollup.await_date = today;
            }
        })?;

        log::debug!("Added card {} to set {}", card.id, set_id);
        Ok(card)
    }

    /// Edit the text of a card. Scheduling state is kept.
    pub fn update_card(
        &self,
        set_id: Uuid,
        card_id: Uuid,
        term: Option<String>,
        definition: Option<String>,
    ) -> Result<Card> {
        let mut cards = self.list_cards(set_id)?;
        let card = cards
            .iter_mut()
            .find(|c| c.id == card_id)
            .ok_or(FlashcardStorageError::CardNotFound(card_id))?;

        if let Some(term) = term {
            card.term = non_blank(term, "term")?;
        }
        if let Some(definition) = definition {
            card.definition = non_blank(definition, "definition")?;
        }

        let updated = card.clone();
        self.write_cards(set_id, &cards)?;
        Ok(updated)
    }

    pub fn delete_card(&self, set_id: Uuid, card_id: Uuid) -> Result<()> {
        let mut cards = self.list_cards(set_id)?;
        let len_before = cards.len();
        cards.retain(|c| c.id != card_id);
        if cards.len() == len_before {
            return Err(FlashcardStorageError::CardNotFound(card_id));
        }
        self.write_cards(set_id, &cards)?;
        Ok(())
    }

    fn write_cards(&self, set_id: Uuid, cards: &[Card]) -> Result<()> {
        fs::create_dir_all(self.cards_dir())?;
        fs::write(self.cards_path(set_id), serde_json::to_string_pretty(cards)?)?;
        Ok(())
    }

    /// Find the set owning a card
    fn locate_card(&self, card_id: Uuid) -> Result<(Uuid, Vec<Card>)> {
        for set in self.list_sets()? {
            let cards = self.list_cards(set.id)?;
            if cards.iter().any(|c| c.id == card_id) {
                return Ok((set.id, cards));
            }
        }
        Err(FlashcardStorageError::CardNotFound(card_id))
    }
}

impl ScheduleStore for FlashcardStorage {
    fn load_set_rollup(&self, set_id: Uuid) -> Result<SetRollup> {
        Ok(self.get_set(set_id)?.rollup)
    }

    fn load_due_cards(&self, set_id: Uuid, today: NaiveDate) -> Result<Vec<Card>> {
        let cards = self.list_cards(set_id)?;
        Ok(cards.into_iter().filter(|c| c.is_eligible(today)).collect())
    }

    fn commit_card_schedule(
        &self,
        card_id: Uuid,
        box_level: u8,
        memorization_date: NaiveDate,
    ) -> Result<()> {
        let (set_id, mut cards) = self.locate_card(card_id)?;
        if let Some(card) = cards.iter_mut().find(|c| c.id == card_id) {
            card.box_level = box_level.min(TERMINAL_BOX);
            card.memorization_date = memorization_date;
            card.finished = box_level >= TERMINAL_BOX;
        }
        self.write_cards(set_id, &cards)?;
        log::debug!(
            "Committed card {} to box {}, due {}",
            card_id,
            box_level,
            memorization_date
        );
        Ok(())
    }

    fn commit_set_rollup(
        &self,
        set_id: Uuid,
        last_modified: NaiveDate,
        await_date: NaiveDate,
    ) -> Result<()> {
        self.update_set(set_id, |set| {
            set.rollup.last_modified = last_modified;
            set.rollup.await_date = await_date;
        })?;
        Ok(())
    }
}

fn non_blank(value: String, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FlashcardStorageError::InvalidCard(format!("{} cannot be blank", field)));
    }
    Ok(trimmed.to_string())
}
