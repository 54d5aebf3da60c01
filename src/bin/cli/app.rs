use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use uuid::Uuid;

use memora_lib::config::StudyConfig;
use memora_lib::flashcards::{Card, CardSet, FlashcardStorage, SpacedRepetitionPolicy};

/// Shared application state for CLI commands
pub struct App {
    pub config: StudyConfig,
    pub storage: FlashcardStorage,
    pub today: NaiveDate,
}

impl App {
    /// Load the config and open storage. `data_dir` overrides the config.
    pub fn new(data_dir: Option<PathBuf>) -> Result<Self> {
        let config = StudyConfig::load().context("Failed to load config")?;
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => config.data_dir().context("Failed to get data directory")?,
        };
        Self::with_config(config, data_dir, Local::now().date_naive())
    }

    pub fn with_config(config: StudyConfig, data_dir: PathBuf, today: NaiveDate) -> Result<Self> {
        let storage = FlashcardStorage::new(data_dir);
        storage.init().context("Failed to initialize storage")?;
        log::debug!("Using data directory {}", storage.data_dir().display());

        Ok(Self {
            config,
            storage,
            today,
        })
    }

    pub fn policy(&self) -> Result<SpacedRepetitionPolicy> {
        self.config.policy().context("Invalid schedule in config")
    }

    pub fn list_sets(&self) -> Result<Vec<CardSet>> {
        self.storage.list_sets().context("Failed to list card sets")
    }

    /// Find a card set by title (case-insensitive prefix match)
    pub fn find_set(&self, title: &str) -> Result<CardSet> {
        let sets = self.list_sets()?;
        let title_lower = title.to_lowercase();

        // Exact match first
        if let Some(set) = sets.iter().find(|s| s.title.to_lowercase() == title_lower) {
            return Ok(set.clone());
        }

        // Prefix match
        let matches: Vec<&CardSet> = sets
            .iter()
            .filter(|s| s.title.to_lowercase().starts_with(&title_lower))
            .collect();

        match matches.len() {
            0 => bail!("No card set matching '{}'. Available sets:\n{}", title,
                sets.iter().map(|s| format!("  - {}", s.title)).collect::<Vec<_>>().join("\n")),
            1 => Ok(matches[0].clone()),
            _ => bail!("Ambiguous set title '{}'. Matches:\n{}", title,
                matches.iter().map(|s| format!("  - {}", s.title)).collect::<Vec<_>>().join("\n")),
        }
    }

    /// Find a card by term within a set (case-insensitive prefix match)
    pub fn find_card(&self, set_id: Uuid, term: &str) -> Result<Card> {
        let cards = self.storage.list_cards(set_id).context("Failed to list cards")?;
        let term_lower = term.to_lowercase();

        if let Some(card) = cards.iter().find(|c| c.term.to_lowercase() == term_lower) {
            return Ok(card.clone());
        }

        let matches: Vec<&Card> = cards
            .iter()
            .filter(|c| c.term.to_lowercase().starts_with(&term_lower))
            .collect();

        match matches.len() {
            0 => bail!("No card matching '{}' in set", term),
            1 => Ok(matches[0].clone()),
            _ => bail!("Ambiguous term '{}'. Matches:\n{}", term,
                matches.iter().map(|c| format!("  - {}", c.term)).collect::<Vec<_>>().join("\n")),
        }
    }
}
