//! User configuration, read from `<config_dir>/memora/config.toml`
//!
//! ```toml
//! data_dir = "/home/me/flashcards"
//! insert_mode = "due-aware"
//! sort_mode = "awaiting"
//! schedule = [1, 2, 4, 7, 15, 30, 90, 180]
//! seed = 42
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flashcards::{FlashcardStorage, InsertMode, SortMode, SpacedRepetitionPolicy};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid schedule {0:?}: expected 8 strictly increasing positive intervals")]
    InvalidSchedule(Vec<u32>),

    #[error("Data directory not found")]
    DataDirNotFound,
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    /// Storage root, defaults to the platform data dir
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Order of a set's cards when loaded
    pub insert_mode: InsertMode,
    /// Order of the set listing
    pub sort_mode: SortMode,
    /// Interval table override, in days
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Vec<u32>>,
    /// Fixed RNG seed for reproducible sessions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl StudyConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("memora").join("config.toml"))
    }

    /// Load the config at the default path, falling back to defaults when
    /// there is no file
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.policy()?;
        Ok(config)
    }

    /// Spaced repetition policy with the configured schedule
    pub fn policy(&self) -> Result<SpacedRepetitionPolicy> {
        match &self.schedule {
            None => Ok(SpacedRepetitionPolicy::default()),
            Some(days) => {
                let table: [u32; 8] = days
                    .as_slice()
                    .try_into()
                    .map_err(|_| ConfigError::InvalidSchedule(days.clone()))?;
                let increasing = table.windows(2).all(|w| w[0] < w[1]);
                if table[0] == 0 || !increasing {
                    return Err(ConfigError::InvalidSchedule(days.clone()));
                }
                Ok(SpacedRepetitionPolicy::new(table))
            }
        }
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => FlashcardStorage::default_data_dir().map_err(|_| ConfigError::DataDirNotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_when_file_missing() {
        let temp = TempDir::new().unwrap();
        let config = StudyConfig::load_from(&temp.path().join("config.toml")).unwrap();
        assert_eq!(config, StudyConfig::default());
        assert_eq!(config.insert_mode, InsertMode::DueAware);
        assert_eq!(config.sort_mode, SortMode::Awaiting);
        assert_eq!(config.policy().unwrap(), SpacedRepetitionPolicy::default());
    }

    #[test]
    fn test_parse_full_config() {
        let config = StudyConfig::parse(
            r#"
data_dir = "/tmp/cards"
insert_mode = "alphabetical"
sort_mode = "chronological"
schedule = [1, 3, 5, 8, 13, 21, 34, 55]
seed = 7
"#,
        )
        .unwrap();

        assert_eq!(config.data_dir().unwrap(), PathBuf::from("/tmp/cards"));
        assert_eq!(config.insert_mode, InsertMode::Alphabetical);
        assert_eq!(config.sort_mode, SortMode::Chronological);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.policy().unwrap().interval(7).unwrap(), 55);
    }

    #[test]
    fn test_rejects_bad_schedules() {
        let schedules = [
            "[1, 2, 3]",
            "[0, 2, 4, 7, 15, 30, 90, 180]",
            "[1, 2, 2, 7, 15, 30, 90, 180]",
        ];
        for schedule in schedules {
            let content = format!("schedule = {}", schedule);
            assert!(matches!(
                StudyConfig::parse(&content),
                Err(ConfigError::InvalidSchedule(_))
            ));
        }
    }

    #[test]
    fn test_rejects_unknown_mode() {
        assert!(matches!(
            StudyConfig::parse("insert_mode = \"shuffled\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "seed = 3\n").unwrap();
        assert_eq!(StudyConfig::load_from(&path).unwrap().seed, Some(3));
    }
}
