use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ProcessorError, Result};
use crate::output::ShirtFormat;
use crate::winners::WinnerStrategy;

/// Export format a meet's data files arrive in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// ScoreCat JSON exports with per-event ranks
    Scorecat,
    /// MeetScoresOnline tab-separated tables
    Mso,
    /// Loosely-structured JSON or TSV with aliased column names
    Generic,
}

impl SourceType {
    /// Ranked sources win by rank, everything else by score.
    pub fn winner_strategy(&self) -> WinnerStrategy {
        match self {
            SourceType::Scorecat => WinnerStrategy::RankBased,
            SourceType::Mso | SourceType::Generic => WinnerStrategy::ScoreBased,
        }
    }
}

/// Everything needed to process one meet, usually loaded from a TOML
/// file and overridden by CLI flags.
#[derive(Debug, Clone, Deserialize)]
pub struct MeetConfig {
    pub state: String,
    pub meet_name: String,
    #[serde(default = "default_association")]
    pub association: String,
    pub source: SourceType,
    /// Data files or directories; directories expand to their *.json
    /// and *.tsv files in name order
    #[serde(default)]
    pub data: Vec<PathBuf>,
    /// Strip parenthetical notations from MSO name cells
    #[serde(default)]
    pub strip_parenthetical: bool,
    /// Gym alias map applied as the last normalization phase
    #[serde(default)]
    pub gym_map: Option<PathBuf>,
    #[serde(default = "default_shirt_format")]
    pub shirt_format: ShirtFormat,
    /// Heading for the level-first shirt layout
    #[serde(default)]
    pub shirt_title: Option<String>,
}

fn default_association() -> String {
    "USAG".to_string()
}

fn default_shirt_format() -> ShirtFormat {
    ShirtFormat::EventFirst
}

impl MeetConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ProcessorError::Config(format!(
                "Failed to read meet config '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: MeetConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.meet_name.trim().is_empty() {
            return Err(ProcessorError::Config("meet_name must not be empty".into()));
        }
        if self.state.trim().is_empty() {
            return Err(ProcessorError::Config("state must not be empty".into()));
        }
        Ok(())
    }
}
