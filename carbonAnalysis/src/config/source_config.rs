use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::constants::*;

/// Where every dataset lives and which state the loaders filter to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub livestock_path: PathBuf,
    pub agriculture_path: PathBuf,
    pub meteorology_dir: PathBuf,
    pub forest_carbon_path: PathBuf,
    pub forest_carbon_sheet: String,
    pub agriculture_sheet: Option<String>, // first sheet when unset
    pub state_code: String,
    pub state_name: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::with_data_dir(DEFAULT_DATA_DIR)
    }
}

impl SourceConfig {
    /// Conventional layout rooted at `data_dir`.
    pub fn with_data_dir(data_dir: impl AsRef<Path>) -> Self {
        let root = data_dir.as_ref();
        Self {
            livestock_path: root.join(LIVESTOCK_FILE),
            agriculture_path: root.join(AGRICULTURE_FILE),
            meteorology_dir: root.join(METEOROLOGY_DIR),
            forest_carbon_path: root.join(FOREST_CARBON_FILE),
            forest_carbon_sheet: FOREST_CARBON_SHEET.to_string(),
            agriculture_sheet: None,
            state_code: DEFAULT_STATE_CODE.to_string(),
            state_name: DEFAULT_STATE_NAME.to_string(),
        }
    }

    /// Reads a JSON config; absent fields keep their defaults.
    pub fn load_from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }
}
