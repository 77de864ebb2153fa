use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::decode::CategoryMappings;
use crate::palette::ColorTable;
use crate::ChartOptions;

/// Everything a dashboard run needs besides the records.
///
/// Every section is optional in the JSON file and falls back to the
/// built-in tables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub colors: ColorTable,
    #[serde(default = "CategoryMappings::builtin")]
    pub mappings: CategoryMappings,
    #[serde(default)]
    pub options: ChartOptions,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            colors: ColorTable::default(),
            mappings: CategoryMappings::builtin(),
            options: ChartOptions::default(),
        }
    }
}

impl DashboardConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }
}
