use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

pub const FALLBACK_COLOR: &str = "gray";

/// Colors of the models the backend serves predictions for.
const MODEL_COLORS: [(&str, &str); 4] = [
    ("RandomForestRegressor", "blue"),
    ("XGBRegressor", "green"),
    ("ExtraTreesRegressor", "orange"),
    ("DecisionTreeRegressor", "purple"),
];

/// Fixed name -> color table with a single fallback for everything else.
///
/// When deserialized, configured entries are layered over the model colors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ColorOverrides")]
pub struct ColorTable {
    table: HashMap<String, String>,
    fallback: String,
}

#[derive(Deserialize)]
struct ColorOverrides {
    #[serde(default)]
    table: HashMap<String, String>,
    #[serde(default = "default_fallback")]
    fallback: String,
}

impl From<ColorOverrides> for ColorTable {
    fn from(overrides: ColorOverrides) -> Self {
        let mut colors = ColorTable::models();
        colors.table.extend(overrides.table);
        colors.fallback = overrides.fallback;
        colors
    }
}

fn default_fallback() -> String {
    FALLBACK_COLOR.to_string()
}

impl ColorTable {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            table: HashMap::new(),
            fallback: fallback.into(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, color: impl Into<String>) -> Self {
        self.table.insert(name.into(), color.into());
        self
    }

    /// Colors for the four prediction models.
    pub fn models() -> Self {
        MODEL_COLORS
            .into_iter()
            .fold(Self::new(FALLBACK_COLOR), |table, (name, color)| table.with(name, color))
    }

    /// Process-wide default table, built on first use.
    pub fn global() -> &'static ColorTable {
        static DEFAULT: OnceLock<ColorTable> = OnceLock::new();
        DEFAULT.get_or_init(ColorTable::models)
    }

    /// Total over all names: unknown names resolve to the fallback.
    pub fn color_for(&self, name: &str) -> &str {
        self.table.get(name).map(String::as_str).unwrap_or(self.fallback.as_str())
    }
}

impl Default for ColorTable {
    fn default() -> Self {
        Self::models()
    }
}
