use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::data::{CategoryField, Record};

/// Code -> label table for one categorical field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryMapping {
    labels: HashMap<String, String>,
}

impl CategoryMapping {
    pub fn from_pairs<C, L>(pairs: impl IntoIterator<Item = (C, L)>) -> Self
    where
        C: Into<String>,
        L: Into<String>,
    {
        Self {
            labels: pairs.into_iter().map(|(c, l)| (c.into(), l.into())).collect(),
        }
    }

    /// Build the decode table from a forward label -> code encoding.
    pub fn from_encoding<L, C>(encoding: impl IntoIterator<Item = (L, C)>) -> Self
    where
        L: Into<String>,
        C: ToString,
    {
        Self {
            labels: encoding
                .into_iter()
                .map(|(label, code)| (code.to_string(), label.into()))
                .collect(),
        }
    }

    pub fn label(&self, code: &str) -> Option<&str> {
        self.labels.get(code).map(String::as_str)
    }
}

/// Mapping tables keyed by the closed set of categorical fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryMappings {
    tables: HashMap<CategoryField, CategoryMapping>,
}

// Label encoding the prediction model was trained with.
const TIME_OF_DAY: [(&str, u8); 6] = [
    ("Afternoon", 0),
    ("Early_Morning", 1),
    ("Evening", 2),
    ("Late_Night", 3),
    ("Morning", 4),
    ("Night", 5),
];
const CITIES: [(&str, u8); 6] = [
    ("Bangalore", 0),
    ("Chennai", 1),
    ("Delhi", 2),
    ("Hyderabad", 3),
    ("Kolkata", 4),
    ("Mumbai", 5),
];
const AIRLINES: [(&str, u8); 6] = [
    ("AirAsia", 0),
    ("Air_India", 1),
    ("GO_FIRST", 2),
    ("Indigo", 3),
    ("SpiceJet", 4),
    ("Vistara", 5),
];
const STOPS: [(&str, u8); 3] = [("one", 0), ("two_or_more", 1), ("zero", 2)];
const CLASSES: [(&str, u8); 2] = [("Business", 0), ("Economy", 1)];

impl CategoryMappings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: CategoryField, mapping: CategoryMapping) -> Self {
        self.insert(field, mapping);
        self
    }

    pub fn insert(&mut self, field: CategoryField, mapping: CategoryMapping) {
        self.tables.insert(field, mapping);
    }

    pub fn get(&self, field: CategoryField) -> Option<&CategoryMapping> {
        self.tables.get(&field)
    }

    /// Decode tables for the backend's training encoding.
    pub fn builtin() -> Self {
        Self::new()
            .with(CategoryField::Airline, CategoryMapping::from_encoding(AIRLINES))
            .with(CategoryField::SourceCity, CategoryMapping::from_encoding(CITIES))
            .with(CategoryField::DestinationCity, CategoryMapping::from_encoding(CITIES))
            .with(CategoryField::DepartureTime, CategoryMapping::from_encoding(TIME_OF_DAY))
            .with(CategoryField::ArrivalTime, CategoryMapping::from_encoding(TIME_OF_DAY))
            .with(CategoryField::Stops, CategoryMapping::from_encoding(STOPS))
            .with(CategoryField::Class, CategoryMapping::from_encoding(CLASSES))
    }

    /// Process-wide default tables, built on first use.
    pub fn global() -> &'static CategoryMappings {
        static DEFAULT: OnceLock<CategoryMappings> = OnceLock::new();
        DEFAULT.get_or_init(CategoryMappings::builtin)
    }

    /// Parse `{field_name: {code: label, ...}, ...}`.
    ///
    /// Field names outside the categorical schema are skipped with a warning.
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| anyhow!("Category mappings must be a JSON object"))?;

        let mut mappings = Self::new();
        for (name, table) in object {
            let field: CategoryField = match name.parse() {
                Ok(field) => field,
                Err(_) => {
                    warn!(field = %name, "Ignoring mapping for unknown categorical field");
                    continue;
                }
            };
            let table = table
                .as_object()
                .ok_or_else(|| anyhow!("Mapping for '{}' must be a JSON object", name))?;

            let mut pairs = Vec::with_capacity(table.len());
            for (code, label) in table {
                let label = match label {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    _ => return Err(anyhow!("Label for code '{}' in '{}' must be a string", code, name)),
                };
                pairs.push((code.as_str(), label));
            }
            mappings.insert(field, CategoryMapping::from_pairs(pairs));
        }
        Ok(mappings)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read mappings file {}", path.display()))?;
        let value: Value = serde_json::from_str(&text)
            .with_context(|| format!("Mappings file {} is not valid JSON", path.display()))?;
        Self::from_json(&value)
    }
}

impl<'de> Deserialize<'de> for CategoryMappings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(&value).map_err(serde::de::Error::custom)
    }
}

/// Replace coded categorical fields with their labels.
///
/// Codes missing from a table, and fields without a table, pass through
/// unchanged. Returns new records; the input is left untouched.
pub fn decode(records: &[Record], mappings: &CategoryMappings) -> Vec<Record> {
    let mut unmapped = 0usize;
    let decoded: Vec<Record> = records
        .iter()
        .map(|record| decode_into(record, mappings, &mut unmapped))
        .collect();

    if unmapped > 0 {
        debug!(unmapped, "category codes without a mapping entry passed through");
    }
    decoded
}

fn decode_into(record: &Record, mappings: &CategoryMappings, unmapped: &mut usize) -> Record {
    let mut out = record.clone();
    for (field, table) in &mappings.tables {
        let slot = out.category_slot(*field);
        if let Some(code) = slot.as_deref() {
            match table.label(code) {
                Some(label) => *slot = Some(label.to_string()),
                None => *unmapped += 1,
            }
        }
    }
    out
}
