use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

/// Categorical record fields that may arrive as integer codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CategoryField {
    Airline,
    SourceCity,
    DestinationCity,
    DepartureTime,
    ArrivalTime,
    Stops,
    Class,
}

impl CategoryField {
    pub const ALL: [CategoryField; 7] = [
        CategoryField::Airline,
        CategoryField::SourceCity,
        CategoryField::DestinationCity,
        CategoryField::DepartureTime,
        CategoryField::ArrivalTime,
        CategoryField::Stops,
        CategoryField::Class,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CategoryField::Airline => "airline",
            CategoryField::SourceCity => "source_city",
            CategoryField::DestinationCity => "destination_city",
            CategoryField::DepartureTime => "departure_time",
            CategoryField::ArrivalTime => "arrival_time",
            CategoryField::Stops => "stops",
            CategoryField::Class => "class",
        }
    }
}

impl fmt::Display for CategoryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CategoryField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        if name == "class_type" {
            return Ok(CategoryField::Class);
        }
        CategoryField::ALL
            .into_iter()
            .find(|field| field.name() == name)
            .ok_or_else(|| anyhow!("Unknown categorical field '{}'", s))
    }
}

/// Any field a key or value can be drawn from, derived ones included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    ModelName,
    Category(CategoryField),
    /// `{source_city}-{destination_city}`
    Route,
    Duration,
    DaysLeft,
    ActualPrice,
    PredictedPrice,
    /// Predicted minus actual price.
    PredictionError,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::ModelName => "model_name",
            Field::Category(c) => c.name(),
            Field::Route => "route",
            Field::Duration => "duration",
            Field::DaysLeft => "days_left",
            Field::ActualPrice => "actual_price",
            Field::PredictedPrice => "predicted_price",
            Field::PredictionError => "prediction_error",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Field::Duration
                | Field::DaysLeft
                | Field::ActualPrice
                | Field::PredictedPrice
                | Field::PredictionError
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = anyhow::Error;

    /// Accepts snake_case names and the backend's capitalized column names.
    fn from_str(s: &str) -> Result<Self> {
        let field = match s.trim().to_ascii_lowercase().as_str() {
            "model_name" | "model" => Field::ModelName,
            "route" => Field::Route,
            "duration" => Field::Duration,
            "days_left" => Field::DaysLeft,
            "actual_price" | "price" => Field::ActualPrice,
            "predicted_price" => Field::PredictedPrice,
            "prediction_error" => Field::PredictionError,
            other => Field::Category(
                other
                    .parse()
                    .map_err(|_| anyhow!("Unknown field '{}'", s))?,
            ),
        };
        Ok(field)
    }
}

/// One flight/model observation as delivered by the prediction backend.
///
/// Numeric fields that are missing, unparseable or non-finite are `None`;
/// they are never coerced to zero. Integer category codes are kept as their
/// decimal text until decoded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, deserialize_with = "lenient_text")]
    pub model_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub airline: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub source_city: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub destination_city: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub departure_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub arrival_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub stops: Option<String>,
    #[serde(default, rename = "class", alias = "class_type", deserialize_with = "lenient_text")]
    pub travel_class: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "lenient_days")]
    pub days_left: Option<u32>,
    #[serde(default, alias = "Actual_Price", alias = "price", deserialize_with = "lenient_f64")]
    pub actual_price: Option<f64>,
    #[serde(default, alias = "Predicted_Price", deserialize_with = "lenient_f64")]
    pub predicted_price: Option<f64>,
    #[serde(
        default,
        rename = "prediction_error",
        alias = "Prediction_Error",
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub reported_error: Option<f64>,
}

impl Record {
    pub fn category(&self, field: CategoryField) -> Option<&str> {
        match field {
            CategoryField::Airline => self.airline.as_deref(),
            CategoryField::SourceCity => self.source_city.as_deref(),
            CategoryField::DestinationCity => self.destination_city.as_deref(),
            CategoryField::DepartureTime => self.departure_time.as_deref(),
            CategoryField::ArrivalTime => self.arrival_time.as_deref(),
            CategoryField::Stops => self.stops.as_deref(),
            CategoryField::Class => self.travel_class.as_deref(),
        }
    }

    pub(crate) fn category_slot(&mut self, field: CategoryField) -> &mut Option<String> {
        match field {
            CategoryField::Airline => &mut self.airline,
            CategoryField::SourceCity => &mut self.source_city,
            CategoryField::DestinationCity => &mut self.destination_city,
            CategoryField::DepartureTime => &mut self.departure_time,
            CategoryField::ArrivalTime => &mut self.arrival_time,
            CategoryField::Stops => &mut self.stops,
            CategoryField::Class => &mut self.travel_class,
        }
    }

    pub fn route(&self) -> Option<String> {
        match (&self.source_city, &self.destination_city) {
            (Some(src), Some(dst)) => Some(format!("{}-{}", src, dst)),
            _ => None,
        }
    }

    /// Prediction error as reported by the backend, or derived from the prices.
    pub fn price_error(&self) -> Option<f64> {
        self.reported_error
            .or_else(|| Some(self.predicted_price? - self.actual_price?))
            .filter(|v| v.is_finite())
    }

    /// Numeric value of `field`; `None` for categorical fields.
    pub fn value(&self, field: Field) -> Option<f64> {
        match field {
            Field::Duration => self.duration,
            Field::DaysLeft => self.days_left.map(f64::from),
            Field::ActualPrice => self.actual_price,
            Field::PredictedPrice => self.predicted_price,
            Field::PredictionError => self.price_error(),
            Field::ModelName | Field::Category(_) | Field::Route => None,
        }
    }

    /// Textual form of `field`, used for key rendering.
    pub fn text(&self, field: Field) -> Option<String> {
        match field {
            Field::ModelName => self.model_name.clone(),
            Field::Category(c) => self.category(c).map(str::to_string),
            Field::Route => self.route(),
            Field::DaysLeft => self.days_left.map(|d| d.to_string()),
            Field::Duration | Field::ActualPrice | Field::PredictedPrice | Field::PredictionError => {
                self.value(field).map(|v| v.to_string())
            }
        }
    }
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text_of(&Value::deserialize(deserializer)?))
}

fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(number_of(&Value::deserialize(deserializer)?))
}

fn lenient_days<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let days = number_of(&Value::deserialize(deserializer)?)
        .filter(|v| *v >= 0.0 && v.fract() == 0.0 && *v <= f64::from(u32::MAX))
        .map(|v| v as u32);
    Ok(days)
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else {
                // 3.0 and 3 are the same code
                match n.as_f64() {
                    Some(f) if f.is_finite() && f.fract() == 0.0 => Some(format!("{}", f as i64)),
                    _ => Some(n.to_string()),
                }
            }
        }
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn number_of(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}

/// Supported record encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputFormat {
    #[default]
    Json,
    Csv,
}

impl InputFormat {
    /// Guess the format from a file extension, defaulting to JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => InputFormat::Csv,
            _ => InputFormat::Json,
        }
    }
}

impl FromStr for InputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(InputFormat::Json),
            "csv" => Ok(InputFormat::Csv),
            other => Err(anyhow!("Unsupported input format '{}'", other)),
        }
    }
}

/// Read records in the given format.
pub fn read_records<R: Read>(mut reader: R, format: InputFormat) -> Result<Vec<Record>> {
    match format {
        InputFormat::Json => {
            let mut text = String::new();
            reader
                .read_to_string(&mut text)
                .context("Failed to read JSON input")?;
            let value: Value = serde_json::from_str(&text).context("Input is not valid JSON")?;
            records_from_json(&value)
        }
        InputFormat::Csv => records_from_csv(reader),
    }
}

/// Normalize either backend response shape into a flat list of records.
///
/// Accepts a JSON array of records, or an object keyed by `model_name` whose
/// values are arrays of per-model records. In the keyed shape a record without
/// its own `model_name` inherits the key. Entries that are not JSON objects are
/// skipped.
pub fn records_from_json(value: &Value) -> Result<Vec<Record>> {
    match value {
        Value::Array(items) => Ok(items.iter().filter_map(|item| parse_record(item, None)).collect()),
        Value::Object(groups) => {
            let mut records = Vec::new();
            for (model, items) in groups {
                let items = items.as_array().ok_or_else(|| {
                    anyhow!("Records for model '{}' must be a JSON array", model)
                })?;
                records.extend(items.iter().filter_map(|item| parse_record(item, Some(model))));
            }
            Ok(records)
        }
        _ => Err(anyhow!(
            "Input data must be a JSON array of records or an object keyed by model_name"
        )),
    }
}

// Column spellings per field, highest priority first.
const SPELLINGS: [(&str, &[&str]); 4] = [
    ("actual_price", &["Actual_Price", "price"]),
    ("predicted_price", &["Predicted_Price"]),
    ("prediction_error", &["Prediction_Error"]),
    ("class", &["class_type"]),
];

/// Collapse alternative spellings of one field onto its canonical key, keeping
/// the first non-null value in priority order.
fn canonical_fields(object: &Map<String, Value>) -> Map<String, Value> {
    let mut out = object.clone();
    for (canonical, aliases) in SPELLINGS {
        let chosen = std::iter::once(canonical)
            .chain(aliases.iter().copied())
            .filter_map(|key| object.get(key))
            .find(|v| !v.is_null())
            .cloned();
        for alias in aliases {
            out.remove(*alias);
        }
        match chosen {
            Some(value) => {
                out.insert(canonical.to_string(), value);
            }
            None => {
                out.remove(canonical);
            }
        }
    }
    out
}

fn parse_record(item: &Value, model: Option<&str>) -> Option<Record> {
    let Some(object) = item.as_object() else {
        warn!("Skipping non-object record entry");
        return None;
    };
    match Record::deserialize(Value::Object(canonical_fields(object))) {
        Ok(mut record) => {
            if record.model_name.is_none() {
                record.model_name = model.map(str::to_string);
            }
            Some(record)
        }
        Err(e) => {
            warn!(error = %e, "Skipping malformed record");
            None
        }
    }
}

/// Read the merged results CSV (header row required).
pub fn records_from_csv<R: Read>(reader: R) -> Result<Vec<Record>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rdr.headers().context("Failed to read CSV header")?.clone();

    let mut records = Vec::new();
    for (line, row) in rdr.records().enumerate() {
        let row = row.with_context(|| format!("Failed to read CSV row {}", line + 1))?;
        let mut object = Map::new();
        for (header, cell) in headers.iter().zip(row.iter()) {
            if header.is_empty() {
                // pandas index column
                continue;
            }
            let value = if cell.is_empty() {
                Value::Null
            } else {
                Value::String(cell.to_string())
            };
            object.insert(header.to_string(), value);
        }
        if let Some(record) = parse_record(&Value::Object(object), None) {
            records.push(record);
        }
    }

    debug!(count = records.len(), "read CSV records");
    Ok(records)
}

/// Distinct model names in first-appearance order.
pub fn distinct_models(records: &[Record]) -> Vec<String> {
    let mut models: Vec<String> = Vec::new();
    for name in records.iter().filter_map(|r| r.model_name.as_deref()) {
        if !models.iter().any(|m| m == name) {
            models.push(name.to_string());
        }
    }
    models
}
