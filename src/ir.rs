use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::align::AlignedSeries;
use crate::summary::Distribution;

// =============================================================================
// Axis labels
// =============================================================================

/// A category or x-axis value whose type is only known at runtime.
///
/// Numbers sort before text; numbers ascend numerically and text
/// lexicographically, so an all-numeric axis reads 1, 2, 10 rather than
/// 1, 10, 2.
#[derive(Debug, Clone)]
pub enum AxisLabel {
    Number(f64),
    Text(String),
}

impl AxisLabel {
    /// Numeric only for plain integers and decimals (`12`, `-3`, `0.25`).
    pub fn parse(text: &str) -> Self {
        match plain_number(text) {
            Some(v) => AxisLabel::Number(v),
            None => AxisLabel::Text(text.to_string()),
        }
    }
}

/// Exponents, leading zeros, `inf` and `NaN` stay text.
fn plain_number(text: &str) -> Option<f64> {
    let text = text.trim();
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let (int, frac) = match unsigned.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (unsigned, None),
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(int) || (int.len() > 1 && int.starts_with('0')) {
        return None;
    }
    if frac.is_some_and(|f| !digits(f)) {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

impl From<String> for AxisLabel {
    fn from(text: String) -> Self {
        match plain_number(&text) {
            Some(v) => AxisLabel::Number(v),
            None => AxisLabel::Text(text),
        }
    }
}

impl From<&str> for AxisLabel {
    fn from(text: &str) -> Self {
        AxisLabel::parse(text)
    }
}

impl From<u32> for AxisLabel {
    fn from(v: u32) -> Self {
        AxisLabel::Number(f64::from(v))
    }
}

impl PartialEq for AxisLabel {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AxisLabel {}

impl PartialOrd for AxisLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AxisLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (AxisLabel::Number(a), AxisLabel::Number(b)) => a.total_cmp(b),
            (AxisLabel::Number(_), AxisLabel::Text(_)) => Ordering::Less,
            (AxisLabel::Text(_), AxisLabel::Number(_)) => Ordering::Greater,
            (AxisLabel::Text(a), AxisLabel::Text(b)) => a.cmp(b),
        }
    }
}

impl Hash for AxisLabel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            AxisLabel::Number(v) => {
                0u8.hash(state);
                v.to_bits().hash(state);
            }
            AxisLabel::Text(s) => {
                1u8.hash(state);
                s.hash(state);
            }
        }
    }
}

impl fmt::Display for AxisLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisLabel::Number(v) => write!(f, "{}", v),
            AxisLabel::Text(s) => f.write_str(s),
        }
    }
}

// Largest magnitude below which every integer is exactly representable.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

impl Serialize for AxisLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AxisLabel::Number(v) if v.fract() == 0.0 && v.abs() < MAX_EXACT_INT => {
                serializer.serialize_i64(*v as i64)
            }
            AxisLabel::Number(v) => serializer.serialize_f64(*v),
            AxisLabel::Text(s) => serializer.serialize_str(s),
        }
    }
}

// =============================================================================
// Series charts (line / bar)
// =============================================================================

/// One plotted series. `None` points serialize as `null` (no data).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<Option<f64>>,
    pub color: String,
}

/// `{labels, datasets}` for line and bar charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesChart<X> {
    pub labels: Vec<X>,
    pub datasets: Vec<Dataset>,
}

impl<X> SeriesChart<X> {
    /// Build datasets from aligned series; `style` maps a series name to its
    /// display label and color.
    pub fn from_aligned<F>(aligned: AlignedSeries<X>, mut style: F) -> Self
    where
        F: FnMut(&str) -> (String, String),
    {
        let datasets = aligned
            .series
            .into_iter()
            .map(|(name, data)| {
                let (label, color) = style(&name);
                Dataset { label, data, color }
            })
            .collect();
        Self {
            labels: aligned.domain,
            datasets,
        }
    }
}

// =============================================================================
// Distribution charts (box / violin)
// =============================================================================

/// One box or violin per label. `data` holds the (possibly sampled) raw
/// values, `summaries` the statistics over the full group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionChart {
    pub label: String,
    pub labels: Vec<String>,
    pub data: Vec<Vec<f64>>,
    pub colors: Vec<String>,
    pub summaries: Vec<Distribution>,
}

// =============================================================================
// Scatter charts
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterChart {
    pub label: String,
    pub color: String,
    pub points: Vec<ScatterPoint>,
}
