use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::hash::Hash;
use tracing::debug;

/// Running sum and count of one numeric field.
///
/// Only created from a first value, so `count >= 1` and the mean is always
/// defined. Summation is compensated (Neumaier).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Accumulator {
    sum: f64,
    compensation: f64,
    count: usize,
}

impl Accumulator {
    pub fn from_value(value: f64) -> Self {
        Self {
            sum: value,
            compensation: 0.0,
            count: 1,
        }
    }

    pub fn push(&mut self, value: f64) {
        let total = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - total) + value;
        } else {
            self.compensation += (value - total) + self.sum;
        }
        self.sum = total;
        self.count += 1;
    }

    pub fn sum(&self) -> f64 {
        self.sum + self.compensation
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.sum() / self.count as f64
    }
}

/// Accumulators for every named field that received at least one value,
/// plus the number of records routed to this bucket.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregateBucket {
    rows: usize,
    fields: IndexMap<String, Accumulator>,
}

impl AggregateBucket {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn field(&self, name: &str) -> Option<&Accumulator> {
        self.fields.get(name)
    }

    /// `None` when no record in the bucket had a value for `name`.
    pub fn mean(&self, name: &str) -> Option<f64> {
        self.field(name).map(Accumulator::mean)
    }

    fn add(&mut self, name: &str, value: f64) {
        match self.fields.get_mut(name) {
            Some(acc) => acc.push(value),
            None => {
                self.fields.insert(name.to_string(), Accumulator::from_value(value));
            }
        }
    }
}

type ValueFn<'a, T> = Box<dyn Fn(&T) -> Option<f64> + 'a>;

/// Named numeric extractors applied to every record of a bucket.
pub struct Extractors<'a, T> {
    entries: Vec<(String, ValueFn<'a, T>)>,
}

impl<'a, T> Extractors<'a, T> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn with<F>(mut self, name: impl Into<String>, extract: F) -> Self
    where
        F: Fn(&T) -> Option<f64> + 'a,
    {
        self.entries.push((name.into(), Box::new(extract)));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}

impl<'a, T> Default for Extractors<'a, T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Group `items` by `key_fn` and accumulate every extractor per group.
///
/// Items for which `key_fn` returns `None` are skipped. Each extractor is
/// independent: an item missing one value still contributes to the others.
/// Non-finite values are ignored. Buckets are returned in first-appearance
/// order of their keys.
pub fn aggregate<'i, T, K, F>(
    items: impl IntoIterator<Item = &'i T>,
    key_fn: F,
    extractors: &Extractors<'_, T>,
) -> IndexMap<K, AggregateBucket>
where
    T: 'i,
    K: Hash + Eq,
    F: Fn(&T) -> Option<K>,
{
    let mut buckets: IndexMap<K, AggregateBucket> = IndexMap::new();
    let mut skipped = 0usize;

    for item in items {
        let Some(key) = key_fn(item) else {
            skipped += 1;
            continue;
        };
        let bucket = buckets.entry(key).or_default();
        bucket.rows += 1;
        for (name, extract) in &extractors.entries {
            if let Some(value) = extract(item).filter(|v| v.is_finite()) {
                bucket.add(name, value);
            }
        }
    }

    debug!(buckets = buckets.len(), skipped, "aggregated records");
    buckets
}

/// Collect the raw finite values of each group, for distribution charts.
///
/// A group only appears once it has a value.
pub fn group_values<'i, T, K, F, V>(
    items: impl IntoIterator<Item = &'i T>,
    key_fn: F,
    value_fn: V,
) -> IndexMap<K, Vec<f64>>
where
    T: 'i,
    K: Hash + Eq,
    F: Fn(&T) -> Option<K>,
    V: Fn(&T) -> Option<f64>,
{
    let mut groups: IndexMap<K, Vec<f64>> = IndexMap::new();
    for item in items {
        let Some(value) = value_fn(item).filter(|v| v.is_finite()) else {
            continue;
        };
        if let Some(key) = key_fn(item) {
            groups.entry(key).or_default().push(value);
        }
    }
    groups
}

/// Project buckets onto the mean of one field, ordered by key.
pub fn bucket_means<K: Ord + Clone>(
    buckets: &IndexMap<K, AggregateBucket>,
    field: &str,
) -> BTreeMap<K, f64> {
    buckets
        .iter()
        .filter_map(|(key, bucket)| Some((key.clone(), bucket.mean(field)?)))
        .collect()
}
