use indexmap::IndexMap;
use serde::Serialize;
use std::cmp::Ordering;

use crate::aggregate::AggregateBucket;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry<K> {
    pub key: K,
    pub value: f64,
}

impl<K> RankedEntry<K> {
    pub fn new(key: K, value: f64) -> Self {
        Self { key, value }
    }
}

/// Both ends of a ranking, each listed most extreme first.
///
/// With fewer than `2n` entries the two lists overlap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking<K> {
    pub top: Vec<RankedEntry<K>>,
    pub bottom: Vec<RankedEntry<K>>,
}

fn by_value_desc<K: Ord>(a: &RankedEntry<K>, b: &RankedEntry<K>) -> Ordering {
    b.value.total_cmp(&a.value).then_with(|| a.key.cmp(&b.key))
}

/// Highest `n` (descending) and lowest `n` (ascending) entries.
///
/// Ties on value are broken by ascending key, so the result never depends on
/// arrival order.
pub fn top_and_bottom<K: Ord + Clone>(mut entries: Vec<RankedEntry<K>>, n: usize) -> Ranking<K> {
    entries.sort_by(by_value_desc);
    let top = entries.iter().take(n).cloned().collect();
    let bottom = entries.iter().rev().take(n).cloned().collect();
    Ranking { top, bottom }
}

/// One entry per bucket holding a mean for `field`.
pub fn ranked_means<K: Clone>(
    buckets: &IndexMap<K, AggregateBucket>,
    field: &str,
) -> Vec<RankedEntry<K>> {
    buckets
        .iter()
        .filter_map(|(key, bucket)| Some(RankedEntry::new(key.clone(), bucket.mean(field)?)))
        .collect()
}
