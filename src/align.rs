use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Series values laid out against one shared x domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedSeries<X> {
    pub domain: Vec<X>,
    pub series: IndexMap<String, Vec<Option<f64>>>,
}

/// Sorted union of every x value observed across the series.
pub fn observed_domain<X: Ord + Clone>(series: &IndexMap<String, BTreeMap<X, f64>>) -> Vec<X> {
    series
        .values()
        .flat_map(|points| points.keys().cloned())
        .collect::<BTreeSet<X>>()
        .into_iter()
        .collect()
}

/// Align each series to `domain`; positions without a value hold `None`.
pub fn align<X: Ord + Clone>(
    domain: Vec<X>,
    series: &IndexMap<String, BTreeMap<X, f64>>,
) -> AlignedSeries<X> {
    let series = series
        .iter()
        .map(|(name, points)| {
            let values = domain.iter().map(|x| points.get(x).copied()).collect();
            (name.clone(), values)
        })
        .collect();
    AlignedSeries { domain, series }
}

/// [`align`] against the observed domain.
pub fn align_observed<X: Ord + Clone>(series: &IndexMap<String, BTreeMap<X, f64>>) -> AlignedSeries<X> {
    align(observed_domain(series), series)
}
