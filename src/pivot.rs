use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;
use tracing::debug;

use crate::aggregate::{aggregate, Extractors};

const VALUE: &str = "value";

/// Rows x columns matrix of means; `None` cells had no observations.
///
/// Serializes as `{x: columns, y: rows, z: cells}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotMatrix<R, C> {
    #[serde(rename = "x")]
    pub columns: Vec<C>,
    #[serde(rename = "y")]
    pub rows: Vec<R>,
    #[serde(rename = "z")]
    pub cells: Vec<Vec<Option<f64>>>,
}

impl<R: Ord, C: Ord> PivotMatrix<R, C> {
    /// Cell by row/column label.
    pub fn get(&self, row: &R, col: &C) -> Option<f64> {
        let r = self.rows.binary_search(row).ok()?;
        let c = self.columns.binary_search(col).ok()?;
        self.cells[r][c]
    }
}

/// Pivot `items` into a matrix of `value_fn` means.
///
/// Row and column labels are the sorted distinct keys. Items with either key
/// missing are skipped; duplicate (row, column) pairs are averaged.
pub fn build_matrix<'i, T, R, C, FR, FC, V>(
    items: impl IntoIterator<Item = &'i T>,
    row_fn: FR,
    col_fn: FC,
    value_fn: V,
) -> PivotMatrix<R, C>
where
    T: 'i,
    R: Ord + Hash + Clone,
    C: Ord + Hash + Clone,
    FR: Fn(&T) -> Option<R>,
    FC: Fn(&T) -> Option<C>,
    V: Fn(&T) -> Option<f64>,
{
    let extractors = Extractors::new().with(VALUE, value_fn);
    let buckets = aggregate(
        items,
        |item: &T| Some((row_fn(item)?, col_fn(item)?)),
        &extractors,
    );

    let rows: Vec<R> = buckets
        .keys()
        .map(|(r, _)| r.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let columns: Vec<C> = buckets
        .keys()
        .map(|(_, c)| c.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let row_index: HashMap<&R, usize> = rows.iter().enumerate().map(|(i, r)| (r, i)).collect();
    let col_index: HashMap<&C, usize> = columns.iter().enumerate().map(|(i, c)| (c, i)).collect();

    let mut cells = vec![vec![None; columns.len()]; rows.len()];
    for ((r, c), bucket) in &buckets {
        cells[row_index[r]][col_index[c]] = bucket.mean(VALUE);
    }

    debug!(rows = rows.len(), columns = columns.len(), "built pivot matrix");
    PivotMatrix { columns, rows, cells }
}
