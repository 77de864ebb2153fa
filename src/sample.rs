use rand::seq::index;
use rand::Rng;

/// Draw `min(k, values.len())` elements without replacement.
///
/// Every k-subset of positions is equally likely; the picked elements keep
/// their original relative order. When `k >= values.len()` the whole slice is
/// copied.
pub fn sample<T: Clone, R: Rng + ?Sized>(values: &[T], k: usize, rng: &mut R) -> Vec<T> {
    if k >= values.len() {
        return values.to_vec();
    }
    let mut picked = index::sample(rng, values.len(), k).into_vec();
    picked.sort_unstable();
    picked.into_iter().map(|i| values[i].clone()).collect()
}
