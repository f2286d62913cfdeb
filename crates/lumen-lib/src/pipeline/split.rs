//! Seeded train/test split

use crate::models::Dataset;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle rows with `seed` and hold out `ceil(test_fraction * n)` of them.
///
/// Returns `(train, test)`. The same seed always yields the same split.
pub fn train_test_split(dataset: &Dataset, test_fraction: f64, seed: u64) -> (Dataset, Dataset) {
    let n = dataset.len();
    let n_test = ((test_fraction.clamp(0.0, 1.0) * n as f64).ceil() as usize).min(n);

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);
    (dataset.select(train_idx), dataset.select(test_idx))
}
