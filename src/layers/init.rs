//! Parameter Initialization
//!
//! All initializers draw from a caller-supplied seeded [`StdRng`], so a model
//! built twice with the same seed has identical weights.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Seeded generator used for all parameter initialization
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// `size` values drawn uniformly from `[-range, range]`
///
/// A non-positive `range` yields zeros.
pub fn uniform_init(size: usize, range: f32, rng: &mut StdRng) -> Vec<f32> {
    if range <= 0.0 {
        return vec![0.0; size];
    }
    (0..size).map(|_| rng.random_range(-range..=range)).collect()
}

/// `size` values drawn from the standard normal distribution N(0, 1)
pub fn normal_init(size: usize, rng: &mut StdRng) -> Vec<f32> {
    (0..size).map(|_| rng.sample::<f32, _>(StandardNormal)).collect()
}
