//! Tower height generation for new skip list nodes.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Upper bound on any configured tower height
pub const MAX_LEVELS: usize = 64;

/// Picks how many levels a freshly inserted node occupies.
///
/// `random()` returns a height in `[1, total()]`.
pub trait LevelGenerator {
    fn random(&mut self) -> usize;
    fn total(&self) -> usize;
}

/// Geometric heights: a node reaching level `n` climbs to `n + 1` with
/// probability `p`, independently per level, until `total` is reached.
#[derive(Debug)]
pub struct GeometricLevelGenerator {
    total: usize,
    p: f64,
    rng: StdRng,
}

impl GeometricLevelGenerator {
    /// `total` and `p` are expected to have passed `Config::validate`.
    pub fn new(total: usize, p: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { total, p, rng }
    }
}

impl LevelGenerator for GeometricLevelGenerator {
    fn random(&mut self) -> usize {
        let mut height = 1;
        while height < self.total && self.rng.gen::<f64>() < self.p {
            height += 1;
        }
        height
    }

    fn total(&self) -> usize {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heights_within_bounds() {
        let mut gen = GeometricLevelGenerator::new(4, 0.9, Some(1));
        for _ in 0..1_000 {
            let h = gen.random();
            assert!((1..=4).contains(&h), "height {} out of range", h);
        }
    }

    #[test]
    fn test_single_level_cap() {
        let mut gen = GeometricLevelGenerator::new(1, 0.5, None);
        for _ in 0..100 {
            assert_eq!(gen.random(), 1);
        }
        assert_eq!(gen.total(), 1);
    }

    #[test]
    fn test_seeded_generators_agree() {
        let mut a = GeometricLevelGenerator::new(32, 0.25, Some(99));
        let mut b = GeometricLevelGenerator::new(32, 0.25, Some(99));
        let xs: Vec<usize> = (0..64).map(|_| a.random()).collect();
        let ys: Vec<usize> = (0..64).map(|_| b.random()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_distribution_is_geometric() {
        let mut gen = GeometricLevelGenerator::new(32, 0.25, Some(3));
        let n = 100_000;
        let ones = (0..n).filter(|_| gen.random() == 1).count();
        // P(height == 1) = 0.75
        let ratio = ones as f64 / n as f64;
        assert!((0.73..0.77).contains(&ratio), "ratio {}", ratio);
    }
}
