//! Random source used by every stochastic operator.
//!
//! Reproducibility of a whole generation run depends on consuming the source
//! in the same order with the same number of draws, so each operator in this
//! crate documents its draw count.

use rand::Rng;

use crate::geometry::Point;

/// A reproducible stream of uniform floats.
pub trait RandomSource {
    /// Uniform value in `[lo, hi)`. Consumes exactly one draw; `lo == hi`
    /// returns `lo` and still consumes the draw.
    fn next(&mut self, lo: f64, hi: f64) -> f64;
}

impl<R: Rng + ?Sized> RandomSource for R {
    fn next(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.gen::<f64>()
    }
}

/// Pair of independent standard normal samples (polar Box-Muller).
///
/// Draws two values per attempt and retries until the pair falls strictly
/// inside the unit circle, so the draw count is even but not fixed.
pub fn normal_pair<R: RandomSource + ?Sized>(rng: &mut R) -> (f64, f64) {
    loop {
        let x1 = rng.next(-1.0, 1.0);
        let x2 = rng.next(-1.0, 1.0);
        let w = x1 * x1 + x2 * x2;
        if w < 1.0 && w > 0.0 {
            let scale = (-2.0 * w.ln() / w).sqrt();
            return (x1 * scale, x2 * scale);
        }
    }
}

/// Random vector with normally distributed components of deviation `scale`.
pub fn random_vector<R: RandomSource + ?Sized>(rng: &mut R, scale: f64) -> Point {
    let (x, y) = normal_pair(rng);
    Point::new(scale * x, scale * y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_next_stays_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..1000 {
            let v = rng.next(-0.5, 2.0);
            assert!((-0.5..2.0).contains(&v));
        }
        assert_eq!(rng.next(0.3, 0.3), 0.3);
    }

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = ChaCha8Rng::seed_from_u64(99);
        let mut b = ChaCha8Rng::seed_from_u64(99);
        for _ in 0..50 {
            assert_eq!(a.next(0.0, 1.0), b.next(0.0, 1.0));
        }
        assert_eq!(random_vector(&mut a, 4.0), random_vector(&mut b, 4.0));
    }

    #[test]
    fn test_normal_pair_is_roughly_standard() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let samples: Vec<f64> = (0..5000)
            .flat_map(|_| {
                let (a, b) = normal_pair(&mut rng);
                [a, b]
            })
            .collect();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / samples.len() as f64;
        assert!(mean.abs() < 0.05, "mean {}", mean);
        assert!((var - 1.0).abs() < 0.1, "variance {}", var);
    }
}
