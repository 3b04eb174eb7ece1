//! Random number source for fluctuated charge.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Binomial, Distribution, Exp, Poisson};

/// Draws used by the fluctuating stages.
///
/// Degenerate parameters never panic: a non-positive Poisson mean gives 0,
/// a probability outside `[0, 1]` is clamped, a non-positive rate never
/// fires, and an empty or unbounded uniform range returns `lo`.
pub trait Random {
    /// Number of successes in `n` trials of probability `p`.
    fn binomial(&mut self, n: u64, p: f64) -> u64;

    fn poisson(&mut self, mean: f64) -> f64;

    /// Waiting time to the next event of a process with the given rate.
    fn exponential(&mut self, rate: f64) -> f64;

    /// Uniform on `[lo, hi)`.
    fn uniform(&mut self, lo: f64, hi: f64) -> f64;
}

/// [`Random`] backed by a seeded [`StdRng`].
pub struct StdRandom {
    rng: StdRng,
}

impl StdRandom {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Random for StdRandom {
    fn binomial(&mut self, n: u64, p: f64) -> u64 {
        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
        match Binomial::new(n, p) {
            Ok(dist) => dist.sample(&mut self.rng),
            Err(_) => 0,
        }
    }

    fn poisson(&mut self, mean: f64) -> f64 {
        if !(mean > 0.0) {
            return 0.0;
        }
        match Poisson::new(mean) {
            Ok(dist) => dist.sample(&mut self.rng),
            Err(_) => 0.0,
        }
    }

    fn exponential(&mut self, rate: f64) -> f64 {
        if !(rate > 0.0) {
            return f64::INFINITY;
        }
        match Exp::new(rate) {
            Ok(dist) => dist.sample(&mut self.rng),
            Err(_) => f64::INFINITY,
        }
    }

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        if !(lo < hi && (hi - lo).is_finite()) {
            return lo;
        }
        self.rng.gen_range(lo..hi)
    }
}
