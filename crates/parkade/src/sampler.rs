//! Stochastic sampling for dwell times and inter-arrival gaps.
//!
//! Samples are in simulation time units; the generator scales them to real time.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Whole-unit dwell window, `min..max` (max exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DwellWindow {
    pub min: u32,
    pub max: u32,
}

impl DwellWindow {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min < self.max
    }
}

impl Default for DwellWindow {
    fn default() -> Self {
        Self::new(30, 45)
    }
}

/// Source of simulation randomness.
pub trait Sampler: Send {
    /// Dwell duration for a newly created vehicle, in time units.
    fn dwell(&mut self) -> f64;

    /// Gap before the next arrival, in time units.
    fn inter_arrival(&mut self) -> f64;
}

/// Exponential inter-arrival gap for rate `lambda`, from `u` uniform on `[0, 1)`.
pub fn exponential_gap(u: f64, lambda: f64) -> f64 {
    -(1.0 - u).ln() / lambda
}

/// Seedable sampler: uniform dwell over the window, exponential gaps at rate `lambda`.
pub struct RandomSampler {
    rng: ChaCha8Rng,
    window: DwellWindow,
    lambda: f64,
}

impl RandomSampler {
    pub fn new(seed: u64, window: DwellWindow, lambda: f64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            window,
            lambda,
        }
    }

    pub fn from_entropy(window: DwellWindow, lambda: f64) -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
            window,
            lambda,
        }
    }
}

impl Sampler for RandomSampler {
    fn dwell(&mut self) -> f64 {
        f64::from(self.rng.gen_range(self.window.min..self.window.max))
    }

    fn inter_arrival(&mut self) -> f64 {
        let u: f64 = self.rng.gen_range(0.0..1.0);
        exponential_gap(u, self.lambda)
    }
}

/// Constant samples, for deterministic scenarios.
#[derive(Debug, Clone, Copy)]
pub struct FixedSampler {
    pub dwell: f64,
    pub gap: f64,
}

impl FixedSampler {
    pub fn new(dwell: f64, gap: f64) -> Self {
        Self { dwell, gap }
    }
}

impl Sampler for FixedSampler {
    fn dwell(&mut self) -> f64 {
        self.dwell
    }

    fn inter_arrival(&mut self) -> f64 {
        self.gap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_matches_reference_scenario() {
        let window = DwellWindow::default();
        assert_eq!(window, DwellWindow::new(30, 45));
        assert!(window.is_valid());
        assert!(!DwellWindow::new(5, 5).is_valid());
    }

    #[test]
    fn exponential_gap_edges() {
        assert_eq!(exponential_gap(0.0, 2.0), 0.0);
        let median = exponential_gap(0.5, 1.0);
        assert!((median - std::f64::consts::LN_2).abs() < 1e-12);
        assert!(exponential_gap(0.999_999, 0.5).is_finite());
    }

    #[test]
    fn dwell_stays_in_window() {
        let mut sampler = RandomSampler::new(7, DwellWindow::default(), 0.5);
        for _ in 0..1_000 {
            let dwell = sampler.dwell();
            assert!((30.0..45.0).contains(&dwell), "dwell {dwell} out of window");
            assert_eq!(dwell.fract(), 0.0);
        }
    }

    #[test]
    fn gaps_are_non_negative_with_expected_mean() {
        let lambda = 0.5;
        let mut sampler = RandomSampler::new(42, DwellWindow::default(), lambda);
        let n = 20_000;
        let mut sum = 0.0;
        for _ in 0..n {
            let gap = sampler.inter_arrival();
            assert!(gap >= 0.0 && gap.is_finite());
            sum += gap;
        }
        let mean = sum / f64::from(n);
        // Mean of Exp(λ) is 1/λ = 2.0.
        assert!((mean - 2.0).abs() < 0.1, "mean gap {mean}");
    }

    #[test]
    fn same_seed_same_samples() {
        let mut a = RandomSampler::new(99, DwellWindow::default(), 1.5);
        let mut b = RandomSampler::new(99, DwellWindow::default(), 1.5);
        for _ in 0..50 {
            assert_eq!(a.dwell(), b.dwell());
            assert_eq!(a.inter_arrival(), b.inter_arrival());
        }
    }

    #[test]
    fn fixed_sampler_is_constant() {
        let mut sampler = FixedSampler::new(30.0, 0.25);
        assert_eq!(sampler.dwell(), 30.0);
        assert_eq!(sampler.inter_arrival(), 0.25);
        assert_eq!(sampler.dwell(), 30.0);
    }
}
