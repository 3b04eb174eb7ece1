//! One-dimensional Gaussian sampled onto a uniform axis.
//!
//! The amount of a unit Gaussian falling in a sample's bin is integrated
//! from the error function at the bin edges `x_i ± step/2`. Narrow
//! Gaussians, with sigma of order one step or less, would be badly
//! represented by point sampling.

use lib_types::LinearSampling;
use statrs::function::erf::erf;
use std::f64::consts::SQRT_2;

/// A Gaussian described by its center and width.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GausDesc {
    pub center: f64,
    pub sigma: f64,
}

/// Bin weights of a [`GausDesc`] inside a sampling, starting at absolute
/// sample `offset`.
#[derive(Clone, Debug, PartialEq)]
pub struct SampledGaussian {
    pub offset: i32,
    pub weights: Vec<f64>,
    /// Weight of the whole envelope, including bins outside the sampling.
    pub total: f64,
}

impl SampledGaussian {
    /// Half-open range of absolute sample indices covered.
    pub fn range(&self) -> (i32, i32) {
        (self.offset, self.offset + self.weights.len() as i32)
    }

    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

impl GausDesc {
    /// A description with a finite center and a finite, non-negative
    /// sigma, or `None`.
    pub fn checked(center: f64, sigma: f64) -> Option<Self> {
        (center.is_finite() && sigma >= 0.0 && sigma.is_finite()).then_some(Self { center, sigma })
    }

    /// # Panics
    ///
    /// Panics if `sigma` is negative or not finite.
    pub fn new(center: f64, sigma: f64) -> Self {
        assert!(
            sigma >= 0.0 && sigma.is_finite(),
            "Gaussian sigma must be finite and >= 0, got {}",
            sigma
        );
        Self { center, sigma }
    }

    /// Distance from the center in units of sigma.
    #[inline]
    pub fn distance(&self, x: f64) -> f64 {
        (x - self.center) / self.sigma
    }

    /// The interval `center ± nsigma * sigma`.
    #[inline]
    pub fn sigma_range(&self, nsigma: f64) -> (f64, f64) {
        let half = nsigma * self.sigma;
        (self.center - half, self.center + half)
    }

    /// True if the `nsigma` envelope lies entirely outside `[lo, hi]`.
    pub fn outside(&self, lo: f64, hi: f64, nsigma: f64) -> bool {
        let (smin, smax) = self.sigma_range(nsigma);
        smin > hi || smax < lo
    }

    /// Half-open range of sample indices covering the `nsigma` envelope.
    /// Indices are not clipped to the sampling.
    pub fn sample_range(&self, sampling: &LinearSampling, nsigma: f64) -> (i32, i32) {
        let (smin, smax) = self.sigma_range(nsigma);
        (sampling.index(smin), sampling.index(smax).saturating_add(1))
    }

    /// Integrated weight of a unit-area Gaussian in each sample bin of the
    /// `nsigma` envelope that lies inside the sampling.
    ///
    /// A zero sigma puts all of the weight in the sample nearest the center.
    pub fn binint(&self, sampling: &LinearSampling, nsigma: f64) -> SampledGaussian {
        let (b0, b1) = self.sample_range(sampling, nsigma);
        let lo = b0.max(0);
        let hi = b1.min(i32::try_from(sampling.n).unwrap_or(i32::MAX));
        let empty = |total| SampledGaussian {
            offset: lo,
            weights: Vec::new(),
            total,
        };

        if self.sigma == 0.0 {
            let hit = sampling.index(self.center);
            if lo >= hi {
                return empty(1.0);
            }
            let weights = (lo..hi).map(|i| if i == hit { 1.0 } else { 0.0 }).collect();
            return SampledGaussian { offset: lo, weights, total: 1.0 };
        }

        let step = sampling.step();
        let scale = 1.0 / (self.sigma * SQRT_2);
        let cdf = |x: f64| 0.5 * erf((x - self.center) * scale);
        // bin integrals telescope to the difference at the outer edges
        let total = cdf(sampling.position(b1 - 1) + 0.5 * step) - cdf(sampling.position(b0) - 0.5 * step);
        if lo >= hi {
            return empty(total);
        }
        let weights = (lo..hi)
            .map(|i| {
                let x = sampling.position(i);
                cdf(x + 0.5 * step) - cdf(x - 0.5 * step)
            })
            .collect();
        SampledGaussian { offset: lo, weights, total }
    }
}
