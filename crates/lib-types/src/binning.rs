//! Uniform binnings of a one-dimensional domain.
//!
//! Two conventions are in use and must not be mixed up:
//!
//! - [`Binning`] divides `[min, max)` into `nbins` bins of width
//!   `(max - min) / nbins`. Wire regions are described this way, with one
//!   bin per wire and the wire sitting at the bin center.
//! - [`LinearSampling`] places `n` sample points on `[min, max]` with both
//!   ends included, so the step is `(max - min) / (n - 1)`. Impact positions
//!   and time ticks use this convention, which response tables are built
//!   against.

use serde::{Deserialize, Serialize};

/// `nbins` equal bins spanning `[min, max)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Binning {
    pub nbins: usize,
    pub min: f64,
    pub max: f64,
}

impl Binning {
    /// # Panics
    ///
    /// Panics if `nbins` is 0 or `min >= max`.
    pub fn new(nbins: usize, min: f64, max: f64) -> Self {
        assert!(nbins > 0, "nbins must be > 0");
        assert!(min < max, "binning min ({}) must be less than max ({})", min, max);
        Self { nbins, min, max }
    }

    #[inline]
    pub fn binsize(&self) -> f64 {
        (self.max - self.min) / self.nbins as f64
    }

    /// Center of bin `i`.
    #[inline]
    pub fn center(&self, i: i32) -> f64 {
        self.min + (i as f64 + 0.5) * self.binsize()
    }
}

/// `n` sample points from `min` to `max` inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearSampling {
    pub n: usize,
    pub min: f64,
    pub max: f64,
}

impl LinearSampling {
    /// # Panics
    ///
    /// Panics if fewer than 2 samples are requested or `min >= max`.
    pub fn new(n: usize, min: f64, max: f64) -> Self {
        match Self::try_new(n, min, max) {
            Ok(s) => s,
            Err(msg) => panic!("{} (n={}, min={}, max={})", msg, n, min, max),
        }
    }

    /// Try to create a sampling, returning an error for invalid parameters.
    pub fn try_new(n: usize, min: f64, max: f64) -> Result<Self, &'static str> {
        if n < 2 {
            return Err("linear sampling needs at least 2 samples");
        }
        if !(min < max) {
            return Err("linear sampling min must be less than max");
        }
        Ok(Self { n, min, max })
    }

    /// Distance between consecutive samples.
    #[inline]
    pub fn step(&self) -> f64 {
        (self.max - self.min) / (self.n - 1) as f64
    }

    /// Location of sample `i` (may be outside the domain).
    #[inline]
    pub fn position(&self, i: i32) -> f64 {
        self.min + i as f64 * self.step()
    }

    /// Index of the sample nearest to `x`; may be out of bounds.
    #[inline]
    pub fn index(&self, x: f64) -> i32 {
        ((x - self.min) / self.step()).round() as i32
    }

    #[inline]
    pub fn contains(&self, i: i32) -> bool {
        i >= 0 && (i as usize) < self.n
    }

    /// Domain extended by half a step on either side, the region covered
    /// by the bins centered on the samples.
    #[inline]
    pub fn extent(&self) -> (f64, f64) {
        let half = 0.5 * self.step();
        (self.min - half, self.max + half)
    }
}
