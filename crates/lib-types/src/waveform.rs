//! Time-domain waveform representation.
//!
//! # Sample Semantics
//!
//! Samples in a `Waveform` are values at discrete time instants. For a
//! waveform with `N` samples, the sample times are:
//!
//! ```text
//! t[i] = t_start + i * dt,  for i = 0, 1, ..., N-1
//! ```
//!
//! A sample holds whatever the producer accumulated over its tick: charge
//! for binned diffusion, charge or voltage for a convolved wire signal.

use serde::{Deserialize, Serialize};

/// Real-valued sequence.
pub type RealSeq = Vec<f64>;

/// A uniformly-sampled time-domain waveform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Waveform {
    /// Sample values.
    pub samples: RealSeq,

    /// Time step between consecutive samples.
    pub dt: f64,

    /// Time of the first sample.
    pub t_start: f64,
}

impl Waveform {
    /// Create a new waveform from samples.
    pub fn new(samples: RealSeq, dt: f64, t_start: f64) -> Self {
        Self { samples, dt, t_start }
    }

    /// Create a zero-valued waveform of specified length.
    pub fn zeros(len: usize, dt: f64, t_start: f64) -> Self {
        Self {
            samples: vec![0.0; len],
            dt,
            t_start,
        }
    }

    /// Number of samples in the waveform.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the waveform is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Total duration of the waveform.
    #[inline]
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 * self.dt
    }

    /// Get the time value for a given sample index.
    #[inline]
    pub fn time_at(&self, index: usize) -> f64 {
        self.t_start + index as f64 * self.dt
    }

    /// Find the index of the sample nearest to a given time.
    pub fn index_at_time(&self, t: f64) -> usize {
        let offset = (t - self.t_start) / self.dt;
        offset.round().max(0.0).min(self.samples.len().saturating_sub(1) as f64) as usize
    }

    /// Interpolate the waveform value at an arbitrary time.
    ///
    /// Times outside the sampled span yield zero.
    pub fn value_at(&self, t: f64) -> f64 {
        let offset = (t - self.t_start) / self.dt;
        if offset < 0.0 || self.samples.is_empty() {
            return 0.0;
        }
        let idx = offset.floor() as usize;
        let last = self.samples.len() - 1;
        if idx > last {
            return 0.0;
        }
        if idx == last {
            return if offset == last as f64 { self.samples[last] } else { 0.0 };
        }

        let frac = offset - idx as f64;
        self.samples[idx] * (1.0 - frac) + self.samples[idx + 1] * frac
    }

    /// Resample onto `len` samples with a new time step using linear
    /// interpolation. The start time is kept.
    pub fn resample(&self, new_dt: f64, len: usize) -> Self {
        let samples = (0..len)
            .map(|i| self.value_at(self.t_start + i as f64 * new_dt))
            .collect();
        Self {
            samples,
            dt: new_dt,
            t_start: self.t_start,
        }
    }

    /// Sum of all samples.
    pub fn sum(&self) -> f64 {
        self.samples.iter().sum()
    }

    /// Maximum absolute value.
    pub fn max_abs(&self) -> f64 {
        self.samples.iter().map(|v| v.abs()).fold(0.0, f64::max)
    }

    /// Scale all samples by a factor.
    pub fn scale(&mut self, factor: f64) {
        for sample in &mut self.samples {
            *sample *= factor;
        }
    }

    /// Half-open index range from the first to one past the last non-zero
    /// sample. An all-zero waveform gives `(len, len)`.
    pub fn edge(&self) -> (usize, usize) {
        let len = self.samples.len();
        match self.samples.iter().position(|&v| v != 0.0) {
            None => (len, len),
            Some(first) => {
                let last = self.samples.iter().rposition(|&v| v != 0.0).unwrap_or(first);
                (first, last + 1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waveform_basics() {
        let samples = vec![0.0, 0.5, 1.0, 0.5, 0.0];
        let wf = Waveform::new(samples, 10.0, 0.0);

        assert_eq!(wf.len(), 5);
        assert!((wf.duration() - 50.0).abs() < 1e-12);
        assert!((wf.sum() - 2.0).abs() < 1e-12);
        assert_eq!(wf.index_at_time(21.0), 2);
    }

    #[test]
    fn test_waveform_interpolation() {
        let samples = vec![0.0, 1.0, 0.0];
        let wf = Waveform::new(samples, 1.0, 0.0);

        assert!((wf.value_at(0.5) - 0.5).abs() < 0.001);
        assert!((wf.value_at(1.5) - 0.5).abs() < 0.001);
        assert_eq!(wf.value_at(-0.5), 0.0);
        assert_eq!(wf.value_at(2.5), 0.0);
    }

    #[test]
    fn test_resample_finer() {
        let wf = Waveform::new(vec![0.0, 2.0, 4.0], 1.0, 0.0);
        let fine = wf.resample(0.5, 6);
        assert_eq!(fine.samples, vec![0.0, 1.0, 2.0, 3.0, 4.0, 0.0]);
    }

    #[test]
    fn test_edge() {
        let wf = Waveform::new(vec![0.0, 0.0, 1.0, -2.0, 0.0], 0.5, 10.0);
        assert_eq!(wf.edge(), (2, 4));
        assert_eq!(wf.time_at(2), 11.0);

        let empty = Waveform::zeros(4, 1.0, 0.0);
        assert_eq!(empty.edge(), (4, 4));
    }
}
