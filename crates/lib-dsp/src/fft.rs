//! Discrete Fourier transforms using rustfft and realfft.
//!
//! This module provides a high-level wrapper around the FFT planners with:
//! - Planner caching for repeated transforms of the same length
//! - A reusable [`DftPlan`] bound to one length, cheap to clone and share
//! - Full (not half) spectra, so spectra of real signals can be multiplied
//!   and summed element-wise with response spectra
//!
//! Any length is accepted; wire readouts are rarely a power of 2.

use crate::error::{DspError, DspResult};
use num_complex::Complex64;
use realfft::{RealFftPlanner, RealToComplex};
use rustfft::{Fft, FftPlanner};
use std::fmt;
use std::sync::Arc;

/// FFT engine with cached planners.
pub struct FftEngine {
    /// Complex FFT planner.
    complex_planner: FftPlanner<f64>,

    /// Real FFT planner.
    real_planner: RealFftPlanner<f64>,
}

impl FftEngine {
    /// Create a new FFT engine.
    pub fn new() -> Self {
        Self {
            complex_planner: FftPlanner::new(),
            real_planner: RealFftPlanner::new(),
        }
    }

    /// Build forward and inverse transforms for sequences of `len` samples.
    pub fn plan(&mut self, len: usize) -> DspResult<DftPlan> {
        if len == 0 {
            return Err(DspError::InsufficientData { needed: 1, got: 0 });
        }
        tracing::debug!(len, "planning DFT");
        Ok(DftPlan {
            len,
            r2c: self.real_planner.plan_fft_forward(len),
            c2c_inverse: self.complex_planner.plan_fft_inverse(len),
        })
    }
}

impl Default for FftEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Forward and inverse transforms of one fixed length.
#[derive(Clone)]
pub struct DftPlan {
    len: usize,
    r2c: Arc<dyn RealToComplex<f64>>,
    c2c_inverse: Arc<dyn Fft<f64>>,
}

impl fmt::Debug for DftPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DftPlan").field("len", &self.len).finish()
    }
}

impl DftPlan {
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn check_len(&self, actual: usize) -> DspResult<()> {
        if actual != self.len {
            return Err(DspError::LengthMismatch {
                expected: self.len,
                actual,
            });
        }
        Ok(())
    }

    /// Forward transform of a real signal.
    ///
    /// Returns all N frequency bins. The upper half is filled in from the
    /// Hermitian symmetry of a real input.
    pub fn forward(&self, data: &[f64]) -> DspResult<Vec<Complex64>> {
        self.check_len(data.len())?;

        let mut input = data.to_vec();
        let mut half = self.r2c.make_output_vec();
        self.r2c
            .process(&mut input, &mut half)
            .map_err(|e| DspError::NumericalInstability(e.to_string()))?;

        let mut full = Vec::with_capacity(self.len);
        full.extend_from_slice(&half);
        for k in half.len()..self.len {
            full.push(half[self.len - k].conj());
        }
        Ok(full)
    }

    /// Inverse transform keeping only the real part, without the 1/N
    /// factor. Callers fold the normalization into their own scaling.
    pub fn inverse_unnormalized(&self, spectrum: &[Complex64]) -> DspResult<Vec<f64>> {
        self.check_len(spectrum.len())?;

        let mut buffer = spectrum.to_vec();
        self.c2c_inverse.process(&mut buffer);
        Ok(buffer.iter().map(|c| c.re).collect())
    }

    /// Inverse transform normalized so that `inverse(forward(x)) == x`.
    pub fn inverse(&self, spectrum: &[Complex64]) -> DspResult<Vec<f64>> {
        let mut out = self.inverse_unnormalized(spectrum)?;
        let scale = 1.0 / self.len as f64;
        for x in out.iter_mut() {
            *x *= scale;
        }
        Ok(out)
    }
}

/// Truncate or zero-pad a signal to exactly `new_len` samples.
pub fn fit_length(signal: &[f64], new_len: usize) -> Vec<f64> {
    let mut result: Vec<f64> = signal.iter().copied().take(new_len).collect();
    result.resize(new_len, 0.0);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_forward_inverse_roundtrip() {
        let mut engine = FftEngine::new();

        // Not a power of 2 on purpose
        let n = 100;
        let plan = engine.plan(n).unwrap();
        let signal: Vec<f64> = (0..n)
            .map(|i| {
                let t = i as f64 / n as f64;
                (2.0 * PI * 4.0 * t).sin() + 0.25 * (i % 7) as f64
            })
            .collect();

        let spectrum = plan.forward(&signal).unwrap();
        assert_eq!(spectrum.len(), n);

        let unnorm = plan.inverse_unnormalized(&spectrum).unwrap();
        for (orig, rec) in signal.iter().zip(unnorm.iter()) {
            assert!((orig * n as f64 - rec).abs() < 1e-8);
        }

        let recovered = plan.inverse(&spectrum).unwrap();
        for (orig, rec) in signal.iter().zip(recovered.iter()) {
            assert!((orig - rec).abs() < 1e-10);
        }
    }

    #[test]
    fn test_full_spectrum_is_hermitian() {
        let mut engine = FftEngine::new();
        let n = 9;
        let plan = engine.plan(n).unwrap();
        let signal: Vec<f64> = (0..n).map(|i| (i * i) as f64 - 3.0).collect();

        let spectrum = plan.forward(&signal).unwrap();
        assert_relative_eq!(spectrum[0].re, signal.iter().sum::<f64>(), epsilon = 1e-10);
        for k in 1..n {
            let a = spectrum[k];
            let b = spectrum[n - k].conj();
            assert!((a - b).norm() < 1e-10);
        }
    }

    #[test]
    fn test_delta_has_flat_spectrum() {
        let mut engine = FftEngine::new();
        let plan = engine.plan(16).unwrap();
        let mut delta = vec![0.0; 16];
        delta[0] = 2.0;
        for c in plan.forward(&delta).unwrap() {
            assert!((c - Complex64::new(2.0, 0.0)).norm() < 1e-12);
        }
    }

    #[test]
    fn test_length_mismatch() {
        let mut engine = FftEngine::new();
        let plan = engine.plan(8).unwrap();

        let result = plan.forward(&[1.0; 5]);
        assert!(matches!(
            result,
            Err(DspError::LengthMismatch { expected: 8, actual: 5 })
        ));
        assert!(engine.plan(0).is_err());
    }

    #[test]
    fn test_fit_length() {
        assert_eq!(fit_length(&[1.0, 2.0, 3.0], 2), vec![1.0, 2.0]);
        assert_eq!(fit_length(&[1.0], 3), vec![1.0, 0.0, 0.0]);
    }
}
