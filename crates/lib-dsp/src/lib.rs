//! # lib-dsp
//!
//! Numerical kernels for the LArTPC drift and response simulation.
//!
//! - **DFT**: full-spectrum forward and unnormalized inverse transforms of
//!   any length, with planner caching
//! - **Gaussian sampling**: erf-integrated bin weights of a Gaussian on a
//!   uniform sample axis

pub mod error;
pub mod fft;
pub mod gaussian;

pub use error::{DspError, DspResult};
pub use fft::{DftPlan, FftEngine};
pub use gaussian::{GausDesc, SampledGaussian};
