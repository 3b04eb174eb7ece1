//! # lib-types
//!
//! Core type definitions for the LArTPC drift and response simulation.
//!
//! This crate provides foundational types used throughout the workspace:
//! - A consistent system of units
//! - Points, vectors and rays in the detector frame
//! - Binnings of pitch and time domains, and per-plane pitch geometry
//! - Immutable charge depositions with provenance
//! - Waveform representation for time-domain signals

pub mod units;
pub mod point;
pub mod binning;
pub mod pimpos;
pub mod depo;
pub mod waveform;

pub use point::*;
pub use binning::*;
pub use pimpos::*;
pub use depo::*;
pub use waveform::*;
