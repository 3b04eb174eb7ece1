//! System of units.
//!
//! Inside the numerical stages every quantity is an `f64` expressed in a
//! single consistent system: lengths in millimeters, times in nanoseconds,
//! charge in number of electrons. Multiply by a constant to enter the
//! system and divide by it to leave:
//!
//! ```
//! use lib_types::units;
//! let tick = 0.5 * units::US;
//! assert_eq!(tick / units::NS, 500.0);
//! ```
//!
//! Configuration carries times and lengths as the [`Time`] and [`Length`]
//! newtypes so the two cannot be swapped at that boundary.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul};

// Length
pub const MM: f64 = 1.0;
pub const UM: f64 = 1e-3 * MM;
pub const CM: f64 = 10.0 * MM;
pub const M: f64 = 1000.0 * MM;

// Area
pub const MM2: f64 = MM * MM;
pub const CM2: f64 = CM * CM;

// Time
pub const NS: f64 = 1.0;
pub const US: f64 = 1e3 * NS;
pub const MS: f64 = 1e6 * NS;
pub const S: f64 = 1e9 * NS;

// Frequency
pub const HZ: f64 = 1.0 / S;
pub const KHZ: f64 = 1e3 * HZ;
pub const MHZ: f64 = 1e6 * HZ;

// Charge, counted in electrons.
pub const EPLUS: f64 = 1.0;

// Electronics gain is quoted in mV/fC.
pub const MV: f64 = 1.0;
pub const FC: f64 = 6241.509 * EPLUS;

/// A time, or duration, in the system of units.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Time(pub f64);

impl Time {
    pub const ZERO: Self = Self(0.0);

    #[inline]
    pub fn from_us(us: f64) -> Self {
        Self(us * US)
    }

    #[inline]
    pub fn from_ms(ms: f64) -> Self {
        Self(ms * MS)
    }

    #[inline]
    pub fn as_us(&self) -> f64 {
        self.0 / US
    }

    #[inline]
    pub fn as_ms(&self) -> f64 {
        self.0 / MS
    }
}

impl Add for Time {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Mul<f64> for Time {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self(self.0 * rhs)
    }
}

impl Div<Time> for Time {
    type Output = f64;
    fn div(self, rhs: Time) -> f64 {
        self.0 / rhs.0
    }
}

/// A length in the system of units.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Length(pub f64);

impl Length {
    pub const ZERO: Self = Self(0.0);

    #[inline]
    pub fn from_mm(mm: f64) -> Self {
        Self(mm * MM)
    }

    #[inline]
    pub fn as_mm(&self) -> f64 {
        self.0 / MM
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newtypes() {
        let readout = Time::from_ms(5.0);
        let tick = Time::from_us(0.5);
        assert_eq!((readout / tick).round(), 10000.0);
        assert_eq!((tick + tick).as_us(), 1.0);
        assert_eq!((tick * 4.0).as_us(), 2.0);
        assert_eq!(readout.as_ms(), 5.0);
        assert_eq!(Length::from_mm(2.5).as_mm(), 2.5);
        assert_eq!(Length::from_mm(1.0).0, 1.0 * MM);
    }

    #[test]
    fn test_time_scales() {
        assert_eq!(1.0 * MS / US, 1000.0);
        assert_eq!(1.0 * S / MS, 1000.0);
        assert!((1.0 / (1.0 * MHZ) - 1.0 * US).abs() < 1e-9);
    }

    #[test]
    fn test_diffusion_coefficient_units() {
        // 7.2 cm^2/s expressed in mm^2/ns
        let dl = 7.2 * CM2 / S;
        assert!((dl - 7.2e-7).abs() < 1e-15);
    }
}
