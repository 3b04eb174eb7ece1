//! Pitch and impact position coordinates of one wire plane.

use crate::binning::{Binning, LinearSampling};
use crate::point::{Point, Vector};
use serde::{Deserialize, Serialize};

/// Plane impact position description.
///
/// Pitch is measured from `origin` along the unit `pitch_dir`. Wires sit at
/// the centers of the region binning; impact positions subdivide each wire
/// region into `nimp_per_wire` steps with both region edges included.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pimpos {
    origin: Point,
    wire_dir: Vector,
    pitch_dir: Vector,
    region: Binning,
    nimp_per_wire: usize,
}

impl Pimpos {
    /// Describe a plane of `nwires` wires whose pitch locations run from
    /// `min_wire_pitch` to `max_wire_pitch` inclusive.
    ///
    /// # Panics
    ///
    /// Panics if `nwires < 2`, the wire pitch range is empty or
    /// `nimp_per_wire` is 0.
    pub fn new(
        nwires: usize,
        min_wire_pitch: f64,
        max_wire_pitch: f64,
        wire_dir: Vector,
        pitch_dir: Vector,
        origin: Point,
        nimp_per_wire: usize,
    ) -> Self {
        assert!(nwires >= 2, "a plane needs at least 2 wires, got {}", nwires);
        assert!(nimp_per_wire > 0, "nimp_per_wire must be > 0");
        let pitch = (max_wire_pitch - min_wire_pitch) / (nwires - 1) as f64;
        let half = 0.5 * pitch;
        Self {
            origin,
            wire_dir: wire_dir.norm(),
            pitch_dir: pitch_dir.norm(),
            region: Binning::new(nwires, min_wire_pitch - half, max_wire_pitch + half),
            nimp_per_wire,
        }
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn wire_dir(&self) -> Vector {
        self.wire_dir
    }

    pub fn pitch_dir(&self) -> Vector {
        self.pitch_dir
    }

    pub fn nwires(&self) -> usize {
        self.region.nbins
    }

    /// Distance between neighboring wires.
    pub fn pitch(&self) -> f64 {
        self.region.binsize()
    }

    pub fn nimp_per_wire(&self) -> usize {
        self.nimp_per_wire
    }

    /// One bin per wire, the wire at the bin center.
    pub fn region_binning(&self) -> Binning {
        self.region
    }

    /// Impact positions across the whole plane, edges included.
    pub fn impact_sampling(&self) -> LinearSampling {
        LinearSampling::new(
            self.region.nbins * self.nimp_per_wire + 1,
            self.region.min,
            self.region.max,
        )
    }

    /// Pitch location of a point.
    pub fn distance(&self, pt: &Point) -> f64 {
        self.pitch_dir.dot(&(*pt - self.origin))
    }
}
