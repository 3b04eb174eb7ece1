//! Depositions along straight tracks.

use crate::error::{SimError, SimResult};
use lib_types::{ascending_time, units, Depo, DepoRef, Ray};
use std::collections::VecDeque;

/// A straight track as added to [`TrackDepos`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Track {
    pub time: f64,
    pub ray: Ray,
    pub dedx: f64,
}

/// Source of depositions spaced every `stepsize` along straight tracks.
///
/// Depositions are handed out in ascending time order across all tracks
/// through the [`Iterator`] implementation.
#[derive(Debug)]
pub struct TrackDepos {
    stepsize: f64,
    clight: f64,
    depos: VecDeque<DepoRef>,
    tracks: Vec<Track>,
}

impl TrackDepos {
    /// Tracks travel at `clight`; a deposition `s` along the track is made
    /// at `time + s / clight`.
    pub fn new(stepsize: f64, clight: f64) -> SimResult<Self> {
        if !(stepsize > 0.0 && clight > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "track step ({}) and speed ({}) must be positive",
                stepsize, clight
            )));
        }
        Ok(Self {
            stepsize,
            clight,
            depos: VecDeque::new(),
            tracks: Vec::new(),
        })
    }

    /// Add a track starting at `time`.
    ///
    /// A positive `dedx` is the total charge of the track spread evenly
    /// over its depositions. A negative `dedx` gives the charge of each
    /// deposition directly, as `-dedx`. Zero gives unit charge.
    pub fn add_track(&mut self, time: f64, ray: Ray, dedx: f64) {
        let dir = ray.unit();
        let length = ray.length();

        let charge = if dedx > 0.0 {
            dedx / (length / self.stepsize)
        } else if dedx < 0.0 {
            -dedx
        } else {
            1.0
        };

        let mut count = 0usize;
        let mut step = 0.0;
        while step < length {
            let here = ray.tail + dir * step;
            self.depos
                .push_back(Depo::new(time + step / self.clight, here, charge).into_ref());
            count += 1;
            step = count as f64 * self.stepsize;
        }
        self.depos.make_contiguous().sort_by(ascending_time);
        self.tracks.push(Track { time, ray, dedx });

        tracing::debug!(
            time_us = time / units::US,
            length,
            count,
            charge,
            "added track"
        );
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Depositions not yet handed out.
    pub fn len(&self) -> usize {
        self.depos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depos.is_empty()
    }
}

impl Default for TrackDepos {
    fn default() -> Self {
        Self {
            stepsize: 1.0 * units::MM,
            clight: 1.0,
            depos: VecDeque::new(),
            tracks: Vec::new(),
        }
    }
}

impl Iterator for TrackDepos {
    type Item = DepoRef;

    fn next(&mut self) -> Option<DepoRef> {
        self.depos.pop_front()
    }
}
