//! Detector response at each impact position of a plane.
//!
//! A [`FieldResponse`] gives the induced current on a wire for charge
//! drifting along paths at fixed pitch offsets from that wire. The
//! [`PlaneImpactResponse`] table transforms each path once, folds in the
//! electronics, and indexes the spectra by wire and impact so the
//! convolution can look them up by relative pitch.

use crate::error::{SimError, SimResult};
use lib_dsp::fft::fit_length;
use lib_dsp::{DftPlan, DspError, FftEngine};
use lib_types::{units, Waveform};
use num_complex::Complex64;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Induced current for charge drifting at `pitch` from the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponsePath {
    pub pitch: f64,
    pub current: Vec<f64>,
}

/// Field response of one plane.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldResponse {
    pub paths: Vec<ResponsePath>,
    /// Distance between wires.
    pub pitch: f64,
    /// Distance between neighboring paths.
    pub impact: f64,
    /// Sampling period of the currents.
    pub period: f64,
}

/// Cold front-end amplifier parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColdElec {
    pub gain: f64,
    pub shaping: f64,
}

impl Default for ColdElec {
    fn default() -> Self {
        Self {
            gain: 14.0 * units::MV / units::FC,
            shaping: 2.0 * units::US,
        }
    }
}

impl ColdElec {
    pub fn new(gain: f64, shaping: f64) -> Self {
        Self { gain, shaping }
    }

    pub fn value(&self, time: f64) -> f64 {
        coldelec(time, self.gain, self.shaping)
    }

    /// Response sampled at the centers of `nticks` ticks.
    pub fn generate(&self, tick: f64, nticks: usize) -> Vec<f64> {
        (0..nticks)
            .map(|i| self.value((i as f64 + 0.5) * tick))
            .collect()
    }
}

/// Impulse response of the cold electronics shaper. Zero outside
/// `(0, 10 us)`.
pub fn coldelec(time: f64, gain: f64, shaping: f64) -> f64 {
    if time <= 0.0 || time >= 10.0 * units::US {
        return 0.0;
    }

    let t = time / shaping;
    let g = gain * 10.0;

    let e1 = (-2.94809 * t).exp();
    let e2 = (-2.82833 * t).exp();
    let e3 = (-2.40318 * t).exp();
    let (s1, c1) = (1.19361 * t).sin_cos();
    let (s2, c2) = (2.38722 * t).sin_cos();
    let (s3, c3) = (2.5928 * t).sin_cos();
    let (s4, c4) = (5.18561 * t).sin_cos();

    g * (4.31054 * e1
        - 2.6202 * e2 * c1
        - 2.6202 * e2 * c1 * c2
        + 0.464924 * e3 * c3
        + 0.464924 * e3 * c3 * c4
        + 0.762456 * e2 * s1
        - 0.762456 * e2 * c2 * s1
        + 0.762456 * e2 * c1 * s2
        - 2.6202 * e2 * s1 * s2
        - 0.327684 * e3 * s3
        + 0.327684 * e3 * c4 * s3
        - 0.327684 * e3 * c3 * s4
        + 0.464924 * e3 * s3 * s4)
}

/// Response spectrum at one impact position.
#[derive(Clone, Debug, PartialEq)]
pub struct ImpactResponse {
    impact: i32,
    pitch: f64,
    spectrum: Vec<Complex64>,
}

impl ImpactResponse {
    /// Impact number relative to the wire, `pitch / impact`.
    pub fn impact(&self) -> i32 {
        self.impact
    }

    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    pub fn spectrum(&self) -> &[Complex64] {
        &self.spectrum
    }
}

/// All impact responses of a plane, indexed by wire and impact.
///
/// Each wire region spans `[-pitch/2, pitch/2]` around the wire and holds
/// `pitch/impact + 1` impact positions, so the region edges appear in both
/// neighboring wires.
#[derive(Clone, Debug)]
pub struct PlaneImpactResponse {
    responses: Vec<ImpactResponse>,
    bywire: Vec<Vec<Option<usize>>>,
    pitch: f64,
    impact: f64,
    half_extent: f64,
    tick: f64,
    nticks: usize,
}

impl PlaneImpactResponse {
    /// Build the table for a readout of `nticks` ticks.
    ///
    /// Currents are resampled to the tick and truncated or zero-padded to
    /// `nticks` before transforming. If no path has a negative pitch the
    /// paths are mirrored about the wire.
    pub fn new(
        fr: &FieldResponse,
        elec: Option<ColdElec>,
        tick: f64,
        nticks: usize,
        fft: &mut FftEngine,
    ) -> SimResult<Self> {
        validate(fr, tick)?;

        let mirrored: Vec<ResponsePath> = if fr.paths.iter().all(|p| p.pitch >= 0.0) {
            fr.paths
                .iter()
                .filter(|p| p.pitch > 0.0)
                .map(|p| ResponsePath {
                    pitch: -p.pitch,
                    current: p.current.clone(),
                })
                .collect()
        } else {
            Vec::new()
        };
        let mut paths: Vec<&ResponsePath> = fr.paths.iter().chain(mirrored.iter()).collect();
        paths.sort_by(|a, b| a.pitch.total_cmp(&b.pitch));
        for pair in paths.windows(2) {
            if (pair[1].pitch - pair[0].pitch).abs() < 0.5 * fr.impact {
                return Err(SimError::Response(format!(
                    "duplicate response paths at pitch {}",
                    pair[0].pitch
                )));
            }
        }

        let plan = fft.plan(nticks)?;
        let elec_spectrum = match elec {
            Some(ce) => Some(plan.forward(&ce.generate(tick, nticks))?),
            None => None,
        };

        let spectra = paths
            .par_iter()
            .map(|path| path_spectrum(path, fr.period, tick, &plan, elec_spectrum.as_deref()))
            .collect::<Result<Vec<_>, DspError>>()?;

        let responses: Vec<ImpactResponse> = paths
            .iter()
            .zip(spectra)
            .map(|(path, spectrum)| ImpactResponse {
                impact: (path.pitch / fr.impact).round() as i32,
                pitch: path.pitch,
                spectrum,
            })
            .collect();

        let half_extent = paths.iter().map(|p| p.pitch.abs()).fold(0.0, f64::max);
        let ratio = (fr.pitch / fr.impact).round() as i32;
        let half_wires = (half_extent / fr.pitch).round() as i32;
        let pitches: Vec<f64> = responses.iter().map(|r| r.pitch).collect();

        let bywire = (-half_wires..=half_wires)
            .map(|relwire| {
                (0..=ratio)
                    .map(|i| {
                        let rel = relwire as f64 * fr.pitch + (i - ratio / 2) as f64 * fr.impact;
                        let k = pitches.partition_point(|&p| p < rel - 0.5 * fr.impact);
                        (k < pitches.len() && (pitches[k] - rel).abs() < 0.5 * fr.impact)
                            .then_some(k)
                    })
                    .collect()
            })
            .collect();

        tracing::debug!(
            npaths = responses.len(),
            nwires = 2 * half_wires + 1,
            nimp_per_wire = ratio + 1,
            half_extent,
            nticks,
            electronics = elec.is_some(),
            "plane impact response"
        );

        Ok(Self {
            responses,
            bywire,
            pitch: fr.pitch,
            impact: fr.impact,
            half_extent,
            tick,
            nticks,
        })
    }

    /// Full pitch extent covered by the response paths.
    pub fn pitch_range(&self) -> f64 {
        2.0 * self.half_extent
    }

    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    /// Distance between impact positions.
    pub fn impact(&self) -> f64 {
        self.impact
    }

    pub fn tick(&self) -> f64 {
        self.tick
    }

    pub fn nticks(&self) -> usize {
        self.nticks
    }

    pub fn nwires(&self) -> usize {
        self.bywire.len()
    }

    pub fn nimp_per_wire(&self) -> usize {
        self.bywire.first().map_or(0, Vec::len)
    }

    pub fn responses(&self) -> &[ImpactResponse] {
        &self.responses
    }

    fn half_wires(&self) -> i32 {
        (self.bywire.len() / 2) as i32
    }

    fn split(&self, relpitch: f64) -> (i32, f64) {
        let relwire = (relpitch / self.pitch).round() as i32;
        (relwire, relpitch - relwire as f64 * self.pitch)
    }

    fn lookup(&self, wire: i32, impact: i32) -> Option<&ImpactResponse> {
        let wire = usize::try_from(wire).ok()?;
        let impact = usize::try_from(impact).ok()?;
        let k = (*self.bywire.get(wire)?.get(impact)?)?;
        self.responses.get(k)
    }

    /// Table indices of the wire and impact nearest `relpitch`, measured
    /// from the wire of interest. May be out of bounds.
    pub fn closest_wire_impact(&self, relpitch: f64) -> (i32, i32) {
        let (relwire, rem) = self.split(relpitch);
        let half_imp = (self.nimp_per_wire() / 2) as i32;
        (
            relwire + self.half_wires(),
            (rem / self.impact).round() as i32 + half_imp,
        )
    }

    /// Response at the impact position nearest `relpitch`.
    pub fn closest(&self, relpitch: f64) -> Option<&ImpactResponse> {
        let (wire, impact) = self.closest_wire_impact(relpitch);
        self.lookup(wire, impact)
    }

    /// Responses at the impact positions on either side of `relpitch`. A
    /// position on an impact gives that response twice.
    pub fn bounded(&self, relpitch: f64) -> Option<(&ImpactResponse, &ImpactResponse)> {
        let (relwire, rem) = self.split(relpitch);
        let wire = relwire + self.half_wires();

        let mut x = rem / self.impact + (self.nimp_per_wire() / 2) as f64;
        if (x - x.round()).abs() < 1e-6 {
            x = x.round();
        }
        let lo = self.lookup(wire, x.floor() as i32)?;
        let hi = self.lookup(wire, x.ceil() as i32)?;
        Some((lo, hi))
    }
}

fn validate(fr: &FieldResponse, tick: f64) -> SimResult<()> {
    if fr.paths.is_empty() {
        return Err(SimError::Response("field response has no paths".into()));
    }
    if !(fr.pitch > 0.0 && fr.impact > 0.0 && fr.period > 0.0 && tick > 0.0) {
        return Err(SimError::Response(format!(
            "pitch ({}), impact ({}), period ({}) and tick ({}) must be positive",
            fr.pitch, fr.impact, fr.period, tick
        )));
    }
    let ratio = fr.pitch / fr.impact;
    if (ratio - ratio.round()).abs() > 1e-6 || ratio.round() as i64 % 2 != 0 {
        return Err(SimError::Response(format!(
            "wire pitch {} is not an even number of impact steps of {}",
            fr.pitch, fr.impact
        )));
    }
    for path in &fr.paths {
        let steps = path.pitch / fr.impact;
        if (steps - steps.round()).abs() > 1e-6 {
            return Err(SimError::Response(format!(
                "path at pitch {} is not on an impact position",
                path.pitch
            )));
        }
        if path.current.is_empty() {
            return Err(SimError::Response(format!(
                "path at pitch {} has no current samples",
                path.pitch
            )));
        }
    }
    Ok(())
}

fn path_spectrum(
    path: &ResponsePath,
    period: f64,
    tick: f64,
    plan: &DftPlan,
    elec: Option<&[Complex64]>,
) -> Result<Vec<Complex64>, DspError> {
    let current = if (period - tick).abs() <= 1e-9 * tick {
        path.current.clone()
    } else {
        let duration = path.current.len() as f64 * period;
        let n = (duration / tick).ceil() as usize;
        Waveform::new(path.current.clone(), period, 0.0)
            .resample(tick, n)
            .samples
    };

    let mut spectrum = plan.forward(&fit_length(&current, plan.len()))?;
    if let Some(elec) = elec {
        for (s, e) in spectrum.iter_mut().zip(elec) {
            *s *= e;
        }
    }
    Ok(spectrum)
}
