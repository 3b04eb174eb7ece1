//! Convolution of binned charge with the plane impact response.

use crate::binned::BinnedDiffusion;
use crate::config::ZipperConfig;
use crate::error::{SimError, SimResult};
use crate::response::PlaneImpactResponse;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// How the response at an impact position is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// Plain average of the two bracketing responses, not weighted by
    /// distance.
    #[default]
    Bounded,
    /// Response of the nearest impact position.
    Closest,
}

impl ResponseMode {
    /// Scale undoing the number of responses summed per impact.
    pub fn factor(self) -> f64 {
        match self {
            ResponseMode::Bounded => 0.5,
            ResponseMode::Closest => 1.0,
        }
    }
}

/// Produces per-wire waveforms from a [`BinnedDiffusion`].
///
/// With eviction on, wires must be requested in increasing order: after
/// each wire the impacts below its window are erased.
pub struct ImpactZipper<'a> {
    pir: &'a PlaneImpactResponse,
    bd: &'a mut BinnedDiffusion,
    mode: ResponseMode,
    evict: bool,
    last_wire: Option<usize>,
}

impl<'a> ImpactZipper<'a> {
    pub fn new(
        pir: &'a PlaneImpactResponse,
        bd: &'a mut BinnedDiffusion,
        mode: ResponseMode,
        evict: bool,
    ) -> SimResult<Self> {
        if pir.nticks() != bd.nticks() {
            return Err(SimError::InvalidConfig(format!(
                "response has {} ticks but the readout has {}",
                pir.nticks(),
                bd.nticks()
            )));
        }
        let tick = bd.tbins().step();
        if (pir.tick() - tick).abs() > 1e-6 * tick {
            return Err(SimError::InvalidConfig(format!(
                "response tick {} differs from readout tick {}",
                pir.tick(),
                tick
            )));
        }
        let pitch = bd.pimpos().pitch();
        if (pir.pitch() - pitch).abs() > 1e-6 * pitch {
            return Err(SimError::InvalidConfig(format!(
                "response wire pitch {} differs from plane pitch {}",
                pir.pitch(),
                pitch
            )));
        }
        // plane impacts may subdivide the response impacts, never straddle them
        let step = bd.pbins().step();
        let ratio = pir.impact() / step;
        if ratio.round() < 1.0 || (ratio - ratio.round()).abs() > 1e-6 {
            return Err(SimError::InvalidConfig(format!(
                "plane impact step {} does not divide response impact step {}",
                step,
                pir.impact()
            )));
        }
        Ok(Self {
            pir,
            bd,
            mode,
            evict,
            last_wire: None,
        })
    }

    pub fn from_config(
        pir: &'a PlaneImpactResponse,
        bd: &'a mut BinnedDiffusion,
        config: &ZipperConfig,
    ) -> SimResult<Self> {
        Self::new(pir, bd, config.mode, config.evict)
    }

    pub fn mode(&self) -> ResponseMode {
        self.mode
    }

    pub fn binned(&self) -> &BinnedDiffusion {
        &*self.bd
    }

    /// First and last impact index within half the response pitch range
    /// of a wire.
    pub fn impact_window(&self, iwire: usize) -> (i32, i32) {
        let wire_pos = self.bd.pimpos().region_binning().center(iwire as i32);
        let half = 0.5 * self.pir.pitch_range();
        let ib = self.bd.pbins();
        (ib.index(wire_pos - half), ib.index(wire_pos + half))
    }

    /// Signal on wire `iwire`, one sample per tick.
    pub fn waveform(&mut self, iwire: usize) -> SimResult<Vec<f64>> {
        if self.evict {
            if let Some(last) = self.last_wire {
                if iwire < last {
                    tracing::warn!(
                        iwire,
                        last,
                        "wire requested out of order, charge below it may have been evicted"
                    );
                }
            }
            self.last_wire = Some(iwire);
        }

        let wire_pos = self.bd.pimpos().region_binning().center(iwire as i32);
        let (min_impact, max_impact) = self.impact_window(iwire);
        let ib = *self.bd.pbins();
        let nticks = self.bd.nticks();

        let mut spectrum = vec![Complex64::new(0.0, 0.0); nticks];
        let mut nfound = 0usize;
        for imp in min_impact..=max_impact {
            let Some(id) = self.bd.impact_data(imp)? else {
                continue;
            };
            if id.strip()?.is_none() {
                continue;
            }
            let charge = id.spectrum()?;
            let rel = ib.position(imp) - wire_pos;

            match self.mode {
                ResponseMode::Bounded => {
                    let Some((r1, r2)) = self.pir.bounded(rel) else {
                        continue;
                    };
                    for (k, s) in spectrum.iter_mut().enumerate() {
                        *s += charge[k] * (r1.spectrum()[k] + r2.spectrum()[k]);
                    }
                }
                ResponseMode::Closest => {
                    let Some(r) = self.pir.closest(rel) else {
                        continue;
                    };
                    for (k, s) in spectrum.iter_mut().enumerate() {
                        *s += charge[k] * r.spectrum()[k];
                    }
                }
            }
            nfound += 1;
        }

        if self.evict {
            self.bd.erase(0, min_impact);
        }

        tracing::trace!(iwire, min_impact, max_impact, nfound, "zipped wire");
        if nfound == 0 {
            return Ok(vec![0.0; nticks]);
        }

        let mut waveform = self.bd.plan().inverse_unnormalized(&spectrum)?;
        let scale = self.pir.tick() * self.mode.factor() / nticks as f64;
        for v in waveform.iter_mut() {
            *v *= scale;
        }
        Ok(waveform)
    }
}
