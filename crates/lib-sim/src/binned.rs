//! Diffused depositions binned onto a plane's impact positions.

use crate::config::DiffusionConfig;
use crate::diffusion::{ClipPolicy, GaussianDiffusion};
use crate::error::{SimError, SimResult};
use crate::impact::ImpactData;
use crate::random::Random;
use lib_dsp::{DftPlan, FftEngine, GausDesc};
use lib_types::{DepoRef, LinearSampling, Pimpos, Point};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Sparse map from impact index to the charge collected there.
///
/// Depositions are accepted with [`add`](Self::add), which only records
/// which impacts a patch touches. Patches are sampled, and impact
/// waveforms summed, on the first [`impact_data`](Self::impact_data)
/// query for a covered impact.
pub struct BinnedDiffusion {
    pimpos: Pimpos,
    pbins: LinearSampling,
    tbins: LinearSampling,
    nsigma: f64,
    clip: ClipPolicy,
    rng: Option<Box<dyn Random>>,
    plan: DftPlan,
    impacts: BTreeMap<i32, ImpactData>,
}

impl BinnedDiffusion {
    /// Bin onto the impact positions of `pimpos` and the ticks of `tbins`.
    ///
    /// Patches are fluctuated if and only if a random source is given.
    pub fn new(
        pimpos: Pimpos,
        tbins: LinearSampling,
        nsigma: f64,
        clip: ClipPolicy,
        rng: Option<Box<dyn Random>>,
        fft: &mut FftEngine,
    ) -> SimResult<Self> {
        if !(nsigma > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "nsigma must be positive, got {}",
                nsigma
            )));
        }
        let pbins = pimpos.impact_sampling();
        let plan = fft.plan(tbins.n)?;
        tracing::debug!(
            nimpacts = pbins.n,
            nticks = tbins.n,
            nsigma,
            ?clip,
            fluctuate = rng.is_some(),
            "binned diffusion"
        );
        Ok(Self {
            pimpos,
            pbins,
            tbins,
            nsigma,
            clip,
            rng,
            plan,
            impacts: BTreeMap::new(),
        })
    }

    /// Build from configuration. A fluctuating configuration needs `rng`;
    /// a non-fluctuating one ignores it.
    pub fn from_config(
        pimpos: Pimpos,
        tbins: LinearSampling,
        config: &DiffusionConfig,
        rng: Option<Box<dyn Random>>,
        fft: &mut FftEngine,
    ) -> SimResult<Self> {
        config.validate()?;
        let rng = match (config.fluctuate, rng) {
            (true, None) => {
                return Err(SimError::InvalidConfig(
                    "fluctuated diffusion requires a random source".into(),
                ))
            }
            (true, rng) => rng,
            (false, _) => None,
        };
        Self::new(pimpos, tbins, config.nsigma, config.clip, rng, fft)
    }

    pub fn pimpos(&self) -> &Pimpos {
        &self.pimpos
    }

    /// Impact positions.
    pub fn pbins(&self) -> &LinearSampling {
        &self.pbins
    }

    /// Ticks.
    pub fn tbins(&self) -> &LinearSampling {
        &self.tbins
    }

    pub fn nimpacts(&self) -> usize {
        self.pbins.n
    }

    pub fn nticks(&self) -> usize {
        self.tbins.n
    }

    pub fn nsigma(&self) -> f64 {
        self.nsigma
    }

    pub fn is_fluctuated(&self) -> bool {
        self.rng.is_some()
    }

    /// Transforms of one readout length.
    pub fn plan(&self) -> &DftPlan {
        &self.plan
    }

    /// Number of impacts currently holding charge.
    pub fn len(&self) -> usize {
        self.impacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.impacts.is_empty()
    }

    /// Impact indices currently holding charge, ascending.
    pub fn impact_numbers(&self) -> impl Iterator<Item = i32> + '_ {
        self.impacts.keys().copied()
    }

    /// Pitch location of a point.
    pub fn pitch_distance(&self, pt: &Point) -> f64 {
        self.pimpos.distance(pt)
    }

    /// Impact index nearest a pitch location; may be out of bounds.
    pub fn impact_index(&self, pitch: f64) -> i32 {
        self.pbins.index(pitch)
    }

    /// Accept a deposition diffused by the given sigmas.
    ///
    /// Returns false, with no side effect, if its `nsigma` envelope misses
    /// the sampled time or pitch domain, each widened by half a bin, or if
    /// a sigma is negative or not finite.
    pub fn add(&mut self, depo: DepoRef, sigma_time: f64, sigma_pitch: f64) -> bool {
        let Some(time_desc) = GausDesc::checked(depo.time(), sigma_time) else {
            tracing::warn!(time = depo.time(), sigma_time, "unusable time diffusion, depo dropped");
            return false;
        };
        let (tmin, tmax) = self.tbins.extent();
        if time_desc.outside(tmin, tmax, self.nsigma) {
            tracing::trace!(time = depo.time(), sigma_time, "depo outside time domain");
            return false;
        }

        let pitch = self.pitch_distance(&depo.pos());
        let Some(pitch_desc) = GausDesc::checked(pitch, sigma_pitch) else {
            tracing::warn!(pitch, sigma_pitch, "unusable pitch diffusion, depo dropped");
            return false;
        };
        let (pmin, pmax) = self.pbins.extent();
        if pitch_desc.outside(pmin, pmax, self.nsigma) {
            tracing::trace!(pitch = pitch_desc.center, sigma_pitch, "depo outside pitch domain");
            return false;
        }

        let (b0, b1) = pitch_desc.sample_range(&self.pbins, self.nsigma);
        let min_impact = b0.max(0);
        let max_impact = (b1 - 1).min(self.pbins.n as i32 - 1);

        let gd = GaussianDiffusion::new(depo, time_desc, pitch_desc).into_shared();
        for imp in min_impact..=max_impact {
            self.impacts
                .entry(imp)
                .or_insert_with(|| ImpactData::new(imp, self.plan.clone()))
                .add(Rc::clone(&gd));
        }
        true
    }

    /// Charge collected at an impact, or `None` if the index is out of
    /// range or nothing was deposited there.
    ///
    /// Samples every patch touching the impact (a no-op for patches
    /// already sampled) and calculates the impact waveform.
    pub fn impact_data(&mut self, number: i32) -> SimResult<Option<&mut ImpactData>> {
        if !self.pbins.contains(number) {
            return Ok(None);
        }
        let Some(id) = self.impacts.get_mut(&number) else {
            return Ok(None);
        };

        for diffusion in id.diffusions() {
            let mut gd = diffusion.borrow_mut();
            match self.rng.as_deref_mut() {
                Some(rng) => gd.set_sampling_fluctuated(
                    &self.tbins,
                    &self.pbins,
                    self.nsigma,
                    self.clip,
                    rng,
                ),
                None => gd.set_sampling(&self.tbins, &self.pbins, self.nsigma, self.clip),
            }
        }

        id.calculate()?;
        Ok(Some(id))
    }

    /// Drop impacts in `[begin, end)`. Missing impacts are ignored.
    pub fn erase(&mut self, begin: i32, end: i32) {
        if begin >= end {
            return;
        }
        let Some(&first) = self.impacts.keys().next() else {
            return;
        };
        if begin <= first {
            self.impacts = self.impacts.split_off(&end);
        } else {
            let doomed: Vec<i32> = self.impacts.range(begin..end).map(|(&k, _)| k).collect();
            for k in doomed {
                self.impacts.remove(&k);
            }
        }
    }

    /// Pitch interval covered by the `nsigma` envelopes of all depositions
    /// still held, or `None` if there are none.
    pub fn pitch_range(&self, nsigma: f64) -> Option<(f64, f64)> {
        self.impacts
            .values()
            .flat_map(|id| id.diffusions())
            .map(|gd| gd.borrow().pitch_desc().sigma_range(nsigma))
            .fold(None, |acc, (lo, hi)| match acc {
                None => Some((lo, hi)),
                Some((a, b)) => Some((f64::min(a, lo), f64::max(b, hi))),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diffusion::PatchState;
    use crate::random::StdRandom;
    use approx::assert_relative_eq;
    use lib_types::{Depo, Vector};

    /// Two wires 5 mm apart; 11 impacts from 0 to 10 mm.
    fn small_plane() -> Pimpos {
        Pimpos::new(
            2,
            2.5,
            7.5,
            Vector::new(0.0, 1.0, 0.0),
            Vector::new(0.0, 0.0, 1.0),
            Point::ORIGIN,
            5,
        )
    }

    fn tbins() -> LinearSampling {
        LinearSampling::new(100, 0.0, 99.0)
    }

    fn engine(rng: Option<Box<dyn Random>>) -> BinnedDiffusion {
        let mut fft = FftEngine::new();
        BinnedDiffusion::new(small_plane(), tbins(), 3.0, ClipPolicy::Lose, rng, &mut fft).unwrap()
    }

    fn depo(time: f64, pitch: f64, charge: f64) -> DepoRef {
        Depo::new(time, Point::new(0.0, 0.0, pitch), charge).into_ref()
    }

    #[test]
    fn test_impact_index() {
        let bd = engine(None);
        assert_eq!(bd.nimpacts(), 11);
        assert_eq!(bd.pbins().step(), 1.0);
        assert_eq!(bd.impact_index(5.0), 5);
        assert_eq!(bd.impact_index(5.4), 5);
        assert_eq!(bd.pitch_distance(&Point::new(9.0, 9.0, 4.0)), 4.0);
    }

    #[test]
    fn test_add_registers_covered_impacts() {
        let mut bd = engine(None);
        assert!(bd.add(depo(50.0, 5.0, -1000.0), 2.0, 0.5));
        let numbers: Vec<i32> = bd.impact_numbers().collect();
        assert_eq!(numbers, vec![4, 5, 6, 7]);

        let total: f64 = numbers
            .iter()
            .map(|&n| bd.impact_data(n).unwrap().unwrap().waveform().unwrap().iter().sum::<f64>())
            .sum();
        assert_relative_eq!(total, -1000.0, max_relative = 1e-9);
    }

    #[test]
    fn test_rejection_boundary() {
        let mut bd = engine(None);
        let eps = 1e-6;
        let sigma = 1.0;
        // pitch domain is [-0.5, 10.5] once widened by half a step
        assert!(!bd.add(depo(50.0, 10.5 + 3.0 * sigma + eps, -1.0), 1.0, sigma));
        assert!(!bd.add(depo(50.0, -0.5 - 3.0 * sigma - eps, -1.0), 1.0, sigma));
        assert!(bd.is_empty());
        assert!(bd.add(depo(50.0, 10.5 + 3.0 * sigma - eps, -1.0), 1.0, sigma));
        assert!(bd.add(depo(50.0, -0.5 - 3.0 * sigma + eps, -1.0), 1.0, sigma));

        // time domain is [-0.5, 99.5]
        let mut bd = engine(None);
        assert!(!bd.add(depo(99.5 + 6.0 + eps, 5.0, -1.0), 2.0, sigma));
        assert!(!bd.add(depo(-0.5 - 6.0 - eps, 5.0, -1.0), 2.0, sigma));
        assert!(bd.is_empty());
        assert!(bd.add(depo(99.5 + 6.0 - eps, 5.0, -1.0), 2.0, sigma));
    }

    #[test]
    fn test_unusable_sigma_is_rejected() {
        let mut bd = engine(None);
        assert!(!bd.add(depo(50.0, 5.0, -1.0), f64::NAN, 0.5));
        assert!(!bd.add(depo(50.0, 5.0, -1.0), 2.0, -0.5));
        assert!(!bd.add(depo(50.0, 5.0, -1.0), f64::INFINITY, 0.5));
        assert!(!bd.add(depo(f64::NAN, 5.0, -1.0), 2.0, 0.5));
        assert!(bd.is_empty());
        assert!(bd.add(depo(50.0, 5.0, -1.0), 0.0, 0.0));
    }

    #[test]
    fn test_impact_data_out_of_range() {
        let mut bd = engine(None);
        bd.add(depo(50.0, 5.0, -1000.0), 2.0, 0.5);
        assert!(bd.impact_data(-1).unwrap().is_none());
        assert!(bd.impact_data(11).unwrap().is_none());
        assert!(bd.impact_data(0).unwrap().is_none());
    }

    #[test]
    fn test_patch_sampled_once_across_impacts() {
        let rng: Box<dyn Random> = Box::new(StdRandom::seeded(5));
        let mut bd = engine(Some(rng));
        assert!(bd.is_fluctuated());
        bd.add(depo(50.0, 5.0, -10000.0), 2.0, 0.5);

        let gd = Rc::clone(&bd.impact_data(5).unwrap().unwrap().diffusions()[0]);
        let before = gd.borrow().state().clone();
        assert!(matches!(before, PatchState::Sampled { .. }));
        bd.impact_data(6).unwrap().unwrap();
        assert_eq!(gd.borrow().state(), &before);
        assert_relative_eq!(gd.borrow().patch().unwrap().sum(), -10000.0, max_relative = 1e-9);
    }

    #[test]
    fn test_erase() {
        let mut bd = engine(None);
        bd.add(depo(30.0, 2.0, -100.0), 2.0, 0.5);
        bd.add(depo(60.0, 8.0, -100.0), 2.0, 0.5);
        let before: Vec<i32> = bd.impact_numbers().collect();
        assert_eq!(before, vec![1, 2, 3, 4, 7, 8, 9, 10]);
        let kept = bd.impact_data(8).unwrap().unwrap().waveform().unwrap().to_vec();

        bd.erase(0, 8);
        for n in 0..8 {
            assert!(bd.impact_data(n).unwrap().is_none());
        }
        let after: Vec<i32> = bd.impact_numbers().collect();
        assert_eq!(after, vec![8, 9, 10]);
        assert_eq!(bd.impact_data(8).unwrap().unwrap().waveform().unwrap(), &kept[..]);

        // interior range and absent entries
        bd.erase(9, 10);
        bd.erase(3, 5);
        let after: Vec<i32> = bd.impact_numbers().collect();
        assert_eq!(after, vec![8, 10]);
    }

    #[test]
    fn test_pitch_range() {
        let mut bd = engine(None);
        assert!(bd.pitch_range(3.0).is_none());
        bd.add(depo(30.0, 2.0, -100.0), 2.0, 0.5);
        bd.add(depo(60.0, 8.0, -100.0), 2.0, 0.25);
        let (lo, hi) = bd.pitch_range(3.0).unwrap();
        assert_relative_eq!(lo, 0.5);
        assert_relative_eq!(hi, 8.75);
    }

    #[test]
    fn test_fluctuation_needs_random_source() {
        let mut fft = FftEngine::new();
        let config = DiffusionConfig::default();
        let err = BinnedDiffusion::from_config(small_plane(), tbins(), &config, None, &mut fft);
        assert!(matches!(err, Err(SimError::InvalidConfig(_))));

        let quiet = DiffusionConfig {
            fluctuate: false,
            ..DiffusionConfig::default()
        };
        let rng: Box<dyn Random> = Box::new(StdRandom::seeded(1));
        let bd = BinnedDiffusion::from_config(small_plane(), tbins(), &quiet, Some(rng), &mut fft).unwrap();
        assert!(!bd.is_fluctuated());

        let narrow = DiffusionConfig { nsigma: 0.0, ..quiet };
        let err = BinnedDiffusion::from_config(small_plane(), tbins(), &narrow, None, &mut fft);
        assert!(matches!(err, Err(SimError::Config(_))));
    }
}
