//! Charge collected at one impact position.

use crate::diffusion::{DiffusionRef, PatchState};
use lib_dsp::{DftPlan, DspResult};
use num_complex::Complex64;

/// Summed charge waveform of an impact, computed on first use.
#[derive(Clone, Debug, PartialEq)]
pub enum ImpactState {
    Pending,
    Calculated {
        waveform: Vec<f64>,
        spectrum: Vec<Complex64>,
    },
}

/// All diffusion patches overlapping one impact position.
///
/// The waveform spans the full readout, one sample per tick, so it covers
/// the time extent of every contributing patch.
#[derive(Debug)]
pub struct ImpactData {
    impact: i32,
    diffusions: Vec<DiffusionRef>,
    plan: DftPlan,
    state: ImpactState,
}

impl ImpactData {
    pub fn new(impact: i32, plan: DftPlan) -> Self {
        Self {
            impact,
            diffusions: Vec::new(),
            plan,
            state: ImpactState::Pending,
        }
    }

    /// Absolute impact index.
    pub fn impact_number(&self) -> i32 {
        self.impact
    }

    pub fn nticks(&self) -> usize {
        self.plan.len()
    }

    pub fn add(&mut self, diffusion: DiffusionRef) {
        self.diffusions.push(diffusion);
    }

    pub fn diffusions(&self) -> &[DiffusionRef] {
        &self.diffusions
    }

    pub fn state(&self) -> &ImpactState {
        &self.state
    }

    pub fn is_calculated(&self) -> bool {
        matches!(self.state, ImpactState::Calculated { .. })
    }

    /// Sum this impact's row of every patch into a waveform and transform
    /// it. Later calls return immediately.
    ///
    /// # Panics
    ///
    /// Panics if no patch was added, or if a patch has not been sampled.
    pub fn calculate(&mut self) -> DspResult<()> {
        if self.is_calculated() {
            return Ok(());
        }
        assert!(
            !self.diffusions.is_empty(),
            "impact {}: calculate() called with no diffusion patches",
            self.impact
        );

        let nticks = self.plan.len();
        let mut waveform = vec![0.0; nticks];
        for diffusion in &self.diffusions {
            let diffusion = diffusion.borrow();
            let (patch, poffset, toffset) = match diffusion.state() {
                PatchState::Pending => panic!(
                    "impact {}: diffusion patch of depo at t={} used before sampling",
                    self.impact,
                    diffusion.depo().time()
                ),
                PatchState::Empty => continue,
                PatchState::Sampled { patch, poffset, toffset } => (patch, *poffset, *toffset),
            };

            let row = self.impact - poffset;
            if row < 0 || row as usize >= patch.nrows() {
                continue;
            }
            for (col, q) in patch.row(row as usize).iter().enumerate() {
                let tick = toffset + col as i32;
                if tick >= 0 && (tick as usize) < nticks {
                    waveform[tick as usize] += q;
                }
            }
        }

        let spectrum = self.plan.forward(&waveform)?;
        self.state = ImpactState::Calculated { waveform, spectrum };
        Ok(())
    }

    /// Charge per tick.
    pub fn waveform(&mut self) -> DspResult<&[f64]> {
        self.calculate()?;
        match &self.state {
            ImpactState::Calculated { waveform, .. } => Ok(waveform),
            ImpactState::Pending => unreachable!("calculated above"),
        }
    }

    /// Half-open tick range from the first to past the last tick holding
    /// charge, or `None` if the waveform is all zero.
    pub fn strip(&mut self) -> DspResult<Option<(usize, usize)>> {
        let waveform = self.waveform()?;
        let first = waveform.iter().position(|&q| q != 0.0);
        let last = waveform.iter().rposition(|&q| q != 0.0);
        Ok(first.zip(last).map(|(a, b)| (a, b + 1)))
    }

    /// Full spectrum of [`waveform`](Self::waveform).
    pub fn spectrum(&mut self) -> DspResult<&[Complex64]> {
        self.calculate()?;
        match &self.state {
            ImpactState::Calculated { spectrum, .. } => Ok(spectrum),
            ImpactState::Pending => unreachable!("calculated above"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diffusion::{ClipPolicy, GaussianDiffusion};
    use lib_dsp::{FftEngine, GausDesc};
    use lib_types::{Depo, LinearSampling, Point};

    fn sampled(time: f64, pitch: f64, charge: f64) -> DiffusionRef {
        let tbins = LinearSampling::new(64, 0.0, 63.0);
        let pbins = LinearSampling::new(11, 0.0, 10.0);
        let depo = Depo::new(time, Point::new(0.0, 0.0, pitch), charge).into_ref();
        let mut gd = GaussianDiffusion::new(depo, GausDesc::new(time, 2.0), GausDesc::new(pitch, 0.5));
        gd.set_sampling(&tbins, &pbins, 3.0, ClipPolicy::Lose);
        gd.into_shared()
    }

    fn plan() -> DftPlan {
        FftEngine::new().plan(64).unwrap()
    }

    #[test]
    fn test_overlapping_patches_sum() {
        let mut id = ImpactData::new(5, plan());
        id.add(sampled(20.0, 5.0, 100.0));
        id.add(sampled(30.0, 5.0, 100.0));

        let wave = id.waveform().unwrap().to_vec();
        assert_eq!(wave.len(), 64);
        let expected: f64 = id
            .diffusions()
            .iter()
            .map(|d| d.borrow().patch().unwrap().row(1).sum())
            .sum();
        assert!((wave.iter().sum::<f64>() - expected).abs() < 1e-9);
        assert!(wave[20] > 0.0 && wave[30] > 0.0);
        assert_eq!(wave[0], 0.0);
    }

    #[test]
    fn test_calculate_is_idempotent() {
        let mut id = ImpactData::new(4, plan());
        id.add(sampled(20.0, 5.0, 100.0));
        id.calculate().unwrap();
        let first = id.state().clone();
        id.calculate().unwrap();
        assert_eq!(id.state(), &first);
        let spectrum = id.spectrum().unwrap().to_vec();
        match first {
            ImpactState::Calculated { spectrum: s, .. } => assert_eq!(s, spectrum),
            ImpactState::Pending => panic!("not calculated"),
        }
    }

    #[test]
    fn test_row_outside_patch_is_zero() {
        let mut id = ImpactData::new(0, plan());
        id.add(sampled(20.0, 8.0, 100.0));
        assert!(id.waveform().unwrap().iter().all(|&q| q == 0.0));
        assert_eq!(id.strip().unwrap(), None);
    }

    #[test]
    fn test_strip() {
        let mut id = ImpactData::new(5, plan());
        id.add(sampled(20.0, 5.0, 100.0));
        // 3 sigma of 2 ticks either side of tick 20
        assert_eq!(id.strip().unwrap(), Some((14, 27)));

        let mut id = ImpactData::new(5, plan());
        id.add(sampled(20.0, 5.0, -100.0));
        id.add(sampled(40.0, 5.0, -100.0));
        assert_eq!(id.strip().unwrap(), Some((14, 47)));
    }

    #[test]
    #[should_panic(expected = "no diffusion patches")]
    fn test_calculate_without_patches_panics() {
        let mut id = ImpactData::new(0, plan());
        let _ = id.calculate();
    }

    #[test]
    #[should_panic(expected = "before sampling")]
    fn test_unsampled_patch_panics() {
        let depo = Depo::new(1.0, Point::ORIGIN, 1.0).into_ref();
        let gd = GaussianDiffusion::new(depo, GausDesc::new(1.0, 1.0), GausDesc::new(0.0, 1.0));
        let mut id = ImpactData::new(0, plan());
        id.add(gd.into_shared());
        let _ = id.calculate();
    }
}
