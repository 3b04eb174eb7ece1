//! Gaussian diffusion patch of a single deposition.
//!
//! A patch is the outer product of the pitch and time Gaussians, each
//! integrated over the sample bins of the global binning. Rows are impact
//! positions, columns are ticks. Sampling is deferred until the owning
//! [`BinnedDiffusion`](crate::BinnedDiffusion) knows the binning and random
//! source, and happens at most once.

use crate::random::{Random, StdRandom};
use lib_dsp::GausDesc;
use lib_types::{DepoRef, LinearSampling};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// Shared handle to a patch registered against several impacts.
pub type DiffusionRef = Rc<RefCell<GaussianDiffusion>>;

/// Treatment of the part of a Gaussian falling outside the binning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipPolicy {
    /// Charge off the edge of the binning is lost.
    #[default]
    Lose,
    /// The part kept inside the binning is scaled up to the full charge.
    Renormalize,
}

/// Lazily sampled patch.
#[derive(Clone, Debug, PartialEq)]
pub enum PatchState {
    Pending,
    /// `patch[[ip, it]]` holds the charge at absolute impact `poffset + ip`
    /// and tick `toffset + it`.
    Sampled {
        patch: Array2<f64>,
        poffset: i32,
        toffset: i32,
    },
    /// The envelope misses the binning in at least one dimension.
    Empty,
}

#[derive(Clone, Debug)]
pub struct GaussianDiffusion {
    depo: DepoRef,
    time: GausDesc,
    pitch: GausDesc,
    state: PatchState,
}

impl GaussianDiffusion {
    pub fn new(depo: DepoRef, time: GausDesc, pitch: GausDesc) -> Self {
        Self {
            depo,
            time,
            pitch,
            state: PatchState::Pending,
        }
    }

    pub fn into_shared(self) -> DiffusionRef {
        Rc::new(RefCell::new(self))
    }

    pub fn depo(&self) -> &DepoRef {
        &self.depo
    }

    pub fn time_desc(&self) -> GausDesc {
        self.time
    }

    pub fn pitch_desc(&self) -> GausDesc {
        self.pitch
    }

    /// Time and pitch centers.
    pub fn center(&self) -> (f64, f64) {
        (self.time.center, self.pitch.center)
    }

    pub fn state(&self) -> &PatchState {
        &self.state
    }

    pub fn is_sampled(&self) -> bool {
        !matches!(self.state, PatchState::Pending)
    }

    pub fn patch(&self) -> Option<&Array2<f64>> {
        match &self.state {
            PatchState::Sampled { patch, .. } => Some(patch),
            _ => None,
        }
    }

    /// Number of impact rows in the sampled patch.
    pub fn npitches(&self) -> usize {
        self.patch().map_or(0, |p| p.nrows())
    }

    /// Number of tick columns in the sampled patch.
    pub fn ntimes(&self) -> usize {
        self.patch().map_or(0, |p| p.ncols())
    }

    /// Pitch of the first and last rows of the sampled patch.
    pub fn minmax_pitch(&self, pbins: &LinearSampling) -> Option<(f64, f64)> {
        match &self.state {
            PatchState::Sampled { patch, poffset, .. } => Some((
                pbins.position(*poffset),
                pbins.position(*poffset + patch.nrows() as i32 - 1),
            )),
            _ => None,
        }
    }

    /// Time of the first and last columns of the sampled patch.
    pub fn minmax_time(&self, tbins: &LinearSampling) -> Option<(f64, f64)> {
        match &self.state {
            PatchState::Sampled { patch, toffset, .. } => Some((
                tbins.position(*toffset),
                tbins.position(*toffset + patch.ncols() as i32 - 1),
            )),
            _ => None,
        }
    }

    /// Sample the patch without fluctuation. No-op once sampled.
    pub fn set_sampling(
        &mut self,
        tbins: &LinearSampling,
        pbins: &LinearSampling,
        nsigma: f64,
        clip: ClipPolicy,
    ) {
        self.sample_with::<StdRandom>(tbins, pbins, nsigma, clip, None);
    }

    /// Sample the patch and apply charge-preserving Poisson fluctuations.
    /// No-op once sampled.
    pub fn set_sampling_fluctuated<R: Random + ?Sized>(
        &mut self,
        tbins: &LinearSampling,
        pbins: &LinearSampling,
        nsigma: f64,
        clip: ClipPolicy,
        rng: &mut R,
    ) {
        self.sample_with(tbins, pbins, nsigma, clip, Some(rng));
    }

    fn sample_with<R: Random + ?Sized>(
        &mut self,
        tbins: &LinearSampling,
        pbins: &LinearSampling,
        nsigma: f64,
        clip: ClipPolicy,
        rng: Option<&mut R>,
    ) {
        if self.is_sampled() {
            return;
        }

        let pw = self.pitch.binint(pbins, nsigma);
        let tw = self.time.binint(tbins, nsigma);
        let full = pw.total * tw.total;

        if pw.is_empty() || tw.is_empty() {
            self.state = PatchState::Empty;
            return;
        }

        let mut patch = Array2::from_shape_fn((pw.weights.len(), tw.weights.len()), |(ip, it)| {
            pw.weights[ip] * tw.weights[it]
        });

        let norm = match clip {
            ClipPolicy::Lose => full,
            ClipPolicy::Renormalize => patch.sum(),
        };
        if !(norm > 0.0) {
            self.state = PatchState::Empty;
            return;
        }
        patch *= self.depo.charge() / norm;

        if let Some(rng) = rng {
            fluctuate(&mut patch, rng);
        }

        self.state = PatchState::Sampled {
            patch,
            poffset: pw.offset,
            toffset: tw.offset,
        };
    }
}

/// Replace each cell by a Poisson draw of its carrier count, then rescale
/// so the total is unchanged. The sign of the charge is kept.
fn fluctuate<R: Random + ?Sized>(patch: &mut Array2<f64>, rng: &mut R) {
    let target = patch.sum();
    let mean = patch.clone();

    patch.mapv_inplace(|q| q.signum() * rng.poisson(q.abs()));

    let fluctuated = patch.sum();
    if fluctuated == 0.0 {
        // too little charge to survive rounding to whole carriers
        *patch = mean;
        return;
    }
    *patch *= target / fluctuated;
}
