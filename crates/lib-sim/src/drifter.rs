//! Drift of depositions to the response plane.
//!
//! Depositions are transported along x to `location`. A deposition far
//! from the plane arrives later than one close to it, so input in origin
//! time order is reordered to arrival (proper) time order. A deposition is
//! held until no later input can arrive before it: inputs come in
//! non-decreasing origin time and drift only adds time, so once the
//! newest input's time reaches a pending proper time that deposition is
//! final.

use crate::config::DriftConfig;
use crate::error::{SimError, SimResult};
use crate::random::Random;
use lib_types::{Depo, DepoRef};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

/// Counters over the life of a [`Drifter`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DriftStats {
    pub accepted: u64,
    /// Behind the plane, not drifted.
    pub dropped: u64,
    pub emitted: u64,
}

struct Pending {
    proper_time: f64,
    seq: u64,
    depo: DepoRef,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    // reversed, the heap pops the earliest arrival; ties in input order
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .proper_time
            .total_cmp(&self.proper_time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

pub struct Drifter {
    location: f64,
    speed: f64,
    diffusion_long: f64,
    diffusion_tran: f64,
    lifetime: f64,
    rng: Option<Box<dyn Random>>,
    pending: BinaryHeap<Pending>,
    last_time: Option<f64>,
    seq: u64,
    stats: DriftStats,
}

impl Drifter {
    /// Absorption losses are fluctuated if and only if `rng` is given.
    pub fn new(
        location: f64,
        speed: f64,
        diffusion_long: f64,
        diffusion_tran: f64,
        lifetime: f64,
        rng: Option<Box<dyn Random>>,
    ) -> SimResult<Self> {
        if !(speed > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "drift speed must be positive, got {}",
                speed
            )));
        }
        if !(lifetime > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "electron lifetime must be positive, got {}",
                lifetime
            )));
        }
        if diffusion_long < 0.0 || diffusion_tran < 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "diffusion coefficients must be >= 0, got DL={} DT={}",
                diffusion_long, diffusion_tran
            )));
        }
        tracing::debug!(
            location,
            speed,
            diffusion_long,
            diffusion_tran,
            lifetime,
            fluctuate = rng.is_some(),
            "drifter"
        );
        Ok(Self {
            location,
            speed,
            diffusion_long,
            diffusion_tran,
            lifetime,
            rng,
            pending: BinaryHeap::new(),
            last_time: None,
            seq: 0,
            stats: DriftStats::default(),
        })
    }

    /// Build from configuration. A fluctuating configuration needs `rng`;
    /// a non-fluctuating one ignores it.
    pub fn from_config(config: &DriftConfig, rng: Option<Box<dyn Random>>) -> SimResult<Self> {
        config.validate()?;
        let rng = match (config.fluctuate, rng) {
            (true, None) => {
                return Err(SimError::InvalidConfig(
                    "fluctuated drift requires a random source".into(),
                ))
            }
            (true, rng) => rng,
            (false, _) => None,
        };
        Self::new(
            config.location.0,
            config.speed,
            config.diffusion_long,
            config.diffusion_tran,
            config.lifetime.0,
            rng,
        )
    }

    pub fn location(&self) -> f64 {
        self.location
    }

    pub fn stats(&self) -> DriftStats {
        self.stats
    }

    /// Number of depositions waiting to be committed.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Time at which a deposition reaches the plane.
    pub fn proper_time(&self, depo: &Depo) -> f64 {
        depo.time() + (depo.pos().x - self.location) / self.speed
    }

    /// Feed one deposition, or `None` to end the stream.
    ///
    /// Drifted depositions whose arrival is final are appended to `out` in
    /// arrival order. At end of stream everything pending is flushed,
    /// followed by a `None`, and the drifter is ready for a new stream.
    ///
    /// An input earlier than the previous one is rejected with
    /// [`SimError::OutOfOrder`] and leaves the drifter unchanged.
    pub fn push(
        &mut self,
        depo: Option<DepoRef>,
        out: &mut VecDeque<Option<DepoRef>>,
    ) -> SimResult<()> {
        let Some(depo) = depo else {
            while let Some(p) = self.pending.pop() {
                out.push_back(Some(self.transport(&p.depo)));
            }
            out.push_back(None);
            self.last_time = None;
            tracing::debug!(stats = ?self.stats, "drift stream ended");
            return Ok(());
        };

        let now = depo.time();
        if let Some(previous) = self.last_time {
            if now < previous {
                return Err(SimError::OutOfOrder { previous, got: now });
            }
        }
        self.last_time = Some(now);

        if depo.pos().x < self.location {
            self.stats.dropped += 1;
            tracing::trace!(x = depo.pos().x, location = self.location, "depo behind plane");
        } else {
            self.stats.accepted += 1;
            self.pending.push(Pending {
                proper_time: self.proper_time(&depo),
                seq: self.seq,
                depo,
            });
            self.seq += 1;
        }

        while self.pending.peek().map_or(false, |p| p.proper_time <= now) {
            if let Some(p) = self.pending.pop() {
                out.push_back(Some(self.transport(&p.depo)));
            }
        }
        Ok(())
    }

    /// Drift every deposition of `depos`, which must be in time order, and
    /// end the stream. The trailing `None` is not included.
    pub fn drift_all<I>(&mut self, depos: I) -> SimResult<Vec<DepoRef>>
    where
        I: IntoIterator<Item = DepoRef>,
    {
        let mut out = VecDeque::new();
        for depo in depos {
            self.push(Some(depo), &mut out)?;
        }
        self.push(None, &mut out)?;
        Ok(out.into_iter().flatten().collect())
    }

    fn transport(&mut self, depo: &DepoRef) -> DepoRef {
        let dt = (depo.pos().x - self.location) / self.speed;
        let absorb = 1.0 - (-dt / self.lifetime).exp();

        let q = depo.charge();
        let charge = match self.rng.as_mut() {
            Some(rng) => {
                let lost = rng.binomial(q.abs().round() as u64, absorb) as f64;
                q.signum() * (q.abs() - lost).max(0.0)
            }
            None => q * (1.0 - absorb),
        };

        self.stats.emitted += 1;
        Depo::derived(
            depo.clone(),
            depo.time() + dt,
            depo.pos().with_x(self.location),
            charge,
            (2.0 * self.diffusion_long * dt).sqrt(),
            (2.0 * self.diffusion_tran * dt).sqrt(),
        )
        .into_ref()
    }
}
