//! Point-like ionization charge depositions.

use crate::point::Point;
use std::sync::Arc;

/// Shared handle to an immutable deposition.
pub type DepoRef = Arc<Depo>;

/// A point-like quantity of charge at a position and time.
///
/// Depositions are never modified. Processing stages derive a new `Depo`
/// and link the input as its [`prior`](Depo::prior), forming a provenance
/// chain back to the original ionization.
#[derive(Clone, Debug, PartialEq)]
pub struct Depo {
    pos: Point,
    time: f64,
    charge: f64,
    extent_long: f64,
    extent_tran: f64,
    prior: Option<DepoRef>,
}

impl Depo {
    /// A fresh deposition with no extent and no history.
    pub fn new(time: f64, pos: Point, charge: f64) -> Self {
        Self {
            pos,
            time,
            charge,
            extent_long: 0.0,
            extent_tran: 0.0,
            prior: None,
        }
    }

    /// A deposition derived from `prior`.
    pub fn derived(
        prior: DepoRef,
        time: f64,
        pos: Point,
        charge: f64,
        extent_long: f64,
        extent_tran: f64,
    ) -> Self {
        Self {
            pos,
            time,
            charge,
            extent_long,
            extent_tran,
            prior: Some(prior),
        }
    }

    pub fn into_ref(self) -> DepoRef {
        Arc::new(self)
    }

    #[inline]
    pub fn pos(&self) -> Point {
        self.pos
    }

    #[inline]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Signed charge, in number of electrons (negative for electrons).
    #[inline]
    pub fn charge(&self) -> f64 {
        self.charge
    }

    /// Gaussian sigma along the drift direction, as a length.
    #[inline]
    pub fn extent_long(&self) -> f64 {
        self.extent_long
    }

    /// Gaussian sigma perpendicular to the drift direction.
    #[inline]
    pub fn extent_tran(&self) -> f64 {
        self.extent_tran
    }

    pub fn prior(&self) -> Option<&DepoRef> {
        self.prior.as_ref()
    }

    /// The first deposition of the provenance chain.
    pub fn origin(&self) -> &Depo {
        let mut depo = self;
        while let Some(prior) = depo.prior.as_deref() {
            depo = prior;
        }
        depo
    }

    /// Number of derivation steps back to the original deposition.
    pub fn generation(&self) -> usize {
        std::iter::successors(self.prior(), |d| d.prior()).count()
    }
}

/// Order depositions by time.
pub fn ascending_time(a: &DepoRef, b: &DepoRef) -> std::cmp::Ordering {
    a.time().total_cmp(&b.time())
}
