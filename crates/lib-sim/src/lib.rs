//! # lib-sim
//!
//! Signal simulation for a liquid-argon TPC wire plane.
//!
//! Ionization charge flows through these stages:
//!
//! 1. [`TrackDepos`] lays depositions along straight tracks and
//!    [`BlipSource`] scatters decay blips through a box; [`DepoMerger`]
//!    interleaves two such streams in time
//! 2. [`Drifter`] carries them to the response plane, absorbing and
//!    diffusing the charge on the way
//! 3. [`BinnedDiffusion`] samples each diffused deposition onto the impact
//!    positions of a plane and the readout ticks
//! 4. [`ImpactZipper`] convolves the binned charge with a
//!    [`PlaneImpactResponse`] to produce per-wire waveforms
//!
//! Configuration is loaded from TOML into [`SimConfig`].

pub mod binned;
pub mod blips;
pub mod config;
pub mod diffusion;
pub mod drifter;
pub mod error;
pub mod impact;
pub mod merger;
pub mod random;
pub mod response;
pub mod tracks;
pub mod zipper;

pub use binned::BinnedDiffusion;
pub use blips::BlipSource;
pub use config::{load_config, BlipConfig, ConfigError, SimConfig};
pub use diffusion::{ClipPolicy, GaussianDiffusion, PatchState};
pub use drifter::{DriftStats, Drifter};
pub use error::{SimError, SimResult};
pub use impact::{ImpactData, ImpactState};
pub use merger::{DepoMerger, MergeStats};
pub use random::{Random, StdRandom};
pub use response::{coldelec, ColdElec, FieldResponse, ImpactResponse, PlaneImpactResponse, ResponsePath};
pub use tracks::{Track, TrackDepos};
pub use zipper::{ImpactZipper, ResponseMode};
