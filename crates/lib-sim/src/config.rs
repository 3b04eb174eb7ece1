//! Simulation configuration loading and validation.
//!
//! Values are expressed in the system of [`units`], so a TOML file gives
//! lengths in mm and times in ns. Times and lengths are held as
//! [`Time`] and [`Length`]. Every section is optional and falls back to
//! liquid-argon defaults.

use crate::diffusion::ClipPolicy;
use crate::zipper::ResponseMode;
use lib_types::units::{self, Length, Time};
use lib_types::{LinearSampling, Point, Ray};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config as TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{0}")]
    Invalid(String),
}

/// Top-level simulation configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub drift: DriftConfig,

    #[serde(default)]
    pub diffusion: DiffusionConfig,

    #[serde(default)]
    pub random: RandomConfig,

    #[serde(default)]
    pub readout: ReadoutConfig,

    #[serde(default)]
    pub zipper: ZipperConfig,

    #[serde(default)]
    pub blips: BlipConfig,
}

/// Transport of depositions to the response plane.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriftConfig {
    /// Drift coordinate (x) of the plane depositions are drifted to.
    #[serde(default)]
    pub location: Length,

    /// Electron drift speed.
    #[serde(default = "default_drift_speed")]
    pub speed: f64,

    /// Longitudinal diffusion coefficient.
    #[serde(default = "default_diffusion_long")]
    pub diffusion_long: f64,

    /// Transverse diffusion coefficient.
    #[serde(default = "default_diffusion_tran")]
    pub diffusion_tran: f64,

    /// Electron lifetime against attachment.
    #[serde(default = "default_lifetime")]
    pub lifetime: Time,

    /// Draw absorption losses from a binomial instead of the mean.
    #[serde(default = "default_true")]
    pub fluctuate: bool,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            location: Length::ZERO,
            speed: default_drift_speed(),
            diffusion_long: default_diffusion_long(),
            diffusion_tran: default_diffusion_tran(),
            lifetime: default_lifetime(),
            fluctuate: true,
        }
    }
}

/// Binning of diffused charge onto impact positions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiffusionConfig {
    /// Half-width of the sampled Gaussian envelope, in sigmas.
    #[serde(default = "default_nsigma")]
    pub nsigma: f64,

    /// Apply Poisson fluctuations to each patch.
    #[serde(default = "default_true")]
    pub fluctuate: bool,

    /// What happens to charge falling off the sampled domain.
    #[serde(default)]
    pub clip: ClipPolicy,
}

impl Default for DiffusionConfig {
    fn default() -> Self {
        Self {
            nsigma: default_nsigma(),
            fluctuate: true,
            clip: ClipPolicy::default(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RandomConfig {
    #[serde(default)]
    pub seed: u64,
}

/// Readout time window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReadoutConfig {
    #[serde(default)]
    pub start_time: Time,

    #[serde(default = "default_readout_time")]
    pub readout_time: Time,

    #[serde(default = "default_tick")]
    pub tick: Time,
}

impl Default for ReadoutConfig {
    fn default() -> Self {
        Self {
            start_time: Time::ZERO,
            readout_time: default_readout_time(),
            tick: default_tick(),
        }
    }
}

impl ReadoutConfig {
    /// Number of ticks in the readout window.
    pub fn nticks(&self) -> usize {
        (self.readout_time / self.tick).round() as usize
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tick.0 > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "tick must be positive, got {}",
                self.tick.0
            )));
        }
        if self.nticks() < 2 {
            return Err(ConfigError::Invalid(format!(
                "readout of {} spans fewer than 2 ticks of {}",
                self.readout_time.0, self.tick.0
            )));
        }
        Ok(())
    }

    /// Time samples of the readout, one per tick starting at `start_time`.
    ///
    /// # Panics
    ///
    /// Panics on a window shorter than two ticks; [`SimConfig::validate`]
    /// rejects those.
    pub fn time_sampling(&self) -> LinearSampling {
        let n = self.nticks();
        let end = self.start_time + self.tick * n.saturating_sub(1) as f64;
        LinearSampling::new(n, self.start_time.0, end.0)
    }
}

/// Convolution of binned charge with the plane response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZipperConfig {
    #[serde(default)]
    pub mode: ResponseMode,

    /// Drop impact data below each wire's window once it is convolved.
    #[serde(default = "default_true")]
    pub evict: bool,
}

impl Default for ZipperConfig {
    fn default() -> Self {
        Self {
            mode: ResponseMode::default(),
            evict: true,
        }
    }
}

/// Radioactive decays scattered uniformly through a box.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlipConfig {
    /// Charge of every blip.
    #[serde(default = "default_blip_charge")]
    pub charge: f64,

    /// Time before the first blip.
    #[serde(default)]
    pub start_time: Time,

    /// Mean number of blips per unit time.
    #[serde(default = "default_activity")]
    pub activity: f64,

    /// Opposite corners of the box.
    #[serde(default = "default_blip_extent")]
    pub extent: Ray,
}

impl Default for BlipConfig {
    fn default() -> Self {
        Self {
            charge: default_blip_charge(),
            start_time: Time::ZERO,
            activity: default_activity(),
            extent: default_blip_extent(),
        }
    }
}

impl BlipConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.activity > 0.0 && self.activity.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "blip activity must be positive, got {}",
                self.activity
            )));
        }
        Ok(())
    }
}

fn default_drift_speed() -> f64 { 1.6 * units::MM / units::US }
fn default_diffusion_long() -> f64 { 7.2 * units::CM2 / units::S }
fn default_diffusion_tran() -> f64 { 12.0 * units::CM2 / units::S }
fn default_lifetime() -> Time { Time::from_ms(8.0) }
fn default_nsigma() -> f64 { 3.0 }
fn default_readout_time() -> Time { Time::from_ms(5.0) }
fn default_tick() -> Time { Time::from_us(0.5) }
fn default_blip_charge() -> f64 { 20000.0 }
// about the 39Ar rate of two large drift volumes
fn default_activity() -> f64 { 1.0e5 * units::HZ }
fn default_blip_extent() -> Ray {
    let m = units::M;
    Ray::new(Point::new(-m, -m, -m), Point::new(m, m, m))
}
fn default_true() -> bool { true }

impl SimConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every parameter is physically usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.drift.validate()?;
        self.diffusion.validate()?;
        self.readout.validate()?;
        self.blips.validate()
    }
}

impl DriftConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.speed > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "drift speed must be positive, got {}",
                self.speed
            )));
        }
        if !(self.lifetime.0 > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "electron lifetime must be positive, got {}",
                self.lifetime.0
            )));
        }
        if self.diffusion_long < 0.0 || self.diffusion_tran < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "diffusion coefficients must be >= 0, got DL={} DT={}",
                self.diffusion_long, self.diffusion_tran
            )));
        }
        Ok(())
    }
}

impl DiffusionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.nsigma > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "nsigma must be positive, got {}",
                self.nsigma
            )));
        }
        Ok(())
    }
}

/// Load configuration from a file.
pub fn load_config(path: &Path) -> Result<SimConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = SimConfig::from_toml_str(&content)?;
    tracing::debug!(?path, "loaded simulation configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert_relative_eq!(config.drift.speed, 1.6e-3);
        assert_relative_eq!(config.drift.diffusion_long, 7.2e-7, epsilon = 1e-18);
        assert_eq!(config.drift.lifetime.0, 8.0e6);
        assert_eq!(config.blips.activity, 1.0e5 * units::HZ);
        assert_eq!(config.diffusion.clip, ClipPolicy::Lose);
        assert_eq!(config.zipper.mode, ResponseMode::Bounded);
        assert_eq!(config.readout.nticks(), 10000);
    }

    #[test]
    fn test_partial_toml() {
        let config = SimConfig::from_toml_str(
            r#"
            [drift]
            location = 100.0
            fluctuate = false

            [diffusion]
            clip = "renormalize"

            [zipper]
            mode = "closest"
            evict = false

            [readout]
            readout_time = 1000.0
            tick = 100.0
            "#,
        )
        .unwrap();

        assert_eq!(config.drift.location, Length::from_mm(100.0));
        assert!(!config.drift.fluctuate);
        assert_relative_eq!(config.drift.speed, 1.6e-3);
        assert_eq!(config.diffusion.clip, ClipPolicy::Renormalize);
        assert_eq!(config.zipper.mode, ResponseMode::Closest);
        assert!(!config.zipper.evict);

        let ts = config.readout.time_sampling();
        assert_eq!(ts.n, 10);
        assert_relative_eq!(ts.step(), 100.0);
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = SimConfig::from_toml_str("[drift]\nspeed = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = SimConfig::from_toml_str("[drift]\nlifetime = -1.0\n").unwrap_err();
        assert!(err.to_string().contains("lifetime"));

        let err = SimConfig::from_toml_str("[readout]\ntick = 10.0\nreadout_time = 10.0\n");
        assert!(err.is_err());

        let err = SimConfig::from_toml_str("[drift]\nspeed = \"fast\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = SimConfig::from_toml_str("[blips]\nactivity = 0.0\n").unwrap_err();
        assert!(err.to_string().contains("activity"));
    }

    #[test]
    fn test_blip_box() {
        let config = SimConfig::from_toml_str(
            r#"
            [blips]
            charge = 5000.0
            start_time = 1000.0

            [blips.extent.tail]
            x = 0.0
            y = -10.0
            z = -10.0

            [blips.extent.head]
            x = 100.0
            y = 10.0
            z = 10.0
            "#,
        )
        .unwrap();
        assert_eq!(config.blips.charge, 5000.0);
        assert_eq!(config.blips.start_time, Time::from_us(1.0));
        assert_eq!(config.blips.extent.head, Point::new(100.0, 10.0, 10.0));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("/nonexistent/sim.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
