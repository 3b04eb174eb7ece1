//! Point depositions from radioactive decays.

use crate::config::BlipConfig;
use crate::error::{SimError, SimResult};
use crate::random::Random;
use lib_types::{units, Depo, DepoRef, Point, Ray};

/// Endless source of fixed-charge blips scattered uniformly through a box.
///
/// Waiting times between blips are exponential at the configured
/// activity, so the stream is in ascending time order. Bound it with
/// [`Iterator::take`] or [`Iterator::take_while`].
pub struct BlipSource {
    charge: f64,
    activity: f64,
    extent: Ray,
    time: f64,
    rng: Box<dyn Random>,
}

impl BlipSource {
    pub fn new(
        charge: f64,
        start_time: f64,
        activity: f64,
        extent: Ray,
        rng: Box<dyn Random>,
    ) -> SimResult<Self> {
        if !(activity > 0.0 && activity.is_finite()) {
            return Err(SimError::InvalidConfig(format!(
                "blip activity must be positive, got {}",
                activity
            )));
        }
        tracing::debug!(
            charge,
            activity_hz = activity / units::HZ,
            ?extent,
            "blip source"
        );
        Ok(Self {
            charge,
            activity,
            extent,
            time: start_time,
            rng,
        })
    }

    pub fn from_config(config: &BlipConfig, rng: Box<dyn Random>) -> SimResult<Self> {
        config.validate()?;
        Self::new(
            config.charge,
            config.start_time.0,
            config.activity,
            config.extent,
            rng,
        )
    }

    /// Time of the last blip, or the start time before the first.
    pub fn time(&self) -> f64 {
        self.time
    }

    fn position(&mut self) -> Point {
        let (t, h) = (self.extent.tail, self.extent.head);
        Point::new(
            self.rng.uniform(t.x.min(h.x), t.x.max(h.x)),
            self.rng.uniform(t.y.min(h.y), t.y.max(h.y)),
            self.rng.uniform(t.z.min(h.z), t.z.max(h.z)),
        )
    }
}

impl Iterator for BlipSource {
    type Item = DepoRef;

    fn next(&mut self) -> Option<DepoRef> {
        self.time += self.rng.exponential(self.activity);
        let pos = self.position();
        Some(Depo::new(self.time, pos, self.charge).into_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::StdRandom;
    use lib_types::units::Time;

    fn source(seed: u64) -> BlipSource {
        let extent = Ray::new(Point::new(10.0, 5.0, -5.0), Point::new(0.0, -5.0, 5.0));
        BlipSource::new(
            20000.0,
            1.0 * units::MS,
            1.0 * units::MHZ,
            extent,
            Box::new(StdRandom::seeded(seed)),
        )
        .unwrap()
    }

    #[test]
    fn test_blips_ascend_in_time() {
        let blips: Vec<DepoRef> = source(1).take(1000).collect();
        assert!(blips[0].time() > 1.0 * units::MS);
        assert!(blips.windows(2).all(|w| w[0].time() <= w[1].time()));

        // mean spacing is one over the activity
        let span = blips[999].time() - 1.0 * units::MS;
        let mean = span / 1000.0;
        assert!((mean - 1.0 * units::US).abs() < 0.2 * units::US, "mean spacing {}", mean);
    }

    #[test]
    fn test_blips_fill_the_box() {
        for blip in source(2).take(500) {
            let p = blip.pos();
            assert!((0.0..10.0).contains(&p.x));
            assert!((-5.0..5.0).contains(&p.y));
            assert!((-5.0..5.0).contains(&p.z));
            assert_eq!(blip.charge(), 20000.0);
            assert_eq!(blip.extent_long(), 0.0);
        }
    }

    #[test]
    fn test_seeded_source_repeats() {
        let a: Vec<(f64, Point)> = source(9).take(20).map(|d| (d.time(), d.pos())).collect();
        let b: Vec<(f64, Point)> = source(9).take(20).map(|d| (d.time(), d.pos())).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_bounded_by_time() {
        let mut src = source(4);
        let early = src.by_ref().take_while(|d| d.time() < 1.1 * units::MS).count();
        assert!(early > 50 && early < 150);
        assert!(src.time() >= 1.1 * units::MS);
    }

    #[test]
    fn test_invalid_activity() {
        let extent = Ray::new(Point::ORIGIN, Point::new(1.0, 1.0, 1.0));
        for activity in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let src = BlipSource::new(1.0, 0.0, activity, extent, Box::new(StdRandom::seeded(1)));
            assert!(matches!(src, Err(SimError::InvalidConfig(_))));
        }

        let config = BlipConfig {
            activity: 0.0,
            ..BlipConfig::default()
        };
        let src = BlipSource::from_config(&config, Box::new(StdRandom::seeded(1)));
        assert!(matches!(src, Err(SimError::Config(_))));

        let config = BlipConfig {
            start_time: Time::from_ms(2.0),
            ..BlipConfig::default()
        };
        let src = BlipSource::from_config(&config, Box::new(StdRandom::seeded(1))).unwrap();
        assert_eq!(src.time(), 2.0e6);
    }
}
