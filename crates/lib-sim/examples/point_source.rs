//! Simulate a short track drifting onto a wire plane and print what each
//! wire sees.
//!
//! ```text
//! cargo run -p lib-sim --example point_source -- -v --seed 7
//! ```

use anyhow::Result;
use clap::Parser;
use lib_dsp::FftEngine;
use lib_sim::{
    load_config, BinnedDiffusion, BlipSource, ColdElec, DepoMerger, Drifter, FieldResponse,
    ImpactZipper, PlaneImpactResponse, Random, ResponsePath, SimConfig, StdRandom, TrackDepos,
};
use lib_types::{units, Pimpos, Point, Ray, Vector, Waveform};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "point-source")]
#[command(about = "Drift a track onto a wire plane and print the wire signals")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Simulation configuration (TOML); built-in defaults otherwise
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the random seed of the configuration
    #[arg(short, long)]
    seed: Option<u64>,

    /// Distance of the track from the response plane (mm)
    #[arg(long, default_value = "100")]
    distance_mm: f64,

    /// Number of wires in the plane
    #[arg(long, default_value = "21")]
    nwires: usize,

    /// Mix in radioactive decay blips from the configured box
    #[arg(long)]
    blips: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => SimConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.random.seed = seed;
    }
    config.validate()?;
    tracing::info!(
        seed = config.random.seed,
        location_mm = config.drift.location.as_mm(),
        tick_us = config.readout.tick.as_us(),
        readout_ms = config.readout.readout_time.as_ms(),
        "configuration ready"
    );

    let pitch = 5.0 * units::MM;
    let half = (cli.nwires as f64 - 1.0) / 2.0 * pitch;
    let pimpos = Pimpos::new(
        cli.nwires,
        -half,
        half,
        Vector::new(0.0, 1.0, 0.0),
        Vector::new(0.0, 0.0, 1.0),
        Point::ORIGIN,
        10,
    );

    let readout = &config.readout;
    let tick = readout.tick.0;
    let start_time = readout.start_time.0;
    let mut fft = FftEngine::new();
    let pir = PlaneImpactResponse::new(
        &toy_field_response(pitch, tick),
        Some(ColdElec::default()),
        tick,
        readout.nticks(),
        &mut fft,
    )?;

    let mut tracks = TrackDepos::default();
    let x = config.drift.location.0 + cli.distance_mm * units::MM;
    tracks.add_track(
        start_time + 10.0 * units::US,
        Ray::new(
            Point::new(x, 0.0, -2.0 * pitch),
            Point::new(x + 10.0 * units::MM, 0.0, 2.0 * pitch),
        ),
        -50_000.0,
    );

    let seed = config.random.seed;
    let mut drifter = Drifter::from_config(&config.drift, Some(rng(seed)))?;
    let drifted = if cli.blips {
        let end = (readout.start_time + readout.readout_time).0;
        let blips = BlipSource::from_config(&config.blips, rng(seed.wrapping_add(2)))?
            .take_while(move |depo| depo.time() < end);
        let mut merger = DepoMerger::new(tracks, blips);
        let drifted = drifter.drift_all(merger.by_ref())?;
        tracing::info!(stats = ?merger.stats(), "merged blips");
        drifted
    } else {
        drifter.drift_all(tracks)?
    };
    tracing::info!(stats = ?drifter.stats(), "drifted");

    let mut bd = BinnedDiffusion::from_config(
        pimpos,
        readout.time_sampling(),
        &config.diffusion,
        Some(rng(seed.wrapping_add(1))),
        &mut fft,
    )?;
    let speed = config.drift.speed;
    let accepted = drifted
        .into_iter()
        .filter(|depo| {
            let sigma_time = depo.extent_long() / speed;
            let sigma_pitch = depo.extent_tran();
            bd.add(depo.clone(), sigma_time, sigma_pitch)
        })
        .count();
    tracing::info!(accepted, impacts = bd.len(), "binned");

    let mut zipper = ImpactZipper::from_config(&pir, &mut bd, &config.zipper)?;
    println!("{:>5} {:>14} {:>10} {:>10}", "wire", "sum", "first_us", "last_us");
    for iwire in 0..cli.nwires {
        let mut wave = Waveform::new(zipper.waveform(iwire)?, tick, start_time);
        // transform round-off
        let floor = 1e-6 * wave.max_abs();
        wave.samples.iter_mut().filter(|v| v.abs() < floor).for_each(|v| *v = 0.0);
        let (first, last) = wave.edge();
        if first == last {
            continue;
        }
        println!(
            "{:>5} {:>14.4e} {:>10.2} {:>10.2}",
            iwire,
            wave.sum(),
            wave.time_at(first) / units::US,
            wave.time_at(last - 1) / units::US
        );
    }

    Ok(())
}

fn rng(seed: u64) -> Box<dyn Random> {
    Box::new(StdRandom::seeded(seed))
}

/// Bipolar induction currents falling off with distance from the wire.
fn toy_field_response(pitch: f64, period: f64) -> FieldResponse {
    let impact = pitch / 10.0;
    let paths = (0..=15)
        .map(|j| {
            let falloff = 1.0 / (1.0 + j as f64);
            let current = (0..40)
                .map(|i| {
                    let phase = i as f64 / 40.0 * std::f64::consts::TAU;
                    falloff * phase.sin() * units::FC / period
                })
                .collect();
            ResponsePath {
                pitch: j as f64 * impact,
                current,
            }
        })
        .collect();
    FieldResponse {
        paths,
        pitch,
        impact,
        period,
    }
}
