//! Binning and convolution performance benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lib_dsp::FftEngine;
use lib_sim::{
    BinnedDiffusion, ClipPolicy, FieldResponse, ImpactZipper, PlaneImpactResponse, ResponseMode,
    ResponsePath,
};
use lib_types::{units, Depo, DepoRef, LinearSampling, Pimpos, Point, Vector};

const TICK: f64 = 0.5 * units::US;
const NWIRES: usize = 21;

fn plane() -> Pimpos {
    Pimpos::new(
        NWIRES,
        -50.0,
        50.0,
        Vector::new(0.0, 1.0, 0.0),
        Vector::new(0.0, 0.0, 1.0),
        Point::ORIGIN,
        10,
    )
}

fn field_response() -> FieldResponse {
    FieldResponse {
        paths: (0..=50)
            .map(|j| ResponsePath {
                pitch: j as f64 * 0.5,
                current: (0..100).map(|i| (-(i as f64) / (10.0 + j as f64)).exp()).collect(),
            })
            .collect(),
        pitch: 5.0,
        impact: 0.5,
        period: TICK,
    }
}

/// A diagonal line of depositions across the plane.
fn depos(n: usize) -> Vec<DepoRef> {
    (0..n)
        .map(|i| {
            let f = i as f64 / n as f64;
            Depo::new(100.0 * units::US + f * 500.0 * units::US, Point::new(0.0, 0.0, -40.0 + 80.0 * f), -1000.0)
                .into_ref()
        })
        .collect()
}

fn bench_response(c: &mut Criterion) {
    let mut group = c.benchmark_group("response");
    let fr = field_response();

    for nticks in [1000usize, 4000, 10000].iter() {
        group.bench_with_input(BenchmarkId::new("build", nticks), nticks, |b, &n| {
            let mut fft = FftEngine::new();
            b.iter(|| PlaneImpactResponse::new(black_box(&fr), None, TICK, n, &mut fft));
        });
    }

    group.finish();
}

fn bench_zipper(c: &mut Criterion) {
    let mut group = c.benchmark_group("zipper");
    let nticks = 2000;
    let mut fft = FftEngine::new();
    let pir = PlaneImpactResponse::new(&field_response(), None, TICK, nticks, &mut fft).unwrap();
    let tbins = LinearSampling::new(nticks, 0.0, (nticks - 1) as f64 * TICK);

    for ndepos in [10usize, 100, 1000].iter() {
        let line = depos(*ndepos);
        for mode in [ResponseMode::Closest, ResponseMode::Bounded] {
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", mode).to_lowercase(), ndepos),
                &line,
                |b, line| {
                    b.iter(|| {
                        let mut bd =
                            BinnedDiffusion::new(plane(), tbins, 3.0, ClipPolicy::Lose, None, &mut fft)
                                .unwrap();
                        for depo in line {
                            bd.add(depo.clone(), 1.0 * units::US, 1.0 * units::MM);
                        }
                        let mut zipper = ImpactZipper::new(&pir, &mut bd, mode, true).unwrap();
                        for iwire in 0..NWIRES {
                            black_box(zipper.waveform(iwire).unwrap());
                        }
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_response, bench_zipper);
criterion_main!(benches);
