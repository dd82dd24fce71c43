use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gnssr::config::Config;
use gnssr::retrieval::gnssir::{ofac_hifac, par_retrieve_heights, retrieve_heights};
use gnssr::retrieval::lombscargle::periodogram;
use gnssr::track::{Fix, TrackSet};
use gnssr::utils::constants::GPS_L1_WAVELENGTH;
use std::f64::consts::PI;

const EPOCHS: usize = 1500;

/// Rising passes for a handful of satellites with reflectors between 1.5 and 5 m.
fn synthetic_tracks() -> TrackSet {
    let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 9);
    let mut tracks = TrackSet::new();
    for prn in 1..=8u8 {
        let height = 1.5 + 0.5 * prn as f64;
        for i in 0..EPOCHS {
            let elevation = 4.0 + 28.0 * i as f64 / EPOCHS as f64;
            let phase = 4.0 * PI * height * elevation.to_radians().sin() / GPS_L1_WAVELENGTH;
            let amplitude = 200.0 + 15.0 * elevation + 60.0 * phase.cos();
            tracks.push(Fix {
                block: i,
                prn,
                utc_seconds: i as f64,
                date,
                elevation: Some(elevation),
                azimuth: Some(40.0 * prn as f64),
                snr: Some(20.0 * amplitude.log10()),
            });
        }
    }
    tracks
}

fn criterion_benchmark(c: &mut Criterion) {
    let config = Config::default();
    let elevations: Vec<f64> = (0..1200).map(|i| 6.0 + 24.0 * i as f64 / 1200.0).collect();
    let x: Vec<f64> = elevations
        .iter()
        .map(|e| e.to_radians().sin() / config.scale())
        .collect();
    let y: Vec<f64> = x.iter().map(|t| (2.0 * PI * 3.0 * t).cos()).collect();
    let (ofac, hifac) = ofac_hifac(
        &elevations,
        config.scale(),
        config.max_height,
        config.desired_precision,
    )
    .expect("elevations have spread");

    c.bench_function("Periodogram", |b| {
        b.iter(|| periodogram(black_box(&x), black_box(&y), ofac, hifac))
    });

    let tracks = synthetic_tracks();
    c.bench_function("Retrieval", |b| {
        b.iter(|| retrieve_heights(black_box(&tracks), &config).expect("retrieval failed"))
    });
    c.bench_function("Parallel Retrieval", |b| {
        b.iter(|| par_retrieve_heights(black_box(&tracks), &config).expect("retrieval failed"))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
