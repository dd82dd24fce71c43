//! Reflector height retrieval for whole tracks.
use crate::config::Config;
use crate::retrieval::error::RetrievalError;
use crate::retrieval::structs::{span, ConditionedSignal, HeightRetrieval, Spectrum};
use crate::retrieval::{arcs, conditioning, lombscargle, scoring};
use crate::track::{Track, TrackSet};
use crate::utils::constants::SECONDS_PER_HOUR;
use chrono::{DateTime, FixedOffset};
use log::debug;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

type Result<T> = std::result::Result<T, RetrievalError>;

/// Periodogram factors giving a frequency grid of `desired_precision` meters up to
/// `max_height` meters for samples at the given elevations (degrees).
///
/// Returns `None` if the elevations have no spread in sine.
pub fn ofac_hifac(
    elevations: &[f64],
    scale: f64,
    max_height: f64,
    desired_precision: f64,
) -> Option<(f64, f64)> {
    let width = span(elevations.iter().map(|e| e.to_radians().sin() / scale));
    if width <= 0.0 || !width.is_finite() {
        return None;
    }
    let ofac = (1.0 / width) / desired_precision;
    let hifac = max_height / (elevations.len() as f64 / (2.0 * width));
    Some((ofac, hifac))
}

/// Time stamp of the temporally middle sample that carries a date.
fn middle_timestamp(
    track: &Track,
    signal: &ConditionedSignal,
    config: &Config,
) -> Result<Option<DateTime<FixedOffset>>> {
    let zone = FixedOffset::east_opt(config.utc_offset_hours * SECONDS_PER_HOUR).ok_or_else(
        || {
            RetrievalError::InvalidInput(format!(
                "UTC offset of {} hours",
                config.utc_offset_hours
            ))
        },
    )?;
    let mut dated: Vec<usize> = signal
        .sources
        .iter()
        .copied()
        .filter(|&i| track.fixes[i].date.is_some())
        .collect();
    dated.sort_unstable();
    let stamp = dated
        .get(dated.len() / 2)
        .and_then(|&i| track.fixes[i].utc_datetime(config.leap_seconds));
    Ok(stamp.map(|s| s.with_timezone(&zone)))
}

/// Runs one track through arc selection, conditioning, the periodogram and the acceptance
/// gate.
///
/// # Errors
/// Will return `Err` if the configuration makes a stage impossible to evaluate, e.g. a
/// polynomial order the fit cannot solve or an out of range UTC offset.
pub fn retrieve_track(track: &Track, config: &Config) -> Result<Option<HeightRetrieval>> {
    let Some(arc) = arcs::select(track, config) else {
        return Ok(None);
    };
    let Some(signal) = conditioning::condition(&arc, config)? else {
        return Ok(None);
    };
    let Some((ofac, hifac)) = ofac_hifac(
        &signal.elevation,
        config.scale(),
        config.max_height,
        config.desired_precision,
    ) else {
        debug!("PRN {}: conditioned elevations have no spread", track.prn);
        return Ok(None);
    };

    let x: Vec<f64> = signal
        .sin_elevation
        .iter()
        .map(|s| s / config.scale())
        .collect();
    let periodogram = lombscargle::periodogram(&x, &signal.residual, ofac, hifac)?;
    let Some(score) = scoring::score(
        &periodogram.frequencies,
        &periodogram.amplitudes,
        config.noise_band,
    )?
    else {
        return Ok(None);
    };
    let elevation_span = signal.max_elevation - signal.min_elevation;
    if !scoring::accept(track.prn, &score, elevation_span, config) {
        return Ok(None);
    }

    let Some(timestamp) = middle_timestamp(track, &signal, config)? else {
        debug!("PRN {}: no dated fix to stamp the retrieval", track.prn);
        return Ok(None);
    };
    debug!(
        "PRN {}: reflector height {:.3} m at {timestamp}",
        track.prn, score.reflector_height
    );
    Ok(Some(HeightRetrieval {
        prn: track.prn,
        timestamp,
        reflector_height: score.reflector_height,
        peak_amplitude: score.peak_amplitude,
        peak_to_noise: score.peak_to_noise,
        azimuth: arc.mean_azimuth(),
        min_elevation: signal.min_elevation,
        max_elevation: signal.max_elevation,
        point_count: signal.len(),
        spectrum: Spectrum::from(periodogram),
    }))
}

/// Retrieves reflector heights for every track, in PRN order.
///
/// # Errors
/// Will return `Err` if any track fails with an invalid input error.
pub fn retrieve_heights(tracks: &TrackSet, config: &Config) -> Result<Vec<HeightRetrieval>> {
    let mut retrievals = vec![];
    for track in tracks.iter() {
        if let Some(r) = retrieve_track(track, config)? {
            retrievals.push(r);
        }
    }
    Ok(retrievals)
}

/// Retrieves reflector heights for every track in parallel. The output is in PRN order, the
/// same as [`retrieve_heights`].
///
/// # Errors
/// Will return `Err` if any track fails with an invalid input error.
pub fn par_retrieve_heights(
    tracks: &TrackSet,
    config: &Config,
) -> Result<Vec<HeightRetrieval>> {
    let results: Result<Vec<Option<HeightRetrieval>>> = tracks
        .tracks()
        .par_iter()
        .map(|track| retrieve_track(track, config))
        .collect();
    let mut retrievals: Vec<HeightRetrieval> = results?.into_iter().flatten().collect();
    retrievals.sort_by_key(|r| r.prn);
    Ok(retrievals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::Fix;
    use crate::utils::constants::GPS_L1_WAVELENGTH;
    use chrono::{NaiveDate, Timelike};
    use is_close::is_close;
    use std::f64::consts::PI;

    /// A rising pass at 1 Hz whose SNR carries the interference pattern of a reflector
    /// `height` meters below the antenna.
    fn reflected_pass(prn: u8, height: f64, azimuth: f64) -> Track {
        let mut track = Track::new(prn);
        let date = NaiveDate::from_ymd_opt(2024, 3, 9);
        for i in 0..1500 {
            let elevation = 4.0 + 28.0 * i as f64 / 1500.0;
            let phase = 4.0 * PI * height * elevation.to_radians().sin() / GPS_L1_WAVELENGTH;
            let amplitude = 200.0 + 15.0 * elevation + 60.0 * phase.cos();
            track.push(Fix {
                block: i,
                prn,
                utc_seconds: 3600.0 + i as f64,
                date,
                elevation: Some(elevation),
                azimuth: Some(azimuth),
                snr: Some(20.0 * amplitude.log10()),
            });
        }
        track
    }

    #[test]
    fn ofac_hifac_reaches_max_height() {
        let elevations: Vec<f64> = (0..100).map(|i| 6.0 + 0.2 * i as f64).collect();
        let scale = GPS_L1_WAVELENGTH / 2.0;
        let (ofac, hifac) = ofac_hifac(&elevations, scale, 8.0, 0.005).unwrap();

        let width = (25.8_f64.to_radians().sin() - 6.0_f64.to_radians().sin()) / scale;
        let grid = lombscargle::frequency_grid(width, elevations.len(), ofac, hifac);
        assert!(is_close!(grid[0], 0.005, rel_tol = 1e-9));
        assert!(is_close!(grid[grid.len() - 1], 8.0, abs_tol = 0.005));
        assert!(ofac_hifac(&[10.0; 5], scale, 8.0, 0.005).is_none());
    }

    #[test]
    fn retrieves_synthetic_height() {
        let config = Config::default();
        let track = reflected_pass(14, 3.2, 130.0);
        let r = retrieve_track(&track, &config).unwrap().unwrap();

        assert_eq!(r.prn, 14);
        assert!(is_close!(r.reflector_height, 3.2, abs_tol = 0.05));
        assert!(r.peak_to_noise > config.pcrit);
        assert!(is_close!(r.azimuth, 130.0));
        assert!(r.min_elevation > config.emin && r.max_elevation < config.emax);
        assert_eq!(r.timestamp.offset().local_minus_utc(), 12 * 3600);
        // middle of the pass, shifted by the leap seconds and into UTC+12
        assert_eq!(r.timestamp.hour(), 13);
        assert_eq!(r.spectrum.frequencies.len(), r.spectrum.amplitudes.len());
    }

    #[test]
    fn fixed_offset_sets_local_day() {
        let mut track = reflected_pass(14, 3.2, 130.0);
        // middle of the pass near 11:30 UTC
        for fix in track.fixes.iter_mut() {
            fix.utc_seconds += 37_057.0;
        }
        let nzst = retrieve_track(&track, &Config::default()).unwrap().unwrap();
        assert_eq!(nzst.timestamp.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert_eq!(nzst.timestamp.hour(), 23);

        let config = Config {
            utc_offset_hours: 13,
            ..Config::default()
        };
        let nzdt = retrieve_track(&track, &config).unwrap().unwrap();
        assert_eq!(nzdt.timestamp.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert_eq!(nzdt.timestamp.hour(), 0);
        assert_eq!(nzdt.timestamp, nzst.timestamp);
    }

    #[test]
    fn flat_snr_gives_nothing() {
        let config = Config::default();
        let mut track = reflected_pass(3, 3.2, 130.0);
        for fix in track.fixes.iter_mut() {
            fix.snr = Some(45.0);
        }
        assert_eq!(retrieve_track(&track, &config).unwrap(), None);
    }

    #[test]
    fn serial_and_parallel_agree() {
        let config = Config::default();
        let mut tracks = TrackSet::new();
        for (prn, height, azimuth) in [(21, 2.5, 300.0), (4, 4.1, 45.0), (9, 1.6, 200.0)] {
            for fix in reflected_pass(prn, height, azimuth).fixes {
                tracks.push(fix);
            }
        }
        let serial = retrieve_heights(&tracks, &config).unwrap();
        let parallel = par_retrieve_heights(&tracks, &config).unwrap();
        assert_eq!(serial.len(), 3);
        assert_eq!(serial, parallel);
        assert_eq!(serial.iter().map(|r| r.prn).collect::<Vec<_>>(), vec![4, 9, 21]);

        // no hidden state between runs
        assert_eq!(retrieve_heights(&tracks, &config).unwrap(), serial);
    }
}
