use crate::config::Config;
use crate::retrieval::error::RetrievalError;
use crate::retrieval::structs::{Arc, ConditionedSignal};
use crate::utils::least_squares::Polynomial;
use crate::utils::signal::{moving_average, smooth, SMOOTH_WINDOW};
use itertools::Itertools;
use log::debug;

type Result<T> = std::result::Result<T, RetrievalError>;

/// Turns an arc's SNR into a detrended series against sine of elevation.
///
/// Returns `Ok(None)` when the arc runs out of samples at any stage: no fix passes the
/// moving-average lock gate, too few remain for the polynomial or the smoothing window, or
/// fewer than two distinct abscissae survive the edge trim.
///
/// # Errors
/// Will return `Err` if the polynomial fit cannot be solved.
pub fn condition(arc: &Arc, config: &Config) -> Result<Option<ConditionedSignal>> {
    let filter_len = config.filter_len();
    let filtered = moving_average(&arc.snrs(), filter_len);

    // lock gate
    let gated: Vec<_> = arc
        .samples
        .iter()
        .zip(&filtered)
        .filter(|(_, f)| **f > config.snr_thresh)
        .map(|(s, _)| *s)
        .collect();
    if gated.is_empty() {
        debug!("PRN {}: no fix above {} dB-Hz", arc.prn, config.snr_thresh);
        return Ok(None);
    }

    let warm_up = filter_len / 2;
    if gated.len() <= config.pvf || gated.len() < SMOOTH_WINDOW + warm_up + 2 {
        debug!(
            "PRN {}: {} locked fixes are too few to condition",
            arc.prn,
            gated.len()
        );
        return Ok(None);
    }
    let elevations: Vec<f64> = gated.iter().map(|s| s.elevation).collect();
    let (min_elevation, max_elevation) = elevations
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &e| {
            (lo.min(e), hi.max(e))
        });

    // dB to linear amplitude, then remove the direct signal trend
    let amplitudes: Vec<f64> = gated.iter().map(|s| 10f64.powf(s.snr / 20.0)).collect();
    let trend = Polynomial::fit(&elevations, &amplitudes, config.pvf)?;
    let residual = smooth(&trend.residuals(&elevations, &amplitudes));

    // smoothed sample k is centred on gated sample k + SMOOTH_WINDOW / 2
    let offset = SMOOTH_WINDOW / 2 + warm_up;
    let samples: Vec<(f64, f64, f64, usize)> = residual[warm_up..]
        .iter()
        .zip(&gated[offset..])
        .map(|(&r, s)| (s.elevation.to_radians().sin(), s.elevation, r, s.index))
        .sorted_by(|a, b| a.0.total_cmp(&b.0))
        .dedup_by(|a, b| a.0 == b.0)
        .collect();

    if samples.len() < 4 {
        debug!("PRN {}: fewer than two distinct elevations left", arc.prn);
        return Ok(None);
    }
    let samples = &samples[1..samples.len() - 1];

    Ok(Some(ConditionedSignal {
        sin_elevation: samples.iter().map(|s| s.0).collect(),
        elevation: samples.iter().map(|s| s.1).collect(),
        residual: samples.iter().map(|s| s.2).collect(),
        sources: samples.iter().map(|s| s.3).collect(),
        min_elevation,
        max_elevation,
    }))
}
