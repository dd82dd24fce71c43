use crate::config::Config;
use crate::retrieval::error::RetrievalError;
use crate::retrieval::structs::Score;
use log::debug;

/// Picks the dominant peak of a periodogram and rates it against the noise floor.
///
/// The peak is the first of equal maxima. `NaN` amplitudes lose to any number and only win
/// when every amplitude is `NaN`. The noise floor is the mean amplitude at frequencies strictly
/// outside the closed band between the two `noise_band` limits, given in either order.
/// Returns `Ok(None)` for an empty periodogram.
///
/// # Errors
/// Will return `Err` if `frequencies` and `amplitudes` differ in length.
pub fn score(
    frequencies: &[f64],
    amplitudes: &[f64],
    noise_band: (f64, f64),
) -> Result<Option<Score>, RetrievalError> {
    if frequencies.len() != amplitudes.len() {
        Err(RetrievalError::InvalidInput(format!(
            "{} frequencies for {} amplitudes",
            frequencies.len(),
            amplitudes.len()
        )))?
    }
    let Some((peak, peak_amplitude)) = amplitudes
        .iter()
        .copied()
        .enumerate()
        .reduce(|a, b| {
            if b.1 > a.1 || (a.1.is_nan() && !b.1.is_nan()) {
                b
            } else {
                a
            }
        })
    else {
        return Ok(None);
    };
    let reflector_height = frequencies[peak];

    let (low, high) = if noise_band.0 <= noise_band.1 {
        noise_band
    } else {
        (noise_band.1, noise_band.0)
    };
    let (sum, count) = frequencies
        .iter()
        .zip(amplitudes)
        .filter(|(f, _)| **f < low || **f > high)
        .fold((0.0, 0usize), |(sum, count), (_, &a)| (sum + a, count + 1));

    let peak_to_noise = if count == 0 {
        f64::NAN
    } else {
        let noise = sum / count as f64;
        if noise == 0.0 {
            f64::INFINITY
        } else {
            peak_amplitude / noise
        }
    };

    Ok(Some(Score {
        reflector_height,
        peak_amplitude,
        peak_to_noise,
    }))
}

/// Acceptance gate for a scored arc. `elevation_span` is that of the fixes that passed the
/// SNR lock gate. A `NaN` peak-to-noise ratio never passes.
pub fn accept(prn: u8, score: &Score, elevation_span: f64, config: &Config) -> bool {
    let checks = [
        (score.peak_amplitude > config.min_amp, "peak amplitude"),
        (score.reflector_height > config.min_rh, "reflector height"),
        (score.peak_to_noise > config.pcrit, "peak to noise"),
        (elevation_span > config.ediff, "elevation span"),
    ];
    match checks.iter().find(|(passed, _)| !passed) {
        Some((_, name)) => {
            debug!(
                "PRN {prn}: rejected on {name} (height {:.3} m, amplitude {:.2}, PNR {:.2})",
                score.reflector_height, score.peak_amplitude, score.peak_to_noise
            );
            false
        }
        None => true,
    }
}
