//! Lomb-Scargle amplitude periodogram for unevenly sampled data.
//!
//! With the abscissa in units of sine of elevation over half the carrier wavelength, the
//! frequency axis reads directly as reflector height in meters.
use crate::retrieval::error::RetrievalError;
use crate::retrieval::structs::Periodogram;
use rayon::prelude::*;
use std::f64::consts::PI;

type Result<T> = std::result::Result<T, RetrievalError>;

/// Grids at least this long are evaluated in parallel
const PAR_THRESHOLD: usize = 256;
/// Confidence level of [`Periodogram::confidence95`]
const CONFIDENCE: f64 = 0.95;
/// Above this tail estimate the exact false alarm expression is used
const TAIL_LIMIT: f64 = 0.01;
const EPS: f64 = 1e-15;

/// Compensated summation step.
#[inline(always)]
fn kahan_add(sum: &mut f64, c: &mut f64, x: f64) {
    let y = x - *c;
    let t = *sum + y;
    *c = (t - *sum) - y;
    *sum = t;
}

/// Frequencies `k * f_step` for `k = 1, 2, ...` up to `hifac` times the mean Nyquist
/// frequency, where `f_step = 1 / (span * ofac)`.
pub fn frequency_grid(span: f64, n: usize, ofac: f64, hifac: f64) -> Vec<f64> {
    let f_step = 1.0 / (span * ofac);
    let f_max = hifac * n as f64 / (2.0 * span);
    let count = ((f_max - f_step) / f_step).floor() + 1.0;
    if !count.is_finite() || count < 1.0 {
        return vec![];
    }
    (1..=count as usize).map(|k| k as f64 * f_step).collect()
}

/// Normalised power of the mean-centred series `y` at one frequency.
fn power_at(frequency: f64, x: &[f64], y: &[f64], variance: f64) -> f64 {
    let omega = 2.0 * PI * frequency;

    // the phase offset tau makes the sine and cosine terms orthogonal
    let (mut s2, mut c2) = (0.0, 0.0);
    let (mut comp_s2, mut comp_c2) = (0.0, 0.0);
    for &t in x {
        let (s, c) = (omega * t).sin_cos();
        kahan_add(&mut s2, &mut comp_s2, 2.0 * s * c);
        kahan_add(&mut c2, &mut comp_c2, c * c - s * s);
    }
    let (s_tau, c_tau) = (0.5 * f64::atan2(s2, c2)).sin_cos();

    let (mut yc, mut ys) = (0.0, 0.0);
    let (mut comp_yc, mut comp_ys) = (0.0, 0.0);
    let (mut cc, mut ss) = (0.0_f64, 0.0_f64);
    for (&t, &v) in x.iter().zip(y) {
        let (s, c) = (omega * t).sin_cos();
        // rotate by omega * tau
        let s_shift = s * c_tau - c * s_tau;
        let c_shift = c * c_tau + s * s_tau;
        kahan_add(&mut yc, &mut comp_yc, v * c_shift);
        kahan_add(&mut ys, &mut comp_ys, v * s_shift);
        cc = c_shift.mul_add(c_shift, cc);
        ss = s_shift.mul_add(s_shift, ss);
    }

    let pc = if cc > EPS { yc * yc / cc } else { 0.0 };
    let ps = if ss > EPS { ys * ys / ss } else { 0.0 };
    (pc + ps) / (2.0 * variance)
}

/// Computes the amplitude periodogram of `y` sampled at `x`.
///
/// `ofac` is the oversampling factor of the frequency grid and `hifac` the highest
/// frequency as a multiple of the mean Nyquist frequency. A constant `y` gives zero
/// amplitudes with a false alarm probability of one.
///
/// # Errors
/// Will return `Err` if `x` and `y` differ in length, if `x` has no spread, if `ofac` or
/// `hifac` is not a positive number, or if the resulting frequency grid is empty.
pub fn periodogram(x: &[f64], y: &[f64], ofac: f64, hifac: f64) -> Result<Periodogram> {
    if x.len() != y.len() {
        Err(RetrievalError::InvalidInput(format!(
            "periodogram needs equal lengths, got {} and {}",
            x.len(),
            y.len()
        )))?
    }
    if !(ofac > 0.0 && ofac.is_finite() && hifac > 0.0 && hifac.is_finite()) {
        Err(RetrievalError::InvalidInput(format!(
            "oversampling ({ofac}) and high frequency ({hifac}) factors must be positive"
        )))?
    }
    let (lo, hi) = x
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let span = hi - lo;
    if !(span > 0.0 && span.is_finite()) {
        Err(RetrievalError::InvalidInput(
            "periodogram abscissa has no spread".to_string(),
        ))?
    }

    let n = y.len();
    let frequencies = frequency_grid(span, n, ofac, hifac);
    if frequencies.is_empty() {
        Err(RetrievalError::InvalidInput(format!(
            "empty frequency grid for ofac {ofac} and hifac {hifac}"
        )))?
    }

    let mean = y.iter().sum::<f64>() / n as f64;
    let centred: Vec<f64> = y.iter().map(|v| v - mean).collect();
    let variance = centred.iter().map(|v| v * v).sum::<f64>() / n as f64;

    let powers: Vec<f64> = if variance <= 0.0 {
        vec![0.0; frequencies.len()]
    } else if frequencies.len() < PAR_THRESHOLD {
        frequencies
            .iter()
            .map(|&f| power_at(f, x, &centred, variance))
            .collect()
    } else {
        frequencies
            .par_iter()
            .map(|&f| power_at(f, x, &centred, variance))
            .collect()
    };

    // number of independent frequencies
    let m = 2.0 * frequencies.len() as f64 / ofac;
    let false_alarm = powers
        .iter()
        .map(|&p| {
            let tail = m * (-p).exp();
            if tail > TAIL_LIMIT {
                1.0 - (1.0 - (-p).exp()).powf(m)
            } else {
                tail
            }
        })
        .collect();
    let amplitudes = powers
        .iter()
        .map(|&p| 2.0 * (variance * p / n as f64).sqrt())
        .collect();
    let confidence_power = -(1.0 - CONFIDENCE.powf(1.0 / m)).ln();
    let confidence95 = 2.0 * (variance * confidence_power / n as f64).sqrt();

    Ok(Periodogram {
        frequencies,
        amplitudes,
        false_alarm,
        confidence95,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;

    fn uneven_samples(n: usize) -> Vec<f64> {
        // sine of elevations from 6 to 30 degrees, denser at the bottom like a rising pass
        (0..n)
            .map(|i| {
                let u = i as f64 / (n - 1) as f64;
                (6.0 + 24.0 * u.powf(1.3)).to_radians().sin()
            })
            .collect()
    }

    #[test]
    fn grid_length_and_order() {
        let x = uneven_samples(200);
        let y: Vec<f64> = x.iter().map(|v| (40.0 * v).sin()).collect();
        for (ofac, hifac) in [(4.0, 1.0), (10.0, 2.5), (3.3, 0.7)] {
            let p = periodogram(&x, &y, ofac, hifac).unwrap();
            let span = x[x.len() - 1] - x[0];
            let f_step = 1.0 / (span * ofac);
            let f_max = hifac * x.len() as f64 / (2.0 * span);
            let expected = ((f_max - f_step) / f_step).floor() as usize + 1;
            assert_eq!(p.frequencies.len(), expected);
            assert_eq!(p.amplitudes.len(), expected);
            assert_eq!(p.false_alarm.len(), expected);
            assert!(p.frequencies.windows(2).all(|w| w[0] < w[1]));
            assert!(p.amplitudes.iter().all(|&a| a >= 0.0));
            assert!(p.false_alarm.iter().all(|&f| (0.0..=1.0).contains(&f)));
        }
    }

    #[test]
    fn finds_reflector_height() {
        let scale = 0.1902936728 / 2.0;
        let h0 = 2.7;
        let x: Vec<f64> = uneven_samples(400).iter().map(|s| s / scale).collect();
        let y: Vec<f64> = x.iter().map(|&t| 3.0 * (2.0 * PI * h0 * t + 0.4).cos()).collect();

        let p = periodogram(&x, &y, 20.0, 2.0).unwrap();
        let peak = p
            .amplitudes
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        let f_step = p.frequencies[0];
        assert!((p.frequencies[peak] - h0).abs() <= f_step);
        assert!(is_close!(p.amplitudes[peak], 3.0, rel_tol = 0.1));
        assert!(p.amplitudes[peak] > p.confidence95);
        assert!(p.false_alarm[peak] < 1e-6);
    }

    #[test]
    fn parallel_grid_matches_serial_power() {
        let x = uneven_samples(300);
        let y: Vec<f64> = x.iter().map(|v| (90.0 * v).cos() + 0.3 * (17.0 * v).sin()).collect();
        // long enough grid for the parallel branch
        let p = periodogram(&x, &y, 8.0, 2.0).unwrap();
        assert!(p.frequencies.len() >= PAR_THRESHOLD);

        let n = y.len() as f64;
        let mean = y.iter().sum::<f64>() / n;
        let centred: Vec<f64> = y.iter().map(|v| v - mean).collect();
        let variance = centred.iter().map(|v| v * v).sum::<f64>() / n;
        for k in [0, 17, p.frequencies.len() - 1] {
            let power = power_at(p.frequencies[k], &x, &centred, variance);
            assert_eq!(p.amplitudes[k], 2.0 * (variance * power / n).sqrt());
        }
    }

    #[test]
    fn confidence_amplitude_has_five_percent_false_alarm() {
        let x = uneven_samples(300);
        let y: Vec<f64> = x.iter().map(|v| (60.0 * v).sin() + 0.2 * (9.0 * v).cos()).collect();
        let ofac = 6.0;
        let p = periodogram(&x, &y, ofac, 1.5).unwrap();

        let n = y.len() as f64;
        let mean = y.iter().sum::<f64>() / n;
        let variance = y.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let power = p.confidence95.powi(2) * n / (4.0 * variance);
        let m = 2.0 * p.frequencies.len() as f64 / ofac;
        let false_alarm = 1.0 - (1.0 - (-power).exp()).powf(m);
        assert!(is_close!(false_alarm, 1.0 - CONFIDENCE, rel_tol = 1e-6));
    }

    #[test]
    fn constant_signal_has_no_power() {
        let x = uneven_samples(50);
        let p = periodogram(&x, &[1.5; 50], 4.0, 1.0).unwrap();
        assert!(p.amplitudes.iter().all(|&a| a == 0.0));
        assert!(p.false_alarm.iter().all(|&f| f == 1.0));
        assert_eq!(p.confidence95, 0.0);
    }

    #[test]
    fn rejects_invalid_input() {
        let x = uneven_samples(10);
        assert!(periodogram(&x, &[0.0; 9], 4.0, 1.0).is_err());
        assert!(periodogram(&[0.5; 10], &[0.0; 10], 4.0, 1.0).is_err());
        assert!(periodogram(&x, &[0.0; 10], 0.0, 1.0).is_err());
        assert!(periodogram(&x, &[0.0; 10], 4.0, f64::NAN).is_err());
        assert!(periodogram(&[], &[], 4.0, 1.0).is_err());
    }
}
