/// Width of the fixed smoothing window applied to detrended SNR
pub const SMOOTH_WINDOW: usize = 5;

/// Causal moving average with unit gain, `y[k] = (x[k] + ... + x[k-n+1]) / n`.
///
/// Samples before the start of the signal count as zero, so the first `n - 1` outputs are
/// biased low. That warm-up is what the lock gate and the later trim account for.
pub fn moving_average(signal: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let gain = 1.0 / window as f64;
    let mut out = Vec::with_capacity(signal.len());
    let mut running = 0.0;
    for (i, &v) in signal.iter().enumerate() {
        running += v;
        if i >= window {
            running -= signal[i - window];
        }
        out.push(running * gain);
    }
    out
}

/// Mean over every fully overlapping [`SMOOTH_WINDOW`] sample window.
///
/// Output `k` is centred on input `k + SMOOTH_WINDOW / 2` and the result is
/// `SMOOTH_WINDOW - 1` samples shorter than the input (empty if the input is shorter than
/// the window).
pub fn smooth(signal: &[f64]) -> Vec<f64> {
    signal
        .windows(SMOOTH_WINDOW)
        .map(|w| w.iter().sum::<f64>() / SMOOTH_WINDOW as f64)
        .collect()
}

/// Piecewise-linear interpolation of `(xp, fp)` at `x`, clamped to the end values outside
/// `[xp[0], xp[last]]`. `xp` must be strictly increasing and non-empty.
pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let last = xp.len() - 1;
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[last] {
        return fp[last];
    }
    // first anchor strictly greater than x
    let hi = xp.partition_point(|&v| v <= x);
    let lo = hi - 1;
    let t = (x - xp[lo]) / (xp[hi] - xp[lo]);
    fp[lo] + t * (fp[hi] - fp[lo])
}
