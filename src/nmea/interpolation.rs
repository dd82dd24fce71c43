use crate::track::Track;
use crate::utils::signal::interp;

/// Elevation step between consecutive fixes that marks an anchor, degrees
const ANCHOR_STEP: f64 = 0.1;
/// Fewer anchors than this leaves the track unchanged
const MIN_ANCHORS: usize = 10;

/// Re-interpolates a track's elevations linearly in time through the fixes after which the
/// reported elevation steps by more than 0.1 degrees.
///
/// Receivers report elevation in whole degrees, so the raw series is a staircase. The step
/// positions are the only fixes where the reported value is close to the true elevation.
/// Missing elevations stay missing. Returns `true` if the track was modified.
pub fn interpolate_elevation(track: &mut Track) -> bool {
    let fixes = &track.fixes;
    let (times, elevations): (Vec<f64>, Vec<f64>) = fixes
        .windows(2)
        .filter_map(|pair| match (pair[0].elevation, pair[1].elevation) {
            (Some(a), Some(b)) if (b - a).abs() > ANCHOR_STEP => {
                Some((pair[0].epoch_seconds(), a))
            }
            _ => None,
        })
        .unzip();

    if times.len() <= MIN_ANCHORS || times.windows(2).any(|w| w[1] <= w[0]) {
        return false;
    }

    for fix in track.fixes.iter_mut() {
        if fix.elevation.is_some() {
            fix.elevation = Some(interp(fix.epoch_seconds(), &times, &elevations));
        }
    }
    true
}
