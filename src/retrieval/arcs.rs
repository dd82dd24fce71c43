use crate::config::Config;
use crate::retrieval::structs::{Arc, ArcSample};
use crate::track::Track;
use log::debug;

/// Collects the fixes of a track that can take part in a retrieval and accepts them as one
/// arc if they form a long enough, single-sector pass.
///
/// A fix is kept if all three measurements are present, its elevation lies strictly inside
/// `(emin, emax)` and its azimuth falls in any configured azimuth bin. The kept set is
/// accepted if it has more than `min_points` fixes, spans more than `ediff` degrees of
/// elevation and less than `max_az_diff` degrees of azimuth.
pub fn select(track: &Track, config: &Config) -> Option<Arc> {
    let samples: Vec<ArcSample> = track
        .fixes
        .iter()
        .enumerate()
        .filter_map(|(index, fix)| {
            Some(ArcSample {
                index,
                elevation: fix.elevation?,
                azimuth: fix.azimuth?,
                snr: fix.snr?,
            })
        })
        .filter(|s| s.elevation > config.emin && s.elevation < config.emax)
        .filter(|s| config.in_azimuth_bins(s.azimuth))
        .collect();
    let arc = Arc {
        prn: track.prn,
        samples,
    };

    if arc.len() <= config.min_points {
        if !arc.is_empty() {
            debug!(
                "PRN {}: {} fixes in band, need more than {}",
                track.prn,
                arc.len(),
                config.min_points
            );
        }
        return None;
    }
    let elevation_span = arc.elevation_span();
    if elevation_span <= config.ediff {
        debug!(
            "PRN {}: elevation span {elevation_span:.2} within {}",
            track.prn, config.ediff
        );
        return None;
    }
    let azimuth_span = arc.azimuth_span();
    if azimuth_span >= config.max_az_diff {
        debug!(
            "PRN {}: azimuth span {azimuth_span:.2} reaches {}",
            track.prn, config.max_az_diff
        );
        return None;
    }
    Some(arc)
}
