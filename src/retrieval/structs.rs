use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// One fix of an arc, with all measurements present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcSample {
    /// Position of the fix in its track
    pub index: usize,
    pub elevation: f64,
    pub azimuth: f64,
    pub snr: f64,
}

/// Fixes of one satellite pass that passed the elevation, azimuth and completeness filters.
#[derive(Debug, Clone, PartialEq)]
pub struct Arc {
    pub prn: u8,
    pub samples: Vec<ArcSample>,
}

impl Arc {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn indices(&self) -> Vec<usize> {
        self.samples.iter().map(|s| s.index).collect()
    }

    pub fn snrs(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.snr).collect()
    }

    pub fn elevation_span(&self) -> f64 {
        span(self.samples.iter().map(|s| s.elevation))
    }

    pub fn azimuth_span(&self) -> f64 {
        span(self.samples.iter().map(|s| s.azimuth))
    }

    /// Arithmetic mean of the azimuths; `NaN` for an empty arc.
    pub fn mean_azimuth(&self) -> f64 {
        self.samples.iter().map(|s| s.azimuth).sum::<f64>() / self.samples.len() as f64
    }
}

/// `max - min` of a series, `0` if it is empty.
pub(crate) fn span(values: impl Iterator<Item = f64>) -> f64 {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if lo <= hi {
        hi - lo
    } else {
        0.0
    }
}

/// Detrended SNR against sine of elevation, ready for the periodogram.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionedSignal {
    /// Sine of elevation, strictly increasing
    pub sin_elevation: Vec<f64>,
    /// Elevation in degrees for each sample
    pub elevation: Vec<f64>,
    /// Smoothed SNR amplitude residual
    pub residual: Vec<f64>,
    /// Track index of the fix each sample came from
    pub sources: Vec<usize>,
    /// Elevation bounds of the fixes that passed the SNR lock gate, degrees
    pub min_elevation: f64,
    pub max_elevation: f64,
}

impl ConditionedSignal {
    pub fn len(&self) -> usize {
        self.residual.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residual.is_empty()
    }
}

/// Amplitude periodogram of an irregularly sampled series.
#[derive(Debug, Clone, PartialEq)]
pub struct Periodogram {
    /// Strictly increasing, cycles per unit of the abscissa
    pub frequencies: Vec<f64>,
    pub amplitudes: Vec<f64>,
    /// False alarm probability of each amplitude
    pub false_alarm: Vec<f64>,
    /// Amplitude with a 5% false alarm probability
    pub confidence95: f64,
}

/// The part of a periodogram kept alongside a retrieval.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Spectrum {
    /// Reflector heights, meters
    pub frequencies: Vec<f64>,
    pub amplitudes: Vec<f64>,
}

impl From<Periodogram> for Spectrum {
    fn from(p: Periodogram) -> Self {
        Spectrum {
            frequencies: p.frequencies,
            amplitudes: p.amplitudes,
        }
    }
}

/// Dominant peak of a periodogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub reflector_height: f64,
    pub peak_amplitude: f64,
    /// `inf` when the noise floor is zero, `NaN` when no frequency is outside the noise band
    pub peak_to_noise: f64,
}

/// An accepted reflector height for one satellite pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeightRetrieval {
    pub prn: u8,
    pub timestamp: DateTime<FixedOffset>,
    /// Meters above the antenna phase centre
    pub reflector_height: f64,
    pub peak_amplitude: f64,
    pub peak_to_noise: f64,
    /// Mean azimuth of the arc, degrees
    pub azimuth: f64,
    pub min_elevation: f64,
    pub max_elevation: f64,
    /// Samples handed to the periodogram
    pub point_count: usize,
    #[serde(skip)]
    pub spectrum: Spectrum,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arc_statistics() {
        let arc = Arc {
            prn: 2,
            samples: [(10.0, 80.0), (12.0, 90.0), (15.0, 100.0)]
                .iter()
                .enumerate()
                .map(|(i, &(elevation, azimuth))| ArcSample {
                    index: i + 4,
                    elevation,
                    azimuth,
                    snr: 40.0,
                })
                .collect(),
        };
        assert_eq!(arc.len(), 3);
        assert_eq!(arc.indices(), vec![4, 5, 6]);
        assert_eq!(arc.elevation_span(), 5.0);
        assert_eq!(arc.azimuth_span(), 20.0);
        assert_eq!(arc.mean_azimuth(), 90.0);
        assert_eq!(span(std::iter::empty()), 0.0);
    }
}
