//! Run configuration for height retrieval.
//!
//! A [`Config`] is built once at the top of a run (defaults, then an optional INI file, then
//! command line overrides), validated, and passed by reference into every stage.
use crate::utils::constants::GPS_L1_WAVELENGTH;
use log::debug;
use rust_embed::RustEmbed;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(RustEmbed)]
#[folder = "config/"]
struct Presets;

/// Maximum number of azimuth bins a configuration may carry
pub const MAX_AZIMUTH_BINS: usize = 4;
/// Largest leap second correction accepted, in either direction
pub const MAX_LEAP_SECONDS: i64 = 3600;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// A key that is not a recognized option
    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),

    /// A recognized key whose value could not be parsed
    #[error("invalid value '{value}' for configuration key '{key}'")]
    InvalidValue { key: String, value: String },

    /// Values that parse but cannot be used together
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// No preset with that name is embedded in the binary
    #[error("no configuration preset named '{0}'")]
    MissingPreset(String),

    /// Unable to read a configuration file
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

type Result<T> = std::result::Result<T, ConfigError>;

/// Half-open azimuth interval `[min, max)` in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AzimuthBin {
    pub min: f64,
    pub max: f64,
}

impl AzimuthBin {
    pub fn new(min: f64, max: f64) -> AzimuthBin {
        AzimuthBin { min, max }
    }

    pub fn contains(&self, azimuth: f64) -> bool {
        azimuth >= self.min && azimuth < self.max
    }
}

impl fmt::Display for AzimuthBin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    /// Order of the polynomial removed from the SNR amplitude (direct signal)
    pub pvf: usize,
    /// Minimum accepted reflector height, meters
    pub min_rh: f64,
    /// Minimum accepted periodogram peak amplitude
    pub min_amp: f64,
    /// An arc needs strictly more points than this
    pub min_points: usize,
    /// Maximum azimuth spread of an arc, degrees
    pub max_az_diff: f64,
    /// Highest reflector height resolved by the periodogram, meters
    pub max_height: f64,
    /// Frequency grid spacing requested from the periodogram, meters
    pub desired_precision: f64,
    /// Minimum peak-to-noise ratio
    pub pcrit: f64,
    /// Elevation band, degrees (exclusive on both ends)
    pub emin: f64,
    pub emax: f64,
    /// Minimum elevation span of an arc, degrees
    pub ediff: f64,
    /// Carrier wavelength, meters
    pub cf: f64,
    /// Moving-average SNR lock threshold, dB-Hz
    pub snr_thresh: f64,
    /// Receiver output interval, seconds
    pub sampling_interval: f64,
    /// Moving-average window, seconds
    pub av_time: f64,
    pub azimuth_bins: Vec<AzimuthBin>,
    /// Reflector heights excluded from the noise floor estimate, meters
    pub noise_band: (f64, f64),
    /// Re-interpolate elevation through glitch anchors after parsing
    pub interpolate: bool,
    /// Seconds subtracted from receiver time stamps
    pub leap_seconds: i64,
    /// Fixed UTC offset of retrieval time stamps, hours. No daylight saving is applied.
    pub utc_offset_hours: i32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            pvf: 2,
            min_rh: 0.4,
            min_amp: 18.0,
            min_points: 50,
            max_az_diff: 90.0,
            max_height: 8.0,
            desired_precision: 0.005,
            pcrit: 3.0,
            emin: 6.0,
            emax: 30.0,
            ediff: 8.0,
            cf: GPS_L1_WAVELENGTH,
            snr_thresh: 30.0,
            sampling_interval: 1.0,
            av_time: 20.0,
            azimuth_bins: vec![
                AzimuthBin::new(0.0, 90.0),
                AzimuthBin::new(90.0, 180.0),
                AzimuthBin::new(180.0, 270.0),
                AzimuthBin::new(270.0, 360.0),
            ],
            noise_band: (2.0, 6.0),
            interpolate: false,
            leap_seconds: 18,
            utc_offset_hours: 12,
        }
    }
}

impl Config {
    /// Loads a configuration preset embedded at build time, on top of the defaults.
    pub fn from_preset(name: &str) -> Result<Config> {
        let file = Presets::get(&format!("{name}.ini"))
            .ok_or_else(|| ConfigError::MissingPreset(name.to_string()))?;
        let text = std::str::from_utf8(file.data.as_ref())
            .map_err(|e| ConfigError::Invalid(format!("preset '{name}' is not UTF-8: {e}")))?;
        Config::default().with_ini(text)
    }

    /// Raw text of an embedded preset.
    pub fn preset_text(name: &str) -> Result<String> {
        let file = Presets::get(&format!("{name}.ini"))
            .ok_or_else(|| ConfigError::MissingPreset(name.to_string()))?;
        Ok(String::from_utf8_lossy(file.data.as_ref()).into_owned())
    }

    pub fn from_ini_file(path: &Path) -> Result<Config> {
        let text = std::fs::read_to_string(path)?;
        Config::default().with_ini(&text)
    }

    /// Applies every `key = value` line of an INI document to this configuration.
    ///
    /// Section headers are ignored, so a `[DEFAULT]` section reads the same as a bare file.
    /// `azim1`/`azim2` replace the azimuth bins with a single bin once both lines are read.
    pub fn with_ini(mut self, text: &str) -> Result<Config> {
        let mut azim1 = None;
        let mut azim2 = None;
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') || line.starts_with('[') {
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .or_else(|| line.split_once(':'))
                .ok_or_else(|| ConfigError::Invalid(format!("expected 'key = value', found '{line}'")))?;
            let (key, value) = (key.trim(), value.trim());
            match key {
                "azim1" => azim1 = Some(parse_value::<f64>(key, value)?),
                "azim2" => azim2 = Some(parse_value::<f64>(key, value)?),
                _ => self.set(key, value)?,
            }
        }
        if azim1.is_some() || azim2.is_some() {
            self.azimuth_bins = vec![AzimuthBin::new(azim1.unwrap_or(0.0), azim2.unwrap_or(360.0))];
        }
        Ok(self)
    }

    /// Sets a single option from its textual form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        debug!("config: {key} = {value}");
        match key {
            "pvf" => self.pvf = parse_value(key, value)?,
            "min_rh" => self.min_rh = parse_value(key, value)?,
            "min_amp" => self.min_amp = parse_value(key, value)?,
            "min_points" => self.min_points = parse_value(key, value)?,
            "max_az_diff" => self.max_az_diff = parse_value(key, value)?,
            "max_height" => self.max_height = parse_value(key, value)?,
            "desired_precision" => self.desired_precision = parse_value(key, value)?,
            "pcrit" => self.pcrit = parse_value(key, value)?,
            "emin" => self.emin = parse_value(key, value)?,
            "emax" => self.emax = parse_value(key, value)?,
            "ediff" => self.ediff = parse_value(key, value)?,
            "cf" => self.cf = parse_value(key, value)?,
            "snr_thresh" => self.snr_thresh = parse_value(key, value)?,
            "sampling_interval" => self.sampling_interval = parse_value(key, value)?,
            "av_time" => self.av_time = parse_value(key, value)?,
            "azimuth_bins" => self.azimuth_bins = parse_bins(key, value)?,
            "noise_band" => {
                let pair = parse_list::<f64>(key, value)?;
                match pair.as_slice() {
                    [low, high] => self.noise_band = (*low, *high),
                    _ => Err(invalid_value(key, value))?,
                }
            }
            "interpolate" => self.interpolate = parse_bool(key, value)?,
            "leap_seconds" => self.leap_seconds = parse_value(key, value)?,
            "utc_offset_hours" => self.utc_offset_hours = parse_value(key, value)?,
            _ => Err(ConfigError::UnknownKey(key.to_string()))?,
        }
        Ok(())
    }

    /// Checks the preconditions every stage relies on.
    ///
    /// # Errors
    /// Will return `Err` for an empty elevation band, a moving-average window shorter than one
    /// sample, a frequency grid without a single step, a non-finite noise band, an azimuth bin
    /// list that is empty, too long or holds an empty bin, or out of range time corrections.
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("min_rh", self.min_rh),
            ("min_amp", self.min_amp),
            ("max_az_diff", self.max_az_diff),
            ("pcrit", self.pcrit),
            ("emin", self.emin),
            ("emax", self.emax),
            ("ediff", self.ediff),
            ("snr_thresh", self.snr_thresh),
            ("noise_band", self.noise_band.0),
            ("noise_band", self.noise_band.1),
        ];
        if let Some((key, _)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            Err(ConfigError::Invalid(format!("{key} must be finite")))?
        }
        if self.emin >= self.emax {
            Err(ConfigError::Invalid(format!(
                "emin ({}) must be below emax ({})",
                self.emin, self.emax
            )))?
        }
        for (key, value) in [
            ("cf", self.cf),
            ("max_height", self.max_height),
            ("desired_precision", self.desired_precision),
            ("sampling_interval", self.sampling_interval),
            ("av_time", self.av_time),
        ] {
            if !(value.is_finite() && value > 0.0) {
                Err(ConfigError::Invalid(format!("{key} must be positive, got {value}")))?
            }
        }
        if self.max_height < self.desired_precision {
            Err(ConfigError::Invalid(format!(
                "max_height ({}) is below desired_precision ({})",
                self.max_height, self.desired_precision
            )))?
        }
        if self.av_time < self.sampling_interval {
            Err(ConfigError::Invalid(format!(
                "av_time ({}) is shorter than one sampling interval ({})",
                self.av_time, self.sampling_interval
            )))?
        }
        if self.azimuth_bins.is_empty() || self.azimuth_bins.len() > MAX_AZIMUTH_BINS {
            Err(ConfigError::Invalid(format!(
                "between 1 and {MAX_AZIMUTH_BINS} azimuth bins are required, got {}",
                self.azimuth_bins.len()
            )))?
        }
        if let Some(bin) = self.azimuth_bins.iter().find(|b| b.min >= b.max) {
            Err(ConfigError::Invalid(format!("azimuth bin {bin} is empty")))?
        }
        if !(-14..=14).contains(&self.utc_offset_hours) {
            Err(ConfigError::Invalid(format!(
                "utc_offset_hours ({}) is out of range",
                self.utc_offset_hours
            )))?
        }
        if !(-MAX_LEAP_SECONDS..=MAX_LEAP_SECONDS).contains(&self.leap_seconds) {
            Err(ConfigError::Invalid(format!(
                "leap_seconds ({}) is out of range",
                self.leap_seconds
            )))?
        }
        Ok(())
    }

    /// Length of the moving-average lock filter, in samples.
    pub fn filter_len(&self) -> usize {
        ((self.av_time / self.sampling_interval).floor() as usize).max(1)
    }

    /// Scaling between sine of elevation and reflector height (half the carrier wavelength).
    pub fn scale(&self) -> f64 {
        self.cf / 2.0
    }

    pub fn in_azimuth_bins(&self, azimuth: f64) -> bool {
        self.azimuth_bins.iter().any(|b| b.contains(azimuth))
    }
}

fn invalid_value(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse::<T>().map_err(|_| invalid_value(key, value))
}

fn parse_list<T: std::str::FromStr>(key: &str, value: &str) -> Result<Vec<T>> {
    value
        .split(',')
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| parse_value(key, v))
        .collect()
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid_value(key, value)),
    }
}

/// Parses `min-max` pairs separated by commas, e.g. `0-90, 180-270`.
fn parse_bins(key: &str, value: &str) -> Result<Vec<AzimuthBin>> {
    value
        .split(',')
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|bin| {
            let (min, max) = bin.split_once('-').ok_or_else(|| invalid_value(key, value))?;
            Ok(AzimuthBin::new(
                parse_value(key, min.trim())?,
                parse_value(key, max.trim())?,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.filter_len(), 20);
        assert_eq!(config.azimuth_bins.len(), 4);
    }

    #[test]
    fn embedded_preset_matches_defaults() {
        assert_eq!(Config::from_preset("default").unwrap(), Config::default());
        assert!(matches!(
            Config::from_preset("nope"),
            Err(ConfigError::MissingPreset(_))
        ));
    }

    #[test]
    fn ini_overrides() {
        let text = "[DEFAULT]\n# comment\npvf = 3\nmin_rh=1.5\nazim1 = 240\nazim2 = 320\nnoise_band = 6, 2\ninterpolate = yes\n";
        let config = Config::default().with_ini(text).unwrap();
        assert_eq!(config.pvf, 3);
        assert_eq!(config.min_rh, 1.5);
        assert_eq!(config.azimuth_bins, vec![AzimuthBin::new(240.0, 320.0)]);
        assert_eq!(config.noise_band, (6.0, 2.0));
        assert!(config.interpolate);
    }

    #[test]
    fn azimuth_bin_list() {
        let mut config = Config::default();
        config.set("azimuth_bins", "10-80, 200-250").unwrap();
        assert_eq!(config.azimuth_bins.len(), 2);
        assert!(config.in_azimuth_bins(45.0));
        assert!(!config.in_azimuth_bins(100.0));
        assert!(config.in_azimuth_bins(10.0));
        assert!(!config.in_azimuth_bins(80.0));
    }

    #[test]
    fn default_bins_cover_the_horizon() {
        let config = Config::default();
        for azimuth in 0..360 {
            assert!(config.in_azimuth_bins(azimuth as f64), "{azimuth}");
        }
        let sectors = [0.0, 90.0, 180.0, 270.0].map(|a| {
            config
                .azimuth_bins
                .iter()
                .filter(|b| b.contains(a))
                .count()
        });
        assert_eq!(sectors, [1; 4]);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            Config::default().with_ini("bogus = 1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            Config::default().with_ini("pvf = two"),
            Err(ConfigError::InvalidValue { .. })
        ));

        let mut config = Config::default();
        config.emin = 40.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sampling_interval = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.azimuth_bins = vec![AzimuthBin::new(0.0, 90.0); 5];
        assert!(config.validate().is_err());

        for leap_seconds in [1 << 62, i64::MIN] {
            let config = Config {
                leap_seconds,
                ..Config::default()
            };
            assert!(config.validate().is_err());
        }
        let config = Config {
            leap_seconds: -MAX_LEAP_SECONDS,
            ..Config::default()
        };
        assert!(config.validate().is_ok());

        let config = Config {
            max_height: 0.004,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            noise_band: (2.0, f64::NAN),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
