//! GNSS interferometric reflectometry: reflector heights from the SNR of receiver logs.
//!
//! A log is read into one [`track::Track`] per GPS satellite, each track is searched for a
//! usable rising or setting arc, and the arc's detrended SNR is analysed with a Lomb-Scargle
//! periodogram against sine of elevation. The dominant frequency is the height of the
//! reflecting surface below the antenna.
use crate::config::Config;
use crate::error::GnssrError;
use crate::retrieval::gnssir::par_retrieve_heights;
use crate::retrieval::structs::HeightRetrieval;
use log::info;
use std::path::Path;

pub mod config;
pub mod error;
pub mod nmea;
pub mod report;
pub mod retrieval;
pub mod track;
pub mod utils;

#[cfg(feature = "python")]
mod python;

/// Retrieves reflector heights from the text of one receiver log.
///
/// # Errors
/// Will return `Err` if the configuration is invalid.
pub fn process_log(text: &str, config: &Config) -> Result<Vec<HeightRetrieval>, GnssrError> {
    config.validate()?;
    let tracks = nmea::reader::read_log(text, config);
    let retrievals = par_retrieve_heights(&tracks, config)?;
    info!("{} reflector heights retrieved", retrievals.len());
    Ok(retrievals)
}

/// Retrieves reflector heights from one receiver log on disk.
///
/// # Errors
/// Will return `Err` if the configuration is invalid or the file cannot be read.
pub fn process_log_file(path: &Path, config: &Config) -> Result<Vec<HeightRetrieval>, GnssrError> {
    config.validate()?;
    let tracks = nmea::reader::read_log_file(path, config)?;
    let retrievals = par_retrieve_heights(&tracks, config)?;
    info!(
        "{}: {} reflector heights retrieved",
        path.display(),
        retrievals.len()
    );
    Ok(retrievals)
}
