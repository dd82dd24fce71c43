//! Grouping and export of retrievals for plots and summaries.
use crate::retrieval::structs::HeightRetrieval;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;

/// Quarter of the horizon a retrieval's azimuth falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AzimuthSector {
    North,
    East,
    South,
    West,
}

impl AzimuthSector {
    /// Sector of an azimuth in degrees, after wrapping into `[0, 360)`.
    pub fn from_azimuth(azimuth: f64) -> AzimuthSector {
        match azimuth.rem_euclid(360.0) {
            a if a < 90.0 => AzimuthSector::North,
            a if a < 180.0 => AzimuthSector::East,
            a if a < 270.0 => AzimuthSector::South,
            _ => AzimuthSector::West,
        }
    }
}

impl fmt::Display for AzimuthSector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AzimuthSector::North => "0-90",
            AzimuthSector::East => "90-180",
            AzimuthSector::South => "180-270",
            AzimuthSector::West => "270-360",
        };
        f.pad(name)
    }
}

/// Retrievals grouped by azimuth sector, optionally only those of one (local) day.
pub fn by_sector(
    retrievals: &[HeightRetrieval],
    day: Option<NaiveDate>,
) -> BTreeMap<AzimuthSector, Vec<&HeightRetrieval>> {
    let mut sectors: BTreeMap<AzimuthSector, Vec<&HeightRetrieval>> = BTreeMap::new();
    for r in retrievals
        .iter()
        .filter(|r| day.map_or(true, |d| r.timestamp.date_naive() == d))
    {
        sectors
            .entry(AzimuthSector::from_azimuth(r.azimuth))
            .or_default()
            .push(r);
    }
    sectors
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyMean {
    pub day: NaiveDate,
    /// Meters
    pub mean_height: f64,
    pub count: usize,
}

/// Mean reflector height per local calendar day, in day order.
pub fn daily_means(retrievals: &[HeightRetrieval]) -> Vec<DailyMean> {
    let mut days: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for r in retrievals {
        let entry = days.entry(r.timestamp.date_naive()).or_insert((0.0, 0));
        entry.0 += r.reflector_height;
        entry.1 += 1;
    }
    days.into_iter()
        .map(|(day, (sum, count))| DailyMean {
            day,
            mean_height: sum / count as f64,
            count,
        })
        .collect()
}

/// Writes one CSV row per retrieval, with a header. Spectra are not written.
///
/// # Errors
/// Will return `Err` if a row cannot be written.
pub fn to_csv<W: Write>(writer: W, retrievals: &[HeightRetrieval]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for r in retrievals {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}
