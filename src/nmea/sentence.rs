//! Typed NMEA 0183 sentences used by the fix parser.
//!
//! Only the three sentence kinds the retrieval needs are modelled: `GGA` (time of the
//! upcoming satellite batch), `GSV` (satellites in view) and `RMC` (date, closes an epoch).
//! Every kind round-trips through [`Display`](fmt::Display), which emits a checksummed line.
use crate::utils::constants::MAX_GPS_PRN;
use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Satellites carried by one GSV part
pub const SATELLITES_PER_GSV: usize = 4;
const GSV_HEADER_FIELDS: usize = 4;
const RMC_DATE_FIELD: usize = 9;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SentenceError {
    #[error("empty line")]
    Empty,

    /// Line does not start with `$`
    #[error("missing '$' start delimiter")]
    MissingStart,

    #[error("checksum mismatch: expected {expected:02X}, found {found:02X}")]
    Checksum { expected: u8, found: u8 },

    /// Well formed, but not a sentence kind this crate reads
    #[error("unsupported sentence '{0}'")]
    Unsupported(String),

    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("invalid value '{value}' in field '{field}'")]
    InvalidField { field: &'static str, value: String },
}

type Result<T> = std::result::Result<T, SentenceError>;

#[derive(Debug, Clone, PartialEq)]
pub enum Sentence {
    Gga(Gga),
    Gsv(Gsv),
    Rmc(Rmc),
}

/// Fix data; only the time of day is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct Gga {
    pub talker: String,
    /// UTC time of day, seconds
    pub utc_seconds: f64,
}

/// One part of a (possibly multi-part) satellites-in-view report.
#[derive(Debug, Clone, PartialEq)]
pub struct Gsv {
    pub talker: String,
    pub total_messages: u8,
    pub message_number: u8,
    pub satellites_in_view: u8,
    pub satellites: Vec<SatelliteView>,
    /// NMEA 4.10 signal id trailing the satellite groups
    pub signal_id: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SatelliteView {
    pub prn: u8,
    /// Degrees
    pub elevation: Option<f64>,
    /// Degrees, true north
    pub azimuth: Option<f64>,
    /// C/N0, dB-Hz
    pub snr: Option<f64>,
}

/// Recommended minimum data; only time and date are kept.
#[derive(Debug, Clone, PartialEq)]
pub struct Rmc {
    pub talker: String,
    pub utc_seconds: Option<f64>,
    pub date: NaiveDate,
}

/// XOR of every byte of the sentence body (between `$` and `*`).
pub fn checksum(body: &str) -> u8 {
    body.bytes().fold(0, |acc, b| acc ^ b)
}

impl FromStr for Sentence {
    type Err = SentenceError;

    fn from_str(line: &str) -> Result<Sentence> {
        let line = line.trim();
        if line.is_empty() {
            return Err(SentenceError::Empty);
        }
        let line = line.strip_prefix('$').ok_or(SentenceError::MissingStart)?;

        let body = match line.split_once('*') {
            Some((body, sum)) => {
                let sum = sum.trim();
                let found = u8::from_str_radix(sum, 16).map_err(|_| SentenceError::InvalidField {
                    field: "checksum",
                    value: sum.to_string(),
                })?;
                let expected = checksum(body);
                if expected != found {
                    return Err(SentenceError::Checksum { expected, found });
                }
                body
            }
            None => line,
        };

        let fields: Vec<&str> = body.split(',').collect();
        let header = fields[0];
        if header.len() != 5 || !header.is_ascii() {
            return Err(SentenceError::Unsupported(header.to_string()));
        }
        let (talker, kind) = header.split_at(2);
        let talker = talker.to_string();
        match kind {
            "GGA" => Ok(Sentence::Gga(Gga {
                talker,
                utc_seconds: parse_utc(required(&fields, 1, "utc")?)?,
            })),
            "GSV" => parse_gsv(talker, &fields).map(Sentence::Gsv),
            "RMC" => {
                let utc = fields.get(1).copied().unwrap_or("");
                Ok(Sentence::Rmc(Rmc {
                    talker,
                    utc_seconds: if utc.is_empty() { None } else { Some(parse_utc(utc)?) },
                    date: parse_date(required(&fields, RMC_DATE_FIELD, "date")?)?,
                }))
            }
            _ => Err(SentenceError::Unsupported(header.to_string())),
        }
    }
}

fn required<'a>(fields: &[&'a str], idx: usize, name: &'static str) -> Result<&'a str> {
    match fields.get(idx) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(SentenceError::MissingField(name)),
    }
}

fn invalid(field: &'static str, value: &str) -> SentenceError {
    SentenceError::InvalidField {
        field,
        value: value.to_string(),
    }
}

/// `hhmmss[.ss]` to seconds of day.
fn parse_utc(value: &str) -> Result<f64> {
    if value.len() < 6 || !value.is_char_boundary(2) || !value.is_char_boundary(4) {
        return Err(invalid("utc", value));
    }
    let hours = value[0..2].parse::<u32>().map_err(|_| invalid("utc", value))?;
    let minutes = value[2..4].parse::<u32>().map_err(|_| invalid("utc", value))?;
    let seconds = value[4..].parse::<f64>().map_err(|_| invalid("utc", value))?;
    if hours > 23 || minutes > 59 || !(0.0..61.0).contains(&seconds) {
        return Err(invalid("utc", value));
    }
    Ok(f64::from(hours * 3600 + minutes * 60) + seconds)
}

/// `ddmmyy` to a calendar date in 2000-2099.
fn parse_date(value: &str) -> Result<NaiveDate> {
    if value.len() != 6 || !value.is_ascii() {
        return Err(invalid("date", value));
    }
    let day = value[0..2].parse::<u32>().map_err(|_| invalid("date", value))?;
    let month = value[2..4].parse::<u32>().map_err(|_| invalid("date", value))?;
    let year = value[4..6].parse::<i32>().map_err(|_| invalid("date", value))?;
    NaiveDate::from_ymd_opt(2000 + year, month, day).ok_or_else(|| invalid("date", value))
}

fn parse_header_number(fields: &[&str], idx: usize, name: &'static str) -> Result<u8> {
    let value = required(fields, idx, name)?;
    value.parse::<u8>().map_err(|_| invalid(name, value))
}

/// Non-finite readings are kept as missing rather than as NaN.
fn parse_measurement(value: &str) -> Option<Option<f64>> {
    let v = value.parse::<f64>().ok()?;
    Some(if v.is_finite() { Some(v) } else { None })
}

fn parse_gsv(talker: String, fields: &[&str]) -> Result<Gsv> {
    let total_messages = parse_header_number(fields, 1, "total_messages")?;
    let message_number = parse_header_number(fields, 2, "message_number")?;
    let satellites_in_view = parse_header_number(fields, 3, "satellites_in_view")?;

    let mut satellites = Vec::with_capacity(SATELLITES_PER_GSV);
    let mut signal_id = None;
    let groups = fields.get(GSV_HEADER_FIELDS..).unwrap_or(&[]);
    for group in groups.chunks(4) {
        // A short group is whatever follows the satellites (the signal id, or the checksum
        // position on receivers that pad it into the id field).
        if let [id, elevation, azimuth, snr] = group {
            if let Some(view) = parse_satellite(id, elevation, azimuth, snr) {
                satellites.push(view);
            }
        } else {
            if let [id] = group {
                signal_id = id.parse::<u8>().ok();
            }
            break;
        }
    }

    Ok(Gsv {
        talker,
        total_messages,
        message_number,
        satellites_in_view,
        satellites,
        signal_id,
    })
}

/// A group is kept only with a PRN in `1..=32` and all three readings present and numeric.
fn parse_satellite(id: &str, elevation: &str, azimuth: &str, snr: &str) -> Option<SatelliteView> {
    if elevation.is_empty() || azimuth.is_empty() || snr.is_empty() {
        return None;
    }
    let prn = id.parse::<u8>().ok().filter(|p| (1..=MAX_GPS_PRN).contains(p))?;
    Some(SatelliteView {
        prn,
        elevation: parse_measurement(elevation)?,
        azimuth: parse_measurement(azimuth)?,
        snr: parse_measurement(snr)?,
    })
}

fn format_utc(seconds: f64) -> String {
    let hours = (seconds / 3600.0).floor();
    let minutes = ((seconds - hours * 3600.0) / 60.0).floor();
    let rest = seconds - hours * 3600.0 - minutes * 60.0;
    format!("{:02}{:02}{:05.2}", hours as u32, minutes as u32, rest)
}

fn format_measurement(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = match self {
            Sentence::Gga(gga) => {
                format!("{}GGA,{},,,,,,,,,,,,,", gga.talker, format_utc(gga.utc_seconds))
            }
            Sentence::Gsv(gsv) => {
                let mut body = format!(
                    "{}GSV,{},{},{:02}",
                    gsv.talker, gsv.total_messages, gsv.message_number, gsv.satellites_in_view
                );
                for sat in &gsv.satellites {
                    body.push_str(&format!(
                        ",{:02},{},{},{}",
                        sat.prn,
                        format_measurement(sat.elevation),
                        format_measurement(sat.azimuth),
                        format_measurement(sat.snr)
                    ));
                }
                if let Some(id) = gsv.signal_id {
                    body.push_str(&format!(",{id}"));
                }
                body
            }
            Sentence::Rmc(rmc) => format!(
                "{}RMC,{},A,,,,,,,{:02}{:02}{:02},,,A",
                rmc.talker,
                rmc.utc_seconds.map(format_utc).unwrap_or_default(),
                rmc.date.day(),
                rmc.date.month(),
                rmc.date.year() % 100
            ),
        };
        write!(f, "${}*{:02X}", body, checksum(&body))
    }
}
