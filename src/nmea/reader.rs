use crate::config::Config;
use crate::error::GnssrError;
use crate::nmea::interpolation::interpolate_elevation;
use crate::nmea::sentence::{Gsv, Sentence};
use crate::track::{Fix, TrackSet};
use log::{debug, info, trace};
use std::fs;
use std::path::Path;

/// Talker whose satellites-in-view are read (GPS, PRN 1..32)
const GSV_TALKER: &str = "GP";
/// Talkers accepted for the time and date sentences
const TIME_TALKERS: [&str; 2] = ["GP", "GN"];

/// Counters collected while reading one log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    /// Non-blank lines seen
    pub lines: usize,
    /// Lines that did not contribute to any track
    pub skipped: usize,
    /// Fixes appended to tracks
    pub fixes: usize,
    /// Blocks closed by a date sentence
    pub blocks: usize,
}

/// Line-by-line state machine turning a receiver log into per-satellite tracks.
///
/// A block opens with a time sentence (GGA), collects satellites-in-view parts (GSV), and is
/// closed by a date sentence (RMC) which stamps every pending fix with its calendar date.
#[derive(Debug, Default)]
pub struct LogReader {
    utc_seconds: f64,
    in_block: bool,
    pending: Vec<Fix>,
    tracks: TrackSet,
    stats: ReaderStats,
}

impl LogReader {
    pub fn new() -> LogReader {
        LogReader::default()
    }

    /// Consumes one line. Malformed or irrelevant lines are counted and skipped.
    pub fn feed_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        self.stats.lines += 1;

        let sentence = match line.parse::<Sentence>() {
            Ok(s) => s,
            Err(e) => {
                trace!("line {}: {e}", self.stats.lines);
                self.stats.skipped += 1;
                return;
            }
        };

        let used = match sentence {
            Sentence::Gga(gga) if TIME_TALKERS.contains(&gga.talker.as_str()) => {
                self.utc_seconds = gga.utc_seconds;
                self.in_block = true;
                true
            }
            Sentence::Gsv(gsv) if gsv.talker == GSV_TALKER && self.in_block => {
                self.add_satellites(&gsv);
                true
            }
            Sentence::Rmc(rmc) if TIME_TALKERS.contains(&rmc.talker.as_str()) => {
                self.close_block(Some(rmc.date))
            }
            _ => false,
        };
        if !used {
            trace!("line {}: sentence not used", self.stats.lines);
            self.stats.skipped += 1;
        }
    }

    fn add_satellites(&mut self, gsv: &Gsv) {
        let block = self.stats.blocks;
        let utc_seconds = self.utc_seconds;
        self.pending
            .extend(gsv.satellites.iter().map(|sat| Fix {
                block,
                prn: sat.prn,
                utc_seconds,
                date: None,
                elevation: sat.elevation,
                azimuth: sat.azimuth,
                snr: sat.snr,
            }));
    }

    /// Moves the pending fixes into their tracks. Returns `false` if there was nothing to close.
    fn close_block(&mut self, date: Option<chrono::NaiveDate>) -> bool {
        if self.pending.is_empty() {
            return false;
        }
        for mut fix in self.pending.drain(..) {
            fix.date = date;
            if self.tracks.push(fix) {
                self.stats.fixes += 1;
            }
        }
        self.stats.blocks += 1;
        self.in_block = false;
        true
    }

    /// Ends the log. Fixes of a block that was never dated keep `date = None`.
    pub fn finish(mut self) -> (TrackSet, ReaderStats) {
        if !self.pending.is_empty() {
            debug!(
                "{} fixes at end of log without a date sentence",
                self.pending.len()
            );
            for fix in self.pending.drain(..) {
                if self.tracks.push(fix) {
                    self.stats.fixes += 1;
                }
            }
        }
        (self.tracks, self.stats)
    }
}

/// Reads a whole receiver log from text, applying the elevation interpolation pass if the
/// configuration asks for it.
pub fn read_log(text: &str, config: &Config) -> TrackSet {
    let mut reader = LogReader::new();
    for line in text.lines() {
        reader.feed_line(line);
    }
    let (mut tracks, stats) = reader.finish();
    info!(
        "read {} sentences ({} skipped): {} fixes in {} blocks",
        stats.lines, stats.skipped, stats.fixes, stats.blocks
    );

    if config.interpolate {
        for track in tracks.iter_mut() {
            if interpolate_elevation(track) {
                debug!("PRN {}: elevation re-interpolated", track.prn);
            }
        }
    }
    tracks
}

/// Reads a receiver log from disk. Invalid UTF-8 is replaced rather than rejected, since
/// loggers regularly write partial lines on power loss.
///
/// # Errors
/// Will return `Err` if the file cannot be read.
pub fn read_log_file(path: &Path, config: &Config) -> Result<TrackSet, GnssrError> {
    let bytes = fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    info!("reading {}", path.display());
    Ok(read_log(&text, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nmea::sentence::{checksum, Gga, Rmc, SatelliteView};
    use chrono::NaiveDate;

    fn gga(utc_seconds: f64) -> String {
        Sentence::Gga(Gga {
            talker: "GN".to_string(),
            utc_seconds,
        })
        .to_string()
    }

    fn gsv(talker: &str, sats: &[(u8, f64)]) -> String {
        Sentence::Gsv(Gsv {
            talker: talker.to_string(),
            total_messages: 1,
            message_number: 1,
            satellites_in_view: sats.len() as u8,
            satellites: sats
                .iter()
                .map(|&(prn, el)| SatelliteView {
                    prn,
                    elevation: Some(el),
                    azimuth: Some(100.0),
                    snr: Some(40.0),
                })
                .collect(),
            signal_id: None,
        })
        .to_string()
    }

    fn rmc(day: u32) -> String {
        Sentence::Rmc(Rmc {
            talker: "GN".to_string(),
            utc_seconds: None,
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
        })
        .to_string()
    }

    #[test]
    fn blocks_are_dated_by_rmc() {
        let log = [
            gga(10.0),
            gsv("GP", &[(3, 10.0), (7, 20.0)]),
            gsv("GP", &[(9, 30.0)]),
            rmc(1),
            gga(11.0),
            gsv("GP", &[(3, 10.5)]),
            rmc(2),
        ]
        .join("\n");

        let mut reader = LogReader::new();
        log.lines().for_each(|l| reader.feed_line(l));
        let (tracks, stats) = reader.finish();

        assert_eq!(stats.blocks, 2);
        assert_eq!(stats.fixes, 4);
        assert_eq!(stats.skipped, 0);
        let prn3 = tracks.get(3).unwrap();
        assert_eq!(prn3.len(), 2);
        assert_eq!(prn3.fixes[0].date, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(prn3.fixes[1].date, NaiveDate::from_ymd_opt(2024, 5, 2));
        assert_eq!(prn3.fixes[1].utc_seconds, 11.0);
        assert_eq!(prn3.fixes[1].block, 1);
        assert_eq!(tracks.get(9).unwrap().fixes[0].elevation, Some(30.0));
    }

    #[test]
    fn gsv_needs_open_block_and_gps_talker() {
        let log = [
            gsv("GP", &[(3, 10.0)]),
            gga(10.0),
            gsv("GL", &[(3, 10.0)]),
            gsv("GP", &[(4, 10.0)]),
            rmc(1),
            gsv("GP", &[(5, 10.0)]),
        ]
        .join("\n");

        let tracks = read_log(&log, &Config::default());
        assert!(tracks.get(3).unwrap().is_empty());
        assert_eq!(tracks.get(4).unwrap().len(), 1);
        assert!(tracks.get(5).unwrap().is_empty());
    }

    #[test]
    fn skips_garbage_and_empty_rmc() {
        let bad_checksum = format!("$GPGGA,000010.00,,*{:02X}", checksum("GPGGA,000010.00,,") ^ 1);
        let log = [
            "garbage".to_string(),
            rmc(1),
            bad_checksum,
            "$GPGSV,1,1".to_string(),
            "".to_string(),
        ]
        .join("\n");
        let mut reader = LogReader::new();
        log.lines().for_each(|l| reader.feed_line(l));
        let (tracks, stats) = reader.finish();
        assert_eq!(stats.lines, 4);
        assert_eq!(stats.skipped, 4);
        assert_eq!(stats.blocks, 0);
        assert_eq!(tracks.num_fixes(), 0);
    }

    #[test]
    fn undated_tail_is_flushed() {
        let log = [gga(10.0), gsv("GP", &[(3, 10.0)])].join("\n");
        let tracks = read_log(&log, &Config::default());
        let fixes = &tracks.get(3).unwrap().fixes;
        assert_eq!(fixes.len(), 1);
        assert_eq!(fixes[0].date, None);
        assert_eq!(fixes[0].utc_seconds, 10.0);
    }
}
