//! Per-satellite time series of parsed fixes.
use crate::utils::constants::{MAX_GPS_PRN, SECONDS_PER_DAY};
use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Utc};
use serde::Serialize;

/// One satellite observation from one epoch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fix {
    /// Epoch block this fix belongs to (incremented by every date sentence)
    pub block: usize,
    pub prn: u8,
    /// UTC time of day, seconds
    pub utc_seconds: f64,
    /// `None` if no date sentence closed the block
    pub date: Option<NaiveDate>,
    pub elevation: Option<f64>,
    pub azimuth: Option<f64>,
    pub snr: Option<f64>,
}

impl Fix {
    /// Seconds since 0001-01-01 if the date is known, otherwise seconds of day.
    pub fn epoch_seconds(&self) -> f64 {
        match self.date {
            Some(date) => f64::from(date.num_days_from_ce()) * SECONDS_PER_DAY + self.utc_seconds,
            None => self.utc_seconds,
        }
    }

    /// Receiver time stamp corrected by `leap_seconds`, if the date is known and the result
    /// is representable.
    pub fn utc_datetime(&self, leap_seconds: i64) -> Option<DateTime<Utc>> {
        let midnight = self.date?.and_hms_opt(0, 0, 0)?;
        let millis = (self.utc_seconds * 1000.0).round() as i64;
        let stamp = midnight
            .checked_add_signed(TimeDelta::try_milliseconds(millis)?)?
            .checked_sub_signed(TimeDelta::try_seconds(leap_seconds)?)?;
        Some(stamp.and_utc())
    }
}

/// Fixes of one satellite, in acquisition order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Track {
    pub prn: u8,
    pub fixes: Vec<Fix>,
}

impl Track {
    pub fn new(prn: u8) -> Track {
        Track { prn, fixes: vec![] }
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    pub(crate) fn push(&mut self, fix: Fix) {
        debug_assert_eq!(fix.prn, self.prn);
        self.fixes.push(fix);
    }
}

/// One track per GPS PRN `1..=32`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSet {
    tracks: Vec<Track>,
}

impl Default for TrackSet {
    fn default() -> Self {
        TrackSet::new()
    }
}

impl TrackSet {
    pub fn new() -> TrackSet {
        TrackSet {
            tracks: (1..=MAX_GPS_PRN).map(Track::new).collect(),
        }
    }

    pub fn get(&self, prn: u8) -> Option<&Track> {
        if prn == 0 {
            return None;
        }
        self.tracks.get(prn as usize - 1)
    }

    pub(crate) fn get_mut(&mut self, prn: u8) -> Option<&mut Track> {
        if prn == 0 {
            return None;
        }
        self.tracks.get_mut(prn as usize - 1)
    }

    /// Appends a fix to its satellite's track. Fixes with a PRN outside `1..=32` are ignored.
    pub fn push(&mut self, fix: Fix) -> bool {
        match self.get_mut(fix.prn) {
            Some(track) => {
                track.push(fix);
                true
            }
            None => false,
        }
    }

    /// Tracks in PRN order, including empty ones.
    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Track> {
        self.tracks.iter_mut()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn num_fixes(&self) -> usize {
        self.tracks.iter().map(Track::len).sum()
    }
}
