//! Receiver log parsing: typed NMEA sentences and the reader that groups them into tracks.
pub mod interpolation;
pub mod reader;
pub mod sentence;
