//! Reflector height retrieval: arc selection, SNR conditioning, Lomb-Scargle periodogram
//! and peak scoring.
pub mod arcs;
pub mod conditioning;
pub mod error;
pub mod gnssir;
pub mod lombscargle;
pub mod scoring;
pub mod structs;
