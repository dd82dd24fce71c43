pub mod constants;
pub mod least_squares;
pub mod signal;
