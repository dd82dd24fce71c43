pub(crate) const LIGHTSPEED: f64 = 299_792_458.0;
pub(crate) const GPS_L1_FREQUENCY: f64 = 1_575.42e6;
pub const GPS_L1_WAVELENGTH: f64 = LIGHTSPEED / GPS_L1_FREQUENCY;

pub(crate) const MAX_GPS_PRN: u8 = 32;
pub(crate) const SECONDS_PER_DAY: f64 = 86_400.0;
pub(crate) const SECONDS_PER_HOUR: i32 = 3_600;
