pub mod envelope;
pub mod logger;
pub mod params;
pub mod uploads;
