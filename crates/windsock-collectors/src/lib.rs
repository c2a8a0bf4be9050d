pub mod error;
pub mod holfuy;
pub mod meteoswiss;
pub mod source;

pub use error::CollectorError;
pub use holfuy::HolfuyCollector;
pub use meteoswiss::MeteoSwissCollector;
pub use source::{kmh_to_ms, WeatherSource};
