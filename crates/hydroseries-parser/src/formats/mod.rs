mod common;
mod precipitation;
mod temperature;

pub use precipitation::PrecipitationMatrixParser;
pub use temperature::TemperatureMatrixParser;
