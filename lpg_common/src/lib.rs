mod luhn;
mod points;

pub use luhn::luhn_valid;
pub use points::{Points, PointsConversionError};
