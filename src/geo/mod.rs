//! Geo domain types
//!
//! - `classifier`: country code → region / language / Europe flag
//! - `record`: the resolved [`GeoRecord`] value

pub mod classifier;
pub mod record;

pub use classifier::{
    Classification, EUROPEAN_COUNTRIES, GeoClassifier, Language, Region, RegionCategory,
    normalize_country_code,
};
pub use record::{DEFAULT_COUNTRY_CODE, GeoRecord, LOCAL_IP, UNKNOWN_IP};
