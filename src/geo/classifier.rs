//! Country code → region bucket classification
//!
//! Pure and total: every input maps to exactly one [`Region`]. Single-country
//! buckets are checked before the Europe set so no code is double-counted.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString, IntoStaticStr};

/// EU-27 + EEA (IS, LI, NO) + GB + CH
pub const EUROPEAN_COUNTRIES: [&str; 32] = [
    "AT", "BE", "BG", "HR", "CY", "CZ", "DK", "EE", "FI", "FR", "DE", "GR", "HU", "IE", "IT",
    "LV", "LT", "LU", "MT", "NL", "PL", "PT", "RO", "SK", "SI", "ES", "SE", // EU
    "IS", "LI", "NO", // EEA
    "GB", "CH",
];

/// Region bucket used for routing and capability decisions
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    AsRefStr,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Region {
    China,
    Usa,
    India,
    Singapore,
    Europe,
    Other,
}

impl Region {
    pub fn default_language(self) -> Language {
        match self {
            Region::China => Language::Zh,
            _ => Language::En,
        }
    }

    /// Coarse bucket used by the regional client selector (database / identity backend).
    pub fn category(self) -> RegionCategory {
        match self {
            Region::China => RegionCategory::China,
            _ => RegionCategory::Overseas,
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Language {
    Zh,
    En,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RegionCategory {
    China,
    Overseas,
}

/// Everything derived from a country code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub region: Region,
    pub language: Language,
    pub is_europe: bool,
}

/// Stateless classifier, kept as a type so call sites read `GeoClassifier::classify`.
pub struct GeoClassifier;

impl GeoClassifier {
    pub fn classify(country_code: &str) -> Classification {
        let region = Self::region_of(country_code);
        Classification {
            region,
            language: region.default_language(),
            is_europe: region == Region::Europe,
        }
    }

    pub fn region_of(country_code: &str) -> Region {
        let code = normalize_country_code(country_code);
        match code.as_str() {
            "CN" => Region::China,
            "US" => Region::Usa,
            "IN" => Region::India,
            "SG" => Region::Singapore,
            c if EUROPEAN_COUNTRIES.contains(&c) => Region::Europe,
            _ => Region::Other,
        }
    }
}

/// Trim and uppercase a country code
#[inline]
pub fn normalize_country_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
