//! The canonical resolved-location value

use serde::{Deserialize, Serialize};

use super::classifier::{GeoClassifier, Language, Region, RegionCategory, normalize_country_code};

pub const DEFAULT_COUNTRY_CODE: &str = "US";
pub const LOCAL_IP: &str = "127.0.0.1";
pub const UNKNOWN_IP: &str = "unknown";

/// Resolved location for one client.
///
/// `region`, `language` and `is_europe` are private and only ever produced by
/// [`GeoClassifier`] from `country_code`, including on deserialization, so a
/// record can never disagree with its own country code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "GeoRecordWire")]
pub struct GeoRecord {
    ip: String,
    country_code: String,
    country_name: String,
    region: Region,
    language: Language,
    is_europe: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timezone: Option<String>,
}

/// Untrusted on-the-wire shape; derived fields are accepted and discarded.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeoRecordWire {
    #[serde(default)]
    ip: String,
    country_code: String,
    #[serde(default)]
    country_name: String,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    timezone: Option<String>,
}

impl From<GeoRecordWire> for GeoRecord {
    fn from(wire: GeoRecordWire) -> Self {
        let mut record = GeoRecord::new(wire.ip, &wire.country_code);
        record.country_name = wire.country_name;
        record.city = wire.city;
        record.currency = wire.currency;
        record.timezone = wire.timezone;
        record
    }
}

impl GeoRecord {
    /// Build a record for `ip` in `country_code`; an empty code falls back to US.
    pub fn new(ip: impl Into<String>, country_code: &str) -> Self {
        let mut code = normalize_country_code(country_code);
        if code.is_empty() {
            code = DEFAULT_COUNTRY_CODE.to_string();
        }
        let classification = GeoClassifier::classify(&code);
        Self {
            ip: ip.into(),
            country_code: code,
            country_name: String::new(),
            region: classification.region,
            language: classification.language,
            is_europe: classification.is_europe,
            city: None,
            currency: None,
            timezone: None,
        }
    }

    /// Fixed record served to loopback callers (development mode)
    pub fn local_default() -> Self {
        Self::us_default(LOCAL_IP, "Local Development")
    }

    /// Fixed record served when nothing better is known
    pub fn degraded_default() -> Self {
        Self::us_default(UNKNOWN_IP, "Unknown")
    }

    fn us_default(ip: &str, city: &str) -> Self {
        Self::new(ip, DEFAULT_COUNTRY_CODE)
            .with_country_name("United States")
            .with_city(Some(city.to_string()))
            .with_currency(Some("USD".to_string()))
            .with_timezone(Some("America/New_York".to_string()))
    }

    pub fn with_country_name(mut self, name: impl Into<String>) -> Self {
        self.country_name = name.into();
        self
    }

    pub fn with_city(mut self, city: Option<String>) -> Self {
        self.city = city.filter(|c| !c.is_empty());
        self
    }

    pub fn with_currency(mut self, currency: Option<String>) -> Self {
        self.currency = currency.filter(|c| !c.is_empty());
        self
    }

    pub fn with_timezone(mut self, timezone: Option<String>) -> Self {
        self.timezone = timezone.filter(|t| !t.is_empty());
        self
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    pub fn country_name(&self) -> &str {
        &self.country_name
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn is_europe(&self) -> bool {
        self.is_europe
    }

    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    pub fn currency(&self) -> Option<&str> {
        self.currency.as_deref()
    }

    pub fn timezone(&self) -> Option<&str> {
        self.timezone.as_deref()
    }

    pub fn region_category(&self) -> RegionCategory {
        self.region.category()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_derives_from_country() {
        let record = GeoRecord::new("1.2.3.4", "cn");
        assert_eq!(record.country_code(), "CN");
        assert_eq!(record.region(), Region::China);
        assert_eq!(record.language(), Language::Zh);
        assert!(!record.is_europe());
        assert_eq!(record.region_category(), RegionCategory::China);
    }

    #[test]
    fn test_empty_country_defaults_to_us() {
        let record = GeoRecord::new("1.2.3.4", "  ");
        assert_eq!(record.country_code(), "US");
        assert_eq!(record.region(), Region::Usa);
    }

    #[test]
    fn test_defaults() {
        let local = GeoRecord::local_default();
        assert_eq!(local.ip(), LOCAL_IP);
        assert_eq!(local.country_code(), "US");
        assert_eq!(local.city(), Some("Local Development"));

        let degraded = GeoRecord::degraded_default();
        assert_eq!(degraded.ip(), UNKNOWN_IP);
        assert_eq!(degraded.region(), Region::Usa);
        assert_eq!(degraded.timezone(), Some("America/New_York"));
    }

    #[test]
    fn test_serialize_shape() {
        let record = GeoRecord::new("5.6.7.8", "FR").with_country_name("France");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["countryCode"], "FR");
        assert_eq!(json["countryName"], "France");
        assert_eq!(json["region"], "europe");
        assert_eq!(json["language"], "en");
        assert_eq!(json["isEurope"], true);
        assert!(json.get("city").is_none());
    }

    #[test]
    fn test_deserialize_rederives_region() {
        // A tampered payload claims CN is in europe; the derived fields are ignored.
        let json = r#"{"ip":"1.1.1.1","countryCode":"CN","countryName":"China",
            "region":"europe","language":"en","isEurope":true}"#;
        let record: GeoRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.region(), Region::China);
        assert_eq!(record.language(), Language::Zh);
        assert!(!record.is_europe());
    }

    #[test]
    fn test_deserialize_requires_country_code() {
        let json = r#"{"ip":"1.1.1.1","region":"usa"}"#;
        assert!(serde_json::from_str::<GeoRecord>(json).is_err());
    }
}
