//! GeoIP 服务模块
//!
//! - `provider`: lookup trait + timeout/retry wrapper
//! - `external_api`: ipapi.co style HTTP lookup

mod external_api;
mod provider;

pub use external_api::{ExternalApiLookup, parse_response};
pub use provider::{GeoLookup, RetryPolicy, UpstreamGeo, UpstreamGeoResolver};
