//! Service layer
//!
//! Geo resolution shared by the HTTP edge, the detect API and the CLI.

pub mod geoip;
mod resolution;

pub use geoip::{
    ExternalApiLookup, GeoLookup, RetryPolicy, UpstreamGeo, UpstreamGeoResolver, parse_response,
};
pub use resolution::{GeoResolutionService, Resolution, ResolutionSource};
