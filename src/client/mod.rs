//! Client layer for the detect API
//!
//! What a browser-side geo provider does, for CLI and service callers: ask
//! the edge's `/api/geo/detect` once, persist the answer in the client-tier
//! cache, and serve it from there until it expires.
//!
//! ```text
//! location() → ClientGeoCache (fresh) ──→ hit
//!                                  └→ GET /api/geo/detect → persist
//! ```

mod geo_client;

pub use geo_client::{ClientLocation, GeoClient, LocationSource};
