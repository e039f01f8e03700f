//! Geo caches
//!
//! - Server tier: process-local, short TTL (`moka` bounded or `memory` with an injectable clock)
//! - Client tier: persisted key-value store, long TTL
//!
//! Both implement [`GeoCache`] and expire independently.

pub mod client;
pub mod memory;
pub mod moka;
pub mod traits;

pub use self::client::{ClientGeoCache, FileStore, KeyValueStore, MemoryStore, SESSION_KEY};
pub use self::memory::MemoryGeoCache;
pub use self::moka::MokaGeoCache;
pub use self::traits::{CacheEntry, FALLBACK_KEY, GeoCache, ttl_from_secs};
