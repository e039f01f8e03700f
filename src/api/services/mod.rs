pub mod geo;
pub mod health;
pub mod page;

pub use geo::{GeoService, geo_routes};
pub use health::{AppStartTime, HealthResponse, HealthService, health_routes};
pub use page::{PageResponse, PageService, page_routes};
