pub mod region_router;
pub mod request_id;

pub use region_router::{
    GEO_FALLBACK_HEADER, GEO_REGION_HEADER, RegionRouter, RegionRoutingPolicy, RequestTarget,
    RouteDecision,
};
pub use request_id::{RequestId, RequestIdMiddleware};
