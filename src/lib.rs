//! Geofencing core for the pothole navigation UI: haversine distance,
//! route-corridor filtering, and the proximity alert engine with per-hazard
//! cooldown. Pure computation between the location/report feeds and the
//! rendering layer — no map tiles, no UI.

pub mod alert;
pub mod fetcher;
pub mod geodesy;
pub mod hazard;
pub mod position;
pub mod route;
pub mod spatial;
pub mod tracker;

pub use alert::{AlertConfig, AlertEngine, AlertEvent, NearbyHazard, ProximityUpdate, Urgency};
pub use fetcher::{FetchError, ReportFetcher};
pub use geodesy::{distance_meters, is_near_route, is_near_segment};
pub use hazard::{Hazard, HazardSnapshot, Severity, SeverityBreakdown};
pub use position::{Position, TrackingStatus};
pub use route::{hazards_on_route, RoutePath};
pub use spatial::HazardIndex;
pub use tracker::{run_session, PositionEvent, SessionStats, TrackingSession};
