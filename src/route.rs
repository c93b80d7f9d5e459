use crate::geodesy::{distance_meters, is_near_route};
use crate::hazard::{Hazard, HazardSnapshot};
use geo::{Coord, LineString};

/// Default corridor half-width for route hazard filtering, meters.
pub const DEFAULT_CORRIDOR_M: f64 = 300.0;

/// An ordered driving-route polyline from the routing provider.
///
/// Stored as a `geo::LineString` with `x = lon, y = lat`. A plain start/end
/// pair (no intermediate routing points) is a valid degenerate route; fewer
/// than 2 points disables corridor filtering entirely. Never mutated — a new
/// route means a new `RoutePath`.
#[derive(Clone, Debug)]
pub struct RoutePath {
    line: LineString<f64>,
}

impl RoutePath {
    /// Build from (lat, lon) pairs in travel order.
    pub fn from_latlon(points: &[(f64, f64)]) -> Self {
        let coords: Vec<Coord<f64>> = points
            .iter()
            .map(|&(lat, lon)| Coord { x: lon, y: lat })
            .collect();
        RoutePath {
            line: LineString::new(coords),
        }
    }

    /// Straight-line fallback when the routing provider is unavailable.
    pub fn straight(start: (f64, f64), end: (f64, f64)) -> Self {
        Self::from_latlon(&[start, end])
    }

    pub fn point_count(&self) -> usize {
        self.line.0.len()
    }

    /// Route points back in (lat, lon) order.
    pub fn latlon_points(&self) -> Vec<(f64, f64)> {
        self.line.0.iter().map(|c| (c.y, c.x)).collect()
    }

    /// First route point, if any.
    pub fn start(&self) -> Option<(f64, f64)> {
        self.line.0.first().map(|c| (c.y, c.x))
    }

    /// Total route length: sum of haversine segment lengths, meters.
    pub fn length_m(&self) -> f64 {
        self.line
            .0
            .windows(2)
            .map(|pair| distance_meters(pair[0].y, pair[0].x, pair[1].y, pair[1].x))
            .sum()
    }

    /// Whether `point` lies within `threshold_m` of any route segment.
    pub fn is_near(&self, point: (f64, f64), threshold_m: f64) -> bool {
        let latlon = self.latlon_points();
        is_near_route(point, &latlon, threshold_m)
    }
}

/// Filter a hazard snapshot down to the hazards inside the route corridor,
/// sorted ascending by distance from the route's start point.
///
/// The sort key is deliberately the haversine distance to the start — not
/// the minimum distance to the polyline — so hazards appear in rough travel
/// order from the origin. Fewer than 2 route points or no qualifying hazards
/// yields an empty list, never an error.
pub fn hazards_on_route(
    snapshot: &HazardSnapshot,
    route: &RoutePath,
    threshold_m: f64,
) -> Vec<Hazard> {
    let start = match route.start() {
        Some(s) if route.point_count() >= 2 => s,
        _ => return Vec::new(),
    };

    let latlon = route.latlon_points();

    let mut on_route: Vec<(Hazard, f64)> = snapshot
        .located()
        .filter(|&(_, coords)| is_near_route(coords, &latlon, threshold_m))
        .map(|(hazard, (lat, lon))| {
            let from_start = distance_meters(start.0, start.1, lat, lon);
            (hazard.clone(), from_start)
        })
        .collect();

    on_route.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    on_route.into_iter().map(|(h, _)| h).collect()
}
