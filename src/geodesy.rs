/// Mean Earth radius in meters (spherical model).
///
/// Every distance in this crate — alert radius, urgency bands, route
/// corridor width — is expressed in meters under this approximation.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two coordinates in meters (haversine).
///
/// # Properties
/// - `distance_meters(p, p) == 0.0`
/// - Symmetric in its arguments
/// - Finite for antipodal and pole inputs (the `1 - a` term is clamped
///   against negative rounding before the square root)
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());
    EARTH_RADIUS_M * c
}

/// Test whether `point` lies within `threshold_m` of the segment
/// `seg_start`..`seg_end`.
///
/// # Algorithm
/// 1. Projection parameter `t = dot(point - start, end - start) / |end - start|²`
///    computed in raw degree space (planar approximation)
/// 2. Clamp `t` to [0, 1] so the projection stays on the segment, not its
///    extension
/// 3. Haversine distance from `point` to the clamped projection
///
/// Mixing planar projection with spherical distance is a deliberate
/// simplification: fine at route scale (tens of km), not geodetically exact.
/// A degenerate segment (start == end) falls back to point distance.
pub fn is_near_segment(
    point: (f64, f64),
    seg_start: (f64, f64),
    seg_end: (f64, f64),
    threshold_m: f64,
) -> bool {
    let a = point.0 - seg_start.0;
    let b = point.1 - seg_start.1;
    let c = seg_end.0 - seg_start.0;
    let d = seg_end.1 - seg_start.1;

    let len_sq = c * c + d * d;
    let t = if len_sq != 0.0 {
        ((a * c + b * d) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let proj_lat = seg_start.0 + t * c;
    let proj_lon = seg_start.1 + t * d;

    distance_meters(point.0, point.1, proj_lat, proj_lon) <= threshold_m
}

/// Test whether `point` lies within `threshold_m` of any segment of the
/// polyline. Short-circuits on the first matching segment.
///
/// Fewer than 2 points can never produce a hit; a plain start/end pair with
/// no intermediate routing points is a valid 1-segment route.
pub fn is_near_route(point: (f64, f64), route: &[(f64, f64)], threshold_m: f64) -> bool {
    if route.len() < 2 {
        return false;
    }

    route
        .windows(2)
        .any(|pair| is_near_segment(point, pair[0], pair[1], threshold_m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identical_points_zero_distance() {
        assert_eq!(distance_meters(20.0, 78.0, 20.0, 78.0), 0.0);
        assert_eq!(distance_meters(-45.5, 170.2, -45.5, 170.2), 0.0);
    }

    #[test]
    fn test_symmetry() {
        let d1 = distance_meters(20.0, 78.0, 20.01, 78.01);
        let d2 = distance_meters(20.01, 78.01, 20.0, 78.0);
        assert_relative_eq!(d1, d2, max_relative = 1e-12);
    }

    #[test]
    fn test_known_distance_one_km() {
        // 0.009° of latitude ≈ 1000m at the equator
        let d = distance_meters(0.0, 0.0, 0.009, 0.0);
        assert!(
            (d - 1000.0).abs() < 50.0,
            "Expected ~1000m ±5%, got {}",
            d
        );
    }

    #[test]
    fn test_antipodal_and_pole_finite() {
        let antipodal = distance_meters(0.0, 0.0, 0.0, 180.0);
        assert!(antipodal.is_finite());
        // Half the Earth's circumference
        assert_relative_eq!(
            antipodal,
            std::f64::consts::PI * EARTH_RADIUS_M,
            max_relative = 1e-6
        );

        let pole_to_pole = distance_meters(90.0, 0.0, -90.0, 0.0);
        assert!(pole_to_pole.is_finite());
    }

    #[test]
    fn test_segment_endpoints_always_near() {
        let start = (20.0, 78.0);
        let end = (20.01, 78.0);
        assert!(is_near_segment(start, start, end, 1.0));
        assert!(is_near_segment(end, start, end, 1.0));
    }

    #[test]
    fn test_projection_clamps_at_segment_ends() {
        // Segment runs north from (20.000, 78.000) to (20.001, 78.000)
        // (~111m). Point far beyond the north end, on the same meridian:
        // the perpendicular foot lies on the extension, so the clamped
        // distance is measured to the endpoint, not the infinite line.
        let start = (20.000, 78.0);
        let end = (20.001, 78.0);
        let beyond = (20.005, 78.0); // ~444m past the end

        assert!(!is_near_segment(beyond, start, end, 300.0));
        assert!(is_near_segment(beyond, start, end, 500.0));
    }

    #[test]
    fn test_perpendicular_distance_midspan() {
        // North-south segment, point ~100m east of its midpoint
        let start = (20.000, 78.000);
        let end = (20.010, 78.000);
        let east = (20.005, 78.001); // 0.001° lon ≈ 104m at lat 20

        assert!(is_near_segment(east, start, end, 150.0));
        assert!(!is_near_segment(east, start, end, 50.0));
    }

    #[test]
    fn test_degenerate_segment() {
        let p = (20.0, 78.0);
        assert!(is_near_segment(p, p, p, 1.0));
        assert!(!is_near_segment((20.01, 78.0), p, p, 100.0));
    }

    #[test]
    fn test_route_requires_two_points() {
        assert!(!is_near_route((20.0, 78.0), &[], 1000.0));
        assert!(!is_near_route((20.0, 78.0), &[(20.0, 78.0)], 1000.0));
    }

    #[test]
    fn test_route_short_circuit_multi_segment() {
        let route = vec![
            (20.000, 78.000),
            (20.010, 78.000),
            (20.010, 78.010),
        ];
        // Near the second segment only
        assert!(is_near_route((20.011, 78.005), &route, 200.0));
        // Far from both
        assert!(!is_near_route((20.050, 78.050), &route, 200.0));
    }
}
