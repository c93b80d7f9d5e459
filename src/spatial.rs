use crate::geodesy::distance_meters;
use crate::hazard::{Hazard, HazardSnapshot};
use rstar::{RTree, RTreeObject, AABB};

/// Wrapper pairing a hazard with its point envelope for the R-tree.
///
/// Only hazards with usable coordinates are indexed; the rest of the
/// snapshot is still reachable through the snapshot itself.
#[derive(Clone, Debug)]
pub struct SpatialHazard {
    pub hazard: Hazard,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for SpatialHazard {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// R-tree spatial index over one hazard snapshot.
///
/// # Architecture
/// - Built fresh from each snapshot (bulk load), never mutated in place —
///   refresh swaps the whole index along with the snapshot
/// - Radius queries run an envelope prefilter in degree space, then an
///   exact haversine filter
///
/// # Distance prefilter
/// The query envelope converts the radius with 1 degree of latitude ≈
/// 111,000 meters. A longitude degree shrinks by cos(lat), so the east-west
/// half-width is widened by 1/cos(lat) (clamped near the poles) — without
/// that, hazards near the east-west edge of the radius sit outside the
/// envelope and never reach the exact filter. The envelope over-selects;
/// the haversine pass discards the excess.
pub struct HazardIndex {
    tree: RTree<SpatialHazard>,
    indexed_count: usize,
}

impl HazardIndex {
    pub fn new() -> Self {
        HazardIndex {
            tree: RTree::new(),
            indexed_count: 0,
        }
    }

    /// Build the index from a snapshot. Hazards without coordinates are
    /// skipped silently.
    pub fn from_snapshot(snapshot: &HazardSnapshot) -> Self {
        let spatial: Vec<SpatialHazard> = snapshot
            .located()
            .map(|(hazard, (lat, lon))| SpatialHazard {
                hazard: hazard.clone(),
                envelope: AABB::from_point([lon, lat]),
            })
            .collect();

        let indexed_count = spatial.len();

        HazardIndex {
            tree: RTree::bulk_load(spatial),
            indexed_count,
        }
    }

    /// All hazards within `radius_m` of `point`, paired with their exact
    /// distance, sorted ascending so the closest comes first.
    pub fn within_radius(&self, point: (f64, f64), radius_m: f64) -> Vec<(&Hazard, f64)> {
        let lat_half_deg = radius_m / 111_000.0;
        let (lat, lon) = point;
        // Longitude degrees shrink toward the poles; clamp the scale so a
        // query at extreme latitude degrades to a wide envelope, not a
        // division blowup.
        let lon_scale = lat.to_radians().cos().abs().max(0.01);
        let lon_half_deg = lat_half_deg / lon_scale;
        let envelope = AABB::from_corners(
            [lon - lon_half_deg, lat - lat_half_deg],
            [lon + lon_half_deg, lat + lat_half_deg],
        );

        let mut hits: Vec<(&Hazard, f64)> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .filter_map(|sh| {
                let (hlat, hlon) = sh.hazard.coords()?;
                let dist = distance_meters(lat, lon, hlat, hlon);
                (dist <= radius_m).then_some((&sh.hazard, dist))
            })
            .collect();

        hits.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        hits
    }

    pub fn indexed_count(&self) -> usize {
        self.indexed_count
    }
}

impl Default for HazardIndex {
    fn default() -> Self {
        Self::new()
    }
}
