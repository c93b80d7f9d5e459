use crate::hazard::{Hazard, HazardSnapshot, Severity};
use crate::position::Position;
use crate::spatial::HazardIndex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Distance band for critical alerts, meters. Fixed, not configurable.
pub const CRITICAL_BAND_M: f64 = 100.0;
/// Distance band for high-urgency alerts, meters. Fixed, not configurable.
pub const HIGH_BAND_M: f64 = 250.0;
/// Minimum time between repeated alerts for the same hazard.
pub const ALERT_COOLDOWN_MS: u64 = 60_000;
/// Default alert radius, meters.
pub const DEFAULT_ALERT_RADIUS_M: f64 = 500.0;

/// Alert configuration.
///
/// Only the radius and the sound gate are meant to be adjusted by the user;
/// the urgency bands and the cooldown are fixed constants independent of the
/// radius, which acts purely as an upper bound.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AlertConfig {
    pub alert_radius_m: f64,
    pub cooldown_ms: u64,
    /// Gates only the audible cue, never the alert computation itself.
    pub sound_enabled: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        AlertConfig {
            alert_radius_m: DEFAULT_ALERT_RADIUS_M,
            cooldown_ms: ALERT_COOLDOWN_MS,
            sound_enabled: true,
        }
    }
}

/// Alert urgency, a pure function of current distance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Critical,
    High,
    Warning,
}

impl Urgency {
    /// ≤100 m critical, ≤250 m high, otherwise warning (the caller has
    /// already established the hazard is within the alert radius).
    pub fn classify(distance_m: f64) -> Self {
        if distance_m <= CRITICAL_BAND_M {
            Urgency::Critical
        } else if distance_m <= HIGH_BAND_M {
            Urgency::High
        } else {
            Urgency::Warning
        }
    }
}

/// A hazard inside the alert radius, paired with its current distance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NearbyHazard {
    pub hazard: Hazard,
    pub distance_m: f64,
}

/// One fired alert. Ephemeral: recomputed from scratch on every position
/// update, never persisted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AlertEvent {
    pub hazard_id: String,
    pub distance_m: u32,
    pub severity: Severity,
    pub urgency: Urgency,
    pub message: String,
}

impl AlertEvent {
    fn new(hazard: &Hazard, distance_m: f64) -> Self {
        let severity = hazard.severity();
        let rounded = distance_m.round() as u32;
        AlertEvent {
            hazard_id: hazard.id.clone(),
            distance_m: rounded,
            severity,
            urgency: Urgency::classify(distance_m),
            message: format!("{} pothole ahead in {}m - Drive carefully!", severity, rounded),
        }
    }
}

/// Result of one position update.
#[derive(Clone, Debug, Default)]
pub struct ProximityUpdate {
    /// All hazards within the alert radius, ascending by distance,
    /// regardless of cooldown. Used for display.
    pub nearby: Vec<NearbyHazard>,
    /// Cooldown-gated alerts, ascending by distance.
    pub alerts: Vec<AlertEvent>,
    /// True when at least one alert fired and sound is enabled. The caller
    /// owns the actual tone playback.
    pub play_tone: bool,
}

impl ProximityUpdate {
    /// The closest `n` alerts, for banner/toast presentation (UI typically
    /// caps at 3).
    pub fn top_alerts(&self, n: usize) -> &[AlertEvent] {
        &self.alerts[..self.alerts.len().min(n)]
    }
}

/// Proximity alert engine.
///
/// # State
/// Per-hazard last-alert timestamps, keyed by hazard id. The map is touched
/// only by the single event-processing path; `now_ms` comes in explicitly so
/// the cooldown logic is testable without a clock.
///
/// # Lifecycle
/// A timestamp appears when a hazard first fires, is overwritten on every
/// re-fire, and is pruned on snapshot sync once the hazard id disappears
/// from the feed.
pub struct AlertEngine {
    config: AlertConfig,
    last_alert_ms: HashMap<String, u64>,
}

impl AlertEngine {
    pub fn new(config: AlertConfig) -> Self {
        AlertEngine {
            config,
            last_alert_ms: HashMap::new(),
        }
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Process one position fix against the current hazard index.
    ///
    /// Hazards outside the radius never fire, even if previously alerted;
    /// there is no clearing event — absence from `nearby` is the signal.
    /// An empty index yields empty sets, not an error.
    pub fn on_position_update(
        &mut self,
        position: &Position,
        index: &HazardIndex,
        now_ms: u64,
    ) -> ProximityUpdate {
        let hits = index.within_radius((position.lat, position.lon), self.config.alert_radius_m);

        let mut nearby = Vec::with_capacity(hits.len());
        let mut alerts = Vec::new();

        for (hazard, distance_m) in hits {
            nearby.push(NearbyHazard {
                hazard: hazard.clone(),
                distance_m,
            });

            let fire = match self.last_alert_ms.get(&hazard.id) {
                Some(&last) => now_ms.saturating_sub(last) > self.config.cooldown_ms,
                None => true,
            };

            if fire {
                self.last_alert_ms.insert(hazard.id.clone(), now_ms);
                alerts.push(AlertEvent::new(hazard, distance_m));
            } else {
                log::debug!("alert suppressed for {} (cooldown)", hazard.id);
            }
        }

        // within_radius already sorts ascending; keep the contract explicit
        // for callers that rebuild these lists.
        nearby.sort_by(|a, b| {
            a.distance_m
                .partial_cmp(&b.distance_m)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        alerts.sort_by_key(|a| a.distance_m);

        let play_tone = self.config.sound_enabled && !alerts.is_empty();

        ProximityUpdate {
            nearby,
            alerts,
            play_tone,
        }
    }

    /// Sync with a freshly fetched snapshot: drop cooldown entries for
    /// hazard ids no longer present, so a long session does not accumulate
    /// state for reports that were resolved or withdrawn.
    pub fn sync_snapshot(&mut self, snapshot: &HazardSnapshot) {
        let before = self.last_alert_ms.len();
        self.last_alert_ms.retain(|id, _| snapshot.contains_id(id));
        let pruned = before - self.last_alert_ms.len();
        if pruned > 0 {
            log::info!("pruned {} stale alert-cooldown entries", pruned);
        }
    }

    #[cfg(test)]
    fn tracked_ids(&self) -> usize {
        self.last_alert_ms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_hazard(id: &str, lat: f64, lon: f64, breakdown: &str) -> Hazard {
        serde_json::from_str(&format!(
            r#"{{"id": "{}", "lat": {}, "lon": {}, "severity_breakdown": {}}}"#,
            id, lat, lon, breakdown
        ))
        .unwrap()
    }

    fn index_of(hazards: Vec<Hazard>) -> (HazardSnapshot, HazardIndex) {
        let snapshot = HazardSnapshot::new(hazards);
        let index = HazardIndex::from_snapshot(&snapshot);
        (snapshot, index)
    }

    #[test]
    fn test_urgency_bands() {
        assert_eq!(Urgency::classify(50.0), Urgency::Critical);
        assert_eq!(Urgency::classify(100.0), Urgency::Critical);
        assert_eq!(Urgency::classify(150.0), Urgency::High);
        assert_eq!(Urgency::classify(250.0), Urgency::High);
        assert_eq!(Urgency::classify(400.0), Urgency::Warning);
    }

    #[test]
    fn test_bands_independent_of_radius() {
        // A wider radius must not move the fixed bands.
        let mut engine = AlertEngine::new(AlertConfig {
            alert_radius_m: 2000.0,
            ..AlertConfig::default()
        });
        // ~480m north of origin: warning, not high
        let (_, index) = index_of(vec![make_hazard("w", 20.00432, 78.0, r#"{"Minor": 1}"#)]);
        let update = engine.on_position_update(&Position::new(20.0, 78.0), &index, 0);
        assert_eq!(update.alerts.len(), 1);
        assert_eq!(update.alerts[0].urgency, Urgency::Warning);
    }

    #[test]
    fn test_outside_radius_excluded() {
        let mut engine = AlertEngine::new(AlertConfig::default());
        // ~666m north with the default 500m radius
        let (_, index) = index_of(vec![make_hazard("far", 20.006, 78.0, r#"{"Major": 1}"#)]);
        let update = engine.on_position_update(&Position::new(20.0, 78.0), &index, 0);
        assert!(update.nearby.is_empty());
        assert!(update.alerts.is_empty());
        assert!(!update.play_tone);
    }

    #[test]
    fn test_cooldown_suppresses_refire() {
        let mut engine = AlertEngine::new(AlertConfig::default());
        let (_, index) = index_of(vec![make_hazard("h", 20.0005, 78.0, r#"{"Major": 1}"#)]);
        let pos = Position::new(20.0, 78.0);

        let first = engine.on_position_update(&pos, &index, 0);
        assert_eq!(first.alerts.len(), 1);

        // Second update inside the 60s window: nearby yes, alert no
        let second = engine.on_position_update(&pos, &index, 30_000);
        assert_eq!(second.nearby.len(), 1);
        assert!(second.alerts.is_empty());

        // Third update after 61s total: fires again
        let third = engine.on_position_update(&pos, &index, 61_000);
        assert_eq!(third.alerts.len(), 1);
    }

    #[test]
    fn test_cooldown_boundary_exclusive() {
        // Exactly cooldown_ms elapsed does not re-fire; the window is
        // strictly greater-than.
        let mut engine = AlertEngine::new(AlertConfig::default());
        let (_, index) = index_of(vec![make_hazard("h", 20.0005, 78.0, r#"{"Minor": 1}"#)]);
        let pos = Position::new(20.0, 78.0);

        engine.on_position_update(&pos, &index, 1_000);
        let at_boundary = engine.on_position_update(&pos, &index, 61_000);
        assert!(at_boundary.alerts.is_empty());
        let past_boundary = engine.on_position_update(&pos, &index, 61_001);
        assert_eq!(past_boundary.alerts.len(), 1);
    }

    #[test]
    fn test_alert_message_format() {
        let mut engine = AlertEngine::new(AlertConfig::default());
        // 0.0005° lat ≈ 55.6m north
        let (_, index) = index_of(vec![make_hazard("a", 20.0005, 78.0, r#"{"Major": 2}"#)]);
        let update = engine.on_position_update(&Position::new(20.0, 78.0), &index, 0);

        assert_eq!(update.alerts.len(), 1);
        let alert = &update.alerts[0];
        assert_eq!(alert.urgency, Urgency::Critical);
        assert_eq!(alert.severity, Severity::Major);
        assert_eq!(alert.distance_m, 56);
        assert_eq!(alert.message, "Major pothole ahead in 56m - Drive carefully!");
    }

    #[test]
    fn test_sorted_ascending_and_top_cap() {
        let mut engine = AlertEngine::new(AlertConfig::default());
        let (_, index) = index_of(vec![
            make_hazard("c", 20.003, 78.0, r#"{"Minor": 1}"#),
            make_hazard("a", 20.0005, 78.0, r#"{"Major": 1}"#),
            make_hazard("b", 20.0015, 78.0, r#"{"Moderate": 1}"#),
            make_hazard("d", 20.004, 78.0, r#"{"Minor": 1}"#),
        ]);
        let update = engine.on_position_update(&Position::new(20.0, 78.0), &index, 0);

        let ids: Vec<&str> = update.alerts.iter().map(|a| a.hazard_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        let nearby_ids: Vec<&str> = update
            .nearby
            .iter()
            .map(|n| n.hazard.id.as_str())
            .collect();
        assert_eq!(nearby_ids, vec!["a", "b", "c", "d"]);

        assert_eq!(update.top_alerts(3).len(), 3);
        assert_eq!(update.top_alerts(10).len(), 4);
    }

    #[test]
    fn test_sound_gate() {
        let mut engine = AlertEngine::new(AlertConfig {
            sound_enabled: false,
            ..AlertConfig::default()
        });
        let (_, index) = index_of(vec![make_hazard("h", 20.0005, 78.0, r#"{"Major": 1}"#)]);
        let update = engine.on_position_update(&Position::new(20.0, 78.0), &index, 0);

        // Sound off gates only the tone, never the alert computation
        assert_eq!(update.alerts.len(), 1);
        assert!(!update.play_tone);
    }

    #[test]
    fn test_empty_snapshot_yields_empty_sets() {
        let mut engine = AlertEngine::new(AlertConfig::default());
        let (_, index) = index_of(vec![]);
        let update = engine.on_position_update(&Position::new(20.0, 78.0), &index, 0);
        assert!(update.nearby.is_empty());
        assert!(update.alerts.is_empty());
    }

    #[test]
    fn test_stale_cooldown_entries_pruned_on_sync() {
        let mut engine = AlertEngine::new(AlertConfig::default());
        let (_, index) = index_of(vec![
            make_hazard("keep", 20.0005, 78.0, r#"{"Minor": 1}"#),
            make_hazard("drop", 20.001, 78.0, r#"{"Minor": 1}"#),
        ]);
        engine.on_position_update(&Position::new(20.0, 78.0), &index, 0);
        assert_eq!(engine.tracked_ids(), 2);

        // Next refresh no longer carries "drop"
        let replacement =
            HazardSnapshot::new(vec![make_hazard("keep", 20.0005, 78.0, r#"{"Minor": 1}"#)]);
        engine.sync_snapshot(&replacement);
        assert_eq!(engine.tracked_ids(), 1);
    }

    #[test]
    fn test_scenario_55m_major_critical() {
        // Position (20.000, 78.000), hazard ~55m north, severity Major:
        // one critical alert with the rounded-distance message.
        let mut engine = AlertEngine::new(AlertConfig::default());
        let (_, index) = index_of(vec![make_hazard(
            "A",
            20.000495,
            78.0,
            r#"{"Major": 1}"#,
        )]);
        let update = engine.on_position_update(&Position::new(20.0, 78.0), &index, 0);

        assert_eq!(update.alerts.len(), 1);
        let alert = &update.alerts[0];
        assert_eq!(alert.urgency, Urgency::Critical);
        assert_eq!(alert.message, "Major pothole ahead in 55m - Drive carefully!");
    }
}
