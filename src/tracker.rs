use crate::alert::{AlertConfig, AlertEngine, ProximityUpdate};
use crate::fetcher::{ReportFetcher, REFRESH_INTERVAL};
use crate::geodesy::distance_meters;
use crate::hazard::HazardSnapshot;
use crate::position::{Position, TrackingStatus};
use crate::spatial::HazardIndex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;

/// One event from the location watch: either a fix or a provider failure
/// (capability absent, permission denied, timeout).
#[derive(Clone, Debug)]
pub enum PositionEvent {
    Fix(Position),
    Error(String),
}

/// Running totals for one tracking session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionStats {
    pub started_at: String,
    pub position_fixes: u64,
    /// Haversine sum over consecutive fixes, meters.
    pub total_distance_m: f64,
    pub alerts_shown: u64,
    /// Distinct hazards that entered the alert radius at least once.
    pub hazards_passed: u64,
    pub snapshot_refreshes: u64,
}

impl SessionStats {
    fn new() -> Self {
        SessionStats {
            started_at: chrono::Utc::now().to_rfc3339(),
            position_fixes: 0,
            total_distance_m: 0.0,
            alerts_shown: 0,
            hazards_passed: 0,
            snapshot_refreshes: 0,
        }
    }

    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// A live tracking session: one alert engine, one hazard snapshot, session
/// stats.
///
/// The session itself is synchronous and performs no IO; each method is one
/// pass over bounded data, safe to call inline on every event. `run_session`
/// drives it from the async event streams.
pub struct TrackingSession {
    engine: AlertEngine,
    snapshot: HazardSnapshot,
    index: HazardIndex,
    status: TrackingStatus,
    stats: SessionStats,
    last_fix: Option<Position>,
    seen_hazards: HashSet<String>,
}

impl TrackingSession {
    pub fn new(config: AlertConfig) -> Self {
        TrackingSession {
            engine: AlertEngine::new(config),
            snapshot: HazardSnapshot::default(),
            index: HazardIndex::new(),
            status: TrackingStatus::Idle,
            stats: SessionStats::new(),
            last_fix: None,
            seen_hazards: HashSet::new(),
        }
    }

    pub fn status(&self) -> &TrackingStatus {
        &self.status
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn snapshot(&self) -> &HazardSnapshot {
        &self.snapshot
    }

    /// Swap in a fresh hazard snapshot (wholesale replacement) and rebuild
    /// the spatial index. Cooldown state for vanished hazard ids is pruned.
    pub fn apply_snapshot(&mut self, snapshot: HazardSnapshot) {
        self.index = HazardIndex::from_snapshot(&snapshot);
        self.engine.sync_snapshot(&snapshot);
        self.snapshot = snapshot;
        self.stats.snapshot_refreshes += 1;
        log::info!(
            "hazard snapshot refreshed: {} reports ({} located)",
            self.snapshot.len(),
            self.index.indexed_count()
        );
    }

    /// Process one position fix.
    pub fn handle_fix(&mut self, position: Position, now_ms: u64) -> ProximityUpdate {
        self.status = TrackingStatus::Active;
        self.stats.position_fixes += 1;

        if let Some(prev) = self.last_fix {
            self.stats.total_distance_m +=
                distance_meters(prev.lat, prev.lon, position.lat, position.lon);
        }
        self.last_fix = Some(position);

        let update = self.engine.on_position_update(&position, &self.index, now_ms);

        self.stats.alerts_shown += update.alerts.len() as u64;
        for nearby in &update.nearby {
            if self.seen_hazards.insert(nearby.hazard.id.clone()) {
                self.stats.hazards_passed += 1;
            }
        }

        update
    }

    /// Record a location-provider failure. This is a distinct status — the
    /// caller must never read it as "tracking active, nothing nearby".
    pub fn handle_error(&mut self, message: String) {
        log::warn!("location watch error: {}", message);
        self.status = TrackingStatus::Unavailable(message);
    }

    /// Stop consuming updates. Idempotent; no alert fires after this.
    pub fn stop(&mut self) {
        self.status = TrackingStatus::Idle;
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Drive a session from its two event streams until the position stream
/// closes.
///
/// # Event model
/// - Position events arrive over the mpsc channel at whatever rate the
///   location provider produces them
/// - The hazard snapshot refreshes on a fixed 30-second timer. The fetch
///   runs in its own task and hands finished snapshots back over a channel,
///   so a slow backend (up to the 10 s client timeout) never stalls the
///   position arm
/// - Both feed the same single-threaded session; there is no concurrent
///   mutation to guard against
///
/// # Cancellation
/// Dropping the sender ends the stream: the loop finishes the event in
/// flight, aborts the refresh task, marks the session idle, and returns it
/// with final stats. No further alerts fire.
pub async fn run_session(
    mut session: TrackingSession,
    mut positions: mpsc::Receiver<PositionEvent>,
    fetcher: ReportFetcher,
    mut on_update: impl FnMut(ProximityUpdate),
) -> TrackingSession {
    // Initial snapshot before tracking starts, so early fixes see hazards.
    match fetcher.fetch_snapshot().await {
        Ok(snapshot) => session.apply_snapshot(snapshot),
        Err(e) => log::warn!("initial hazard fetch failed: {}", e),
    }

    let (snapshot_tx, mut snapshots) = mpsc::channel::<HazardSnapshot>(4);
    let refresher = tokio::spawn(async move {
        let mut refresh = tokio::time::interval(REFRESH_INTERVAL);
        refresh.tick().await; // first tick completes immediately
        loop {
            refresh.tick().await;
            match fetcher.fetch_snapshot().await {
                Ok(snapshot) => {
                    if snapshot_tx.send(snapshot).await.is_err() {
                        break;
                    }
                }
                // Keep the previous snapshot; retry on the next tick.
                Err(e) => log::warn!("hazard refresh failed: {}", e),
            }
        }
    });

    loop {
        tokio::select! {
            event = positions.recv() => {
                match event {
                    Some(PositionEvent::Fix(position)) => {
                        let update = session.handle_fix(position, now_ms());
                        on_update(update);
                    }
                    Some(PositionEvent::Error(message)) => {
                        session.handle_error(message);
                    }
                    None => break,
                }
            }
            Some(snapshot) = snapshots.recv() => {
                session.apply_snapshot(snapshot);
            }
        }
    }

    refresher.abort();
    session.stop();
    session
}
