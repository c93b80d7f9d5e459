use serde::{Deserialize, Serialize};

/// A single GPS fix from the location provider.
///
/// Immutable once captured. Fixes arrive at irregular intervals, typically
/// sub-second to several seconds apart depending on the device.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    /// Reported horizontal accuracy in meters.
    #[serde(default)]
    pub accuracy: Option<f64>,
    /// Ground speed in m/s.
    #[serde(default)]
    pub speed: Option<f64>,
    /// Heading in degrees clockwise from north.
    #[serde(default)]
    pub heading: Option<f64>,
}

impl Position {
    pub fn new(lat: f64, lon: f64) -> Self {
        Position {
            lat,
            lon,
            accuracy: None,
            speed: None,
            heading: None,
        }
    }
}

/// State of the live location watch.
///
/// `Unavailable` is a distinct, observable status: a caller must be able to
/// tell "tracking is not running" apart from "tracking active, nothing
/// nearby". It is never collapsed into an empty alert set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TrackingStatus {
    /// No watch has been started, or it was stopped.
    Idle,
    /// Watch active; position updates are flowing.
    Active,
    /// Location capability absent, permission denied, or fix timed out.
    Unavailable(String),
}

impl TrackingStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, TrackingStatus::Active)
    }
}
