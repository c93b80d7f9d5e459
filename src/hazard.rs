use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Dominant severity class of a reported hazard.
///
/// Ordering follows damage: `Major > Moderate > Minor`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Minor,
    Moderate,
    Major,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Severity::Minor => write!(f, "Minor"),
            Severity::Moderate => write!(f, "Moderate"),
            Severity::Major => write!(f, "Major"),
        }
    }
}

/// Per-class detection counts as reported by the detection backend.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct SeverityBreakdown {
    #[serde(rename = "Minor", default)]
    pub minor: u32,
    #[serde(rename = "Moderate", default)]
    pub moderate: u32,
    #[serde(rename = "Major", default)]
    pub major: u32,
}

impl SeverityBreakdown {
    /// Dominant class: any Major detection wins, then Moderate, else Minor.
    pub fn dominant(&self) -> Severity {
        if self.major > 0 {
            Severity::Major
        } else if self.moderate > 0 {
            Severity::Moderate
        } else {
            Severity::Minor
        }
    }
}

/// A reported road-damage point from the backend `/reports` feed.
///
/// Coordinates are optional on the wire: volunteer uploads without GPS tags
/// produce reports with `lat`/`lon` null. Those are skipped by every
/// geometric operation, never treated as errors.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Hazard {
    pub id: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub severity_breakdown: Option<SeverityBreakdown>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub total_detections: Option<u32>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl Hazard {
    /// Coordinates if the report carries both, else None.
    pub fn coords(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }

    /// Effective severity: the explicit class if present, else the dominant
    /// class of the breakdown, else Minor.
    pub fn severity(&self) -> Severity {
        if let Some(sev) = self.severity {
            return sev;
        }
        self.severity_breakdown
            .map(|b| b.dominant())
            .unwrap_or(Severity::Minor)
    }
}

/// Immutable batch of hazards, replaced wholesale on each refresh.
///
/// The backend feed is re-synchronized on a fixed timer (30 s); each sync
/// swaps in a new snapshot rather than merging, so a scan in progress keeps
/// reading a consistent batch via its `Arc`.
#[derive(Clone, Debug, Default)]
pub struct HazardSnapshot {
    hazards: Arc<Vec<Hazard>>,
}

impl HazardSnapshot {
    pub fn new(hazards: Vec<Hazard>) -> Self {
        HazardSnapshot {
            hazards: Arc::new(hazards),
        }
    }

    pub fn hazards(&self) -> &[Hazard] {
        &self.hazards
    }

    pub fn len(&self) -> usize {
        self.hazards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hazards.is_empty()
    }

    /// Hazards that carry usable coordinates.
    pub fn located(&self) -> impl Iterator<Item = (&Hazard, (f64, f64))> {
        self.hazards.iter().filter_map(|h| h.coords().map(|c| (h, c)))
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.hazards.iter().any(|h| h.id == id)
    }
}
