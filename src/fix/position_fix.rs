use crate::logger::JsonDump;
use crate::sighting::SightingId;
use crate::solver::LopResponse;
use chrono::{DateTime, Utc};

/// A position computed from exactly three lines of position.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PositionFix {
    latitude_deg: Option<f64>,
    longitude_deg: Option<f64>,
    spread_nm: Option<f64>,
    error: Option<String>,
    /// The sightings the fix was computed from, ordered by id.
    sighting_ids: Vec<SightingId>,
    computed_at: DateTime<Utc>,
}

impl PositionFix {
    pub fn from_response(sighting_ids: Vec<SightingId>, resp: &LopResponse) -> Self {
        let error = resp.error.clone().or_else(|| match (resp.latitude_deg, resp.longitude_deg) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => None,
            _ => Some(String::from("no position returned")),
        });
        if error.is_some() {
            return Self::failed(sighting_ids, error.unwrap_or_default());
        }
        Self {
            latitude_deg: resp.latitude_deg,
            longitude_deg: resp.longitude_deg,
            spread_nm: resp.spread_nm,
            error: None,
            sighting_ids,
            computed_at: Utc::now(),
        }
    }

    /// An error-only fix.
    pub fn failed(sighting_ids: Vec<SightingId>, error: String) -> Self {
        Self {
            latitude_deg: None,
            longitude_deg: None,
            spread_nm: None,
            error: Some(error),
            sighting_ids,
            computed_at: Utc::now(),
        }
    }

    pub fn latitude_deg(&self) -> Option<f64> { self.latitude_deg }
    pub fn longitude_deg(&self) -> Option<f64> { self.longitude_deg }
    pub fn spread_nm(&self) -> Option<f64> { self.spread_nm }
    pub fn error(&self) -> Option<&str> { self.error.as_deref() }
    pub fn sighting_ids(&self) -> &[SightingId] { &self.sighting_ids }
    pub fn computed_at(&self) -> DateTime<Utc> { self.computed_at }
    pub fn is_valid(&self) -> bool { self.error.is_none() }
}

impl JsonDump for PositionFix {
    fn file_name(&self) -> String { format!("fix_{}.json", self.computed_at.format("%Y%m%d_%H%M%S")) }

    fn dir_name(&self) -> &'static str { "fixes" }
}
