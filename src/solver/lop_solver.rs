use super::solver_common::CollaboratorError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One celestial observation handed to the sight reduction.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Observation {
    pub utc: DateTime<Utc>,
    pub ra_deg: f64,
    pub dec_deg: f64,
    /// True azimuth of the camera axis at capture time.
    pub azimuth_deg: Option<f64>,
    /// Calibration corrected elevation of the camera axis at capture time.
    pub pitch_deg: f64,
    pub roll_deg: Option<f64>,
}

/// Input of a sight reduction: one observation for a line of position, three for a fix.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LopRequest {
    pub observations: Vec<Observation>,
    pub est_lat_deg: f64,
    pub est_lon_deg: f64,
    pub lon_east_positive: bool,
}

/// Per observation result of a sight reduction.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ObservationDetail {
    pub intercept_nm: f64,
    pub azimuth_deg: f64,
    pub estimated_altitude_deg: f64,
    pub observed_altitude_deg: f64,
    pub error: Option<String>,
}

/// Result of a sight reduction.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LopResponse {
    pub latitude_deg: Option<f64>,
    pub longitude_deg: Option<f64>,
    pub spread_nm: Option<f64>,
    pub error: Option<String>,
    #[serde(default)]
    pub per_observation_details: Vec<ObservationDetail>,
}

/// Reduces celestial observations to lines of position and position fixes.
#[async_trait]
pub trait LopSolver: Send + Sync {
    async fn compute_lop(&self, request: &LopRequest) -> Result<LopResponse, CollaboratorError>;

    /// Releases long-lived resources; later calls fail with [`CollaboratorError::Released`].
    async fn release(&self) {}
}
