use super::solver_common::CollaboratorError;
use async_trait::async_trait;
use std::time::Duration;

/// Raw answer of a plate solver.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SolveResponse {
    pub solved: bool,
    pub ra_deg: Option<f64>,
    pub dec_deg: Option<f64>,
    /// Rotation of the image relative to celestial north.
    pub roll_deg: Option<f64>,
    pub fov_deg: Option<f64>,
    pub error_arcsec: Option<f64>,
    /// Solver status, only meaningful if `solved` is false.
    pub status_code: Option<i32>,
    pub message: Option<String>,
}

impl SolveResponse {
    pub const STATUS_UNKNOWN: i32 = 0;
    pub const STATUS_NO_MATCH: i32 = 2;
    pub const STATUS_TIMEOUT: i32 = 3;
    pub const STATUS_CANCELLED: i32 = 4;
    pub const STATUS_TOO_FEW_CENTROIDS: i32 = 5;

    /// A successful solve pointing at `(ra_deg, dec_deg)`.
    pub fn solved(ra_deg: f64, dec_deg: f64) -> Self {
        Self {
            solved: true,
            ra_deg: Some(ra_deg),
            dec_deg: Some(dec_deg),
            roll_deg: None,
            fov_deg: None,
            error_arcsec: None,
            status_code: None,
            message: None,
        }
    }

    /// An unsuccessful solve with the given status code.
    pub fn failed(status_code: i32) -> Self {
        Self {
            solved: false,
            ra_deg: None,
            dec_deg: None,
            roll_deg: None,
            fov_deg: None,
            error_arcsec: None,
            status_code: Some(status_code),
            message: None,
        }
    }
}

/// Identifies the stars in an image and returns the celestial coordinates of its center.
#[async_trait]
pub trait PlateSolver: Send + Sync {
    /// Solves the image at `image_path` within `timeout`.
    async fn solve(&self, image_path: &str, timeout: Duration) -> Result<SolveResponse, CollaboratorError>;

    /// Releases long-lived resources; later calls fail with [`CollaboratorError::Released`].
    async fn release(&self) {}
}
