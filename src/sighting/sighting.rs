use crate::logger::JsonDump;
use crate::orientation::OrientationSnapshot;
use crate::solver::{LopResponse, Observation, ObservationDetail, SolveResponse};
use strum_macros::Display;

/// Registry wide unique identifier of a sighting, assigned at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct SightingId(pub(super) u64);

impl SightingId {
    pub fn value(self) -> u64 { self.0 }
}

impl std::fmt::Display for SightingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "#{}", self.0) }
}

/// Where the image of a sighting came from.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CaptureSource {
    Camera,
    Storage,
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AnalysisState {
    Pending,
    Solved,
    Failed,
}

/// Why a plate solve did not produce coordinates.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FailureReason {
    NoMatch,
    Timeout,
    Cancelled,
    TooFewCentroids,
    Unknown,
    IOError,
}

impl FailureReason {
    /// Maps a plate solver status code, unknown codes map to [`FailureReason::Unknown`].
    pub fn from_status_code(code: i32) -> Self {
        match code {
            SolveResponse::STATUS_NO_MATCH => FailureReason::NoMatch,
            SolveResponse::STATUS_TIMEOUT => FailureReason::Timeout,
            SolveResponse::STATUS_CANCELLED => FailureReason::Cancelled,
            SolveResponse::STATUS_TOO_FEW_CENTROIDS => FailureReason::TooFewCentroids,
            _ => FailureReason::Unknown,
        }
    }
}

/// Outcome of a plate solve attached to a sighting.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlateSolveResult {
    solved: bool,
    ra_deg: Option<f64>,
    dec_deg: Option<f64>,
    image_roll_deg: Option<f64>,
    fov_deg: Option<f64>,
    error_arcsec: Option<f64>,
    failure_reason: Option<FailureReason>,
    message: Option<String>,
}

impl PlateSolveResult {
    /// Converts a solver answer. A solve without both coordinates counts as a failure.
    pub fn from_response(resp: SolveResponse) -> Self {
        match (resp.solved, resp.ra_deg, resp.dec_deg) {
            (true, Some(ra), Some(dec)) if ra.is_finite() && dec.is_finite() => Self {
                solved: true,
                ra_deg: Some(ra),
                dec_deg: Some(dec),
                image_roll_deg: resp.roll_deg,
                fov_deg: resp.fov_deg,
                error_arcsec: resp.error_arcsec,
                failure_reason: None,
                message: resp.message,
            },
            (true, _, _) => Self::failure(
                FailureReason::Unknown,
                Some(String::from("solver reported success without coordinates")),
            ),
            (false, _, _) => Self::failure(
                FailureReason::from_status_code(resp.status_code.unwrap_or(SolveResponse::STATUS_UNKNOWN)),
                resp.message,
            ),
        }
    }

    pub fn failure(reason: FailureReason, message: Option<String>) -> Self {
        Self {
            solved: false,
            ra_deg: None,
            dec_deg: None,
            image_roll_deg: None,
            fov_deg: None,
            error_arcsec: None,
            failure_reason: Some(reason),
            message,
        }
    }

    pub fn is_solved(&self) -> bool { self.solved }
    pub fn ra_deg(&self) -> Option<f64> { self.ra_deg }
    pub fn dec_deg(&self) -> Option<f64> { self.dec_deg }
    pub fn image_roll_deg(&self) -> Option<f64> { self.image_roll_deg }
    pub fn fov_deg(&self) -> Option<f64> { self.fov_deg }
    pub fn error_arcsec(&self) -> Option<f64> { self.error_arcsec }
    pub fn failure_reason(&self) -> Option<FailureReason> { self.failure_reason }
    pub fn message(&self) -> Option<&str> { self.message.as_deref() }
}

/// A line of position derived from a single sighting.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LineOfPosition {
    intercept_nm: f64,
    azimuth_deg: f64,
    observed_altitude_deg: f64,
    computed_altitude_deg: f64,
    error: Option<String>,
}

impl LineOfPosition {
    pub fn new(intercept_nm: f64, azimuth_deg: f64, observed_altitude_deg: f64, computed_altitude_deg: f64) -> Self {
        Self { intercept_nm, azimuth_deg, observed_altitude_deg, computed_altitude_deg, error: None }
    }

    /// An invalid line of position carrying only the error.
    pub fn failed(error: String) -> Self {
        Self {
            intercept_nm: 0.0,
            azimuth_deg: 0.0,
            observed_altitude_deg: 0.0,
            computed_altitude_deg: 0.0,
            error: Some(error),
        }
    }

    pub fn from_detail(detail: &ObservationDetail) -> Self {
        match &detail.error {
            Some(e) => Self::failed(e.clone()),
            None => Self::new(
                detail.intercept_nm,
                detail.azimuth_deg,
                detail.observed_altitude_deg,
                detail.estimated_altitude_deg,
            ),
        }
    }

    /// Extracts the line of position from a single observation reduction.
    pub fn from_response(resp: &LopResponse) -> Self {
        if let Some(e) = &resp.error {
            return Self::failed(e.clone());
        }
        resp.per_observation_details
            .first()
            .map_or_else(|| Self::failed(String::from("no observation details returned")), Self::from_detail)
    }

    pub fn intercept_nm(&self) -> f64 { self.intercept_nm }
    pub fn azimuth_deg(&self) -> f64 { self.azimuth_deg }
    pub fn observed_altitude_deg(&self) -> f64 { self.observed_altitude_deg }
    pub fn computed_altitude_deg(&self) -> f64 { self.computed_altitude_deg }
    pub fn error(&self) -> Option<&str> { self.error.as_deref() }

    /// A line of position without error and with finite values takes part in fixes.
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
            && self.intercept_nm.is_finite()
            && self.azimuth_deg.is_finite()
            && self.observed_altitude_deg.is_finite()
            && self.computed_altitude_deg.is_finite()
    }
}

/// A captured star image together with the orientation at capture time.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Sighting {
    id: SightingId,
    image_reference: String,
    source: CaptureSource,
    capture_orientation: OrientationSnapshot,
    analysis_state: AnalysisState,
    plate_solve_result: Option<PlateSolveResult>,
    lop: Option<LineOfPosition>,
}

impl Sighting {
    pub(super) fn new(
        id: SightingId,
        image_reference: String,
        source: CaptureSource,
        capture_orientation: OrientationSnapshot,
    ) -> Self {
        Self {
            id,
            image_reference,
            source,
            capture_orientation,
            analysis_state: AnalysisState::Pending,
            plate_solve_result: None,
            lop: None,
        }
    }

    pub fn id(&self) -> SightingId { self.id }
    pub fn image_reference(&self) -> &str { &self.image_reference }
    pub fn source(&self) -> CaptureSource { self.source }
    pub fn capture_orientation(&self) -> &OrientationSnapshot { &self.capture_orientation }
    pub fn analysis_state(&self) -> AnalysisState { self.analysis_state }
    pub fn plate_solve_result(&self) -> Option<&PlateSolveResult> { self.plate_solve_result.as_ref() }
    pub fn lop(&self) -> Option<&LineOfPosition> { self.lop.as_ref() }

    /// The line of position if it can take part in a fix.
    pub fn valid_lop(&self) -> Option<&LineOfPosition> { self.lop.as_ref().filter(|l| l.is_valid()) }

    /// Analysis finished, either failed or with a line of position.
    pub fn is_terminal(&self) -> bool {
        match self.analysis_state {
            AnalysisState::Pending => false,
            AnalysisState::Failed => true,
            AnalysisState::Solved => self.lop.is_some(),
        }
    }

    /// The observation handed to the sight reduction, `None` until solved.
    pub fn observation(&self) -> Option<Observation> {
        let result = self.plate_solve_result.as_ref().filter(|r| r.is_solved())?;
        Some(Observation {
            utc: self.capture_orientation.timestamp(),
            ra_deg: result.ra_deg()?,
            dec_deg: result.dec_deg()?,
            azimuth_deg: Some(self.capture_orientation.true_azimuth_deg()),
            pitch_deg: self.capture_orientation.pitch_deg(),
            roll_deg: Some(self.capture_orientation.roll_deg()),
        })
    }

    pub(super) fn set_solve_result(&mut self, result: PlateSolveResult) {
        self.analysis_state = if result.is_solved() { AnalysisState::Solved } else { AnalysisState::Failed };
        self.plate_solve_result = Some(result);
    }

    /// Stores the line of position. Ignored unless the plate solve succeeded.
    ///
    /// # Returns
    /// `true` if the line of position was stored.
    pub(super) fn set_lop(&mut self, lop: LineOfPosition) -> bool {
        if self.analysis_state != AnalysisState::Solved {
            return false;
        }
        self.lop = Some(lop);
        true
    }
}

impl JsonDump for Sighting {
    fn file_name(&self) -> String {
        format!("sighting_{}_{}.json", self.id.0, self.capture_orientation.timestamp().format("%Y%m%d_%H%M%S"))
    }

    fn dir_name(&self) -> &'static str { "sightings" }
}
