use super::{CollaboratorError, LopRequest, LopResponse, LopSolver, ObservationDetail, PlateSolver, SolveResponse};
use async_trait::async_trait;
use std::{
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

type SolveScript = Box<dyn Fn(&str) -> Result<SolveResponse, CollaboratorError> + Send + Sync>;
type LopScript = Box<dyn Fn(&LopRequest) -> Result<LopResponse, CollaboratorError> + Send + Sync>;

/// Plate solver answering from a script after a fixed delay.
pub(crate) struct StubPlateSolver {
    delay: Duration,
    calls: AtomicUsize,
    released: AtomicBool,
    script: SolveScript,
}

impl StubPlateSolver {
    pub(crate) fn new<F>(delay: Duration, script: F) -> Self
    where F: Fn(&str) -> Result<SolveResponse, CollaboratorError> + Send + Sync + 'static {
        Self { delay, calls: AtomicUsize::new(0), released: AtomicBool::new(false), script: Box::new(script) }
    }

    /// Solves every image to the same coordinates.
    pub(crate) fn solving(delay: Duration, ra_deg: f64, dec_deg: f64) -> Self {
        Self::new(delay, move |_| Ok(SolveResponse::solved(ra_deg, dec_deg)))
    }

    pub(crate) fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
    pub(crate) fn is_released(&self) -> bool { self.released.load(Ordering::SeqCst) }
}

#[async_trait]
impl PlateSolver for StubPlateSolver {
    async fn solve(&self, image_path: &str, _timeout: Duration) -> Result<SolveResponse, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        (self.script)(image_path)
    }

    async fn release(&self) { self.released.store(true, Ordering::SeqCst); }
}

/// Sight reduction answering from a script after a fixed delay, recording every request.
pub(crate) struct StubLopSolver {
    delay: Duration,
    requests: Mutex<Vec<LopRequest>>,
    released: AtomicBool,
    script: LopScript,
}

impl StubLopSolver {
    pub(crate) fn new<F>(delay: Duration, script: F) -> Self
    where F: Fn(&LopRequest) -> Result<LopResponse, CollaboratorError> + Send + Sync + 'static {
        Self { delay, requests: Mutex::new(Vec::new()), released: AtomicBool::new(false), script: Box::new(script) }
    }

    /// Answers single observations with one line of position.
    pub(crate) fn single(delay: Duration, intercept_nm: f64, azimuth_deg: f64) -> Self {
        Self::new(delay, move |req| {
            Ok(LopResponse {
                latitude_deg: None,
                longitude_deg: None,
                spread_nm: None,
                error: None,
                per_observation_details: req.observations.iter().map(|_| detail(intercept_nm, azimuth_deg)).collect(),
            })
        })
    }

    pub(crate) fn requests(&self) -> Vec<LopRequest> { self.requests.lock().unwrap().clone() }

    /// Number of calls with `n` observations.
    pub(crate) fn calls_with(&self, n: usize) -> usize {
        self.requests.lock().unwrap().iter().filter(|r| r.observations.len() == n).count()
    }

    pub(crate) fn is_released(&self) -> bool { self.released.load(Ordering::SeqCst) }
}

#[async_trait]
impl LopSolver for StubLopSolver {
    async fn compute_lop(&self, request: &LopRequest) -> Result<LopResponse, CollaboratorError> {
        self.requests.lock().unwrap().push(request.clone());
        tokio::time::sleep(self.delay).await;
        (self.script)(request)
    }

    async fn release(&self) { self.released.store(true, Ordering::SeqCst); }
}

pub(crate) fn detail(intercept_nm: f64, azimuth_deg: f64) -> ObservationDetail {
    ObservationDetail {
        intercept_nm,
        azimuth_deg,
        estimated_altitude_deg: 30.0,
        observed_altitude_deg: 30.0 + intercept_nm / 60.0,
        error: None,
    }
}
