use super::{
    lop_solver::{LopRequest, LopResponse, LopSolver},
    plate_solver::{PlateSolver, SolveResponse},
    solver_common::CollaboratorError,
};
use crate::http_handler::{http_client::HTTPClient, http_request::solve_post::SolveRequest};
use crate::{info, log};
use async_trait::async_trait;
use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

/// [`PlateSolver`] talking to a plate solving service over HTTP.
#[derive(Debug)]
pub struct HttpPlateSolver {
    client: HTTPClient,
    released: AtomicBool,
}

impl HttpPlateSolver {
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        let client = HTTPClient::new(base_url)?;
        info!("Plate solver at {}", client.url());
        Ok(Self { client, released: AtomicBool::new(false) })
    }
}

#[async_trait]
impl PlateSolver for HttpPlateSolver {
    async fn solve(&self, image_path: &str, timeout: Duration) -> Result<SolveResponse, CollaboratorError> {
        if self.released.load(Ordering::Acquire) {
            return Err(CollaboratorError::Released);
        }
        let request = SolveRequest::new(image_path, timeout);
        Ok(self.client.send_json(&request).await?)
    }

    async fn release(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            log!("Plate solver session released");
        }
    }
}

/// [`LopSolver`] talking to a sight reduction service over HTTP.
#[derive(Debug)]
pub struct HttpLopSolver {
    client: HTTPClient,
    released: AtomicBool,
}

impl HttpLopSolver {
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        let client = HTTPClient::new(base_url)?;
        info!("Sight reduction at {}", client.url());
        Ok(Self { client, released: AtomicBool::new(false) })
    }
}

#[async_trait]
impl LopSolver for HttpLopSolver {
    async fn compute_lop(&self, request: &LopRequest) -> Result<LopResponse, CollaboratorError> {
        if self.released.load(Ordering::Acquire) {
            return Err(CollaboratorError::Released);
        }
        if request.observations.is_empty() {
            return Err(CollaboratorError::Malformed(String::from("no observations")));
        }
        Ok(self.client.send_json(request).await?)
    }

    async fn release(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            log!("Sight reduction session released");
        }
    }
}
