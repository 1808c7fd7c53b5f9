use super::request_common::{HTTPRequestMethod, HTTPRequestType, JSONBodyHTTPRequestType};
use crate::solver::SolveResponse;
use std::time::Duration;

/// Request type for the plate solver's /solve endpoint.
#[derive(serde::Serialize, Debug)]
pub(crate) struct SolveRequest {
    /// Path of the image on the shared file system.
    pub(crate) image_path: String,
    /// Time budget of the solver in milliseconds.
    pub(crate) timeout_ms: u64,
}

impl SolveRequest {
    /// Extra time granted on top of the solver budget for transport.
    const TRANSPORT_GRACE: Duration = Duration::from_secs(2);

    pub(crate) fn new(image_path: &str, timeout: Duration) -> Self {
        Self {
            image_path: String::from(image_path),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl JSONBodyHTTPRequestType for SolveRequest {
    type Body = SolveRequest;
    fn body(&self) -> &Self::Body { self }
}

impl HTTPRequestType for SolveRequest {
    type Response = SolveResponse;
    fn endpoint(&self) -> &'static str { "/solve" }
    fn request_method(&self) -> HTTPRequestMethod { HTTPRequestMethod::Post }
    fn timeout(&self) -> Option<Duration> {
        Some(Duration::from_millis(self.timeout_ms).saturating_add(Self::TRANSPORT_GRACE))
    }
}
