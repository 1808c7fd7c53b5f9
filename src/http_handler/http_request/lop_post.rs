use super::request_common::{HTTPRequestMethod, HTTPRequestType, JSONBodyHTTPRequestType};
use crate::solver::{LopRequest, LopResponse};

impl JSONBodyHTTPRequestType for LopRequest {
    type Body = LopRequest;
    fn body(&self) -> &Self::Body { self }
}

/// The sight reduction service's /lop endpoint.
impl HTTPRequestType for LopRequest {
    type Response = LopResponse;
    fn endpoint(&self) -> &'static str { "/lop" }
    fn request_method(&self) -> HTTPRequestMethod { HTTPRequestMethod::Post }
}
