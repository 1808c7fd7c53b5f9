use std::time::Duration;

/// HTTP methods used by the collaborator services.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum HTTPRequestMethod {
    Post,
}

pub(crate) trait HTTPRequestType {
    /// Type of the expected response.
    type Response: for<'de> serde::Deserialize<'de>;
    /// `str` object representing the specific endpoint.
    fn endpoint(&self) -> &str;
    /// The corresponding HTTP Request Method.
    fn request_method(&self) -> HTTPRequestMethod;
    fn header_params(&self) -> reqwest::header::HeaderMap { reqwest::header::HeaderMap::new() }
    /// Overrides the client wide timeout for this request.
    fn timeout(&self) -> Option<Duration> { None }
}

pub(crate) trait JSONBodyHTTPRequestType: HTTPRequestType {
    /// The type of the json body.
    type Body: serde::Serialize;
    /// Returns the serializable object.
    fn body(&self) -> &Self::Body;
}
