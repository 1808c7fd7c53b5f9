use crate::http_handler::http_response::response_common::ResponseError;
use strum_macros::Display;

/// Failure of a call to an external collaborator.
#[derive(Debug, Display)]
pub enum CollaboratorError {
    /// The transport failed or the service answered with an error status.
    Http(ResponseError),
    /// The call did not finish in time.
    Timeout,
    /// The collaborator answered, but the answer cannot be used.
    Malformed(String),
    /// The collaborator session was already released.
    Released,
}

impl std::error::Error for CollaboratorError {}

impl From<ResponseError> for CollaboratorError {
    fn from(value: ResponseError) -> Self {
        match value {
            ResponseError::Timeout => CollaboratorError::Timeout,
            other => CollaboratorError::Http(other),
        }
    }
}
