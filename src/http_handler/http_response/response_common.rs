use strum_macros::Display;

#[derive(Debug, Display)]
pub enum ResponseError {
    /// 5xx answer, carries the status code.
    InternalServer(u16),
    /// 4xx answer, carries the status code and the body text.
    BadRequest(u16, String),
    NoConnection,
    Timeout,
    /// The body could not be decoded into the expected type.
    Decode,
    Unknown,
}

impl std::error::Error for ResponseError {}

impl From<reqwest::Error> for ResponseError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            ResponseError::Timeout
        } else if value.is_connect() {
            ResponseError::NoConnection
        } else if value.is_decode() {
            ResponseError::Decode
        } else if value.is_request() {
            ResponseError::BadRequest(0, value.to_string())
        } else {
            ResponseError::Unknown
        }
    }
}

/// Passes successful responses through and maps everything else to a [`ResponseError`].
pub(crate) async fn unwrap_return_code(response: reqwest::Response) -> Result<reqwest::Response, ResponseError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else if status.is_server_error() {
        Err(ResponseError::InternalServer(status.as_u16()))
    } else if status.is_client_error() {
        let text = response.text().await.unwrap_or_default();
        Err(ResponseError::BadRequest(status.as_u16(), text))
    } else {
        Err(ResponseError::Unknown)
    }
}
