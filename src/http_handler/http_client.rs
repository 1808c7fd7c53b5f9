use super::http_request::request_common::{HTTPRequestMethod, JSONBodyHTTPRequestType};
use super::http_response::response_common::{ResponseError, unwrap_return_code};

/// A simple wrapper around `reqwest::Client` used to manage HTTP requests
/// with a preconfigured base URL and default settings.
///
/// One client is created per collaborator service (plate solver, sight
/// reduction) and shared by all sighting tasks.
#[derive(Debug)]
pub(crate) struct HTTPClient {
    /// The underlying `reqwest::Client` used to perform HTTP requests.
    client: reqwest::Client,
    /// Base URL for the service, prepended to all endpoint paths.
    base_url: String,
}

impl HTTPClient {
    /// Default timeout for requests that do not specify their own.
    const DEF_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

    /// Constructs a new `HTTPClient` with the given base URL.
    ///
    /// # Arguments
    /// * `base_url` – The root URL for all HTTP requests (e.g., `"http://localhost:33100"`).
    ///
    /// # Returns
    /// A configured `HTTPClient` instance or the builder error.
    pub(crate) fn new(base_url: &str) -> Result<HTTPClient, reqwest::Error> {
        Ok(HTTPClient {
            client: reqwest::Client::builder().timeout(Self::DEF_TIMEOUT).build()?,
            base_url: String::from(base_url.trim_end_matches('/')),
        })
    }

    /// Returns the base URL that the client was initialized with.
    pub(crate) fn url(&self) -> &str { self.base_url.as_str() }

    /// Sends a request with a JSON body and parses the JSON answer.
    pub(crate) async fn send_json<T>(&self, request: &T) -> Result<T::Response, ResponseError>
    where T: JSONBodyHTTPRequestType {
        let url = format!("{}{}", self.base_url, request.endpoint());
        let mut builder = match request.request_method() {
            HTTPRequestMethod::Post => self.client.post(url),
        };
        if let Some(timeout) = request.timeout() {
            builder = builder.timeout(timeout);
        }
        let response = builder.headers(request.header_params()).json(request.body()).send().await?;
        let response = unwrap_return_code(response).await?;
        Ok(response.json::<T::Response>().await?)
    }
}
