//! HTTP client abstraction.
//!
//! The store client talks to ResultsDB through the [`HttpClient`] trait so
//! the network can be swapped out: [`ReqwestClient`] for real deployments,
//! [`LoopbackClient`] to route requests to an in-process server in tests.

use crate::error::{SyncError, SyncResult};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Url;
use std::time::Duration;

/// Status and body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the body as lossy UTF-8, for diagnostics.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// HTTP client abstraction.
///
/// `Err` means the request never produced an HTTP response; any status,
/// including errors, comes back as `Ok`.
pub trait HttpClient: Send + Sync {
    /// Sends a GET request to a fully built URL.
    fn get(&self, url: &str) -> Result<HttpResponse, String>;

    /// Sends a POST request with a JSON body.
    fn post(&self, url: &str, body: Vec<u8>) -> Result<HttpResponse, String>;
}

/// Appends query parameters to `url`.
pub fn url_with_params(url: &str, params: &[(String, String)]) -> SyncResult<String> {
    if params.is_empty() {
        return Ok(url.to_string());
    }
    Url::parse_with_params(url, params)
        .map(String::from)
        .map_err(|e| SyncError::Client(format!("invalid url {url}: {e}")))
}

/// Blocking [`HttpClient`] backed by `reqwest`.
///
/// The underlying connection pool is reused across requests; the timeout
/// applies to each request individually.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a client with the given per-request timeout.
    pub fn new(timeout: Duration) -> SyncResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("rdbsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::Client(e.to_string()))?;

        Ok(Self { client })
    }

    fn read(response: reqwest::blocking::Response) -> Result<HttpResponse, String> {
        let status = response.status().as_u16();
        let body = response.bytes().map_err(|e| e.to_string())?;
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<HttpResponse, String> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .map_err(|e| e.to_string())?;
        Self::read(response)
    }

    fn post(&self, url: &str, body: Vec<u8>) -> Result<HttpResponse, String> {
        let response = self
            .client
            .post(url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(|e| e.to_string())?;
        Self::read(response)
    }
}

/// Trait for servers that can handle loopback requests.
pub trait LoopbackServer {
    /// Handles a GET request for `url`.
    fn handle_get(&self, url: &Url) -> HttpResponse;

    /// Handles a POST request for `url`.
    fn handle_post(&self, url: &Url, body: &[u8]) -> HttpResponse;
}

/// An HTTP client that routes requests directly to an in-process server.
///
/// Useful for testing without actual network overhead.
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
}

impl<S: LoopbackServer + Send + Sync> LoopbackClient<S> {
    /// Creates a new loopback client connected to the given server.
    pub fn new(server: S) -> Self {
        Self { server }
    }

    /// Returns the server behind this client.
    pub fn server(&self) -> &S {
        &self.server
    }
}

impl<S: LoopbackServer + Send + Sync> HttpClient for LoopbackClient<S> {
    fn get(&self, url: &str) -> Result<HttpResponse, String> {
        let url = Url::parse(url).map_err(|e| e.to_string())?;
        Ok(self.server.handle_get(&url))
    }

    fn post(&self, url: &str, body: Vec<u8>) -> Result<HttpResponse, String> {
        let url = Url::parse(url).map_err(|e| e.to_string())?;
        Ok(self.server.handle_post(&url, &body))
    }
}
