//! Configuration for the sync engine.

use crate::error::SyncResult;
use crate::http::ReqwestClient;
use crate::store::ResultStore;
use std::io;
use std::path::Path;
use std::time::Duration;

/// Default source store (CentOS CI).
pub const DEFAULT_SOURCE_URL: &str = "https://resultsdb.ci.centos.org/resultsdb_api/api";
/// Default destination store (Fedora).
pub const DEFAULT_DESTINATION_URL: &str = "https://taskotron.fedoraproject.org/resultsdb_api/api";
/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
/// Default number of source results fetched per page.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Configuration for sync and verification passes.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the source store API.
    pub source_url: String,
    /// Base URL of the destination store API.
    pub destination_url: String,
    /// Timeout applied to every HTTP request.
    pub timeout: Duration,
    /// Page size for listing queries.
    pub page_size: u32,
    /// Sleep between passes; `None` runs a single pass.
    pub poll_interval: Option<Duration>,
    /// Credential attached to destination writes.
    pub auth_token: Option<String>,
}

impl SyncConfig {
    /// Creates a configuration for the given stores.
    pub fn new(source_url: impl Into<String>, destination_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            destination_url: destination_url.into(),
            timeout: DEFAULT_TIMEOUT,
            page_size: DEFAULT_PAGE_SIZE,
            poll_interval: None,
            auth_token: None,
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size.max(1);
        self
    }

    /// Runs continuously, sleeping `interval` after each pass.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Sets the write credential.
    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token;
        self
    }

    /// Opens one HTTP client per store, both using the configured timeout.
    pub fn connect(&self) -> SyncResult<(ResultStore<ReqwestClient>, ResultStore<ReqwestClient>)> {
        let source = ResultStore::new(
            self.source_url.clone(),
            ReqwestClient::new(self.timeout)?,
            self.auth_token.clone(),
        );
        let destination = ResultStore::new(
            self.destination_url.clone(),
            ReqwestClient::new(self.timeout)?,
            self.auth_token.clone(),
        );
        Ok((source, destination))
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_URL, DEFAULT_DESTINATION_URL)
    }
}

/// Reads the write credential from `path`.
///
/// A missing file means "no credential" rather than an error. Surrounding
/// whitespace is trimmed and an empty file also yields `None`.
pub fn load_auth_token(path: &Path) -> SyncResult<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let token = contents.trim();
            Ok((!token.is_empty()).then(|| token.to_string()))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
