//! Typed client for one ResultsDB instance.

use crate::error::{SyncError, SyncResult};
use crate::http::{url_with_params, HttpClient, HttpResponse};
use rdbsync_protocol::{NewResult, ResultRecord, ResultsPage, ResultsQuery};
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use tracing::{debug, trace};

/// API version prefix appended to the base URL.
pub const API_VERSION: &str = "v2.0";

/// Client for a ResultsDB v2.0 API.
///
/// Holds the base URL, an optional write credential and a reusable HTTP
/// client; no other state.
pub struct ResultStore<C: HttpClient> {
    base_url: String,
    auth_token: Option<String>,
    client: C,
}

impl<C: HttpClient> ResultStore<C> {
    /// Creates a client for the API at `base_url`.
    ///
    /// `base_url` is the API root without the version prefix, e.g.
    /// `https://taskotron.fedoraproject.org/resultsdb_api/api`.
    pub fn new(base_url: impl Into<String>, client: C, auth_token: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            auth_token,
            client,
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns true if a write credential is configured.
    pub fn has_auth_token(&self) -> bool {
        self.auth_token.is_some()
    }

    /// Returns the underlying HTTP client.
    pub fn client(&self) -> &C {
        &self.client
    }

    fn results_url(&self) -> String {
        format!("{}/{}/results", self.base_url, API_VERSION)
    }

    /// Fetches one result by id.
    pub fn get_result(&self, id: i64) -> SyncResult<ResultRecord> {
        let url = format!("{}/{}", self.results_url(), id);
        let response = self.send_get(&url)?;

        if response.status == 404 {
            return Err(SyncError::NotFound {
                url,
                body: response.body_text(),
            });
        }
        decode(&url, check_status(&url, response)?)
    }

    /// Lists results matching `query`, following pagination lazily.
    ///
    /// No request is made until the iterator is first advanced, and each
    /// further page is fetched only once the previous one is consumed.
    pub fn get_results(&self, query: &ResultsQuery) -> ResultsIter<'_, C> {
        ResultsIter {
            store: self,
            next_url: Some(url_with_params(&self.results_url(), &query.to_params())),
            buffer: VecDeque::new(),
            pages_fetched: 0,
        }
    }

    /// Returns the first result of `query`, fetching a single-item page.
    pub fn latest_result(&self, query: &ResultsQuery) -> SyncResult<Option<ResultRecord>> {
        let query = query.clone().limit(1);
        self.get_results(&query).next().transpose()
    }

    /// Copies a source result into this store.
    ///
    /// The source `id` and `submit_time` are relocated into provenance
    /// annotations; the store assigns fresh values for both.
    pub fn create_result(&self, record: ResultRecord) -> SyncResult<()> {
        let url = self.results_url();
        let source_id = record.id;
        let body = NewResult::from_source(record, self.auth_token.clone());
        let body = serde_json::to_vec(&body)
            .map_err(|e| SyncError::Protocol(format!("failed to encode result: {e}")))?;

        let response = self
            .client
            .post(&url, body)
            .map_err(|e| SyncError::transport(&url, e))?;
        check_status(&url, response)?;

        debug!(source_id, store = %self.base_url, "created result");
        Ok(())
    }

    fn send_get(&self, url: &str) -> SyncResult<HttpResponse> {
        trace!(url, "GET");
        self.client
            .get(url)
            .map_err(|e| SyncError::transport(url, e))
    }

    fn fetch_page(&self, url: &str) -> SyncResult<ResultsPage> {
        let response = self.send_get(url)?;
        decode(url, check_status(url, response)?)
    }
}

fn check_status(url: &str, response: HttpResponse) -> SyncResult<HttpResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(SyncError::Remote {
            url: url.to_string(),
            status: response.status,
            body: response.body_text(),
        })
    }
}

fn decode<T: DeserializeOwned>(url: &str, response: HttpResponse) -> SyncResult<T> {
    serde_json::from_slice(&response.body)
        .map_err(|e| SyncError::Protocol(format!("failed to decode response from {url}: {e}")))
}

/// Lazy iterator over a paginated results listing.
///
/// Yields each result in store order. After an error is yielded the
/// iterator is exhausted; call [`ResultStore::get_results`] again to start
/// over.
pub struct ResultsIter<'a, C: HttpClient> {
    store: &'a ResultStore<C>,
    next_url: Option<SyncResult<String>>,
    buffer: VecDeque<ResultRecord>,
    pages_fetched: u64,
}

impl<C: HttpClient> ResultsIter<'_, C> {
    /// Number of pages requested so far.
    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched
    }
}

impl<C: HttpClient> Iterator for ResultsIter<'_, C> {
    type Item = SyncResult<ResultRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Some(Ok(record));
            }

            let url = match self.next_url.take()? {
                Ok(url) => url,
                Err(e) => return Some(Err(e)),
            };

            let page = match self.store.fetch_page(&url) {
                Ok(page) => page,
                Err(e) => return Some(Err(e)),
            };
            self.pages_fetched += 1;

            self.next_url = page.next_link().map(|link| Ok(link.to_string()));
            self.buffer.extend(page.data);
        }
    }
}

impl<C: HttpClient> std::iter::FusedIterator for ResultsIter<'_, C> {}
