//! In-memory ResultsDB emulation.
//!
//! `MemoryResultStore` answers the three endpoints rdbsync uses through the
//! [`LoopbackServer`] seam, modelling the behaviour a real ResultsDB shows:
//!
//! - every `data` value is stored and returned as a list of strings
//! - created results get a fresh `id` and `submit_time`
//! - listings honour `since`, `_sort`, `limit` and `data` equality filters
//!   and paginate through `next` links
//!
//! Handles are cheap clones sharing the same state, so a test can keep one
//! while the engine owns another.

use parking_lot::RwLock;
use rdbsync_engine::{HttpResponse, LoopbackServer, Url};
use rdbsync_protocol::{
    DataValue, NewResult, ResultData, ResultRecord, ResultsPage, Sort, SortDirection, SubmitTime,
};
use serde_json::json;
use std::sync::Arc;

/// Page size used when a listing does not ask for one.
pub const DEFAULT_LIMIT: usize = 20;

const PAGE_PARAM: &str = "page";

/// A request seen by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// `GET` or `POST`.
    pub method: &'static str,
    /// Full request URL.
    pub url: String,
}

#[derive(Debug, Default)]
struct StoreState {
    results: Vec<ResultRecord>,
    clock: i64,
    requests: Vec<RecordedRequest>,
    required_token: Option<String>,
    failure: Option<Failure>,
}

#[derive(Debug, Clone, Copy)]
struct Failure {
    remaining_ok: usize,
    status: u16,
}

/// Shared-state, in-memory ResultsDB.
#[derive(Debug, Clone)]
pub struct MemoryResultStore {
    base_url: String,
    state: Arc<RwLock<StoreState>>,
}

impl MemoryResultStore {
    /// Creates an empty store serving `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            state: Arc::new(RwLock::new(StoreState::default())),
        }
    }

    /// Rejects POSTs whose `_auth_token` differs from `token`.
    pub fn with_required_token(self, token: impl Into<String>) -> Self {
        self.state.write().required_token = Some(token.into());
        self
    }

    /// Returns the API base URL (without version prefix).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Seeds a result, keeping its `id` and `submit_time`.
    pub fn insert(&self, mut record: ResultRecord) {
        record.data = normalize(record.data);
        self.state.write().results.push(record);
    }

    /// Seeds several results.
    pub fn insert_all(&self, records: impl IntoIterator<Item = ResultRecord>) {
        for record in records {
            self.insert(record);
        }
    }

    /// Overwrites one `data` entry of a stored result.
    pub fn set_data(&self, id: i64, key: &str, value: impl Into<DataValue>) -> bool {
        let mut state = self.state.write();
        match state.results.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record
                    .data
                    .insert(key.to_string(), normalize_value(value.into()));
                true
            }
            None => false,
        }
    }

    /// Overwrites the submit time of a stored result.
    pub fn set_submit_time(&self, id: i64, submit_time: impl Into<SubmitTime>) -> bool {
        let mut state = self.state.write();
        match state.results.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.submit_time = submit_time.into();
                true
            }
            None => false,
        }
    }

    /// Deletes a stored result.
    pub fn remove(&self, id: i64) -> bool {
        let mut state = self.state.write();
        let before = state.results.len();
        state.results.retain(|r| r.id != id);
        state.results.len() != before
    }

    /// Returns a stored result as it would be served.
    pub fn get(&self, id: i64) -> Option<ResultRecord> {
        self.state.read().results.iter().find(|r| r.id == id).cloned()
    }

    /// Returns every stored result in insertion order.
    pub fn results(&self) -> Vec<ResultRecord> {
        self.state.read().results.clone()
    }

    /// Number of stored results.
    pub fn len(&self) -> usize {
        self.state.read().results.len()
    }

    /// Returns true if the store holds no results.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every request served so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.read().requests.clone()
    }

    /// Number of POST requests served so far.
    pub fn post_count(&self) -> usize {
        self.state
            .read()
            .requests
            .iter()
            .filter(|r| r.method == "POST")
            .count()
    }

    /// Forgets recorded requests.
    pub fn clear_requests(&self) {
        self.state.write().requests.clear();
    }

    /// Serves `ok_requests` more requests normally, then answers every
    /// request with `status`.
    pub fn fail_after(&self, ok_requests: usize, status: u16) {
        self.state.write().failure = Some(Failure {
            remaining_ok: ok_requests,
            status,
        });
    }

    /// Stops injecting failures.
    pub fn heal(&self) {
        self.state.write().failure = None;
    }

    fn record_request(&self, method: &'static str, url: &Url) -> Option<HttpResponse> {
        let mut state = self.state.write();
        state.requests.push(RecordedRequest {
            method,
            url: url.to_string(),
        });

        let failure = state.failure.as_mut()?;
        if failure.remaining_ok == 0 {
            return Some(HttpResponse::new(
                failure.status,
                json!({"message": "injected failure"}).to_string(),
            ));
        }
        failure.remaining_ok -= 1;
        None
    }

    fn route<'a>(&self, url: &'a Url) -> Option<Route<'a>> {
        let (_, rest) = url.path().split_once("/v2.0/results")?;
        match rest.trim_end_matches('/') {
            "" => Some(Route::Collection),
            item => item.strip_prefix('/').map(Route::Item),
        }
    }

    fn get_item(&self, id: &str) -> HttpResponse {
        let found = id.parse::<i64>().ok().and_then(|id| self.get(id));
        match found {
            Some(record) => json_response(200, &record),
            None => HttpResponse::new(404, json!({"message": "Result not found"}).to_string()),
        }
    }

    fn list(&self, url: &Url) -> HttpResponse {
        let mut since = None;
        let mut sort = None;
        let mut limit = DEFAULT_LIMIT;
        let mut page = 0usize;
        let mut filters = Vec::new();

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "since" => since = Some(value.into_owned()),
                "_sort" => match Sort::parse(&value) {
                    Some(parsed) => sort = Some(parsed),
                    None => return bad_request(format!("invalid _sort: {value}")),
                },
                "limit" => match value.parse::<usize>() {
                    Ok(parsed) if parsed > 0 => limit = parsed,
                    _ => return bad_request(format!("invalid limit: {value}")),
                },
                PAGE_PARAM => match value.parse() {
                    Ok(parsed) => page = parsed,
                    Err(_) => return bad_request(format!("invalid page: {value}")),
                },
                _ => filters.push((key.into_owned(), value.into_owned())),
            }
        }

        let mut matching: Vec<ResultRecord> = self
            .state
            .read()
            .results
            .iter()
            .filter(|r| since.as_deref().map_or(true, |s| submitted_since(r, s)))
            .filter(|r| filters.iter().all(|(k, v)| matches_filter(&r.data, k, v)))
            .cloned()
            .collect();

        let sort = sort.unwrap_or_else(|| Sort::descending("submit_time"));
        matching.sort_by(|a, b| {
            let order = match sort.field.as_str() {
                "id" => a.id.cmp(&b.id),
                _ => a.submit_time.cmp(&b.submit_time).then(a.id.cmp(&b.id)),
            };
            match sort.direction {
                SortDirection::Ascending => order,
                SortDirection::Descending => order.reverse(),
            }
        });

        let start = page.saturating_mul(limit).min(matching.len());
        let end = start.saturating_add(limit).min(matching.len());
        let next = (end < matching.len()).then(|| next_page_url(url, page + 1));

        json_response(
            200,
            &ResultsPage::new(matching[start..end].to_vec(), next),
        )
    }

    fn create(&self, body: &[u8]) -> HttpResponse {
        let new: NewResult = match serde_json::from_slice(body) {
            Ok(new) => new,
            Err(e) => return bad_request(format!("invalid result: {e}")),
        };

        let mut state = self.state.write();
        if let Some(required) = &state.required_token {
            if new.auth_token.as_ref() != Some(required) {
                return HttpResponse::new(
                    401,
                    json!({"message": "invalid auth token"}).to_string(),
                );
            }
        }

        state.clock += 1;
        let id = state.results.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let record = ResultRecord {
            id,
            submit_time: SubmitTime::Integer(state.clock),
            data: normalize(new.data),
            fields: new.fields,
        };
        state.results.push(record.clone());

        json_response(201, &record)
    }
}

enum Route<'a> {
    Collection,
    Item(&'a str),
}

impl LoopbackServer for MemoryResultStore {
    fn handle_get(&self, url: &Url) -> HttpResponse {
        if let Some(failure) = self.record_request("GET", url) {
            return failure;
        }
        match self.route(url) {
            Some(Route::Collection) => self.list(url),
            Some(Route::Item(id)) => self.get_item(id),
            None => not_found(),
        }
    }

    fn handle_post(&self, url: &Url, body: &[u8]) -> HttpResponse {
        if let Some(failure) = self.record_request("POST", url) {
            return failure;
        }
        match self.route(url) {
            Some(Route::Collection) => self.create(body),
            Some(Route::Item(_)) => HttpResponse::new(
                405,
                json!({"message": "method not allowed"}).to_string(),
            ),
            None => not_found(),
        }
    }
}

/// Converts a `data` bag to the list-of-strings form ResultsDB serves.
pub fn normalize(data: ResultData) -> ResultData {
    data.into_iter()
        .map(|(key, value)| (key, normalize_value(value)))
        .collect()
}

fn normalize_value(value: DataValue) -> DataValue {
    match value {
        DataValue::List(items) => DataValue::List(
            items
                .into_iter()
                .map(|item| DataValue::Text(item.unwrap_single().to_query_value()))
                .collect(),
        ),
        scalar => DataValue::List(vec![DataValue::Text(scalar.to_query_value())]),
    }
}

fn matches_filter(data: &ResultData, key: &str, expected: &str) -> bool {
    match data.get(key) {
        Some(DataValue::List(items)) => items.iter().any(|v| v.to_query_value() == expected),
        Some(value) => value.to_query_value() == expected,
        None => false,
    }
}

fn submitted_since(record: &ResultRecord, since: &str) -> bool {
    match &record.submit_time {
        SubmitTime::Integer(value) => since.parse::<i64>().map_or(false, |since| *value >= since),
        SubmitTime::Text(value) => value.as_str() >= since,
    }
}

fn next_page_url(url: &Url, page: usize) -> String {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != PAGE_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut next = url.clone();
    next.query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair(PAGE_PARAM, &page.to_string());
    next.to_string()
}

fn json_response<T: serde::Serialize>(status: u16, value: &T) -> HttpResponse {
    match serde_json::to_vec(value) {
        Ok(body) => HttpResponse::new(status, body),
        Err(e) => HttpResponse::new(500, json!({"message": e.to_string()}).to_string()),
    }
}

fn bad_request(message: String) -> HttpResponse {
    HttpResponse::new(400, json!({"message": message}).to_string())
}

fn not_found() -> HttpResponse {
    HttpResponse::new(404, json!({"message": "not found"}).to_string())
}
