//! Test fixtures: paired stores and ready-made engines.

use crate::memory_store::MemoryResultStore;
use rdbsync_engine::{LoopbackClient, ResultStore, SyncConfig, SyncEngine, Verifier};
use rdbsync_protocol::{ResultRecord, SubmitTime};
use serde_json::json;

/// Base URL the source store is served at.
pub const SOURCE_URL: &str = "http://source.test/resultsdb_api/api";
/// Base URL the destination store is served at.
pub const DESTINATION_URL: &str = "http://destination.test/resultsdb_api/api";

/// A store client wired straight to a [`MemoryResultStore`].
pub type LoopbackStore = ResultStore<LoopbackClient<MemoryResultStore>>;

/// Engine over two in-memory stores.
pub type LoopbackEngine = SyncEngine<LoopbackClient<MemoryResultStore>, LoopbackClient<MemoryResultStore>>;

/// Verifier over two in-memory stores.
pub type LoopbackVerifier = Verifier<LoopbackClient<MemoryResultStore>, LoopbackClient<MemoryResultStore>>;

/// Builds a result the way a CI system would submit it.
pub fn ci_result(id: i64, submit_time: impl Into<SubmitTime>, outcome: &str) -> ResultRecord {
    ResultRecord::new(id, submit_time)
        .with_data("outcome", outcome)
        .with_data("item", format!("pkg-{id}-1.0-1.fc26"))
        .with_field("outcome", json!(outcome))
        .with_field("testcase", json!({"name": "ci.pipeline"}))
        .with_field("note", json!(""))
}

/// A source and a destination store plus helpers to drive them.
#[derive(Debug, Clone)]
pub struct SyncFixture {
    /// Store results are copied from.
    pub source: MemoryResultStore,
    /// Store results are copied into.
    pub destination: MemoryResultStore,
    /// Credential handed to both clients.
    pub auth_token: Option<String>,
}

impl SyncFixture {
    /// Two empty stores.
    pub fn new() -> Self {
        Self {
            source: MemoryResultStore::new(SOURCE_URL),
            destination: MemoryResultStore::new(DESTINATION_URL),
            auth_token: None,
        }
    }

    /// Two empty stores; the destination only accepts writes carrying `token`.
    pub fn with_token(token: &str) -> Self {
        Self {
            source: MemoryResultStore::new(SOURCE_URL),
            destination: MemoryResultStore::new(DESTINATION_URL).with_required_token(token),
            auth_token: Some(token.to_string()),
        }
    }

    /// Seeds the source store.
    pub fn seed_source(&self, records: impl IntoIterator<Item = ResultRecord>) -> &Self {
        self.source.insert_all(records);
        self
    }

    /// A client for the source store.
    pub fn source_client(&self) -> LoopbackStore {
        ResultStore::new(
            self.source.base_url(),
            LoopbackClient::new(self.source.clone()),
            self.auth_token.clone(),
        )
    }

    /// A client for the destination store.
    pub fn destination_client(&self) -> LoopbackStore {
        ResultStore::new(
            self.destination.base_url(),
            LoopbackClient::new(self.destination.clone()),
            self.auth_token.clone(),
        )
    }

    /// Configuration pointing at both stores.
    pub fn config(&self, page_size: u32) -> SyncConfig {
        SyncConfig::new(self.source.base_url(), self.destination.base_url())
            .with_page_size(page_size)
            .with_auth_token(self.auth_token.clone())
    }

    /// An engine over both stores.
    pub fn engine(&self, page_size: u32) -> LoopbackEngine {
        SyncEngine::new(
            self.config(page_size),
            self.source_client(),
            self.destination_client(),
        )
    }

    /// A verifier over both stores.
    pub fn verifier(&self, page_size: u32) -> LoopbackVerifier {
        Verifier::new(self.source_client(), self.destination_client(), page_size)
    }
}

impl Default for SyncFixture {
    fn default() -> Self {
        Self::new()
    }
}
