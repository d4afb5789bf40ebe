//! # rdbsync Engine
//!
//! Incremental, idempotent copying of results between two ResultsDB
//! instances.
//!
//! This crate provides:
//! - `ResultStore`, a typed client for one ResultsDB v2.0 API
//! - Lazy pagination over result listings
//! - The sync state machine (discover cursor → fetch → duplicate check → copy)
//! - The verifier that audits copies against their source
//! - HTTP client abstraction with a `reqwest` and a loopback implementation
//!
//! ## Architecture
//!
//! The destination store is the only durable state. Each copied result
//! carries its source `id` and `submit_time` as provenance annotations in
//! its `data` bag; every pass:
//! 1. Reads the newest copy in the destination to find the resume cursor
//! 2. Lists source results submitted at or after the cursor, oldest first
//! 3. Skips results whose copy already exists, creates the rest
//!
//! ## Key Invariants
//!
//! - No duplicate copies: every candidate is checked before it is written
//! - No lost results: the cursor is inclusive, so a crashed pass is re-walked
//! - No internal retries: errors abort the pass and re-running is the recovery

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod http;
mod state;
mod store;
mod verify;

pub use config::{
    load_auth_token, SyncConfig, DEFAULT_DESTINATION_URL, DEFAULT_PAGE_SIZE, DEFAULT_SOURCE_URL,
    DEFAULT_TIMEOUT,
};
pub use error::{SyncError, SyncResult};
pub use http::{
    url_with_params, HttpClient, HttpResponse, LoopbackClient, LoopbackServer, ReqwestClient,
};
pub use state::{SyncEngine, SyncPassResult, SyncState, SyncStats};
pub use store::{ResultStore, ResultsIter, API_VERSION};
pub use verify::{Verifier, VerifyReport};

/// Re-exported so loopback servers can parse request URLs.
pub use reqwest::Url;
