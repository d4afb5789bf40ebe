//! # rdbsync Protocol
//!
//! Data types for talking to a ResultsDB v2.0 API.
//!
//! This crate provides:
//! - `ResultRecord` with its `data` bag and submit time
//! - Provenance annotations and the field remapping applied on copy
//! - `ResultsQuery` for listing filters, ordering and page size
//! - `ResultsPage`, the paginated listing envelope
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod page;
mod provenance;
mod query;
mod record;

pub use page::ResultsPage;
pub use provenance::{
    NewResult, Provenance, ProvenanceError, ORIGIN_FLAG_KEY, ORIGIN_FLAG_QUERY_VALUE,
    ORIGIN_ID_KEY, ORIGIN_SUBMIT_TIME_KEY, PROVENANCE_KEYS,
};
pub use query::{ResultsQuery, Sort, SortDirection, SUBMIT_TIME_FIELD};
pub use record::{DataValue, ResultData, ResultRecord, SubmitTime};
