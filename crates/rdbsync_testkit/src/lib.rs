//! # rdbsync Testkit
//!
//! Test utilities for rdbsync.
//!
//! This crate provides:
//! - `MemoryResultStore`, an in-memory ResultsDB served over the loopback
//!   HTTP seam
//! - Fixtures pairing a source and a destination store
//! - Property-based generators for source store contents
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rdbsync_testkit::prelude::*;
//!
//! #[test]
//! fn copies_everything() {
//!     let fixture = SyncFixture::new();
//!     fixture.seed_source([ci_result(1, "T1", "PASSED")]);
//!     fixture.engine(50).sync_once().unwrap();
//!     assert_eq!(fixture.destination.len(), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod memory_store;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::memory_store::*;
}

pub use fixtures::*;
pub use generators::*;
pub use memory_store::*;
