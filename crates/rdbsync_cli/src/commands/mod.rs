//! CLI command implementations.

pub mod sync;
pub mod verify;

use rdbsync_engine::SyncError;
use thiserror::Error;

/// Errors surfaced by the CLI.
#[derive(Error, Debug)]
pub enum CliError {
    /// A sync or verification run failed.
    #[error(transparent)]
    Sync(#[from] SyncError),
}
