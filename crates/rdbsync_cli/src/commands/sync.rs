//! Sync command implementation.

use super::CliError;
use rdbsync_engine::{HttpClient, ResultStore, SyncConfig, SyncEngine, SyncStats};
use tracing::{error, warn};

/// Runs the sync command.
///
/// With a poll interval the engine keeps running until a pass fails;
/// without one it makes a single pass.
pub fn run<S: HttpClient, D: HttpClient>(
    config: SyncConfig,
    source: ResultStore<S>,
    destination: ResultStore<D>,
) -> Result<SyncStats, CliError> {
    if !destination.has_auth_token() {
        warn!("no auth token configured, the destination may reject writes");
    }

    let engine = SyncEngine::new(config, source, destination);
    match engine.run() {
        Ok(()) => {
            let stats = engine.stats();
            println!(
                "Copied {} result(s), skipped {} already present",
                stats.results_copied, stats.results_skipped
            );
            Ok(stats)
        }
        Err(e) => {
            error!(error = %e, state = ?engine.state(), "sync failed");
            Err(e.into())
        }
    }
}
