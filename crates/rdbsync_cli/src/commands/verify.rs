//! Verify command implementation.

use super::CliError;
use rdbsync_engine::{HttpClient, ResultStore, Verifier, VerifyReport};
use rdbsync_protocol::SubmitTime;

/// Runs the verify command.
pub fn run<S: HttpClient, D: HttpClient>(
    source: ResultStore<S>,
    destination: ResultStore<D>,
    page_size: u32,
) -> Result<VerifyReport, CliError> {
    println!("Verifying copies in {}", destination.base_url());
    println!();

    let verifier = Verifier::new(source, destination, page_size);
    match verifier.verify() {
        Ok(report) => {
            println!("Copies checked:           {}", report.verified);
            println!(
                "Latest source result:     {}",
                or_none(&report.latest_source_submit_time)
            );
            println!(
                "Latest synced result:     {}",
                or_none(&report.latest_synced_submit_time)
            );
            println!();
            println!("✓ Verification passed");
            Ok(report)
        }
        Err(e) => {
            println!("✗ Verification failed: {e}");
            Err(e.into())
        }
    }
}

fn or_none(value: &Option<SubmitTime>) -> String {
    value
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "(none)".to_string())
}
