//! rdbsync CLI
//!
//! Copies CI results from one ResultsDB instance into another and audits
//! the copies.
//!
//! # Commands
//!
//! - `sync` - Copy new results, once or on a polling interval
//! - `verify` - Check every copy against its source result
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use commands::CliError;
use rdbsync_engine::{
    SyncConfig, DEFAULT_DESTINATION_URL, DEFAULT_PAGE_SIZE, DEFAULT_SOURCE_URL, DEFAULT_TIMEOUT,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Log verbosity, named the way operators of the service know it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Debug,
    Info,
    #[value(alias = "warn")]
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    fn filter(self) -> LevelFilter {
        match self {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            // tracing has nothing above error
            LogLevel::Error | LogLevel::Critical => LevelFilter::ERROR,
        }
    }

    fn env_filter(self) -> EnvFilter {
        EnvFilter::default().add_directive(self.filter().into())
    }
}

/// Copies results between ResultsDB instances.
#[derive(Parser, Debug)]
#[command(name = "rdbsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base API URL of the store results are copied from
    #[arg(global = true, long, default_value = DEFAULT_SOURCE_URL)]
    source_url: String,

    /// Base API URL of the store results are copied into
    #[arg(global = true, long, default_value = DEFAULT_DESTINATION_URL)]
    destination_url: String,

    /// Per-request timeout in seconds
    #[arg(global = true, long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout: u64,

    /// File holding the destination write credential
    #[arg(global = true, long)]
    auth_token_file: Option<PathBuf>,

    /// Log verbosity
    #[arg(global = true, long, value_enum, ignore_case = true, default_value = "info")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Copy results not yet present in the destination
    Sync {
        /// Keep running, sleeping this many seconds between passes
        #[arg(long)]
        poll_interval: Option<u64>,

        /// Results requested per source page
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: u32,
    },

    /// Check every copied result against its source
    Verify {
        /// Copies requested per destination page
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: u32,
    },

    /// Show version information
    Version,
}

impl Cli {
    fn config(&self, page_size: u32) -> Result<SyncConfig, CliError> {
        let auth_token = match &self.auth_token_file {
            Some(path) => rdbsync_engine::load_auth_token(path)?,
            None => None,
        };
        Ok(
            SyncConfig::new(self.source_url.clone(), self.destination_url.clone())
                .with_timeout(Duration::from_secs(self.timeout))
                .with_page_size(page_size)
                .with_auth_token(auth_token),
        )
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(cli.log_level.env_filter())
        .init();

    match cli.command {
        Commands::Sync {
            poll_interval,
            page_size,
        } => {
            let mut config = cli.config(page_size)?;
            if let Some(seconds) = poll_interval {
                config = config.with_poll_interval(Duration::from_secs(seconds));
            }
            let (source, destination) = config.connect()?;
            commands::sync::run(config, source, destination)?;
        }
        Commands::Verify { page_size } => {
            let config = cli.config(page_size)?;
            let (source, destination) = config.connect()?;
            commands::verify::run(source, destination, config.page_size)?;
        }
        Commands::Version => {
            println!("rdbsync v{}", env!("CARGO_PKG_VERSION"));
            println!("ResultsDB API {}", rdbsync_engine::API_VERSION);
        }
    }

    Ok(())
}
