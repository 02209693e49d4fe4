//! vigil - language server binary.
//!
//! Speaks JSON-RPC over stdin/stdout. Logs go to a file, never to stdout,
//! which carries the protocol.

use std::sync::{Arc, Mutex};
use std::{
    fs::{self, File, OpenOptions},
    path::PathBuf,
    process,
};

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use vigil_config::VigilConfig;
use vigil_lsp::{DelimiterEngine, Dispatcher};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No log file: stay silent rather than write into the protocol stream.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> (Option<(PathBuf, File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: next to the config file, ~/.vigil/logs/vigil.log
    if let Some(config_path) = VigilConfig::path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("vigil.log"));
    }

    // Fallback: ./.vigil/logs/vigil.log
    candidates.push(PathBuf::from(".vigil").join("logs").join("vigil.log"));

    candidates
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = match VigilConfig::load() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            tracing::warn!("{e}; continuing with defaults");
            VigilConfig::default()
        }
    };

    let engine = Arc::new(DelimiterEngine::new(&config.engine));
    let dispatcher = Dispatcher::new(engine, config.server);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting");

    let exit = vigil_lsp::run(tokio::io::stdin(), tokio::io::stdout(), dispatcher).await?;
    tracing::info!(?exit, "Exiting");
    process::exit(exit.code());
}
