//! # tc-runner
//!
//! Composition root for the trade-companion sync engine.
//!
//! Loads a JSON configuration file, wires the store, stream client, and
//! connection supervisor together, drives the authentication channel from
//! the configured session-token environment variable, and runs until
//! interrupted.
//!
//! # Usage
//!
//! ```bash
//! TC_SESSION_TOKEN=... tc-runner config.json --log-level info
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tc_store::AppStore;
use tc_stream::supervisor::{ConnectionSupervisor, SupervisorConfig};
use tc_stream::{EventStreamClient, SseTransport};
use tokio::sync::watch;
use tracing::{info, warn};

/// Trade Companion Sync Runner.
#[derive(Parser)]
#[command(name = "tc-runner", about = "Trade Companion Sync Runner")]
struct Cli {
    /// Configuration file path (JSON).
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Optional log directory for file output.
    #[arg(long)]
    log_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration (before logging so the module name is known)
    let config = tc_core::config::load_config(&cli.config)?;

    // 2. Initialize logging
    let log_dir = cli.log_dir.clone().or_else(|| config.log_path());
    tc_core::logging::init_logging(&cli.log_level, log_dir.as_deref(), &config.module_name());

    info!(
        "tc-runner starting — config={}, stream={}",
        cli.config.display(),
        config.stream.url,
    );

    // 3. Build the pipeline at the composition root: store, transport,
    //    client, supervisor — all explicitly constructed and injected.
    let store = Arc::new(AppStore::new());

    let token = std::env::var(config.stream.effective_token_env()).ok();
    let (token_tx, token_rx) = watch::channel(token.clone());

    let transport = Arc::new(SseTransport::new(config.stream.url.clone()));
    let client = Arc::new(EventStreamClient::new(
        transport,
        token_rx,
        config.stream.effective_staleness(),
    ));

    let supervisor = Arc::new(ConnectionSupervisor::new(
        Arc::clone(&client),
        Arc::clone(&store),
        SupervisorConfig::from_settings(&config.supervisor),
    ));

    // 4. Drive the auth channel from the session token and start supervising
    let (auth_tx, auth_rx) = watch::channel(token.is_some());
    supervisor.start(auth_rx);

    if token.is_none() {
        warn!(
            "no session token in ${} — supervisor idle until one is provided",
            config.stream.effective_token_env(),
        );
    }

    // 5. Report store changes at debug level until shutdown
    let mut changes = store.subscribe_changes();
    let report_store = Arc::clone(&store);
    let reporter = tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let conn = report_store.connection();
            tracing::debug!(
                version = *changes.borrow(),
                connected = conn.is_connected,
                active_positions = report_store.active_positions().len(),
                "store updated",
            );
        }
    });

    info!("running — press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    // 6. Graceful teardown
    let _ = auth_tx.send(false);
    drop(token_tx);
    supervisor.stop();
    reporter.abort();

    info!("stopped — goodbye");
    Ok(())
}
