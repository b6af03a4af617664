//! The `watch` subcommand: poll on a fixed cadence until Ctrl-C.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use gzwater_lib::{Config, Pipeline, Poller};
use tokio_util::sync::CancellationToken;

use crate::output::{print_readings, OutputFormat};

#[derive(Args)]
pub struct WatchArgs {
    /// Polling interval in seconds (defaults to the configured interval, one day)
    #[arg(long)]
    pub interval: Option<u64>,
}

pub async fn run(args: &WatchArgs, config_path: Option<&Path>, format: &OutputFormat) -> Result<()> {
    let config = Config::load(config_path)?;
    let credentials = config.credentials()?;
    let pipeline = Pipeline::from_config(&config);
    let interval = args
        .interval
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.poll_interval());

    let poller = Poller::new(pipeline, credentials, interval);
    let store = poller.store();
    let cancel = CancellationToken::new();

    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
                return;
            }
            tracing::info!("Interrupt received, shutting down");
            cancel.cancel();
        })
    };

    poller.run(cancel).await;
    ctrl_c.abort();

    print_readings(&store.snapshot(), store.last_error().as_deref(), format)?;
    Ok(())
}
