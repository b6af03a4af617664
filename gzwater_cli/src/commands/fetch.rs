//! The `fetch` subcommand: a single acquisition cycle.

use std::path::Path;

use anyhow::{bail, Result};
use clap::Args;
use gzwater_lib::{Config, Pipeline};

use crate::output::{print_acquisition, OutputFormat};

#[derive(Args)]
pub struct FetchArgs {
    /// Exit with an error when the portal yielded nothing and only synthetic data is available
    #[arg(long)]
    pub strict: bool,
}

pub async fn run(args: &FetchArgs, config_path: Option<&Path>, format: &OutputFormat) -> Result<()> {
    let config = Config::load(config_path)?;
    let credentials = config.credentials()?;
    let pipeline = Pipeline::from_config(&config);

    let acquisition = pipeline.fetch_billing_record(&credentials).await?;
    print_acquisition(&acquisition, format)?;

    if args.strict && acquisition.is_synthetic() {
        bail!("no real billing data could be retrieved; output above is synthetic");
    }
    Ok(())
}
