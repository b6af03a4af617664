mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "gzwater")]
#[command(about = "Fetch water billing data from the Guangzhou water supply portal")]
struct Cli {
    /// Output format: table, json or markdown
    #[arg(long, default_value = "table", global = true)]
    output: String,

    /// Path to a TOML config file (GZWATER_* environment variables override it)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one billing acquisition and print the result
    Fetch(commands::fetch::FetchArgs),
    /// Poll the portal on a fixed interval until interrupted
    Watch(commands::watch::WatchArgs),
    /// List the published metrics and their display metadata
    Sensors,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gzwater_cli=info".parse()?)
                .add_directive("gzwater_lib=info".parse()?)
                .add_directive("gzwater_api=info".parse()?),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let format = match cli.output.as_str() {
        "json" => OutputFormat::Json,
        "markdown" => OutputFormat::Markdown,
        _ => OutputFormat::Table,
    };

    match &cli.command {
        Commands::Fetch(args) => commands::fetch::run(args, cli.config.as_deref(), &format).await?,
        Commands::Watch(args) => commands::watch::run(args, cli.config.as_deref(), &format).await?,
        Commands::Sensors => output::print_sensors(&format)?,
    }

    Ok(())
}
