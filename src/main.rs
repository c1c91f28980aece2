mod main_runtime;

use ats_console::cli::{Cli, Commands};
use clap::Parser;
use main_runtime::{init_logging, init_logging_simple};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    match &cli.command {
        Commands::Serve { .. } => init_logging(&config.logging),
        _ => init_logging_simple(cli.verbose),
    }

    cli.run(config).await
}
