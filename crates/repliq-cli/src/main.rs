use anyhow::Result;
use clap::Parser;
use repliq_cli::{commands, logging, Cli, ToolConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, config_missing) = ToolConfig::load(cli.config.as_deref())?;

    let log_dir = cli.log_dir.clone().unwrap_or_else(|| config.log_dir.clone());
    let (_guard, log_file) = logging::init(&log_dir)?;
    tracing::info!("repliq starting, logging to {}", log_file.display());
    if let (true, Some(path)) = (config_missing, cli.config.as_ref()) {
        tracing::warn!("Config file not found, using defaults: {}", path.display());
    }

    cli.validate()?;
    commands::run(&cli, &config).await
}
