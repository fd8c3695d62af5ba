//! Action dispatch for the `repliq` binary.

use tracing::{error, info};

use repliq_engine::render::write_csv_file;
use repliq_engine::{
    accept_pending, clean_destination, clean_source, collect_summary, create_relationships, render,
    resolve_pool, AcceptOptions, AlwaysApprove, BatchReport, CleanOptions, ClusterApi,
    ConfirmGate, CreateOptions, Rendered, ReplError, ReportFormat,
};

use crate::cli::{ActionArg, Cli};
use crate::client::RestCluster;
use crate::config::ToolConfig;
use crate::prompt::{resolve_password, TerminalGate};

/// Run the selected action. Only fatal errors are returned.
pub async fn run(cli: &Cli, config: &ToolConfig) -> anyhow::Result<()> {
    match cli.action {
        ActionArg::Summary => summary(cli, config).await,
        ActionArg::Create => create(cli, config).await,
        ActionArg::Accept => accept(cli, config).await,
        ActionArg::Clean => clean(cli, config).await,
    }
}

/// Destination network to draw addresses from.
pub fn network_for(cli: &Cli, config: &ToolConfig) -> String {
    cli.dst_network
        .clone()
        .unwrap_or_else(|| config.default_network.clone())
}

/// Create options from the command line.
pub fn create_options(cli: &Cli) -> Result<CreateOptions, ReplError> {
    Ok(CreateOptions {
        basepath: cli.basepath.clone(),
        dst_path: cli.dst_path.clone(),
        filter: cli.filter()?,
        allow_non_empty_dir: cli.allow_non_empty_dir,
    })
}

/// Source clean options from the command line.
pub fn clean_options(cli: &Cli) -> Result<CleanOptions, ReplError> {
    Ok(CleanOptions {
        basepath: cli.basepath.clone(),
        filter: cli.filter()?,
        set_readonly: cli.set_readonly,
    })
}

async fn connect(
    side: &str,
    host: Option<&str>,
    user: Option<&str>,
    password: Option<&str>,
    config: &ToolConfig,
) -> Result<RestCluster, ReplError> {
    let (host, user) = match (host, user) {
        (Some(host), Some(user)) => (host, user),
        _ => {
            return Err(ReplError::Configuration(format!(
                "{} host and user are required",
                side
            )))
        }
    };
    let password = resolve_password(password, user, host)?;
    info!("Connecting to {} cluster {}", side, host);
    RestCluster::connect(host, user, &password, config).await
}

async fn connect_source(cli: &Cli, config: &ToolConfig) -> Result<RestCluster, ReplError> {
    connect(
        "source",
        cli.src_host.as_deref(),
        cli.src_user.as_deref(),
        cli.src_password.as_deref(),
        config,
    )
    .await
}

async fn connect_destination(cli: &Cli, config: &ToolConfig) -> Result<RestCluster, ReplError> {
    connect(
        "destination",
        cli.dst_host.as_deref(),
        cli.dst_user.as_deref(),
        cli.dst_password.as_deref(),
        config,
    )
    .await
}

fn finish(report: &BatchReport) {
    println!("{}", report.summary_line());
}

async fn summary(cli: &Cli, config: &ToolConfig) -> anyhow::Result<()> {
    let source = connect_source(cli, config).await?;

    let (dst_session, dst_error) = if cli.has_destination() {
        match connect_destination(cli, config).await {
            Ok(session) => (Some(session), None),
            Err(e) => {
                error!("Could not connect to destination cluster: {}", e);
                (None, Some(e))
            }
        }
    } else {
        (None, None)
    };
    let destination = match (&dst_session, dst_error) {
        (Some(session), _) => Some(Ok(session as &dyn ClusterApi)),
        (None, Some(e)) => Some(Err(e)),
        (None, None) => None,
    };

    let report = collect_summary(&source, destination).await?;

    if !cli.csv_only {
        if let Rendered::Text(text) = render(&report, cli.format.into()) {
            println!("{}", text);
        }
    }

    if let Some(path) = &cli.csv {
        if let Rendered::Records(rows) = render(&report, ReportFormat::Csv) {
            match write_csv_file(path, &rows) {
                Ok(()) => println!("Saved to CSV: {}", path.display()),
                Err(e) => error!("Failed to write CSV file {}: {}", path.display(), e),
            }
        }
    }
    Ok(())
}

async fn create(cli: &Cli, config: &ToolConfig) -> anyhow::Result<()> {
    let opts = create_options(cli)?;
    let source = connect_source(cli, config).await?;
    let destination = connect_destination(cli, config).await?;

    let mut pool = resolve_pool(&destination, &cli.dst, &network_for(cli, config)).await?;
    info!("Destination addresses: {}", pool.addresses().join(", "));

    let report = create_relationships(&source, &destination, &mut pool, &opts).await?;
    finish(&report);
    Ok(())
}

async fn accept(cli: &Cli, config: &ToolConfig) -> anyhow::Result<()> {
    let destination = connect_destination(cli, config).await?;
    let opts = AcceptOptions {
        allow_non_empty_dir: cli.allow_non_empty_dir,
        confirm: cli.confirm,
    };
    let gate: &dyn ConfirmGate = if cli.confirm {
        &TerminalGate
    } else {
        &AlwaysApprove
    };

    let report = accept_pending(&destination, &opts, gate).await?;
    finish(&report);
    Ok(())
}

async fn clean(cli: &Cli, config: &ToolConfig) -> anyhow::Result<()> {
    let opts = clean_options(cli)?;

    if cli.has_source() {
        let source = connect_source(cli, config).await?;
        let report = clean_source(&source, &opts).await?;
        finish(&report);
    }
    if cli.has_destination() {
        let destination = connect_destination(cli, config).await?;
        let report = clean_destination(&destination, &cli.basepath).await?;
        finish(&report);
    }
    Ok(())
}
