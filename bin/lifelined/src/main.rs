//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Binary entrypoint for the lifeline agent daemon."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use lifeline_agent::{shutdown_signal, ContainerAgent};
use lifeline_common::{init_tracing, ContainerDaemonConfig, LogFormat};
use tracing::info;

#[derive(Debug, Parser)]
#[command(author, version, about = "Lifecycle agent for managed container components", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Start the agent and run until interrupted")]
    Start(StartArgs),
}

#[derive(Debug, Clone, clap::Args)]
struct StartArgs {
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config.json",
        help = "Path to the container daemon configuration"
    )]
    config: PathBuf,

    #[arg(long, value_enum, help = "Override the configured log format")]
    log_format: Option<CliLogFormat>,
}

impl Default for StartArgs {
    fn default() -> Self {
        Self {
            config: PathBuf::from("config.json"),
            log_format: None,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogFormat {
    Pretty,
    StructuredJson,
}

impl From<CliLogFormat> for LogFormat {
    fn from(value: CliLogFormat) -> Self {
        match value {
            CliLogFormat::Pretty => LogFormat::Pretty,
            CliLogFormat::StructuredJson => LogFormat::StructuredJson,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Start(StartArgs::default())) {
        Commands::Start(args) => start(args).await,
    }
}

async fn start(args: StartArgs) -> Result<()> {
    let loaded = ContainerDaemonConfig::load(&[args.config.clone()])
        .context("unable to load configuration")?;
    let mut config = loaded.config;
    if let Some(format) = args.log_format {
        config.logging.format = format.into();
    }
    init_tracing("lifelined", &config.logging)?;

    config.resolve_host_identity();
    info!(
        source = %loaded.source.display(),
        config = %serde_json::to_string(&config)?,
        "configuration loaded"
    );

    let agent = ContainerAgent::new(config).context("unable to construct agent")?;
    let report = agent.run_until(shutdown_signal()).await?;
    info!(
        ticks = report.ticks,
        deactivated = report.deactivated,
        final_state = %report.final_state,
        drained = report.drained,
        "lifelined exiting"
    );
    Ok(())
}
