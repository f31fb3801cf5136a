//! mroutemgrd - static multicast routing daemon
//!
//! Programs the kernel multicast forwarding cache from a static route
//! configuration. SIGHUP reloads the configuration, SIGINT/SIGTERM release
//! the kernel multicast routing API and exit.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use sonic_mroute_types::InterfaceTable;
use sonic_mroutemgrd::{
    discover_interfaces, KernelMrouteMgr, MroutemgrdConfig, DEFAULT_CONFIG_PATH,
};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// SONiC static multicast routing daemon
#[derive(Parser, Debug)]
#[command(name = "mroutemgrd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log filter (trace, debug, info, warn, error or an EnvFilter directive)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    if args.check {
        return match load_config(&args.config) {
            Ok(config) => {
                info!(routes = config.routes.len(), "Configuration OK");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("{:#}", e);
                ExitCode::FAILURE
            }
        };
    }

    info!("--- Starting mroutemgrd ---");
    match run(&args.config).await {
        Ok(()) => {
            info!("mroutemgrd exiting normally");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("mroutemgrd exiting with error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_level(true)
        .init();
}

fn load_config(path: &Path) -> anyhow::Result<MroutemgrdConfig> {
    let config = MroutemgrdConfig::load_or_default(path)?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    Ok(config)
}

fn interfaces() -> anyhow::Result<InterfaceTable> {
    let table = discover_interfaces()?;
    info!(count = table.len(), "Discovered interfaces");
    Ok(table)
}

async fn run(config_path: &Path) -> anyhow::Result<()> {
    let mut sighup = signal(SignalKind::hangup()).context("Failed to install SIGHUP handler")?;
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;

    let config = load_config(config_path)?;
    let mut mgr = KernelMrouteMgr::with_kernel(config);
    mgr.start(interfaces()?)
        .context("Failed initializing multicast routing")?;

    loop {
        tokio::select! {
            _ = sighup.recv() => {
                info!(path = %config_path.display(), "Received SIGHUP, reloading");
                let config = match load_config(config_path) {
                    Ok(config) => config,
                    Err(e) => {
                        warn!("Keeping current configuration: {:#}", e);
                        continue;
                    }
                };
                mgr.reload(config, interfaces()?)
                    .context("Failed re-initializing multicast routing")?;
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
                break;
            }
        }
    }

    mgr.stop();
    info!("Multicast routing released");
    Ok(())
}
