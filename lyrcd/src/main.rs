//! lyrcd: infrared remote transmission daemon
//!
//! ```text
//! lyrcd                      Run with ./lyrcd.toml (or defaults)
//! lyrcd --config <path>      Load a custom config TOML
//! lyrcd --gen-config         Write default config to stdout
//! lyrcd --simulate           Use the virtual transmitter instead of pigpio
//! lyrcd --verbose            Log at debug level
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use lyrc_catalog::{load_catalog, Catalog};
use lyrc_engine::{CatalogSource, Connector, EngineLifecycle, PigpioConnector};
use lyrc_sim::VirtualConnector;
use lyrcd::{DaemonConfig, Server};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "lyrcd", version, about = "Infrared remote transmission daemon")]
struct Cli {
    /// Path to configuration TOML file
    #[arg(short, long, default_value = "lyrcd.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit
    #[arg(long)]
    gen_config: bool,

    /// Transmit through the virtual transmitter instead of pigpio
    #[arg(long)]
    simulate: bool,

    /// Override the remote definitions directory
    #[arg(long)]
    remotes: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "lyrcd={level},lyrc_engine={level},lyrc_catalog={level},lyrc_protocol={level},lyrc_sim={level}"
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Reads the remote definitions afresh for every engine start
fn catalog_source(path: PathBuf) -> CatalogSource {
    Arc::new(move || match load_catalog(&path) {
        Ok(catalog) => Arc::new(catalog),
        Err(e) => {
            warn!("{}; starting with no remotes", e);
            Arc::new(Catalog::new())
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.gen_config {
        println!("{}", DaemonConfig::default_toml()?);
        return Ok(());
    }

    let mut config = DaemonConfig::load(&cli.config)?;
    if let Some(remotes) = cli.remotes {
        config.remotes.path = remotes;
    }

    init_logging(cli.verbose || config.logging.verbose);
    info!("lyrcd v{}", env!("CARGO_PKG_VERSION"));
    if !cli.config.exists() {
        info!("No config at {}, using defaults", cli.config.display());
    }

    let connector: Arc<dyn Connector> = if cli.simulate {
        info!("Using the virtual transmitter");
        Arc::new(VirtualConnector::new(config.simulator.clone()))
    } else {
        info!("Using pigpiod at {}:{}", config.pigpio.host, config.pigpio.port);
        Arc::new(PigpioConnector::new(
            config.pigpio.host.clone(),
            config.pigpio.port,
        ))
    };
    info!(
        "Transmitting on GPIO {}, remotes from {}",
        config.engine.gpio_pin,
        config.remotes.path.display()
    );

    let lifecycle = Arc::new(EngineLifecycle::new(
        connector,
        config.engine.clone(),
        catalog_source(config.remotes.path.clone()),
    ));

    let address = config.server.bind_address();
    let server = Server::bind(&address, lifecycle.clone(), config.server.keep_alive())
        .await
        .with_context(|| format!("cannot listen on {}", address))?;

    tokio::select! {
        result = server.run() => result.context("listener failed")?,
        _ = tokio::signal::ctrl_c() => info!("Ctrl-C received, shutting down"),
    }

    lifecycle.shutdown().await;
    info!("lyrcd stopped");
    Ok(())
}
