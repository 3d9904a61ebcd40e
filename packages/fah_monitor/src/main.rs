use anyhow::{Context, Result};
use clap::Parser;
use fah_client::{ClientSession, LogBuffer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::prelude::*;

mod config;
mod connection;
mod output;

use crate::config::{CliOverrides, ConnectionOverrides, FileConfig, MonitorConfig};
use crate::output::Format;

#[derive(Parser)]
#[command(name = "fahmon")]
#[command(about = "Watch a Folding@home client's slots, units and log")]
struct Cli {
    /// Client host (overrides [connection] host)
    #[arg(long)]
    host: Option<String>,

    /// Client command port (overrides [connection] port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Command socket password (overrides [connection] password)
    #[arg(long)]
    password: Option<String>,

    /// Configuration file
    #[arg(short, long, default_value = config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Output format for updates
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Also print the client's log as it arrives
    #[arg(long)]
    log: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            connection: ConnectionOverrides {
                host: self.host.clone(),
                port: self.port,
                password: self.password.clone(),
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let default_directive = if cli.debug {
        "fahmon=debug,fah_client=debug,info"
    } else {
        "fahmon=info,fah_client=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();

    let file_config: FileConfig = config::load_config(&cli.config, &cli.overrides())
        .extract()
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    let config = MonitorConfig::from_file(&file_config);

    let log = Arc::new(LogBuffer::new(config.log_max_lines));
    let session = Arc::new(ClientSession::standard().with_log_sink(log.clone()));

    let printer = tokio::spawn(output::print_updates(
        session.clone(),
        session.subscribe(),
        cli.format,
        cli.log.then_some(log),
    ));

    info!(address = %config.connection.address(), "Starting fahmon");
    let result = tokio::select! {
        result = connection::run(&config.connection, &config.updates, &session) => result,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            info!("Interrupted");
            Ok(())
        }
    };

    printer.abort();
    result
}
