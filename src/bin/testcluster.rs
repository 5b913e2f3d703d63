//! Run a mock cluster from the command line

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use testcluster::common::{format_bytes, parse_duration, ServiceMock};
use testcluster::{ClusterConfig, TestCluster};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "testcluster")]
#[command(about = "Mock directory / catalog / storage cluster for client tests")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a cluster and keep it up until Ctrl-C
    Up {
        /// Number of storage devices
        #[arg(long, default_value = "1")]
        storage_devices: usize,

        /// TOML config file (defaults to ./testcluster.toml if present)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Stop after this long (e.g. "30s", "5m") instead of waiting for Ctrl-C
        #[arg(long)]
        duration: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Up {
            storage_devices,
            config,
            duration,
        } => {
            let config = ClusterConfig::load(config.as_deref())?;

            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| config.log_level.clone().into()),
                )
                .with(tracing_subscriber::fmt::layer())
                .init();

            let run_for = duration.as_deref().map(parse_duration).transpose()?;

            let mut cluster = TestCluster::with_config(config);
            cluster.add_storage_devices(storage_devices)?;

            if let Err(e) = cluster.try_start().await {
                cluster.stop().await;
                return Err(e.into());
            }

            println!("Test cluster up:");
            println!("  Volume: {}", cluster.volume_name());
            println!("  Directory: {}", cluster.config().service_address);
            if let Some(addr) = cluster.catalog().address() {
                println!("  Catalog: {}", addr);
            }
            for (idx, device) in cluster.storage_devices().iter().enumerate() {
                let addr = device.address().unwrap_or_default();
                println!("  Storage device #{}: {} ({})", idx, addr, device.device_id());
            }
            println!("  Stripe size: {}", format_bytes(cluster.config().stripe_size));

            match run_for {
                Some(run_for) => tokio::time::sleep(run_for).await,
                None => tokio::signal::ctrl_c().await?,
            }

            cluster.try_stop().await?;
        }
    }

    Ok(())
}
