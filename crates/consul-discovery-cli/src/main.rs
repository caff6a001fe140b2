//! `consul-discover`: look up a service in the Consul DNS catalog.
//!
//! ```text
//! consul-discover [--config FILE] [--server HOST:PORT] [--suffix SUFFIX] [--all] SERVICE
//! ```
//!
//! Prints one `ip:port` line per instance. Log verbosity follows `RUST_LOG`.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use consul_discovery::{DiscoveryConfig, Resolver};

#[derive(Parser, Debug)]
#[command(name = "consul-discover", version, about = "Look up a service in the Consul DNS catalog")]
struct Args {
    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Discovery DNS server, overrides the config file
    #[arg(long, value_name = "HOST:PORT")]
    server: Option<String>,

    /// Search suffix appended to the service name, overrides the config file
    #[arg(long)]
    suffix: Option<String>,

    /// Print every resolvable instance instead of the first one
    #[arg(long)]
    all: bool,

    /// Service name, without the search suffix
    service: String,
}

fn load_config(args: &Args) -> Result<DiscoveryConfig> {
    let mut config = match &args.config {
        Some(path) => DiscoveryConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => DiscoveryConfig::default(),
    };

    if let Some(server) = &args.server {
        config.server = server.clone();
    }
    if let Some(suffix) = &args.suffix {
        config.search_suffix = suffix.clone();
    }
    Ok(config)
}

async fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    let server = config.server.clone();

    let resolver = Resolver::with_config(config)
        .await
        .with_context(|| format!("Failed to set up resolver for {server}"))?;
    tracing::debug!(server = %resolver.server(), "Using discovery server");

    if args.all {
        let instances = resolver
            .discover_all_service_instances(&args.service)
            .await
            .with_context(|| format!("Failed to discover {}", args.service))?;
        for instance in &instances {
            println!("{instance}");
        }

        let stats = resolver.stats();
        if stats.skipped_targets > 0 {
            tracing::warn!(skipped = stats.skipped_targets, "Some SRV targets could not be resolved");
        }
    } else {
        let (ip, port) = resolver
            .discover_service(&args.service)
            .await
            .with_context(|| format!("Failed to discover {}", args.service))?;
        println!("{ip}:{port}");
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("consul_discovery=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
