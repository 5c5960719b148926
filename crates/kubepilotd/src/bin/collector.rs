//! Standalone resource sampler.
//!
//! Collects per-pod CPU usage from Prometheus for a fixed duration
//! and writes the dataset as JSON in one shot at the end. Meant to
//! run out-of-band, next to load tests, not inside the daemon.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use kubepilotd::collector::{collect_with_retry, write_samples, CollectorConfig};
use kubepilotd::prom::PromClient;

#[derive(Parser)]
#[command(name = "kubepilot-collector", about = "Sample per-pod CPU usage over time")]
struct Args {
    /// Prometheus base URL
    #[arg(long)]
    prom_url: String,

    /// Namespace to sample
    #[arg(long, default_value = "default")]
    namespace: String,

    /// Pod name regex, e.g. "web-.*"
    #[arg(long)]
    pod_regex: String,

    /// Total sampling duration in seconds
    #[arg(long, default_value_t = 300)]
    duration: u64,

    /// Seconds between samples
    #[arg(long, default_value_t = 5)]
    interval: u64,

    /// Output JSON file
    #[arg(long)]
    output: PathBuf,

    /// Per-query timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Attempts per interval before recording a gap
    #[arg(long, default_value_t = 3)]
    retries: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let prom = PromClient::new(&args.prom_url, Duration::from_secs(args.timeout));
    let config = CollectorConfig {
        namespace: args.namespace,
        pod_regex: args.pod_regex,
        duration: Duration::from_secs(args.duration),
        interval: Duration::from_secs(args.interval),
        retries: args.retries,
    };

    let samples = collect_with_retry(&prom, &config).await;
    write_samples(&args.output, &samples).await?;
    Ok(())
}
