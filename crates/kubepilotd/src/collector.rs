//! Long-running resource sampler.
//!
//! Builds a per-pod CPU dataset by sampling Prometheus on a fixed
//! interval for a fixed wall-clock duration. Each interval retries a
//! bounded number of times with a one-second pause; an interval that
//! never succeeds is recorded as a gap and the loop moves on. The
//! dataset is written exactly once, at the end of the run.
//!
//! Runs out-of-band (see the kubepilot-collector binary), never on
//! the request-handling path.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{error, info, warn};

use kubepilot_common::MetricsError;

use crate::prom::PromClient;

/// Pause between retry attempts within one interval.
const RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Per-pod CPU snapshot source, separated from `PromClient` so the
/// sampling loop can be exercised against a double.
#[async_trait]
pub trait PodCpuSource: Send + Sync {
    /// Current CPU usage in millicores for every pod matching the
    /// regex in the namespace.
    async fn sample_pod_cpu(
        &self,
        namespace: &str,
        pod_regex: &str,
    ) -> Result<Vec<(String, f64)>, MetricsError>;
}

#[async_trait]
impl PodCpuSource for PromClient {
    async fn sample_pod_cpu(
        &self,
        namespace: &str,
        pod_regex: &str,
    ) -> Result<Vec<(String, f64)>, MetricsError> {
        let query = format!(
            r#"sum(rate(container_cpu_usage_seconds_total{{namespace="{namespace}",pod=~"{pod_regex}",container!=""}}[1m])) by (pod)"#
        );
        let series = self.instant(&query).await?;
        Ok(series
            .into_iter()
            .map(|(labels, value)| (pod_label(&labels), value * 1000.0))
            .collect())
    }
}

fn pod_label(labels: &HashMap<String, String>) -> String {
    labels
        .get("pod")
        .cloned()
        .unwrap_or_else(|| "unknown".to_string())
}

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub namespace: String,
    pub pod_regex: String,
    pub duration: Duration,
    pub interval: Duration,
    pub retries: u32,
}

/// One collected data point.
#[derive(Debug, Clone, Serialize)]
pub struct CollectedSample {
    pub timestamp: String,
    pub pod: String,
    pub cpu: f64,
}

/// Run the sampling loop to completion.
///
/// A backend failure never terminates the loop early; it costs at
/// most `retries` paused attempts and one gap.
pub async fn collect_with_retry<S: PodCpuSource + ?Sized>(
    source: &S,
    config: &CollectorConfig,
) -> Vec<CollectedSample> {
    let mut samples = Vec::new();
    let started = Instant::now();

    while started.elapsed() < config.duration {
        let mut batch = None;
        for attempt in 1..=config.retries {
            match source
                .sample_pod_cpu(&config.namespace, &config.pod_regex)
                .await
            {
                Ok(points) => {
                    batch = Some(points);
                    break;
                }
                Err(e) => {
                    warn!(
                        "Empty or failed sample (attempt {}/{}): {}",
                        attempt, config.retries, e
                    );
                    tokio::time::sleep(RETRY_PAUSE).await;
                }
            }
        }

        match batch {
            Some(points) => {
                let timestamp = Utc::now().to_rfc3339();
                info!("Collected {} pod metrics", points.len());
                for (pod, cpu) in points {
                    samples.push(CollectedSample {
                        timestamp: timestamp.clone(),
                        pod,
                        cpu,
                    });
                }
            }
            None => {
                error!("Giving up on this interval");
            }
        }

        tokio::time::sleep(config.interval).await;
    }

    samples
}

/// Write the whole dataset in one shot.
pub async fn write_samples(path: &Path, samples: &[CollectedSample]) -> Result<()> {
    let json = serde_json::to_string_pretty(samples).context("Failed to serialize samples")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Saved {} samples to {}", samples.len(), path.display());
    Ok(())
}
