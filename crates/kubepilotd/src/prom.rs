//! Prometheus metrics gateway.
//!
//! Single-shot range and instant queries over the fixed named-query
//! registry. No retry here: transient-failure policy belongs to the
//! caller (see `collector` for the long-running sampling loop).

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use kubepilot_common::{promql_for, MetricSample, MetricsError, PodUsage};

use crate::capabilities::MetricsSource;

/// Labels tried in order when naming a returned series.
const LABEL_KEYS: &[&str] = &["instance", "exported_instance", "device", "interface", "job"];

pub struct PromClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct PromResponse {
    #[serde(default)]
    data: PromData,
}

#[derive(Deserialize, Default)]
struct PromData {
    #[serde(default)]
    result: Vec<PromSeries>,
}

#[derive(Deserialize)]
struct PromSeries {
    #[serde(default)]
    metric: HashMap<String, String>,
    /// Range query points: [unix_ts, "value"]
    #[serde(default)]
    values: Vec<(f64, String)>,
    /// Instant query point
    #[serde(default)]
    value: Option<(f64, String)>,
}

impl PromClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// One range query over the last `window_minutes`, resolved at
    /// `step_seconds`. Samples that fail numeric conversion are
    /// dropped, not fatal to the batch.
    pub async fn query_series(
        &self,
        metric: &str,
        window_minutes: u64,
        step_seconds: u64,
    ) -> Result<Vec<MetricSample>, MetricsError> {
        let promql = promql_for(metric)
            .ok_or_else(|| MetricsError::UnsupportedMetric(metric.to_string()))?;

        let end = Utc::now().timestamp();
        let start = end - (window_minutes as i64) * 60;
        debug!("Range query for {metric}: [{start}, {end}] step {step_seconds}s");

        let response: PromResponse = self
            .get(
                "/api/v1/query_range",
                &[
                    ("query", promql),
                    ("start", &start.to_string()),
                    ("end", &end.to_string()),
                    ("step", &step_seconds.to_string()),
                ],
            )
            .await?;

        let mut samples = Vec::new();
        for series in response.data.result {
            let label = series_label(&series.metric);
            for (ts, raw) in series.values {
                let Ok(value) = raw.parse::<f64>() else {
                    continue;
                };
                samples.push(MetricSample {
                    timestamp: ts as i64,
                    label: label.clone(),
                    value: round2(value),
                });
            }
        }
        Ok(samples)
    }

    /// One instant query, returning each series' labels and value.
    pub async fn instant(
        &self,
        promql: &str,
    ) -> Result<Vec<(HashMap<String, String>, f64)>, MetricsError> {
        let response: PromResponse = self.get("/api/v1/query", &[("query", promql)]).await?;

        let mut out = Vec::new();
        for series in response.data.result {
            let Some((_, raw)) = series.value else {
                continue;
            };
            let Ok(value) = raw.parse::<f64>() else {
                continue;
            };
            out.push((series.metric, value));
        }
        Ok(out)
    }

    /// Per-pod CPU and memory for a deployment's pods: CPU as
    /// millicores, memory as MiB.
    pub async fn pod_usage(
        &self,
        deployment: &str,
    ) -> Result<BTreeMap<String, PodUsage>, MetricsError> {
        let selector = format!("{deployment}.*");
        let cpu_query =
            format!(r#"rate(container_cpu_usage_seconds_total{{pod=~"{selector}"}}[2m])"#);
        let mem_query =
            format!(r#"avg_over_time(container_memory_usage_bytes{{pod=~"{selector}"}}[2m])"#);

        let cpu = self.instant(&cpu_query).await?;
        let mem = self.instant(&mem_query).await?;

        let mut usage: BTreeMap<String, PodUsage> = BTreeMap::new();
        for (labels, value) in cpu {
            let pod = pod_name(&labels);
            usage.entry(pod).or_default().cpu = Some(round2(value * 1000.0));
        }
        for (labels, value) in mem {
            let pod = pod_name(&labels);
            usage.entry(pod).or_default().memory = Some(round2(value / (1024.0 * 1024.0)));
        }
        Ok(usage)
    }

    async fn get(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<PromResponse, MetricsError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .query(params)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| MetricsError::Backend(e.to_string()))?;

        response
            .json::<PromResponse>()
            .await
            .map_err(|e| MetricsError::Backend(e.to_string()))
    }
}

#[async_trait]
impl MetricsSource for PromClient {
    async fn query_series(
        &self,
        metric: &str,
        window_minutes: u64,
        step_seconds: u64,
    ) -> Result<Vec<MetricSample>, MetricsError> {
        PromClient::query_series(self, metric, window_minutes, step_seconds).await
    }
}

fn series_label(labels: &HashMap<String, String>) -> String {
    LABEL_KEYS
        .iter()
        .filter_map(|key| labels.get(*key))
        .find(|value| !value.is_empty())
        .cloned()
        .unwrap_or_else(|| "unknown".to_string())
}

fn pod_name(labels: &HashMap<String, String>) -> String {
    labels
        .get("pod")
        .cloned()
        .unwrap_or_else(|| "unknown".to_string())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
