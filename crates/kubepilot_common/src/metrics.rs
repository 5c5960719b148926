//! Metric sample types and the named query registry.
//!
//! Only pre-registered metric names can be queried; an unknown name
//! fails fast before any network call.

use serde::{Deserialize, Serialize};

/// Metric names accepted by the gateway.
pub const SUPPORTED_METRICS: &[&str] = &["cpu", "memory", "disk", "net_rx", "net_tx"];

/// PromQL expression for a registered metric name.
pub fn promql_for(metric: &str) -> Option<&'static str> {
    match metric {
        "cpu" => Some(r#"100 - (avg by (instance) (rate(node_cpu_seconds_total{mode="idle"}[2m])) * 100)"#),
        "memory" => Some(r#"100 * (1 - (node_memory_MemAvailable_bytes / node_memory_MemTotal_bytes))"#),
        "disk" => Some(r#"100 - ((node_filesystem_avail_bytes{mountpoint="/"} / node_filesystem_size_bytes{mountpoint="/"}) * 100)"#),
        "net_rx" => Some(r#"rate(node_network_receive_bytes_total[2m])"#),
        "net_tx" => Some(r#"rate(node_network_transmit_bytes_total[2m])"#),
        _ => None,
    }
}

/// One time-series point, chronological per query.
///
/// `label` disambiguates the series a backend returns for one query;
/// the gateway picks the first non-empty of instance, exported
/// instance, device, interface, and job, falling back to "unknown".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub timestamp: i64,
    pub label: String,
    pub value: f64,
}

/// Per-pod resource usage; either side may be missing and renders as
/// "?" in reports.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PodUsage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<f64>,
}

/// A service reachable from outside the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposedService {
    pub name: String,
    pub namespace: String,
    pub service_type: String,
    pub port: i64,
    pub target_port: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_supported_metric_has_a_query() {
        for metric in SUPPORTED_METRICS {
            assert!(promql_for(metric).is_some(), "no query for {metric}");
        }
    }

    #[test]
    fn unregistered_metric_has_no_query() {
        assert!(promql_for("gpu").is_none());
    }
}
