//! Action dispatcher.
//!
//! Maps a normalized `Action` to its handler. Every handler returns
//! `Result<String, ActionError>` internally so tests and telemetry can
//! inspect failures; `execute` folds the error into the step's display
//! string at the formatting boundary. Nothing above this module ever
//! observes a raised fault from a single action.
//!
//! Multi-step plans run sequentially and a failed step never aborts
//! its successors: cluster operations are independent and mostly
//! idempotent, so partial completion is still useful to the operator.

use std::sync::Arc;

use tracing::{info, warn};

use kubepilot_common::{Action, ActionError, DEFAULT_NAMESPACE};

use crate::capabilities::{ClusterOps, MetricsSource};

/// Fixed resource requests applied by latency optimization.
const OPTIMIZE_CPU_REQUEST: &str = "100m";
const OPTIMIZE_MEMORY_REQUEST: &str = "128Mi";

/// Autoscaler bounds used when the planner leaves them out.
const DEFAULT_MIN_REPLICAS: i64 = 1;
const DEFAULT_MAX_REPLICAS: i64 = 5;
const DEFAULT_TARGET_CPU: i64 = 60;

/// Stateless dispatcher over the injected cluster and metrics
/// capabilities.
pub struct ActionDispatcher {
    cluster: Arc<dyn ClusterOps>,
    metrics: Arc<dyn MetricsSource>,
}

impl ActionDispatcher {
    pub fn new(cluster: Arc<dyn ClusterOps>, metrics: Arc<dyn MetricsSource>) -> Self {
        Self { cluster, metrics }
    }

    /// Execute one action, folding any failure into the result text.
    pub async fn execute(&self, action: &Action) -> String {
        match self.try_execute(action).await {
            Ok(report) => report,
            Err(e) => {
                warn!("Action '{}' failed: {}", action.type_name(), e);
                e.to_string()
            }
        }
    }

    /// Execute each step of a multi-step plan independently and join
    /// the labelled results in order.
    pub async fn execute_plan(&self, steps: &[Action]) -> String {
        let mut parts = Vec::with_capacity(steps.len());
        for (idx, step) in steps.iter().enumerate() {
            info!("Executing step {} of {}: {}", idx + 1, steps.len(), step.type_name());
            let outcome = self.execute(step).await;
            parts.push(format!("Step {} ({}):\n{}", idx + 1, step.type_name(), outcome));
        }
        parts.join("\n\n")
    }

    /// Typed execution path; `execute` is its display fold.
    pub async fn try_execute(&self, action: &Action) -> Result<String, ActionError> {
        match action {
            Action::Yaml { content } => {
                let manifest = required(content, "content")?;
                self.cluster
                    .apply_manifest(manifest)
                    .await
                    .map_err(cluster_err("Error applying YAML"))
            }

            Action::Cli { content } => {
                let command = required(content, "content")?;
                self.cluster
                    .run_cli(command)
                    .await
                    .map_err(cluster_err("Error executing command"))
            }

            Action::Scale {
                name,
                replicas,
                namespace,
            } => {
                let name = deployment(name, "scaling")?;
                let replicas = replicas.ok_or(ActionError::MissingField("replicas"))?;
                let ns = resolve(namespace);
                self.cluster
                    .scale(name, ns, replicas)
                    .await
                    .map_err(cluster_err("Error scaling deployment"))
            }

            Action::Autoscale {
                name,
                min_replicas,
                max_replicas,
                target_cpu,
                namespace,
            } => {
                let name = deployment(name, "autoscaling")?;
                let ns = resolve(namespace);
                self.cluster
                    .create_autoscaler(
                        name,
                        ns,
                        min_replicas.unwrap_or(DEFAULT_MIN_REPLICAS),
                        max_replicas.unwrap_or(DEFAULT_MAX_REPLICAS),
                        target_cpu.unwrap_or(DEFAULT_TARGET_CPU),
                    )
                    .await
                    .map_err(cluster_err("Error creating HPA"))
            }

            // Composite: all three sub-operations are attempted even
            // when earlier ones fail; each outcome lands in the report.
            Action::OptimizeLatency { name, namespace } => {
                let name = deployment(name, "latency optimization")?;
                let ns = resolve(namespace);

                let patch = self
                    .cluster
                    .patch_resources(name, ns, OPTIMIZE_CPU_REQUEST, OPTIMIZE_MEMORY_REQUEST)
                    .await
                    .unwrap_or_else(|e| format!("Error patching resources: {e}"));
                let hpa = self
                    .cluster
                    .create_autoscaler(
                        name,
                        ns,
                        DEFAULT_MIN_REPLICAS,
                        DEFAULT_MAX_REPLICAS,
                        DEFAULT_TARGET_CPU,
                    )
                    .await
                    .unwrap_or_else(|e| format!("Error creating HPA: {e}"));
                let lb = self
                    .cluster
                    .create_loadbalancer(name, ns, 80, 80)
                    .await
                    .unwrap_or_else(|e| format!("Error creating LoadBalancer service: {e}"));

                Ok(format!(
                    "Latency optimization complete for '{name}':\n\n\
                     - Resource patch:\n{patch}\n\n\
                     - HPA setup:\n{hpa}\n\n\
                     - LoadBalancer:\n{lb}"
                ))
            }

            Action::SuggestScaling { name, namespace } => {
                let name = deployment(name, "scaling suggestion")?;
                let ns = resolve(namespace);
                let metrics = self
                    .cluster
                    .pod_metrics(name, ns)
                    .await
                    .map_err(cluster_err("Error fetching pod metrics"))?;
                if metrics.is_empty() {
                    return Ok(format!("No metrics found for deployment '{name}'."));
                }

                let cpus: Vec<f64> = metrics.values().filter_map(|usage| usage.cpu).collect();
                // Mean of an empty set is "?" rather than zero, so the
                // report never implies 0% usage.
                let avg = if cpus.is_empty() {
                    "?".to_string()
                } else {
                    format!("{}", cpus.iter().sum::<f64>() / cpus.len() as f64)
                };
                Ok(format!(
                    "Suggestion: Deployment '{name}' average CPU usage: {avg} millicores."
                ))
            }

            Action::AnalyzeMetrics { name, namespace } => {
                let name = deployment(name, "metrics analysis")?;
                let ns = resolve(namespace);
                let metrics = self
                    .cluster
                    .pod_metrics(name, ns)
                    .await
                    .map_err(cluster_err("Error fetching pod metrics"))?;
                if metrics.is_empty() {
                    return Ok(format!("No metrics found for deployment '{name}'."));
                }

                let mut out = format!("Resource usage for '{name}':\n");
                for (pod, usage) in &metrics {
                    out.push_str(&format!(
                        "- {}: CPU={}m | Memory={}Mi\n",
                        pod,
                        fmt_value(usage.cpu),
                        fmt_value(usage.memory)
                    ));
                }
                Ok(out)
            }

            Action::ShowExposedServices => {
                let services = self
                    .cluster
                    .list_exposed_services(&["LoadBalancer", "NodePort"])
                    .await
                    .map_err(cluster_err("Error listing services"))?;
                if services.is_empty() {
                    return Ok("No exposed services found.".to_string());
                }

                let mut out = String::from("Exposed Services:\n");
                for svc in &services {
                    out.push_str(&format!(
                        "- {} ({}) in {} -> Port: {} Target: {}\n",
                        svc.name, svc.service_type, svc.namespace, svc.port, svc.target_port
                    ));
                }
                Ok(out)
            }

            Action::FixDeploymentIssues { name, namespace } => {
                let name = deployment(name, "fix attempt")?;
                let ns = resolve(namespace);
                self.cluster
                    .remediate(name, ns)
                    .await
                    .map_err(cluster_err("Error fixing deployment"))
            }

            Action::MetricsAnalysis {
                metric,
                minutes,
                step,
            } => {
                let metric = metric.as_deref().unwrap_or("cpu");
                let minutes = minutes.unwrap_or(10);
                let step = step.unwrap_or(15);
                let samples = self
                    .metrics
                    .query_series(metric, minutes, step)
                    .await
                    .map_err(|source| ActionError::MetricsFetch {
                        metric: metric.to_string(),
                        source,
                    })?;
                match samples.last() {
                    None => Ok(format!(
                        "No {metric} data found in the last {minutes} minutes."
                    )),
                    Some(latest) => Ok(format!(
                        "{} analysis (last {} min):\nInstance: {}\nValue: {}%",
                        metric.to_uppercase(),
                        minutes,
                        latest.label,
                        latest.value
                    )),
                }
            }

            Action::AutoscaleBasedOnMetrics {
                name,
                metric,
                namespace,
            } => {
                let name = deployment(name, "autoscaling")?;
                let metric = metric.as_deref().unwrap_or("cpu");
                let ns = resolve(namespace);

                let samples = self
                    .metrics
                    .query_series(metric, 5, 15)
                    .await
                    .map_err(|_| ActionError::MetricsUnavailable(metric.to_string()))?;
                let latest = samples
                    .last()
                    .ok_or_else(|| ActionError::MetricsUnavailable(metric.to_string()))?;

                let target = autoscale_target(&latest.value.to_string());
                let result = self
                    .cluster
                    .create_autoscaler(name, ns, DEFAULT_MIN_REPLICAS, DEFAULT_MAX_REPLICAS, target)
                    .await
                    .map_err(cluster_err("Error creating HPA"))?;
                Ok(format!(
                    "Autoscaling applied based on current {} usage ({}%):\n{}",
                    metric, latest.value, result
                ))
            }

            Action::Unknown { action_type } => Err(ActionError::UnknownType(
                action_type.clone().unwrap_or_else(|| "none".to_string()),
            )),

            Action::Malformed { reason } => Err(ActionError::MalformedStep(reason.clone())),
        }
    }
}

/// Target CPU utilization derived from the latest observed usage:
/// 20 points of headroom above current usage, clamped to 90. A value
/// that does not read as a finite number falls back to 60 instead of
/// propagating a parse failure into the dispatch result.
pub fn autoscale_target(raw: &str) -> i64 {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => ((value + 20.0).trunc() as i64).min(90),
        _ => DEFAULT_TARGET_CPU,
    }
}

fn resolve(namespace: &Option<String>) -> &str {
    namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE)
}

fn required<'a>(
    field: &'a Option<String>,
    name: &'static str,
) -> Result<&'a str, ActionError> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ActionError::MissingField(name))
}

fn deployment<'a>(
    name: &'a Option<String>,
    what: &'static str,
) -> Result<&'a str, ActionError> {
    name.as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(ActionError::MissingName(what))
}

fn fmt_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v}"),
        None => "?".to_string(),
    }
}

fn cluster_err(prefix: &'static str) -> impl FnOnce(anyhow::Error) -> ActionError {
    move |e| ActionError::Cluster(format!("{prefix}: {e}"))
}
