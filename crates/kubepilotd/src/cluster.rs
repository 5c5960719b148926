//! kubectl-backed cluster operations.
//!
//! Every operation is one kubectl invocation plus output shaping; the
//! returned strings are the summary lines shown to the operator.
//! Pod-level metrics come from Prometheus rather than the API server.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use kubepilot_common::{ExposedService, PodUsage};

use crate::capabilities::ClusterOps;
use crate::config::ClusterConfig;
use crate::prom::PromClient;

pub struct KubectlClient {
    kubectl: String,
    namespace: String,
    prom: Arc<PromClient>,
}

impl KubectlClient {
    pub fn new(config: &ClusterConfig, prom: Arc<PromClient>) -> Self {
        Self {
            kubectl: config.kubectl_path.clone(),
            namespace: config.namespace.clone(),
            prom,
        }
    }

    async fn kubectl(&self, args: &[&str]) -> Result<String> {
        debug!("kubectl {}", args.join(" "));
        let output = Command::new(&self.kubectl)
            .args(args)
            .output()
            .await
            .context("Failed to run kubectl")?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(anyhow!(
                "{}",
                String::from_utf8_lossy(&output.stderr).trim()
            ))
        }
    }

    async fn resource_names(&self, args: &[&str]) -> Result<Vec<String>> {
        let raw = self.kubectl(args).await?;
        let parsed: Value = serde_json::from_str(&raw).context("Unexpected kubectl output")?;
        Ok(parsed["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item["metadata"]["name"].as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    pub async fn list_pods(&self) -> Result<Vec<String>> {
        self.resource_names(&["get", "pods", "-n", &self.namespace, "-o", "json"])
            .await
    }

    pub async fn list_deployments(&self) -> Result<Vec<String>> {
        self.resource_names(&["get", "deployments", "-n", &self.namespace, "-o", "json"])
            .await
    }

    pub async fn list_services(&self) -> Result<Vec<String>> {
        self.resource_names(&["get", "services", "-n", &self.namespace, "-o", "json"])
            .await
    }

    pub async fn list_configmaps(&self) -> Result<Vec<String>> {
        self.resource_names(&["get", "configmaps", "-n", &self.namespace, "-o", "json"])
            .await
    }

    pub async fn list_namespaces(&self) -> Result<Vec<String>> {
        self.resource_names(&["get", "namespaces", "-o", "json"]).await
    }

    pub async fn list_nodes(&self) -> Result<Vec<String>> {
        self.resource_names(&["get", "nodes", "-o", "json"]).await
    }
}

#[async_trait]
impl ClusterOps for KubectlClient {
    async fn apply_manifest(&self, manifest: &str) -> Result<String> {
        let mut child = Command::new(&self.kubectl)
            .args(["apply", "-f", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to run kubectl")?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(manifest.as_bytes())
                .await
                .context("Failed to stream manifest to kubectl")?;
        }

        let output = child
            .wait_with_output()
            .await
            .context("Failed to run kubectl")?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(anyhow!(
                "{}",
                String::from_utf8_lossy(&output.stderr).trim()
            ))
        }
    }

    async fn run_cli(&self, command: &str) -> Result<String> {
        let parts: Vec<&str> = command.split_whitespace().collect();
        let Some((program, args)) = parts.split_first() else {
            bail!("Empty command");
        };

        info!("Executing: {program} {args:?}");
        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .context("Failed to execute command")?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(anyhow!(
                "{}",
                String::from_utf8_lossy(&output.stderr).trim()
            ))
        }
    }

    async fn scale(&self, name: &str, namespace: &str, replicas: i64) -> Result<String> {
        self.kubectl(&[
            "scale",
            "deployment",
            name,
            "-n",
            namespace,
            &format!("--replicas={replicas}"),
        ])
        .await?;
        Ok(format!("Scaled deployment '{name}' to {replicas} replicas."))
    }

    async fn patch_resources(
        &self,
        name: &str,
        namespace: &str,
        cpu: &str,
        memory: &str,
    ) -> Result<String> {
        // The strategic merge patch targets a container by name, so
        // look up the first container before patching.
        let raw = self
            .kubectl(&["get", "deployment", name, "-n", namespace, "-o", "json"])
            .await?;
        let deployment: Value =
            serde_json::from_str(&raw).context("Unexpected kubectl output")?;
        let container = deployment["spec"]["template"]["spec"]["containers"][0]["name"]
            .as_str()
            .ok_or_else(|| anyhow!("No containers found in deployment '{name}'."))?
            .to_string();

        let patch = json!({
            "spec": { "template": { "spec": { "containers": [{
                "name": container,
                "resources": { "requests": { "cpu": cpu, "memory": memory } }
            }]}}}
        });
        self.kubectl(&[
            "patch",
            "deployment",
            name,
            "-n",
            namespace,
            "-p",
            &patch.to_string(),
        ])
        .await?;
        Ok(format!(
            "Patched resources for deployment '{name}' (CPU: {cpu}, Memory: {memory})"
        ))
    }

    async fn create_autoscaler(
        &self,
        name: &str,
        namespace: &str,
        min_replicas: i64,
        max_replicas: i64,
        target_cpu: i64,
    ) -> Result<String> {
        let result = self
            .kubectl(&[
                "autoscale",
                "deployment",
                name,
                "-n",
                namespace,
                &format!("--min={min_replicas}"),
                &format!("--max={max_replicas}"),
                &format!("--cpu-percent={target_cpu}"),
            ])
            .await;

        match result {
            Ok(_) => Ok(format!("Autoscaler created for deployment '{name}'.")),
            Err(e) if e.to_string().contains("already exists") => {
                Ok(format!("HPA for '{name}' already exists."))
            }
            Err(e) => Err(e),
        }
    }

    async fn create_loadbalancer(
        &self,
        name: &str,
        namespace: &str,
        port: i64,
        target_port: i64,
    ) -> Result<String> {
        let result = self
            .kubectl(&[
                "expose",
                "deployment",
                name,
                "-n",
                namespace,
                "--type=LoadBalancer",
                &format!("--port={port}"),
                &format!("--target-port={target_port}"),
                "--name",
                name,
            ])
            .await;

        match result {
            Ok(_) => Ok(format!("LoadBalancer service created for '{name}'.")),
            Err(e) if e.to_string().contains("already exists") => {
                Ok(format!("LoadBalancer service for '{name}' already exists."))
            }
            Err(e) => Err(e),
        }
    }

    async fn list_exposed_services(&self, types: &[&str]) -> Result<Vec<ExposedService>> {
        let raw = self.kubectl(&["get", "svc", "-A", "-o", "json"]).await?;
        let parsed: Value = serde_json::from_str(&raw).context("Unexpected kubectl output")?;

        let mut services = Vec::new();
        for item in parsed["items"].as_array().unwrap_or(&Vec::new()) {
            let service_type = item["spec"]["type"].as_str().unwrap_or_default();
            if !types.contains(&service_type) {
                continue;
            }
            let first_port = &item["spec"]["ports"][0];
            services.push(ExposedService {
                name: item["metadata"]["name"].as_str().unwrap_or_default().to_string(),
                namespace: item["metadata"]["namespace"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string(),
                service_type: service_type.to_string(),
                port: first_port["port"].as_i64().unwrap_or_default(),
                target_port: match &first_port["targetPort"] {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                },
            });
        }
        Ok(services)
    }

    async fn pod_metrics(
        &self,
        name: &str,
        _namespace: &str,
    ) -> Result<BTreeMap<String, PodUsage>> {
        self.prom
            .pod_usage(name)
            .await
            .map_err(|e| anyhow!("{e}"))
    }

    async fn remediate(&self, name: &str, namespace: &str) -> Result<String> {
        self.kubectl(&[
            "rollout",
            "restart",
            &format!("deployment/{name}"),
            "-n",
            namespace,
        ])
        .await?;
        Ok(format!(
            "Auto-fix applied for '{name}': restarted pods and re-applied the deployment template."
        ))
    }
}
