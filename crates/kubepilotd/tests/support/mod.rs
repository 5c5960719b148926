//! Test doubles for the capability traits.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;

use kubepilot_common::{
    ConversationRecord, ExposedService, Intent, MetricSample, MetricsError, PodUsage,
};
use kubepilotd::capabilities::{
    AnswerGenerator, ClusterOps, ContextRetriever, HistoryStore, MetricsSource, Planner,
};
use kubepilotd::dispatcher::ActionDispatcher;
use kubepilotd::orchestrator::Orchestrator;

/// Cluster double: records every call, optionally failing named
/// operations, and serves canned pod metrics and service listings.
#[derive(Default)]
pub struct MockCluster {
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    pods: Mutex<BTreeMap<String, PodUsage>>,
    services: Mutex<Vec<ExposedService>>,
}

impl MockCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(self, op: &str) -> Self {
        self.failing.lock().unwrap().insert(op.to_string());
        self
    }

    pub fn with_pods(self, pods: BTreeMap<String, PodUsage>) -> Self {
        *self.pods.lock().unwrap() = pods;
        self
    }

    pub fn with_services(self, services: Vec<ExposedService>) -> Self {
        *self.services.lock().unwrap() = services;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, op: &str, call: String) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing.lock().unwrap().contains(op) {
            Err(anyhow!("simulated {op} failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ClusterOps for MockCluster {
    async fn apply_manifest(&self, manifest: &str) -> Result<String> {
        self.record("apply_manifest", format!("apply_manifest {manifest}"))?;
        Ok("deployment.apps/test configured".to_string())
    }

    async fn run_cli(&self, command: &str) -> Result<String> {
        self.record("run_cli", format!("run_cli {command}"))?;
        Ok(format!("ran: {command}"))
    }

    async fn scale(&self, name: &str, namespace: &str, replicas: i64) -> Result<String> {
        self.record("scale", format!("scale {name} {namespace} {replicas}"))?;
        Ok(format!("Scaled deployment '{name}' to {replicas} replicas."))
    }

    async fn patch_resources(
        &self,
        name: &str,
        namespace: &str,
        cpu: &str,
        memory: &str,
    ) -> Result<String> {
        self.record(
            "patch_resources",
            format!("patch_resources {name} {namespace} {cpu} {memory}"),
        )?;
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
        self.record(
            "create_autoscaler",
            format!("create_autoscaler {name} {namespace} {min_replicas} {max_replicas} {target_cpu}"),
        )?;
        Ok(format!("Autoscaler created for deployment '{name}'."))
    }

    async fn create_loadbalancer(
        &self,
        name: &str,
        namespace: &str,
        port: i64,
        target_port: i64,
    ) -> Result<String> {
        self.record(
            "create_loadbalancer",
            format!("create_loadbalancer {name} {namespace} {port} {target_port}"),
        )?;
        Ok(format!("LoadBalancer service created for '{name}'."))
    }

    async fn list_exposed_services(&self, types: &[&str]) -> Result<Vec<ExposedService>> {
        self.record(
            "list_exposed_services",
            format!("list_exposed_services {types:?}"),
        )?;
        Ok(self.services.lock().unwrap().clone())
    }

    async fn pod_metrics(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<BTreeMap<String, PodUsage>> {
        self.record("pod_metrics", format!("pod_metrics {name} {namespace}"))?;
        Ok(self.pods.lock().unwrap().clone())
    }

    async fn remediate(&self, name: &str, namespace: &str) -> Result<String> {
        self.record("remediate", format!("remediate {name} {namespace}"))?;
        Ok(format!("Auto-fix applied for '{name}'."))
    }
}

/// Metrics double serving one canned response.
pub struct MockMetrics {
    response: Result<Vec<MetricSample>, MetricsError>,
}

impl MockMetrics {
    pub fn with_samples(values: &[f64]) -> Self {
        Self {
            response: Ok(values
                .iter()
                .enumerate()
                .map(|(i, value)| MetricSample {
                    timestamp: 1_700_000_000 + i as i64 * 15,
                    label: "node-1".to_string(),
                    value: *value,
                })
                .collect()),
        }
    }

    pub fn empty() -> Self {
        Self { response: Ok(vec![]) }
    }

    pub fn failing() -> Self {
        Self {
            response: Err(MetricsError::Backend("connection refused".to_string())),
        }
    }
}

#[async_trait]
impl MetricsSource for MockMetrics {
    async fn query_series(
        &self,
        _metric: &str,
        _window_minutes: u64,
        _step_seconds: u64,
    ) -> Result<Vec<MetricSample>, MetricsError> {
        self.response.clone()
    }
}

/// Planner double with fixed classifier and plan output.
pub struct MockPlanner {
    pub intent: String,
    pub plan: Value,
}

#[async_trait]
impl Planner for MockPlanner {
    async fn classify_intent(&self, _query: &str) -> Result<Intent> {
        Ok(Intent::parse(&self.intent))
    }

    async fn plan_action(&self, _query: &str) -> Result<Value> {
        Ok(self.plan.clone())
    }
}

/// Planner double whose classifier call fails outright.
pub struct FailingPlanner;

#[async_trait]
impl Planner for FailingPlanner {
    async fn classify_intent(&self, _query: &str) -> Result<Intent> {
        Err(anyhow!("model endpoint unreachable"))
    }

    async fn plan_action(&self, _query: &str) -> Result<Value> {
        Err(anyhow!("model endpoint unreachable"))
    }
}

/// In-memory history with a visible store count.
#[derive(Default)]
pub struct MockHistory {
    entries: Mutex<Vec<(String, String)>>,
}

impl MockHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(String, String)> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl HistoryStore for MockHistory {
    async fn store(&self, query: &str, response: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .push((query.to_string(), response.to_string()));
        Ok(())
    }

    async fn history(&self) -> Result<Vec<ConversationRecord>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .rev()
            .map(|(query, response)| ConversationRecord {
                query: query.clone(),
                response: response.clone(),
                timestamp: "2026-01-01T00:00:00Z".to_string(),
            })
            .collect())
    }
}

pub struct MockRetriever {
    pub docs: Vec<String>,
}

#[async_trait]
impl ContextRetriever for MockRetriever {
    async fn retrieve(&self, _query: &str) -> Result<Vec<String>> {
        Ok(self.docs.clone())
    }
}

/// Answerer double that echoes its inputs so tests can see what the
/// question branch passed in.
pub struct MockAnswerer;

#[async_trait]
impl AnswerGenerator for MockAnswerer {
    async fn generate_answer(&self, query: &str, context: &str) -> Result<String> {
        Ok(format!("answer[{query}] from [{context}]"))
    }
}

pub fn dispatcher(cluster: Arc<MockCluster>, metrics: Arc<MockMetrics>) -> ActionDispatcher {
    ActionDispatcher::new(cluster, metrics)
}

/// A fully mocked orchestrator plus handles on its doubles.
pub struct World {
    pub cluster: Arc<MockCluster>,
    pub history: Arc<MockHistory>,
    pub orchestrator: Orchestrator,
}

pub fn world_with(planner: Arc<dyn Planner>, cluster: Arc<MockCluster>) -> World {
    let history = Arc::new(MockHistory::new());
    let orchestrator = Orchestrator::new(
        planner,
        Arc::new(MockRetriever {
            docs: vec!["doc one".to_string(), "doc two".to_string()],
        }),
        Arc::new(MockAnswerer),
        history.clone(),
        ActionDispatcher::new(cluster.clone(), Arc::new(MockMetrics::empty())),
    );
    World {
        cluster,
        history,
        orchestrator,
    }
}

pub fn world(intent: &str, plan: Value) -> World {
    world_with(
        Arc::new(MockPlanner {
            intent: intent.to_string(),
            plan,
        }),
        Arc::new(MockCluster::new()),
    )
}
