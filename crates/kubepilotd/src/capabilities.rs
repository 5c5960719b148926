//! Capability traits for every external collaborator.
//!
//! The orchestrator and dispatcher only ever see these traits; the
//! concrete clients (Ollama, kubectl, Prometheus, SQLite) are
//! constructed once at startup and injected, so every external call
//! has a test double.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use kubepilot_common::{
    ConversationRecord, ExposedService, Intent, MetricSample, MetricsError, PodUsage,
};

/// Intent classification and plan generation.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn classify_intent(&self, query: &str) -> Result<Intent>;

    /// Produce a raw plan value: a command string, a sequence of
    /// actions, or a single action mapping. A planner that cannot
    /// produce valid JSON must return a clarify mapping, not an error.
    async fn plan_action(&self, query: &str) -> Result<Value>;
}

/// Documentation retrieval for the question branch.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<Vec<String>>;
}

/// Answer generation conditioned on retrieved context.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate_answer(&self, query: &str, context: &str) -> Result<String>;
}

/// Append-only conversation log.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn store(&self, query: &str, response: &str) -> Result<()>;

    /// Stored interactions, most recent first.
    async fn history(&self) -> Result<Vec<ConversationRecord>>;
}

/// Idempotent cluster-control operations.
///
/// Success values are the human-readable summary lines shown to the
/// operator; failures carry the underlying cause and are folded into
/// step results by the dispatcher.
#[async_trait]
pub trait ClusterOps: Send + Sync {
    async fn apply_manifest(&self, manifest: &str) -> Result<String>;
    async fn run_cli(&self, command: &str) -> Result<String>;
    async fn scale(&self, name: &str, namespace: &str, replicas: i64) -> Result<String>;
    async fn patch_resources(
        &self,
        name: &str,
        namespace: &str,
        cpu: &str,
        memory: &str,
    ) -> Result<String>;
    async fn create_autoscaler(
        &self,
        name: &str,
        namespace: &str,
        min_replicas: i64,
        max_replicas: i64,
        target_cpu: i64,
    ) -> Result<String>;
    async fn create_loadbalancer(
        &self,
        name: &str,
        namespace: &str,
        port: i64,
        target_port: i64,
    ) -> Result<String>;
    async fn list_exposed_services(&self, types: &[&str]) -> Result<Vec<ExposedService>>;
    async fn pod_metrics(&self, name: &str, namespace: &str)
        -> Result<BTreeMap<String, PodUsage>>;
    async fn remediate(&self, name: &str, namespace: &str) -> Result<String>;
}

/// Single-shot time-series queries against the metrics backend.
///
/// No internal retry: callers that need resilience loop themselves
/// (see `collector`).
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn query_series(
        &self,
        metric: &str,
        window_minutes: u64,
        step_seconds: u64,
    ) -> Result<Vec<MetricSample>, MetricsError>;
}
