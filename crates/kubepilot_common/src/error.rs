//! Error types for KubePilot.
//!
//! Three layers, matching where a fault can be recovered:
//! - `PlanError`: the plan could not be classified at all; the
//!   orchestrator turns this into a clarification, never a crash.
//! - `ActionError`: a single action failed; the dispatcher folds it
//!   into the step's result string so sibling steps keep running.
//! - `MetricsError`: a metrics query failed; callers decide whether
//!   to retry, report, or record a gap.

use thiserror::Error;

/// Faults raised while classifying the raw plan value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("Plan is empty.")]
    EmptyPlan,

    #[error("Plan must be a string, a sequence of actions, or a mapping.")]
    InvalidPlanShape,
}

/// Faults raised while querying the metrics backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetricsError {
    #[error("Unsupported metric: {0}")]
    UnsupportedMetric(String),

    #[error("Prometheus error: {0}")]
    Backend(String),
}

/// Faults raised while executing a single action.
///
/// The `Display` text of every variant is user-facing: the dispatcher
/// renders it verbatim into the step result.
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("Missing deployment name for {0}.")]
    MissingName(&'static str),

    #[error("Missing required field '{0}'.")]
    MissingField(&'static str),

    #[error("Unknown action type: {0}")]
    UnknownType(String),

    #[error("Malformed plan step: {0}")]
    MalformedStep(String),

    #[error("{0}")]
    Cluster(String),

    #[error("Error fetching {metric} metrics: {source}")]
    MetricsFetch {
        metric: String,
        source: MetricsError,
    },

    #[error("Failed to fetch {0} metrics.")]
    MetricsUnavailable(String),
}
