//! Shared types for KubePilot.
//!
//! Everything the daemon and its tests agree on lives here: the plan
//! normalizer and its closed action type, the error taxonomy, metric
//! sample types and the named query registry, and the LLM prompts.

pub mod error;
pub mod metrics;
pub mod plan;
pub mod prompts;
pub mod result;

pub use error::{ActionError, MetricsError, PlanError};
pub use metrics::{promql_for, ExposedService, MetricSample, PodUsage, SUPPORTED_METRICS};
pub use plan::{normalize, normalize_step, Action, NormalizedPlan, DEFAULT_NAMESPACE};
pub use result::{ConversationRecord, ExecutionResult, Intent};
