//! Plan normalization.
//!
//! The planner returns free-form JSON: a bare command string, an array
//! of action objects, or a single action mapping. `normalize` resolves
//! that value into a closed `NormalizedPlan` exactly once; everything
//! downstream matches exhaustively on the result and never inspects
//! raw JSON again.
//!
//! Normalization is total over action content: an element with an
//! unrecognized type becomes `Action::Unknown` and one that fails the
//! shape check becomes `Action::Malformed`, so a bad step reports its
//! own failure at execution time instead of aborting its siblings.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::PlanError;

/// Namespace applied when the planner omits one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Action types the dispatcher has a handler for.
const KNOWN_TYPES: &[&str] = &[
    "yaml",
    "cli",
    "scale",
    "autoscale",
    "optimize_latency",
    "suggest_scaling",
    "analyze_metrics",
    "show_exposed_services",
    "fix_deployment_issues",
    "metrics_analysis",
    "autoscale_based_on_metrics",
];

/// A single cluster-management operation.
///
/// Fields the planner may omit stay `Option` here; each handler
/// validates what it actually needs and reports a missing field as
/// that step's result. `namespace` resolution happens at dispatch,
/// except for the two types that default it during normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Yaml {
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
    Cli {
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
    Scale {
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        replicas: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        namespace: Option<String>,
    },
    Autoscale {
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(alias = "min", skip_serializing_if = "Option::is_none")]
        min_replicas: Option<i64>,
        #[serde(alias = "max", skip_serializing_if = "Option::is_none")]
        max_replicas: Option<i64>,
        #[serde(
            alias = "cpu",
            alias = "target_cpu_utilization",
            skip_serializing_if = "Option::is_none"
        )]
        target_cpu: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        namespace: Option<String>,
    },
    OptimizeLatency {
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        namespace: Option<String>,
    },
    SuggestScaling {
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        namespace: Option<String>,
    },
    AnalyzeMetrics {
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        namespace: Option<String>,
    },
    ShowExposedServices,
    FixDeploymentIssues {
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        namespace: Option<String>,
    },
    MetricsAnalysis {
        #[serde(skip_serializing_if = "Option::is_none")]
        metric: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        minutes: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        step: Option<u64>,
    },
    AutoscaleBasedOnMetrics {
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        metric: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        namespace: Option<String>,
    },
    /// Mapping with a type string no handler recognizes.
    Unknown {
        #[serde(skip_serializing_if = "Option::is_none")]
        action_type: Option<String>,
    },
    /// Element that failed the action shape check; reports its own
    /// failure when dispatched.
    Malformed { reason: String },
}

impl Action {
    /// Tag used in per-step labels and logs.
    pub fn type_name(&self) -> &str {
        match self {
            Action::Yaml { .. } => "yaml",
            Action::Cli { .. } => "cli",
            Action::Scale { .. } => "scale",
            Action::Autoscale { .. } => "autoscale",
            Action::OptimizeLatency { .. } => "optimize_latency",
            Action::SuggestScaling { .. } => "suggest_scaling",
            Action::AnalyzeMetrics { .. } => "analyze_metrics",
            Action::ShowExposedServices => "show_exposed_services",
            Action::FixDeploymentIssues { .. } => "fix_deployment_issues",
            Action::MetricsAnalysis { .. } => "metrics_analysis",
            Action::AutoscaleBasedOnMetrics { .. } => "autoscale_based_on_metrics",
            Action::Unknown { action_type } => action_type.as_deref().unwrap_or("unknown"),
            Action::Malformed { .. } => "error",
        }
    }

    /// Apply the normalization-time namespace default.
    ///
    /// Only `analyze_metrics` and `fix_deployment_issues` receive it;
    /// every other type is left unmodified and resolves its namespace
    /// at dispatch.
    fn with_namespace_default(mut self) -> Self {
        match &mut self {
            Action::AnalyzeMetrics { namespace, .. }
            | Action::FixDeploymentIssues { namespace, .. } => {
                if namespace.is_none() {
                    *namespace = Some(DEFAULT_NAMESPACE.to_string());
                }
            }
            _ => {}
        }
        self
    }
}

/// The plan after shape resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedPlan {
    /// Opaque command string, executed verbatim.
    SingleCommand(String),
    /// Ordered sequence of independent actions.
    MultiStep(Vec<Action>),
    /// One structured action.
    Single(Action),
    /// Terminal outcome: the planner could not produce an executable
    /// plan. Carries no side effects and is never persisted.
    Clarification {
        hint: Option<String>,
        missing: Option<Vec<String>>,
    },
}

/// Resolve a raw plan value into a `NormalizedPlan`.
///
/// Strings become `SingleCommand` (blank is `EmptyPlan`), arrays
/// become `MultiStep` with per-element fallbacks, mappings become a
/// `Clarification` or a `Single` action. Anything else is
/// `InvalidPlanShape`.
pub fn normalize(raw: &Value) -> Result<NormalizedPlan, PlanError> {
    match raw {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Err(PlanError::EmptyPlan)
            } else {
                Ok(NormalizedPlan::SingleCommand(trimmed.to_string()))
            }
        }
        Value::Array(items) => Ok(NormalizedPlan::MultiStep(
            items.iter().map(normalize_step).collect(),
        )),
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("clarify") {
                return Ok(NormalizedPlan::Clarification {
                    hint: map.get("hint").and_then(Value::as_str).map(str::to_string),
                    missing: map.get("missing").and_then(Value::as_array).map(|items| {
                        items
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    }),
                });
            }
            Ok(NormalizedPlan::Single(normalize_step(raw)))
        }
        _ => Err(PlanError::InvalidPlanShape),
    }
}

/// Resolve one plan element into an `Action`.
///
/// Total: every JSON value maps to some variant. A bare string is
/// treated as a type-only action name.
pub fn normalize_step(raw: &Value) -> Action {
    match raw {
        Value::String(s) => normalize_object(&json!({ "type": s })),
        Value::Object(_) => normalize_object(raw),
        other => Action::Malformed {
            reason: format!(
                "plan step must be an action mapping or action name, got {}",
                json_kind(other)
            ),
        },
    }
}

fn normalize_object(raw: &Value) -> Action {
    match raw.get("type").and_then(Value::as_str) {
        Some(tag) if KNOWN_TYPES.contains(&tag) => {
            match serde_json::from_value::<Action>(raw.clone()) {
                Ok(action) => action.with_namespace_default(),
                Err(e) => Action::Malformed {
                    reason: e.to_string(),
                },
            }
        }
        Some(tag) => Action::Unknown {
            action_type: Some(tag.to_string()),
        },
        None => {
            // Bare payload form: {"yaml": "..."} or {"cli": "..."}.
            if let Some(content) = raw.get("yaml").and_then(Value::as_str) {
                return Action::Yaml {
                    content: Some(content.to_string()),
                };
            }
            if let Some(content) = raw.get("cli").and_then(Value::as_str) {
                return Action::Cli {
                    content: Some(content.to_string()),
                };
            }
            Action::Unknown { action_type: None }
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_plan_is_single_command() {
        let plan = normalize(&json!("kubectl get pods")).unwrap();
        assert_eq!(
            plan,
            NormalizedPlan::SingleCommand("kubectl get pods".to_string())
        );
    }

    #[test]
    fn blank_string_is_empty_plan() {
        assert_eq!(normalize(&json!("   ")), Err(PlanError::EmptyPlan));
    }

    #[test]
    fn unclassifiable_values_are_invalid_shape() {
        assert_eq!(normalize(&json!(42)), Err(PlanError::InvalidPlanShape));
        assert_eq!(normalize(&json!(true)), Err(PlanError::InvalidPlanShape));
        assert_eq!(normalize(&Value::Null), Err(PlanError::InvalidPlanShape));
    }

    #[test]
    fn clarify_short_circuits_without_defaulting() {
        let plan = normalize(&json!({
            "type": "clarify",
            "hint": "Which deployment?",
            "missing": ["name"]
        }))
        .unwrap();
        assert_eq!(
            plan,
            NormalizedPlan::Clarification {
                hint: Some("Which deployment?".to_string()),
                missing: Some(vec!["name".to_string()]),
            }
        );
    }

    #[test]
    fn namespace_defaulted_only_for_the_two_types() {
        let analyzed = normalize_step(&json!({"type": "analyze_metrics", "name": "web"}));
        assert_eq!(
            analyzed,
            Action::AnalyzeMetrics {
                name: Some("web".to_string()),
                namespace: Some("default".to_string()),
            }
        );

        let fixed = normalize_step(&json!({"type": "fix_deployment_issues", "name": "web"}));
        assert_eq!(
            fixed,
            Action::FixDeploymentIssues {
                name: Some("web".to_string()),
                namespace: Some("default".to_string()),
            }
        );

        // Scale is not in the defaulting set; its namespace stays unset
        // until dispatch.
        let scaled = normalize_step(&json!({"type": "scale", "name": "web", "replicas": 3}));
        assert_eq!(
            scaled,
            Action::Scale {
                name: Some("web".to_string()),
                replicas: Some(3),
                namespace: None,
            }
        );
    }

    #[test]
    fn explicit_namespace_is_preserved() {
        let action = normalize_step(&json!({
            "type": "analyze_metrics", "name": "web", "namespace": "prod"
        }));
        assert_eq!(
            action,
            Action::AnalyzeMetrics {
                name: Some("web".to_string()),
                namespace: Some("prod".to_string()),
            }
        );
    }

    #[test]
    fn unknown_type_is_carried_not_raised() {
        let action = normalize_step(&json!({"type": "reticulate_splines"}));
        assert_eq!(
            action,
            Action::Unknown {
                action_type: Some("reticulate_splines".to_string()),
            }
        );
    }

    #[test]
    fn bare_yaml_and_cli_payloads_resolve() {
        assert_eq!(
            normalize_step(&json!({"yaml": "apiVersion: v1"})),
            Action::Yaml {
                content: Some("apiVersion: v1".to_string()),
            }
        );
        assert_eq!(
            normalize_step(&json!({"cli": "kubectl get pods"})),
            Action::Cli {
                content: Some("kubectl get pods".to_string()),
            }
        );
        assert_eq!(
            normalize_step(&json!({"note": "no type at all"})),
            Action::Unknown { action_type: None }
        );
    }

    #[test]
    fn malformed_sibling_does_not_abort_the_sequence() {
        let plan = normalize(&json!([
            {"type": "scale", "name": "web", "replicas": 2},
            17,
            {"type": "show_exposed_services"}
        ]))
        .unwrap();

        let NormalizedPlan::MultiStep(steps) = plan else {
            panic!("expected multi-step plan");
        };
        assert_eq!(steps.len(), 3);
        assert!(matches!(steps[0], Action::Scale { .. }));
        assert!(matches!(steps[1], Action::Malformed { .. }));
        assert_eq!(steps[2], Action::ShowExposedServices);
    }

    #[test]
    fn field_type_mismatch_becomes_malformed() {
        let action = normalize_step(&json!({"type": "scale", "name": "web", "replicas": "two"}));
        assert!(matches!(action, Action::Malformed { .. }));
    }

    #[test]
    fn autoscale_accepts_both_field_spellings() {
        let short = normalize_step(&json!({
            "type": "autoscale", "name": "web", "min": 2, "max": 6, "cpu": 70
        }));
        let long = normalize_step(&json!({
            "type": "autoscale", "name": "web",
            "min_replicas": 2, "max_replicas": 6, "target_cpu": 70
        }));
        assert_eq!(short, long);
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize_step(&json!({"type": "analyze_metrics", "name": "web"}));
        let twice = normalize_step(&serde_json::to_value(&once).unwrap());
        assert_eq!(once, twice);

        let scale = normalize_step(&json!({"type": "scale", "name": "web", "replicas": 5}));
        let again = normalize_step(&serde_json::to_value(&scale).unwrap());
        assert_eq!(scale, again);
    }

    #[test]
    fn bare_action_name_string_is_a_type_only_action() {
        assert_eq!(
            normalize_step(&json!("show_exposed_services")),
            Action::ShowExposedServices
        );
    }
}
