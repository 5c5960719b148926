//! Orchestration entry point.
//!
//! `process` is the single operation this daemon exposes upward:
//! classify the query, answer it from documentation or turn it into
//! cluster operations via the planner and dispatcher, persist the
//! interaction, and return a typed result. No fault escapes to the
//! caller: anything unexpected becomes an `error`-kind result, which
//! (like `clarify`) is never persisted.

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use kubepilot_common::{normalize, Action, ExecutionResult, Intent, NormalizedPlan};

use crate::capabilities::{AnswerGenerator, ContextRetriever, HistoryStore, Planner};
use crate::dispatcher::ActionDispatcher;

pub struct Orchestrator {
    planner: Arc<dyn Planner>,
    retriever: Arc<dyn ContextRetriever>,
    answerer: Arc<dyn AnswerGenerator>,
    history: Arc<dyn HistoryStore>,
    dispatcher: ActionDispatcher,
}

impl Orchestrator {
    pub fn new(
        planner: Arc<dyn Planner>,
        retriever: Arc<dyn ContextRetriever>,
        answerer: Arc<dyn AnswerGenerator>,
        history: Arc<dyn HistoryStore>,
        dispatcher: ActionDispatcher,
    ) -> Self {
        Self {
            planner,
            retriever,
            answerer,
            history,
            dispatcher,
        }
    }

    /// Process one query start to finish.
    pub async fn process(&self, query: &str) -> ExecutionResult {
        match self.process_inner(query).await {
            Ok(result) => result,
            Err(e) => {
                error!("Query processing failed: {e:#}");
                ExecutionResult::Error {
                    message: e.to_string(),
                }
            }
        }
    }

    async fn process_inner(&self, query: &str) -> Result<ExecutionResult> {
        let intent = self.planner.classify_intent(query).await?;
        info!("Classified intent: {intent:?}");

        match intent {
            Intent::Question => self.answer_question(query).await,
            Intent::Command => self.run_command(query).await,
            Intent::Other(_) => Ok(ExecutionResult::Error {
                message: "Unknown intent type.".to_string(),
            }),
        }
    }

    async fn answer_question(&self, query: &str) -> Result<ExecutionResult> {
        let docs = self.retriever.retrieve(query).await?;
        let context = docs.join("\n---\n");
        let answer = self.answerer.generate_answer(query, &context).await?;

        self.history.store(query, &answer).await?;
        Ok(ExecutionResult::Answer { result: answer })
    }

    async fn run_command(&self, query: &str) -> Result<ExecutionResult> {
        let plan = self.planner.plan_action(query).await?;

        let normalized = match normalize(&plan) {
            Ok(normalized) => normalized,
            // A plan we cannot classify is a clarification, not a
            // fault: ask the operator to rephrase.
            Err(e) => {
                info!("Plan failed normalization: {e}");
                return Ok(ExecutionResult::Clarify {
                    hint: Some(format!("{e} Please rephrase your command.")),
                    missing: None,
                });
            }
        };

        match normalized {
            NormalizedPlan::SingleCommand(command) => {
                let action = if looks_like_manifest(&command) {
                    Action::Yaml {
                        content: Some(command),
                    }
                } else {
                    Action::Cli {
                        content: Some(command),
                    }
                };
                let result = self.dispatcher.execute(&action).await;
                self.history.store(query, &result).await?;
                Ok(ExecutionResult::Command { result })
            }

            NormalizedPlan::MultiStep(steps) => {
                info!("Executing multi-step plan with {} steps", steps.len());
                let result = self.dispatcher.execute_plan(&steps).await;
                self.history.store(query, &result).await?;
                Ok(ExecutionResult::MultiStep { result })
            }

            // Terminal: no dispatch, no persistence.
            NormalizedPlan::Clarification { hint, missing } => {
                Ok(ExecutionResult::Clarify { hint, missing })
            }

            NormalizedPlan::Single(action) => {
                let result = self.dispatcher.execute(&action).await;
                self.history.store(query, &result).await?;
                Ok(ExecutionResult::Action { result })
            }
        }
    }
}

/// A bare command string is applied as a manifest when it reads like
/// one, and run as a CLI command otherwise.
fn looks_like_manifest(command: &str) -> bool {
    let trimmed = command.trim_start();
    trimmed.starts_with("apiVersion:") || trimmed.starts_with("kind:") || command.contains("\nkind:")
}
