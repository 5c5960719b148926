//! Ollama LLM client.
//!
//! One client, three roles: intent classification, plan generation,
//! and documentation-grounded answering, plus embeddings for the doc
//! store. Plan generation never fails on bad model output: anything
//! that does not parse as JSON comes back as a clarify mapping.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use kubepilot_common::prompts::{
    answer_prompt, intent_prompt, ANSWER_SYSTEM_PROMPT, PLANNER_SYSTEM_PROMPT,
};
use kubepilot_common::Intent;

use crate::capabilities::{AnswerGenerator, Planner};
use crate::config::LlmConfig;
use crate::rag::Embedder;

pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    planner_model: String,
    answer_model: String,
    embed_model: String,
    json_block: Regex,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.request_timeout_secs))
                .build()
                .unwrap_or_default(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            planner_model: config.planner_model.clone(),
            answer_model: config.answer_model.clone(),
            embed_model: config.embed_model.clone(),
            json_block: Regex::new(r"(?s)(\{.*\}|\[.*\])").expect("valid JSON block pattern"),
        }
    }

    async fn chat(&self, model: &str, system: &str, user: &str) -> Result<String> {
        let mut messages = Vec::new();
        if !system.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: user,
        });

        let response = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .json(&json!({
                "model": model,
                "messages": messages,
                "stream": false,
            }))
            .send()
            .await
            .context("Ollama request failed")?
            .error_for_status()
            .context("Ollama returned an error status")?;

        let parsed: ChatResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;
        Ok(parsed.message.content.trim().to_string())
    }

    /// First JSON object or array embedded in the model output.
    fn extract_json<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.json_block.find(text).map(|m| m.as_str())
    }
}

#[async_trait]
impl Planner for OllamaClient {
    async fn classify_intent(&self, query: &str) -> Result<Intent> {
        let verdict = self
            .chat(&self.planner_model, "", &intent_prompt(query))
            .await?;
        debug!("Intent classifier said: {verdict}");
        Ok(Intent::parse(&verdict))
    }

    async fn plan_action(&self, query: &str) -> Result<Value> {
        let raw = self
            .chat(&self.planner_model, PLANNER_SYSTEM_PROMPT, query)
            .await?;

        let Some(block) = self.extract_json(&raw) else {
            warn!("Planner output contained no JSON: {raw}");
            return Ok(clarify(
                "Failed to parse action plan. Please rephrase or simplify the command.",
            ));
        };

        match serde_json::from_str::<Value>(block) {
            Ok(plan) => Ok(plan),
            Err(e) => {
                warn!("Planner output was not valid JSON: {e}");
                Ok(clarify("Invalid JSON in plan. Please rephrase your command."))
            }
        }
    }
}

#[async_trait]
impl AnswerGenerator for OllamaClient {
    async fn generate_answer(&self, query: &str, context: &str) -> Result<String> {
        self.chat(
            &self.answer_model,
            ANSWER_SYSTEM_PROMPT,
            &answer_prompt(query, context),
        )
        .await
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .http
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&json!({
                "model": self.embed_model,
                "prompt": text,
            }))
            .send()
            .await
            .context("Ollama embedding request failed")?
            .error_for_status()
            .context("Ollama returned an error status")?;

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .context("Failed to parse embedding response")?;
        if parsed.embedding.is_empty() {
            return Err(anyhow!("Ollama returned an empty embedding"));
        }
        Ok(parsed.embedding)
    }
}

fn clarify(hint: &str) -> Value {
    json!({ "type": "clarify", "hint": hint })
}
