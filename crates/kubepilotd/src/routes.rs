//! HTTP front door.
//!
//! Thin request boundary over the orchestrator and the read-only
//! resource views. No business logic here: handlers deserialize,
//! delegate, and shape the response.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::capabilities::HistoryStore;
use crate::cluster::KubectlClient;
use crate::orchestrator::Orchestrator;
use crate::prom::PromClient;
use crate::rag::{DocStore, Embedder};

pub struct AppState {
    pub orchestrator: Orchestrator,
    pub history: Arc<dyn HistoryStore>,
    pub metrics: Arc<PromClient>,
    pub cluster: Arc<KubectlClient>,
    pub docs: Arc<DocStore>,
    pub embedder: Arc<dyn Embedder>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/ask", post(ask))
        .route("/history", get(history))
        .route("/docs", post(upload_doc))
        .route("/metrics/time-series", get(time_series))
        .route("/pods", get(pods))
        .route("/deployments", get(deployments))
        .route("/services", get(services))
        .route("/configmaps", get(configmaps))
        .route("/namespaces", get(namespaces))
        .route("/nodes", get(nodes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Deserialize)]
struct AskRequest {
    query: String,
}

#[derive(Deserialize)]
struct TimeSeriesParams {
    metric_type: String,
}

#[derive(Deserialize)]
struct DocUpload {
    id: String,
    text: String,
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "LLM-powered Kubernetes assistant is running." }))
}

async fn ask(State(state): State<Arc<AppState>>, Json(request): Json<AskRequest>) -> Json<Value> {
    let result = state.orchestrator.process(&request.query).await;
    Json(serde_json::to_value(&result).unwrap_or_else(|e| {
        error!("Failed to serialize result: {e}");
        json!({ "type": "error", "message": "Internal serialization error." })
    }))
}

async fn history(State(state): State<Arc<AppState>>) -> Json<Value> {
    match state.history.history().await {
        Ok(records) => Json(json!(records)),
        Err(e) => error_body(e.to_string()),
    }
}

async fn upload_doc(
    State(state): State<Arc<AppState>>,
    Json(doc): Json<DocUpload>,
) -> Json<Value> {
    let embedding = match state.embedder.embed(&doc.text).await {
        Ok(embedding) => embedding,
        Err(e) => return error_body(e.to_string()),
    };
    match state.docs.upsert(&doc.id, &doc.text, &embedding).await {
        Ok(()) => Json(json!({ "status": "stored", "id": doc.id })),
        Err(e) => error_body(e.to_string()),
    }
}

async fn time_series(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TimeSeriesParams>,
) -> Json<Value> {
    match state.metrics.query_series(&params.metric_type, 10, 10).await {
        Ok(samples) => Json(json!({ "status": "success", "metrics": samples })),
        Err(e) => error_body(e.to_string()),
    }
}

async fn pods(State(state): State<Arc<AppState>>) -> Json<Value> {
    listing(state.cluster.list_pods().await)
}

async fn deployments(State(state): State<Arc<AppState>>) -> Json<Value> {
    listing(state.cluster.list_deployments().await)
}

async fn services(State(state): State<Arc<AppState>>) -> Json<Value> {
    listing(state.cluster.list_services().await)
}

async fn configmaps(State(state): State<Arc<AppState>>) -> Json<Value> {
    listing(state.cluster.list_configmaps().await)
}

async fn namespaces(State(state): State<Arc<AppState>>) -> Json<Value> {
    listing(state.cluster.list_namespaces().await)
}

async fn nodes(State(state): State<Arc<AppState>>) -> Json<Value> {
    listing(state.cluster.list_nodes().await)
}

fn listing(result: anyhow::Result<Vec<String>>) -> Json<Value> {
    match result {
        Ok(names) => Json(json!(names)),
        Err(e) => error_body(e.to_string()),
    }
}

fn error_body(message: String) -> Json<Value> {
    Json(json!({ "status": "error", "message": message }))
}
