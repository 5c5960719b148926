//! KubePilot daemon - LLM-driven Kubernetes assistant.
//!
//! Wires the configured clients together and serves the HTTP front
//! door.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kubepilotd::cluster::KubectlClient;
use kubepilotd::config::Config;
use kubepilotd::dispatcher::ActionDispatcher;
use kubepilotd::history::SqliteHistory;
use kubepilotd::llm_client::OllamaClient;
use kubepilotd::orchestrator::Orchestrator;
use kubepilotd::prom::PromClient;
use kubepilotd::rag::{DocStore, RagRetriever};
use kubepilotd::routes::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("KubePilot daemon v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::load();
    let db_path = Path::new(&config.database.path);

    let history = Arc::new(SqliteHistory::open(db_path)?);
    let docs = Arc::new(DocStore::open(db_path)?);
    let llm = Arc::new(OllamaClient::new(&config.llm));
    let prom = Arc::new(PromClient::new(
        &config.prometheus.base_url,
        Duration::from_secs(config.prometheus.timeout_secs),
    ));
    let cluster = Arc::new(KubectlClient::new(&config.cluster, prom.clone()));

    let retriever = Arc::new(RagRetriever::new(docs.clone(), llm.clone()));
    let dispatcher = ActionDispatcher::new(cluster.clone(), prom.clone());
    let orchestrator = Orchestrator::new(
        llm.clone(),
        retriever,
        llm.clone(),
        history.clone(),
        dispatcher,
    );

    let state = Arc::new(AppState {
        orchestrator,
        history,
        metrics: prom,
        cluster,
        docs,
        embedder: llm,
    });

    let app = routes::router(state);
    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    info!("Listening on {}", config.server.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
