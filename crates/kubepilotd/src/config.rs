//! Configuration management for kubepilotd.
//!
//! Loads settings from /etc/kubepilot/config.toml or uses defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/kubepilot/config.toml";

/// HTTP front door configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the request boundary
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Ollama endpoint
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model used for intent classification and plan generation
    #[serde(default = "default_planner_model")]
    pub planner_model: String,

    /// Model used for documentation-grounded answers
    #[serde(default = "default_answer_model")]
    pub answer_model: String,

    /// Model used for document embeddings
    #[serde(default = "default_embed_model")]
    pub embed_model: String,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub request_timeout_secs: u64,
}

fn default_llm_base_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_planner_model() -> String {
    "qwen2.5:7b-instruct".to_string()
}

fn default_answer_model() -> String {
    "qwen2.5:7b-instruct".to_string()
}

fn default_embed_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_llm_timeout() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            planner_model: default_planner_model(),
            answer_model: default_answer_model(),
            embed_model: default_embed_model(),
            request_timeout_secs: default_llm_timeout(),
        }
    }
}

/// Prometheus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrometheusConfig {
    #[serde(default = "default_prometheus_url")]
    pub base_url: String,

    /// Per-query timeout in seconds
    #[serde(default = "default_prometheus_timeout")]
    pub timeout_secs: u64,
}

fn default_prometheus_url() -> String {
    "http://localhost:19092".to_string()
}

fn default_prometheus_timeout() -> u64 {
    30
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            base_url: default_prometheus_url(),
            timeout_secs: default_prometheus_timeout(),
        }
    }
}

/// Cluster access configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// kubectl binary to drive
    #[serde(default = "default_kubectl_path")]
    pub kubectl_path: String,

    /// Namespace used for resource listings
    #[serde(default = "default_cluster_namespace")]
    pub namespace: String,
}

fn default_kubectl_path() -> String {
    "kubectl".to_string()
}

fn default_cluster_namespace() -> String {
    "default".to_string()
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            kubectl_path: default_kubectl_path(),
            namespace: default_cluster_namespace(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file holding conversation history and the doc store
    #[serde(default = "default_database_path")]
    pub path: String,
}

fn default_database_path() -> String {
    "/var/lib/kubepilot/kubepilot.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Top-level daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub prometheus: PrometheusConfig,
    #[serde(default)]
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl Config {
    /// Load from the config file, falling back to defaults on any
    /// read or parse problem.
    pub fn load() -> Self {
        Self::load_from(Path::new(CONFIG_PATH))
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(raw) => match toml::from_str(&raw) {
                Ok(config) => {
                    info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Invalid config at {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("No config at {}, using defaults", path.display());
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load_from(Path::new("/nonexistent/kubepilot.toml"));
        assert_eq!(config.server.bind_addr, "127.0.0.1:8000");
        assert_eq!(config.prometheus.base_url, "http://localhost:19092");
    }

    #[test]
    fn partial_file_fills_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[prometheus]\nbase_url = \"http://prom:9090\"\n").unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.prometheus.base_url, "http://prom:9090");
        assert_eq!(config.prometheus.timeout_secs, 30);
        assert_eq!(config.cluster.kubectl_path, "kubectl");
    }
}
