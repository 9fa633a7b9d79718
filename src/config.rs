use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct KeepsakeConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: String,
    pub log_level: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Relational store (entities, memories, profiles).
    pub db_path: String,
    /// Vector index — a separate database so the two stores fail independently.
    pub vector_db_path: String,
    /// Vector collection name for the memory corpus.
    pub collection: String,
    /// User the MCP tools act for when a call does not name one.
    pub default_user: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub cache_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Result count for plain semantic search.
    pub default_top_k: usize,
    /// Result count for time-aware ranked search.
    pub ranked_top_k: usize,
    /// Over-fetch factor: the ranker sees `top_k * candidate_multiplier` candidates.
    pub candidate_multiplier: usize,
    pub recency_weight: f64,
    pub recency_decay_days: f64,
    /// Character budget for the rendered RAG context string.
    pub rag_max_length: usize,
}

impl Default for KeepsakeConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "stdio".into(),
            log_level: "info".into(),
            host: "127.0.0.1".into(),
            port: 8178,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let dir = default_keepsake_dir();
        Self {
            db_path: dir.join("keepsake.db").to_string_lossy().into_owned(),
            vector_db_path: dir.join("vectors.db").to_string_lossy().into_owned(),
            collection: "memories".into(),
            default_user: String::new(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_keepsake_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "all-MiniLM-L6-v2".into(),
            cache_dir,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            ranked_top_k: 6,
            candidate_multiplier: 3,
            recency_weight: 0.15,
            recency_decay_days: 90.0,
            rag_max_length: 8000,
        }
    }
}

/// Returns `~/.keepsake/`
pub fn default_keepsake_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".keepsake")
}

/// Returns the default config file path: `~/.keepsake/config.toml`
pub fn default_config_path() -> PathBuf {
    default_keepsake_dir().join("config.toml")
}

impl KeepsakeConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            KeepsakeConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (KEEPSAKE_DB, KEEPSAKE_VECTOR_DB, KEEPSAKE_USER, KEEPSAKE_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("KEEPSAKE_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("KEEPSAKE_VECTOR_DB") {
            self.storage.vector_db_path = val;
        }
        if let Ok(val) = std::env::var("KEEPSAKE_USER") {
            self.storage.default_user = val;
        }
        if let Ok(val) = std::env::var("KEEPSAKE_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }

    /// Resolve the relational database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    /// Resolve the vector database path, expanding `~` if needed.
    pub fn resolved_vector_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.vector_db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = KeepsakeConfig::default();
        assert_eq!(config.server.transport, "stdio");
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.storage.collection, "memories");
        assert_eq!(config.retrieval.default_top_k, 5);
        assert_eq!(config.retrieval.ranked_top_k, 6);
        assert_eq!(config.retrieval.candidate_multiplier, 3);
        assert!((config.retrieval.recency_weight - 0.15).abs() < 1e-9);
        assert!((config.retrieval.recency_decay_days - 90.0).abs() < 1e-9);
        assert!(config.storage.db_path.ends_with("keepsake.db"));
        assert!(config.storage.vector_db_path.ends_with("vectors.db"));
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
log_level = "debug"

[storage]
db_path = "/tmp/test.db"
default_user = "0198c6a1-0000-7000-8000-000000000001"

[retrieval]
ranked_top_k = 10
recency_decay_days = 30.0
"#;
        let config: KeepsakeConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.storage.db_path, "/tmp/test.db");
        assert_eq!(config.retrieval.ranked_top_k, 10);
        assert!((config.retrieval.recency_decay_days - 30.0).abs() < 1e-9);
        // defaults still apply for unset fields
        assert_eq!(config.retrieval.candidate_multiplier, 3);
        assert_eq!(config.storage.collection, "memories");
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = KeepsakeConfig::default();
        std::env::set_var("KEEPSAKE_DB", "/tmp/override.db");
        std::env::set_var("KEEPSAKE_USER", "env-user");
        std::env::set_var("KEEPSAKE_LOG_LEVEL", "trace");

        config.apply_env_overrides();

        assert_eq!(config.storage.db_path, "/tmp/override.db");
        assert_eq!(config.storage.default_user, "env-user");
        assert_eq!(config.server.log_level, "trace");

        std::env::remove_var("KEEPSAKE_DB");
        std::env::remove_var("KEEPSAKE_USER");
        std::env::remove_var("KEEPSAKE_LOG_LEVEL");
    }
}
