//! Text-to-vector embedding pipeline.
//!
//! Provides the [`EmbeddingProvider`] trait and a local implementation using
//! all-MiniLM-L6-v2 (384 dimensions, L2-normalized). The provider is created
//! via [`create_provider`] from configuration and injected into the insert
//! and search paths.

pub mod local;

use crate::error::StoreError;

/// Number of dimensions produced by the default model (all-MiniLM-L6-v2).
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Trait for embedding text into vectors.
///
/// `embed_texts` is the primary operation — the insert path embeds whole
/// batches in one call, and implementations must preserve input order
/// (one vector per input text). All methods are synchronous; callers in
/// async contexts offload to `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts, order-preserving. Empty input returns an
    /// empty batch without touching the model.
    fn embed_texts(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StoreError>;

    /// Embed a single text.
    fn embed_text(&self, text: &str) -> Result<Vec<f32>, StoreError> {
        let mut batch = self.embed_texts(&[text])?;
        batch
            .pop()
            .ok_or_else(|| StoreError::Embedding("provider returned empty batch".into()))
    }

    /// Number of dimensions this provider produces.
    fn dimensions(&self) -> usize {
        DEFAULT_EMBEDDING_DIM
    }
}

/// Create an embedding provider from config.
///
/// Currently only `"local"` is supported (ONNX Runtime + all-MiniLM-L6-v2).
/// Returns an error if model files are not found — run `keepsake model download` first.
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> Result<Box<dyn EmbeddingProvider>, StoreError> {
    match config.provider.as_str() {
        "local" => {
            let provider = local::LocalEmbeddingProvider::new(config)?;
            Ok(Box::new(provider))
        }
        other => Err(StoreError::Embedding(format!(
            "unknown embedding provider: {other}. Supported: local"
        ))),
    }
}
