//! Local ONNX Runtime embedding provider.
//!
//! Implements [`EmbeddingProvider`] with all-MiniLM-L6-v2 via `ort`:
//! batched tokenization, one inference pass per batch, attention-masked
//! mean pooling, L2 normalization.

use std::sync::Mutex;

use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;

use super::{EmbeddingProvider, DEFAULT_EMBEDDING_DIM};
use crate::config::EmbeddingConfig;
use crate::error::StoreError;

/// Maximum sequence length for all-MiniLM-L6-v2 (trained at 256).
const MAX_SEQ_LEN: usize = 256;

/// Local ONNX-based embedding provider using all-MiniLM-L6-v2.
pub struct LocalEmbeddingProvider {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

// Safety: Tokenizer is Send+Sync. Session is behind a Mutex, which
// guarantees exclusive access during run().
unsafe impl Send for LocalEmbeddingProvider {}
unsafe impl Sync for LocalEmbeddingProvider {}

impl LocalEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, StoreError> {
        let cache_dir = crate::config::expand_tilde(&config.cache_dir);
        let model_path = cache_dir.join("model.onnx");
        let tokenizer_path = cache_dir.join("tokenizer.json");

        if !model_path.exists() {
            return Err(StoreError::Embedding(format!(
                "ONNX model not found at {}. Run `keepsake model download` first.",
                model_path.display()
            )));
        }
        if !tokenizer_path.exists() {
            return Err(StoreError::Embedding(format!(
                "Tokenizer not found at {}. Run `keepsake model download` first.",
                tokenizer_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e| StoreError::Embedding(format!("failed to load ONNX model: {e}")))?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
            .map_err(|e| StoreError::Embedding(format!("failed to load ONNX model: {e}")))?
            .with_intra_threads(4)
            .map_err(|e| StoreError::Embedding(format!("failed to load ONNX model: {e}")))?
            .commit_from_file(&model_path)
            .map_err(|e| StoreError::Embedding(format!("failed to load ONNX model: {e}")))?;

        tracing::info!(model = %model_path.display(), "ONNX model loaded");

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| StoreError::Embedding(format!("failed to load tokenizer: {e}")))?;

        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_SEQ_LEN,
                ..Default::default()
            }))
            .map_err(|e| StoreError::Embedding(format!("failed to set truncation: {e}")))?;

        tokenizer.with_padding(Some(tokenizers::PaddingParams {
            strategy: tokenizers::PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        tracing::info!(tokenizer = %tokenizer_path.display(), "tokenizer loaded");

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }
}

impl EmbeddingProvider for LocalEmbeddingProvider {
    fn embed_texts(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StoreError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let embed_err = |msg: String| StoreError::Embedding(msg);

        // Tokenize the whole batch; padding makes rows uniform
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| embed_err(format!("tokenization failed: {e}")))?;

        let batch_size = encodings.len();
        let seq_len = encodings[0].get_ids().len();

        let mut input_ids_flat = Vec::with_capacity(batch_size * seq_len);
        let mut attention_mask_flat = Vec::with_capacity(batch_size * seq_len);

        for encoding in &encodings {
            for &id in encoding.get_ids() {
                input_ids_flat.push(id as i64);
            }
            for &mask in encoding.get_attention_mask() {
                attention_mask_flat.push(mask as i64);
            }
        }

        let shape = vec![batch_size as i64, seq_len as i64];
        let input_ids_tensor = Tensor::from_array((shape.clone(), input_ids_flat.into_boxed_slice()))
            .map_err(|e| embed_err(format!("tensor build failed: {e}")))?;
        let attention_mask_tensor = Tensor::from_array((
            shape.clone(),
            attention_mask_flat.clone().into_boxed_slice(),
        ))
        .map_err(|e| embed_err(format!("tensor build failed: {e}")))?;
        // token_type_ids: all zeros (single sentence, no segment B)
        let token_type_ids = vec![0i64; batch_size * seq_len];
        let token_type_ids_tensor = Tensor::from_array((shape, token_type_ids.into_boxed_slice()))
            .map_err(|e| embed_err(format!("tensor build failed: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| embed_err(format!("session lock poisoned: {e}")))?;

        let outputs = session
            .run(ort::inputs! {
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor,
            })
            .map_err(|e| embed_err(format!("inference failed: {e}")))?;

        // Token embeddings come out as [batch, seq_len, dim]. The output
        // name varies by ONNX export — try common names, fall back to index 0.
        let token_emb_value = outputs
            .get("token_embeddings")
            .or_else(|| outputs.get("last_hidden_state"))
            .unwrap_or_else(|| &outputs[0]);

        let (out_shape, data) = token_emb_value
            .try_extract_tensor::<f32>()
            .map_err(|e| embed_err(format!("failed to extract token embeddings: {e}")))?;

        let dims: &[i64] = &out_shape;
        if dims.len() != 3 || dims[2] != DEFAULT_EMBEDDING_DIM as i64 {
            return Err(embed_err(format!(
                "unexpected token embedding shape: {dims:?}, expected [batch, seq, {DEFAULT_EMBEDDING_DIM}]"
            )));
        }
        let hidden_dim = dims[2] as usize;
        let actual_seq_len = dims[1] as usize;

        // Attention-masked mean pooling, then L2 normalization
        let mut results = Vec::with_capacity(batch_size);
        for b in 0..batch_size {
            let mut sum = vec![0.0f32; hidden_dim];
            let mut count = 0.0f32;

            for s in 0..actual_seq_len {
                let mask = attention_mask_flat[b * seq_len + s] as f32;
                if mask > 0.0 {
                    let offset = (b * actual_seq_len + s) * hidden_dim;
                    for d in 0..hidden_dim {
                        sum[d] += data[offset + d] * mask;
                    }
                    count += mask;
                }
            }

            if count > 0.0 {
                for d in sum.iter_mut() {
                    *d /= count;
                }
            }

            results.push(l2_normalize(&sum));
        }

        Ok(results)
    }
}

/// L2-normalize a vector. Returns a zero vector if the input norm is zero.
fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}
