//! Local ONNX embedding provider
//!
//! Runs a sentence-transformer model (all-MiniLM-L6-v2 by default, 384
//! dimensions) through ONNX Runtime. The model and tokenizer are downloaded
//! once into a cache directory; after initialization the session is treated
//! as read-only and shared across concurrent inference calls.

use async_trait::async_trait;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tokenizers::Tokenizer;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;

/// Local ONNX text embedder
pub struct OnnxEmbedder {
    inner: Arc<OnnxModel>,
}

struct OnnxModel {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    dimensions: usize,
    max_length: usize,
    batch_size: usize,
}

impl OnnxEmbedder {
    /// Load or download the model and build an inference session
    pub async fn new(config: &EmbeddingConfig) -> Result<Self> {
        tracing::info!(model = %config.model, "initializing ONNX embedder");

        std::fs::create_dir_all(&config.cache_dir)
            .map_err(|e| Error::Config(format!("Failed to create model cache dir: {}", e)))?;

        let model_path = config.cache_dir.join("model.onnx");
        let tokenizer_path = config.cache_dir.join("tokenizer.json");

        if !model_path.exists() {
            download_artifact(&config.model, "onnx/model.onnx", &model_path).await?;
        }
        if !tokenizer_path.exists() {
            download_artifact(&config.model, "tokenizer.json", &tokenizer_path).await?;
        }

        let session = Session::builder()
            .map_err(|e| Error::embedding_unavailable(format!("session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| Error::embedding_unavailable(format!("optimization level: {}", e)))?
            .with_intra_threads(4)
            .map_err(|e| Error::embedding_unavailable(format!("thread config: {}", e)))?
            .commit_from_file(&model_path)
            .map_err(|e| Error::embedding_unavailable(format!("model load: {}", e)))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| Error::embedding_unavailable(format!("tokenizer load: {}", e)))?;

        tracing::info!("ONNX embedder ready");

        Ok(Self {
            inner: Arc::new(OnnxModel {
                session: Mutex::new(session),
                tokenizer,
                dimensions: config.dimensions,
                max_length: config.max_length,
                batch_size: config.batch_size,
            }),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OnnxEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let inner = Arc::clone(&self.inner);
        let text = text.to_string();

        let mut vectors = tokio::task::spawn_blocking(move || inner.encode_batch(&[text]))
            .await
            .map_err(|e| Error::internal(format!("inference task join error: {}", e)))??;

        vectors
            .pop()
            .ok_or_else(|| Error::embedding_unavailable("empty embedding result"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let inner = Arc::clone(&self.inner);
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut all = Vec::with_capacity(texts.len());
            for batch in texts.chunks(inner.batch_size) {
                all.extend(inner.encode_batch(batch)?);
            }
            Ok(all)
        })
        .await
        .map_err(|e| Error::internal(format!("inference task join error: {}", e)))?
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        // A constructed session is ready; construction already validated it
        Ok(true)
    }

    fn name(&self) -> &str {
        "onnx"
    }
}

impl OnnxModel {
    /// Run one tokenize/inference/pool pass over a batch
    fn encode_batch<T: AsRef<str> + Send + Sync>(&self, texts: &[T]) -> Result<Vec<Vec<f32>>> {
        let batch_size = texts.len();
        let inputs: Vec<String> = texts.iter().map(|t| t.as_ref().to_string()).collect();

        let encodings = self
            .tokenizer
            .encode_batch(inputs, true)
            .map_err(|e| Error::embedding_unavailable(format!("tokenization failed: {}", e)))?;

        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(self.max_length);

        let mut input_ids = vec![0i64; batch_size * seq_len];
        let mut attention_mask = vec![0i64; batch_size * seq_len];
        let mut token_type_ids = vec![0i64; batch_size * seq_len];

        for (row, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let types = encoding.get_type_ids();
            let len = ids.len().min(seq_len);

            for col in 0..len {
                input_ids[row * seq_len + col] = ids[col] as i64;
                attention_mask[row * seq_len + col] = mask[col] as i64;
                token_type_ids[row * seq_len + col] = types[col] as i64;
            }
        }

        let shape = vec![batch_size, seq_len];
        let ids_tensor = Tensor::from_array((shape.clone(), input_ids.into_boxed_slice()))
            .map_err(|e| Error::embedding_unavailable(format!("input tensor: {}", e)))?;
        let mask_values = attention_mask.clone();
        let mask_tensor = Tensor::from_array((shape.clone(), attention_mask.into_boxed_slice()))
            .map_err(|e| Error::embedding_unavailable(format!("mask tensor: {}", e)))?;
        let types_tensor = Tensor::from_array((shape, token_type_ids.into_boxed_slice()))
            .map_err(|e| Error::embedding_unavailable(format!("type tensor: {}", e)))?;

        let run_inputs = vec![
            ("input_ids", ids_tensor.into_dyn()),
            ("attention_mask", mask_tensor.into_dyn()),
            ("token_type_ids", types_tensor.into_dyn()),
        ];

        let mut session = self.session.lock();
        let outputs = session
            .run(run_inputs)
            .map_err(|e| Error::embedding_unavailable(format!("inference failed: {}", e)))?;

        let collected: Vec<_> = outputs.iter().collect();
        let output = collected
            .iter()
            .find(|(name, _)| *name == "last_hidden_state")
            .or_else(|| collected.first())
            .map(|(_, value)| value)
            .ok_or_else(|| Error::embedding_unavailable("no output tensor"))?;

        let (tensor_shape, tensor_data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::embedding_unavailable(format!("tensor extraction: {}", e)))?;

        let dims: Vec<usize> = tensor_shape.iter().map(|&d| d as usize).collect();
        let hidden_size = dims.get(2).copied().unwrap_or(self.dimensions);

        Ok(mean_pool(
            tensor_data,
            &mask_values,
            batch_size,
            seq_len,
            hidden_size,
        ))
    }
}

/// Attention-masked mean pooling followed by L2 normalization
fn mean_pool(
    hidden: &[f32],
    mask: &[i64],
    batch_size: usize,
    seq_len: usize,
    hidden_size: usize,
) -> Vec<Vec<f32>> {
    let mut embeddings = Vec::with_capacity(batch_size);

    for row in 0..batch_size {
        let mut pooled = vec![0.0f32; hidden_size];
        let mut count = 0.0f32;

        for col in 0..seq_len {
            let mask_val = mask[row * seq_len + col] as f32;
            if mask_val > 0.0 {
                let base = row * seq_len * hidden_size + col * hidden_size;
                for (k, value) in pooled.iter_mut().enumerate() {
                    if let Some(h) = hidden.get(base + k) {
                        *value += h * mask_val;
                    }
                }
                count += mask_val;
            }
        }

        if count > 0.0 {
            for value in &mut pooled {
                *value /= count;
            }
        }

        let norm: f32 = pooled.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut pooled {
                *value /= norm;
            }
        }

        embeddings.push(pooled);
    }

    embeddings
}

/// Download one model artifact from the sentence-transformers hub
async fn download_artifact(model_name: &str, artifact: &str, dest: &Path) -> Result<()> {
    let url = format!(
        "https://huggingface.co/sentence-transformers/{}/resolve/main/{}",
        model_name, artifact
    );

    tracing::info!(%url, "downloading model artifact");

    let response = reqwest::get(&url)
        .await
        .map_err(|e| Error::embedding_unavailable(format!("download failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(Error::embedding_unavailable(format!(
            "download failed: HTTP {}",
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::embedding_unavailable(format!("download read failed: {}", e)))?;

    std::fs::write(dest, &bytes)
        .map_err(|e| Error::embedding_unavailable(format!("artifact write failed: {}", e)))?;

    tracing::info!(bytes = bytes.len(), "artifact cached");

    Ok(())
}
