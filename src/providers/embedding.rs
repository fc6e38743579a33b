//! Embedding provider trait

use async_trait::async_trait;

use crate::error::Result;

/// Trait for mapping text into a fixed-dimension vector space
///
/// Implementations must be deterministic within a process: the same text
/// against the same model handle yields the same vector.
///
/// Implementations:
/// - `OllamaEmbedder`: Ollama server (nomic-embed-text or similar)
/// - `OnnxEmbedder`: local ONNX model (all-MiniLM-L6-v2)
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed multiple texts, preserving input order
    ///
    /// Preferred for index construction to amortize model invocation
    /// overhead. The default implementation calls `embed` sequentially.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Embedding dimensionality (e.g. 384 for MiniLM)
    fn dimensions(&self) -> usize;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic embedder mapping each text to its byte statistics
    struct ByteStatEmbedder;

    #[async_trait]
    impl EmbeddingProvider for ByteStatEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let sum: u32 = text.bytes().map(u32::from).sum();
            Ok(vec![text.len() as f32, sum as f32])
        }

        fn dimensions(&self) -> usize {
            2
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "byte-stat"
        }
    }

    #[tokio::test]
    async fn test_embed_is_deterministic() {
        let embedder = ByteStatEmbedder;
        let a = embedder.embed("termination clause").await.unwrap();
        let b = embedder.embed("termination clause").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_default_batch_preserves_input_order() {
        let embedder = ByteStatEmbedder;
        let texts = vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()];

        let batched = embedder.embed_batch(&texts).await.unwrap();

        assert_eq!(batched.len(), 3);
        for (text, vector) in texts.iter().zip(&batched) {
            assert_eq!(*vector, embedder.embed(text).await.unwrap());
        }
    }
}
