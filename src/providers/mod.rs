//! Provider abstractions for embeddings and answer generation
//!
//! Trait-based seams so the pipeline can run against an Ollama server, a
//! local ONNX model, or test doubles.

pub mod embedding;
pub mod llm;
pub mod ollama;
pub mod onnx;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use ollama::{OllamaEmbedder, OllamaLlm, OllamaProvider};
pub use onnx::OnnxEmbedder;
