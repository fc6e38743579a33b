//! Configuration for the document-QA pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagConfig {
    /// Embedding backend (ollama or onnx)
    #[serde(default)]
    pub backend: EmbeddingBackend,
    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Embedding configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    /// LLM configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Extraction configuration
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Job registry configuration
    #[serde(default)]
    pub jobs: JobConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))
    }
}

/// Embedding backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Ollama server (nomic-embed-text or similar)
    #[default]
    Ollama,
    /// Local ONNX model (all-MiniLM-L6-v2)
    Onnx,
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Overlap between adjacent chunks in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Segments shorter than this are dropped before embedding
    #[serde(default = "default_min_segment_len")]
    pub min_segment_len: usize,
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}
fn default_min_segment_len() -> usize {
    50
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            min_segment_len: 50,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name (ONNX backend downloads this from the HuggingFace hub)
    pub model: String,
    /// Embedding dimensions (384 for MiniLM, 768 for nomic-embed-text)
    pub dimensions: usize,
    /// Batch size for index construction
    pub batch_size: usize,
    /// Maximum token sequence length (ONNX backend)
    pub max_length: usize,
    /// Cache directory for downloaded models (ONNX backend)
    pub cache_dir: PathBuf,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
            batch_size: 32,
            max_length: 256,
            cache_dir: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("doc-rag")
                .join("models"),
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name (Ollama backend)
    pub embed_model: String,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Retries for failed embedding requests
    pub embed_retries: u32,
    /// Retries for failed generation requests
    pub generate_retries: u32,
    /// Character budget for conversation history in prompts
    pub history_budget_chars: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            generate_model: "phi3".to_string(),
            temperature: 0.3,
            timeout_secs: 120,
            embed_retries: 2,
            generate_retries: 1,
            history_budget_chars: 4000,
        }
    }
}

/// Extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Run OCR on pages with no extractable text layer
    #[serde(default = "default_ocr_enabled")]
    pub ocr_enabled: bool,
    /// OCR language passed to tesseract
    #[serde(default = "default_ocr_language")]
    pub ocr_language: String,
    /// Rendering resolution for OCR page images (DPI)
    #[serde(default = "default_ocr_dpi")]
    pub ocr_dpi: u32,
    /// Timeout for in-process PDF extraction in seconds
    #[serde(default = "default_pdf_timeout")]
    pub pdf_timeout_secs: u64,
    /// Rewrite detected table rows into pipe-separated lines
    #[serde(default = "default_linearize_tables")]
    pub linearize_tables: bool,
}

fn default_ocr_enabled() -> bool {
    true
}
fn default_ocr_language() -> String {
    "eng".to_string()
}
fn default_ocr_dpi() -> u32 {
    150
}
fn default_pdf_timeout() -> u64 {
    60
}
fn default_linearize_tables() -> bool {
    true
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            ocr_enabled: true,
            ocr_language: "eng".to_string(),
            ocr_dpi: 150,
            pdf_timeout_secs: 60,
            linearize_tables: true,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of segments to retrieve per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    4
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

/// Job registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Seconds a finished job's result is kept before it can be reaped
    #[serde(default = "default_result_ttl")]
    pub result_ttl_secs: u64,
}

fn default_result_ttl() -> u64 {
    3600
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            result_ttl_secs: 3600,
        }
    }
}
