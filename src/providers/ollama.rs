//! Ollama-backed providers for embeddings and answer generation

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::Result;
use crate::generation::ollama::OllamaClient;
use crate::generation::prompt::PromptBuilder;
use crate::types::ConversationTurn;

use super::embedding::EmbeddingProvider;
use super::llm::LlmProvider;

/// Ollama embedding provider
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    dimensions: usize,
}

impl OllamaEmbedder {
    /// Create a new Ollama embedder
    pub fn new(config: &LlmConfig, dimensions: usize) -> Self {
        Self {
            client: Arc::new(OllamaClient::new(config)),
            dimensions,
        }
    }

    /// Create from an existing shared client
    pub fn from_client(client: Arc<OllamaClient>, dimensions: usize) -> Self {
        Self { client, dimensions }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client.embed(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // Ollama has no native batch endpoint; calls run sequentially
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.client.embed(text).await?);
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Ollama answer generation provider
pub struct OllamaLlm {
    client: Arc<OllamaClient>,
    history_budget_chars: usize,
}

impl OllamaLlm {
    /// Create a new Ollama LLM provider
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            client: Arc::new(OllamaClient::new(config)),
            history_budget_chars: config.history_budget_chars,
        }
    }

    /// Create from an existing shared client
    pub fn from_client(client: Arc<OllamaClient>, history_budget_chars: usize) -> Self {
        Self {
            client,
            history_budget_chars,
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaLlm {
    async fn generate_answer(
        &self,
        question: &str,
        context: &str,
        history: &[ConversationTurn],
    ) -> Result<String> {
        let prompt =
            PromptBuilder::build_qa_prompt(question, context, history, self.history_budget_chars);
        self.client.generate(&prompt).await
    }

    async fn generate_summary(&self, text: &str) -> Result<String> {
        let prompt = PromptBuilder::build_summary_prompt(text);
        self.client.generate(&prompt).await
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        self.client.generate_model()
    }
}

/// Combined provider sharing one client for embeddings and generation
pub struct OllamaProvider {
    embedder: OllamaEmbedder,
    llm: OllamaLlm,
}

impl OllamaProvider {
    /// Create a combined provider
    pub fn new(config: &LlmConfig, dimensions: usize) -> Self {
        let client = Arc::new(OllamaClient::new(config));
        Self {
            embedder: OllamaEmbedder::from_client(Arc::clone(&client), dimensions),
            llm: OllamaLlm::from_client(client, config.history_budget_chars),
        }
    }

    /// Split into separate providers
    pub fn split(self) -> (OllamaEmbedder, OllamaLlm) {
        (self.embedder, self.llm)
    }
}
