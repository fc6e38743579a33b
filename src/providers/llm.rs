//! LLM provider trait

use async_trait::async_trait;

use crate::error::Result;
use crate::types::ConversationTurn;

/// Trait for generative answer synthesis
///
/// Implementations:
/// - `OllamaLlm`: Ollama server (phi3, llama3, etc.)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate an answer from a question, grounding context, and prior
    /// conversation turns
    async fn generate_answer(
        &self,
        question: &str,
        context: &str,
        history: &[ConversationTurn],
    ) -> Result<String>;

    /// Generate a summary of a text
    async fn generate_summary(&self, text: &str) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model identifier in use
    fn model(&self) -> &str;
}
