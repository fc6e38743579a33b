//! Answer generation: Ollama client, prompt composition, answer synthesis

pub mod answerer;
pub mod ollama;
pub mod prompt;

pub use answerer::{Answerer, NO_ANSWER_FALLBACK};
pub use ollama::OllamaClient;
pub use prompt::PromptBuilder;
