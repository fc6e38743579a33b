//! Conversational answer synthesis over retrieved segments

use std::sync::Arc;

use crate::error::Result;
use crate::providers::LlmProvider;
use crate::types::{AnswerResult, ConversationTurn, Segment};

use super::prompt::PromptBuilder;

/// Deterministic answer returned when the model produces no usable output
///
/// Distinguishes "no answer found" from a system failure; callers that need
/// to branch can additionally inspect `supporting_segments`.
pub const NO_ANSWER_FALLBACK: &str = "Sorry, I couldn't find an answer to your question.";

/// Conversational answerer
///
/// Composes retrieved segments, prior turns, and the new question into a
/// prompt and invokes the generative model. This is the single blocking,
/// potentially slow step of the pipeline. `answer` never mutates its inputs
/// and returns a fresh `AnswerResult` on every call.
pub struct Answerer {
    llm: Arc<dyn LlmProvider>,
}

impl Answerer {
    /// Create an answerer over an LLM provider
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Answer a question grounded in the retrieved segments
    ///
    /// A transport-level model failure surfaces as `AnswerGeneration` (the
    /// provider retries internally); a model that returns empty output maps
    /// to the deterministic fallback answer instead of an error.
    pub async fn answer(
        &self,
        question: &str,
        history: &[ConversationTurn],
        retrieved: &[Segment],
    ) -> Result<AnswerResult> {
        let context = PromptBuilder::build_context(retrieved);

        let raw = self
            .llm
            .generate_answer(question, &context, history)
            .await?;

        let answer = raw.trim();
        let answer = if answer.is_empty() {
            tracing::warn!("model returned empty output, using fallback answer");
            NO_ANSWER_FALLBACK.to_string()
        } else {
            answer.to_string()
        };

        Ok(AnswerResult::new(answer, retrieved.to_vec()))
    }

    /// Summarize a text
    pub async fn summarize(&self, text: &str) -> Result<String> {
        let summary = self.llm.generate_summary(text).await?;
        let summary = summary.trim();

        if summary.is_empty() {
            tracing::warn!("model returned empty summary, using fallback answer");
            return Ok(NO_ANSWER_FALLBACK.to_string());
        }

        Ok(summary.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::error::Error;

    /// Test double that records the context it was handed and replies with a
    /// canned answer
    struct RecordingLlm {
        seen_context: Mutex<Option<String>>,
        seen_history: Mutex<Vec<ConversationTurn>>,
        reply: String,
        fail: bool,
    }

    impl RecordingLlm {
        fn replying(reply: &str) -> Self {
            Self {
                seen_context: Mutex::new(None),
                seen_history: Mutex::new(Vec::new()),
                reply: reply.to_string(),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                seen_context: Mutex::new(None),
                seen_history: Mutex::new(Vec::new()),
                reply: String::new(),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl LlmProvider for RecordingLlm {
        async fn generate_answer(
            &self,
            _question: &str,
            context: &str,
            history: &[ConversationTurn],
        ) -> Result<String> {
            if self.fail {
                return Err(Error::answer_generation("model crashed"));
            }
            *self.seen_context.lock() = Some(context.to_string());
            *self.seen_history.lock() = history.to_vec();
            Ok(self.reply.clone())
        }

        async fn generate_summary(&self, _text: &str) -> Result<String> {
            if self.fail {
                return Err(Error::answer_generation("model crashed"));
            }
            Ok(self.reply.clone())
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(!self.fail)
        }

        fn name(&self) -> &str {
            "recording"
        }

        fn model(&self) -> &str {
            "stub"
        }
    }

    #[tokio::test]
    async fn test_answer_is_grounded_in_retrieved_segments() {
        let llm = Arc::new(RecordingLlm::replying(
            "Either party may terminate with 30 days notice.",
        ));
        let answerer = Answerer::new(llm.clone());
        let retrieved = vec![Segment::new(
            "Section 9: Either party may terminate with 30 days notice.",
            "contract.pdf",
            0,
        )];

        let result = answerer
            .answer("What is the termination clause?", &[], &retrieved)
            .await
            .unwrap();

        assert!(result.answer.contains("30 days"));
        assert_eq!(result.supporting_segments, retrieved);

        // The prompt context must carry the retrieved segment verbatim
        let context = llm.seen_context.lock().clone().unwrap();
        assert!(context.contains("Section 9: Either party may terminate with 30 days notice."));
    }

    #[tokio::test]
    async fn test_history_is_passed_through_unchanged() {
        let llm = Arc::new(RecordingLlm::replying("An answer."));
        let answerer = Answerer::new(llm.clone());
        let history = vec![
            ConversationTurn::new("First question?", "First answer."),
            ConversationTurn::new("Second question?", "Second answer."),
        ];

        answerer
            .answer("Follow-up?", &history, &[Segment::new("Some long enough segment text here.", "a", 0)])
            .await
            .unwrap();

        let seen = llm.seen_history.lock().clone();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].question, "First question?");
        assert_eq!(seen[1].question, "Second question?");
    }

    #[tokio::test]
    async fn test_empty_model_output_maps_to_fallback() {
        let llm = Arc::new(RecordingLlm::replying("   \n  "));
        let answerer = Answerer::new(llm);

        let result = answerer
            .answer("Anything?", &[], &[Segment::new("text", "a", 0)])
            .await
            .unwrap();

        assert_eq!(result.answer, NO_ANSWER_FALLBACK);
        assert!(!result.supporting_segments.is_empty());
    }

    #[tokio::test]
    async fn test_model_failure_surfaces_as_answer_generation_error() {
        let llm = Arc::new(RecordingLlm::failing());
        let answerer = Answerer::new(llm);

        let result = answerer.answer("Anything?", &[], &[]).await;
        assert!(matches!(result, Err(Error::AnswerGeneration(_))));
    }

    #[tokio::test]
    async fn test_repeated_calls_return_fresh_results() {
        let llm = Arc::new(RecordingLlm::replying("Same answer."));
        let answerer = Answerer::new(llm);
        let retrieved = vec![Segment::new("Segment body text.", "a", 0)];

        let first = answerer.answer("Q?", &[], &retrieved).await.unwrap();
        let second = answerer.answer("Q?", &[], &retrieved).await.unwrap();

        assert_eq!(first.answer, second.answer);
        assert_eq!(first.supporting_segments, second.supporting_segments);
    }
}
