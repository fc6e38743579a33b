//! Conversation history and answer types

use serde::{Deserialize, Serialize};

use super::segment::Segment;

/// One prior question/answer exchange
///
/// History is always passed explicitly by the caller; the core never stores
/// it. Unbounded history degrades prompt-length-limited models — the prompt
/// builder truncates oldest turns first when its character budget is
/// exceeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// The question that was asked
    pub question: String,
    /// The answer that was given
    pub answer: String,
}

impl ConversationTurn {
    /// Create a new turn
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }

    /// Approximate prompt length contribution of this turn
    pub fn len(&self) -> usize {
        self.question.len() + self.answer.len()
    }

    /// Whether both sides of the turn are empty
    pub fn is_empty(&self) -> bool {
        self.question.is_empty() && self.answer.is_empty()
    }
}

/// The outcome of one answered question
///
/// `supporting_segments` carries the retrieved grounding; an empty list
/// combined with the fallback answer string tells the caller that no
/// grounded answer was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResult {
    /// Generated answer text
    pub answer: String,
    /// Segments that grounded the answer, in retrieval rank order
    pub supporting_segments: Vec<Segment>,
}

impl AnswerResult {
    /// Create a new answer result
    pub fn new(answer: impl Into<String>, supporting_segments: Vec<Segment>) -> Self {
        Self {
            answer: answer.into(),
            supporting_segments,
        }
    }
}
