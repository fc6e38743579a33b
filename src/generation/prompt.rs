//! Prompt templates for grounded question answering

use crate::types::{ConversationTurn, Segment};

/// Prompt builder for retrieval-augmented generation
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build grounding context from retrieved segments
    ///
    /// Segments are rendered verbatim in retrieval rank order, each tagged
    /// with its source reference.
    pub fn build_context(segments: &[Segment]) -> String {
        let mut context = String::new();

        for (i, segment) in segments.iter().enumerate() {
            context.push_str(&format!(
                "[{}] {}, segment {}\n\nContent:\n{}\n\n---\n\n",
                i + 1,
                segment.source_id,
                segment.ordinal + 1,
                segment.text
            ));
        }

        context
    }

    /// Render prior turns in chronological order, truncating oldest first
    ///
    /// Turns are kept from newest to oldest until the character budget is
    /// exhausted, then rendered oldest-to-newest so references like "it" and
    /// "that document" resolve naturally.
    pub fn render_history(history: &[ConversationTurn], budget_chars: usize) -> String {
        let mut kept: Vec<&ConversationTurn> = Vec::new();
        let mut used = 0usize;

        for turn in history.iter().rev() {
            let turn_len = turn.len();
            // The newest turn is always kept; older turns must fit the budget
            if !kept.is_empty() && used + turn_len > budget_chars {
                break;
            }
            used += turn_len;
            kept.push(turn);
        }

        kept.reverse();

        kept.iter()
            .map(|turn| format!("User: {}\nAssistant: {}", turn.question, turn.answer))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Build the full question-answering prompt
    pub fn build_qa_prompt(
        question: &str,
        context: &str,
        history: &[ConversationTurn],
        history_budget_chars: usize,
    ) -> String {
        let history_block = if history.is_empty() {
            String::new()
        } else {
            format!(
                "\nPRIOR CONVERSATION (oldest first, use it to resolve references like \"it\" or \"that document\"):\n{}\n",
                Self::render_history(history, history_budget_chars)
            )
        };

        format!(
            r#"You are a document-grounded assistant that ONLY uses information from provided documents.

RULES:
1. ONLY use information that is EXPLICITLY stated in the CONTEXT below
2. If the answer is not in the context, respond with "This information is not available in the provided documents."
3. NEVER use external knowledge or make inferences beyond what is stated
4. Stay close to the source text; do not paraphrase in ways that change meaning
{history_block}
CONTEXT FROM DOCUMENTS:
{context}

QUESTION: {question}

Provide a grounded answer using ONLY the document content above:"#,
            history_block = history_block,
            context = context,
            question = question
        )
    }

    /// Build a summarization prompt
    pub fn build_summary_prompt(text: &str) -> String {
        format!(
            r#"Summarize the following text in clear, concise language:

{text}

Summary:"#,
            text = text
        )
    }
}
