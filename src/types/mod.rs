//! Core data model: documents, segments, conversation turns, answers

pub mod conversation;
pub mod document;
pub mod segment;

pub use conversation::{AnswerResult, ConversationTurn};
pub use document::{DocumentFormat, SourceDocument};
pub use segment::{EmbeddedSegment, Segment};
