//! doc-rag: document question answering with retrieval-augmented generation
//!
//! Extracts text from PDFs or pasted text, chunks it into overlapping
//! segments, embeds them, and answers natural-language questions by
//! retrieving the most relevant segments and conditioning a generative
//! model on them together with prior conversation turns.
//!
//! The crate is a library core: the surrounding service owns HTTP routing,
//! authentication, and persistence, and drives this crate through
//! [`processing::QaPipeline`]. Every vector index is request-scoped — built
//! from the caller-selected document set and discarded when the request
//! completes.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod processing;
pub mod providers;
pub mod retrieval;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use processing::{CancelToken, JobRegistry, QaPipeline, RequestStage};
pub use retrieval::{DistanceMetric, VectorIndex};
pub use types::{
    AnswerResult, ConversationTurn, DocumentFormat, EmbeddedSegment, Segment, SourceDocument,
};
