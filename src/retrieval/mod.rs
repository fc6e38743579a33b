//! Similarity retrieval: in-memory vector index and top-k retriever

pub mod index;
pub mod retriever;

pub use index::{DistanceMetric, SearchResult, VectorIndex};
pub use retriever::Retriever;
