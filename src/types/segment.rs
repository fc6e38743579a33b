//! Retrieval unit types

use serde::{Deserialize, Serialize};

/// A bounded span of source text, the unit of retrieval
///
/// Immutable once created. `ordinal` preserves the order of segments within
/// one source for traceability; it has no effect on retrieval ranking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    /// Text content
    pub text: String,
    /// Identifier of the source document this segment came from
    pub source_id: String,
    /// Position of this segment within its source (0-based)
    pub ordinal: u32,
}

impl Segment {
    /// Create a new segment
    pub fn new(text: impl Into<String>, source_id: impl Into<String>, ordinal: u32) -> Self {
        Self {
            text: text.into(),
            source_id: source_id.into(),
            ordinal,
        }
    }
}

/// A segment paired with its embedding vector
///
/// Owned exclusively by the index that holds it; every vector in one index
/// has the same dimensionality.
#[derive(Debug, Clone)]
pub struct EmbeddedSegment {
    /// The underlying segment
    pub segment: Segment,
    /// Dense embedding vector
    pub vector: Vec<f32>,
}

impl EmbeddedSegment {
    /// Create a new embedded segment
    pub fn new(segment: Segment, vector: Vec<f32>) -> Self {
        Self { segment, vector }
    }

    /// Vector dimensionality
    pub fn dimensions(&self) -> usize {
        self.vector.len()
    }
}
