//! Ephemeral in-memory vector index
//!
//! Built fresh for each query-processing request from the caller-selected
//! document set and discarded when the request completes. Append-only during
//! construction, read-only afterwards; no entry is ever mutated in place.

use crate::error::{Error, Result};
use crate::types::{EmbeddedSegment, Segment};

/// Metric used for vector comparison
///
/// One metric is fixed at build time and used consistently for every query
/// against the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DistanceMetric {
    /// Cosine similarity, higher is better
    #[default]
    Cosine,
    /// Euclidean distance, lower is better
    L2,
}

/// One ranked query hit
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched segment
    pub segment: Segment,
    /// Cosine similarity (higher is better) or L2 distance (lower is
    /// better), depending on the index metric
    pub score: f32,
}

/// Write-once nearest-neighbor index over embedded segments
pub struct VectorIndex {
    entries: Vec<EmbeddedSegment>,
    metric: DistanceMetric,
    dimensions: usize,
}

impl VectorIndex {
    /// Build an index from embedded segments
    ///
    /// O(n·d). Every vector must share one dimensionality. Duplicate
    /// segments are retained; ties rank in insertion order.
    pub fn build(entries: Vec<EmbeddedSegment>, metric: DistanceMetric) -> Result<Self> {
        let dimensions = entries.first().map(|e| e.dimensions()).unwrap_or(0);

        if !entries.is_empty() && dimensions == 0 {
            return Err(Error::internal("index entries have empty vectors"));
        }

        for entry in &entries {
            if entry.dimensions() != dimensions {
                return Err(Error::internal(format!(
                    "vector dimension mismatch: expected {}, got {} for segment {} of '{}'",
                    dimensions,
                    entry.dimensions(),
                    entry.segment.ordinal,
                    entry.segment.source_id
                )));
            }
        }

        Ok(Self {
            entries,
            metric,
            dimensions,
        })
    }

    /// Number of indexed segments
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no segments
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Vector dimensionality (0 for an empty index)
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// The metric fixed at build time
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Return the `min(k, n)` nearest segments, best first
    ///
    /// Ties break by original insertion order. Querying an empty index
    /// returns an empty sequence, not an error.
    pub fn query(&self, vector: &[f32], k: usize) -> Vec<SearchResult> {
        if self.entries.is_empty() || k == 0 {
            return Vec::new();
        }

        if vector.len() != self.dimensions {
            tracing::warn!(
                expected = self.dimensions,
                got = vector.len(),
                "query vector dimension mismatch"
            );
            return Vec::new();
        }

        let mut results: Vec<SearchResult> = self
            .entries
            .iter()
            .map(|entry| SearchResult {
                segment: entry.segment.clone(),
                score: match self.metric {
                    DistanceMetric::Cosine => cosine_similarity(vector, &entry.vector),
                    DistanceMetric::L2 => l2_distance(vector, &entry.vector),
                },
            })
            .collect();

        // Stable sort keeps insertion order on equal scores
        match self.metric {
            DistanceMetric::Cosine => results.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            }),
            DistanceMetric::L2 => results.sort_by(|a, b| {
                a.score
                    .partial_cmp(&b.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            }),
        }

        results.truncate(k);
        results
    }
}

/// Cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Euclidean distance between two vectors
fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(text: &str, ordinal: u32, vector: Vec<f32>) -> EmbeddedSegment {
        EmbeddedSegment::new(Segment::new(text, "doc", ordinal), vector)
    }

    #[test]
    fn test_empty_index_queries_to_empty() {
        let index = VectorIndex::build(Vec::new(), DistanceMetric::Cosine).unwrap();
        assert!(index.is_empty());
        assert!(index.query(&[1.0, 0.0], 4).is_empty());
    }

    #[test]
    fn test_reflexive_top_one() {
        let entries = vec![
            entry("alpha", 0, vec![1.0, 0.0, 0.0]),
            entry("beta", 1, vec![0.0, 1.0, 0.0]),
            entry("gamma", 2, vec![0.0, 0.0, 1.0]),
        ];
        let index = VectorIndex::build(entries, DistanceMetric::Cosine).unwrap();

        for (vector, expected) in [
            (vec![1.0, 0.0, 0.0], "alpha"),
            (vec![0.0, 1.0, 0.0], "beta"),
            (vec![0.0, 0.0, 1.0], "gamma"),
        ] {
            let results = index.query(&vector, 1);
            assert_eq!(results[0].segment.text, expected);
        }
    }

    #[test]
    fn test_results_ordered_by_similarity_descending() {
        let entries = vec![
            entry("far", 0, vec![0.0, 1.0]),
            entry("near", 1, vec![0.9, 0.1]),
            entry("exact", 2, vec![1.0, 0.0]),
        ];
        let index = VectorIndex::build(entries, DistanceMetric::Cosine).unwrap();

        let results = index.query(&[1.0, 0.0], 3);
        assert_eq!(results[0].segment.text, "exact");
        assert_eq!(results[1].segment.text, "near");
        assert_eq!(results[2].segment.text, "far");
        assert!(results[0].score >= results[1].score);
        assert!(results[1].score >= results[2].score);
    }

    #[test]
    fn test_ties_break_by_insertion_order() {
        let entries = vec![
            entry("first duplicate", 0, vec![1.0, 0.0]),
            entry("unrelated", 1, vec![0.0, 1.0]),
            entry("second duplicate", 2, vec![1.0, 0.0]),
        ];
        let index = VectorIndex::build(entries, DistanceMetric::Cosine).unwrap();

        let results = index.query(&[1.0, 0.0], 3);
        assert_eq!(results[0].segment.text, "first duplicate");
        assert_eq!(results[1].segment.text, "second duplicate");
    }

    #[test]
    fn test_k_larger_than_index_returns_all() {
        let entries = vec![
            entry("one", 0, vec![1.0, 0.0]),
            entry("two", 1, vec![0.0, 1.0]),
        ];
        let index = VectorIndex::build(entries, DistanceMetric::Cosine).unwrap();
        assert_eq!(index.query(&[1.0, 0.0], 10).len(), 2);
    }

    #[test]
    fn test_dimension_mismatch_rejected_at_build() {
        let entries = vec![
            entry("one", 0, vec![1.0, 0.0]),
            entry("two", 1, vec![0.0, 1.0, 0.5]),
        ];
        let result = VectorIndex::build(entries, DistanceMetric::Cosine);
        assert!(matches!(result, Err(Error::Internal(_))));
    }

    #[test]
    fn test_build_is_idempotent() {
        let make_entries = || {
            vec![
                entry("alpha", 0, vec![0.7, 0.3]),
                entry("beta", 1, vec![0.2, 0.8]),
                entry("gamma", 2, vec![0.5, 0.5]),
            ]
        };
        let a = VectorIndex::build(make_entries(), DistanceMetric::Cosine).unwrap();
        let b = VectorIndex::build(make_entries(), DistanceMetric::Cosine).unwrap();

        let query = [0.6, 0.4];
        let ranked_a: Vec<String> = a.query(&query, 3).into_iter().map(|r| r.segment.text).collect();
        let ranked_b: Vec<String> = b.query(&query, 3).into_iter().map(|r| r.segment.text).collect();
        assert_eq!(ranked_a, ranked_b);
    }

    #[test]
    fn test_l2_metric_orders_ascending_by_distance() {
        let entries = vec![
            entry("far", 0, vec![10.0, 10.0]),
            entry("near", 1, vec![1.1, 0.9]),
        ];
        let index = VectorIndex::build(entries, DistanceMetric::L2).unwrap();

        let results = index.query(&[1.0, 1.0], 2);
        assert_eq!(results[0].segment.text, "near");
        assert!(results[0].score < results[1].score);
    }
}
