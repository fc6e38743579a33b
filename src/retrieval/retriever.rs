//! Top-k retrieval over an index

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::Segment;

use super::index::{SearchResult, VectorIndex};

/// Retriever wrapping a request-scoped index with a top-k query contract
///
/// Scores are an internal ranking signal; `retrieve` drops them from the
/// result, `retrieve_with_scores` keeps them for callers that ask.
pub struct Retriever<'a> {
    embedder: Arc<dyn EmbeddingProvider>,
    index: &'a VectorIndex,
}

impl<'a> Retriever<'a> {
    /// Create a retriever over an index
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: &'a VectorIndex) -> Self {
        Self { embedder, index }
    }

    /// Retrieve the top-k segments most similar to the question
    ///
    /// An index built from zero segments fails with `NoContent`: answering
    /// with no grounding context degrades silently to hallucination, so the
    /// caller must be able to branch on this.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<Segment>> {
        Ok(self
            .retrieve_with_scores(question, k)
            .await?
            .into_iter()
            .map(|result| result.segment)
            .collect())
    }

    /// Retrieve the top-k segments with their ranking scores
    pub async fn retrieve_with_scores(&self, question: &str, k: usize) -> Result<Vec<SearchResult>> {
        if self.index.is_empty() {
            return Err(Error::NoContent);
        }

        let query_vector = self.embedder.embed(question).await?;
        Ok(self.index.query(&query_vector, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::retrieval::index::DistanceMetric;
    use crate::types::EmbeddedSegment;

    /// Deterministic embedder: counts occurrences of a fixed vocabulary
    struct KeywordEmbedder;

    const VOCABULARY: [&str; 3] = ["termination", "renewal", "payment"];

    fn keyword_vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        VOCABULARY
            .iter()
            .map(|word| lower.matches(word).count() as f32)
            .collect()
    }

    #[async_trait]
    impl EmbeddingProvider for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(keyword_vector(text))
        }

        fn dimensions(&self) -> usize {
            VOCABULARY.len()
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "keyword"
        }
    }

    fn build_index(texts: &[&str]) -> VectorIndex {
        let entries: Vec<EmbeddedSegment> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                EmbeddedSegment::new(Segment::new(*text, "doc", i as u32), keyword_vector(text))
            })
            .collect();
        VectorIndex::build(entries, DistanceMetric::Cosine).unwrap()
    }

    #[tokio::test]
    async fn test_retrieve_returns_most_relevant_segment_first() {
        let index = build_index(&[
            "Renewal is automatic each year.",
            "Termination requires thirty days notice before the termination date.",
            "Payment is due monthly.",
        ]);
        let retriever = Retriever::new(Arc::new(KeywordEmbedder), &index);

        let segments = retriever
            .retrieve("What does the termination clause say?", 2)
            .await
            .unwrap();

        assert_eq!(segments.len(), 2);
        assert!(segments[0].text.contains("Termination"));
    }

    #[tokio::test]
    async fn test_retrieve_drops_scores() {
        let index = build_index(&["Termination notice period.", "Renewal terms."]);
        let retriever = Retriever::new(Arc::new(KeywordEmbedder), &index);

        let segments = retriever.retrieve("termination", 1).await.unwrap();
        // Contract output is segments only; metadata survives
        assert_eq!(segments[0].source_id, "doc");
    }

    #[tokio::test]
    async fn test_empty_index_is_no_content() {
        let index = VectorIndex::build(Vec::new(), DistanceMetric::Cosine).unwrap();
        let retriever = Retriever::new(Arc::new(KeywordEmbedder), &index);

        let result = retriever.retrieve("anything", 4).await;
        assert!(matches!(result, Err(Error::NoContent)));
    }

    #[tokio::test]
    async fn test_retrieve_with_scores_keeps_ranking_signal() {
        let index = build_index(&[
            "Termination termination termination.",
            "One termination mention.",
        ]);
        let retriever = Retriever::new(Arc::new(KeywordEmbedder), &index);

        let results = retriever
            .retrieve_with_scores("termination", 2)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[0].score >= results[1].score);
    }
}
