//! The query-processing pipeline
//!
//! One request flows through the stages strictly in order:
//! `Received → Extracting → Chunking → Embedding → Indexing → Retrieving →
//! Answering → Completed`, failing terminally from any non-terminal stage.
//! The vector index is rebuilt for every request from the caller-selected
//! document set and discarded afterwards; nothing is persisted.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{EmbeddingBackend, RagConfig};
use crate::error::{Error, Result};
use crate::generation::Answerer;
use crate::ingestion::{TextExtractor, TextSplitter};
use crate::providers::{EmbeddingProvider, LlmProvider, OllamaProvider, OnnxEmbedder, OllamaLlm};
use crate::retrieval::{DistanceMetric, Retriever, VectorIndex};
use crate::types::{AnswerResult, ConversationTurn, DocumentFormat, EmbeddedSegment, Segment, SourceDocument};

use super::jobs::CancelToken;

/// Stage of one query-processing request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestStage {
    Received,
    Extracting,
    Chunking,
    Embedding,
    Indexing,
    Retrieving,
    Answering,
    Completed,
    Failed,
}

/// The retrieval-augmented QA pipeline
///
/// Holds the process-wide model handles (embedder and generator), which are
/// created once and safe for concurrent read-only inference. Each request
/// gets its own index; no state is shared between concurrent requests.
pub struct QaPipeline {
    config: RagConfig,
    extractor: Arc<TextExtractor>,
    splitter: TextSplitter,
    embedder: Arc<dyn EmbeddingProvider>,
    answerer: Answerer,
}

impl QaPipeline {
    /// Create a pipeline, selecting providers from configuration
    pub async fn new(config: RagConfig) -> Result<Self> {
        let (embedder, llm): (Arc<dyn EmbeddingProvider>, Arc<dyn LlmProvider>) =
            match config.backend {
                EmbeddingBackend::Ollama => {
                    tracing::info!("using Ollama backend for embeddings and generation");
                    let (embedder, llm) =
                        OllamaProvider::new(&config.llm, config.embeddings.dimensions).split();
                    (Arc::new(embedder), Arc::new(llm))
                }
                EmbeddingBackend::Onnx => {
                    tracing::info!("using local ONNX embeddings with Ollama generation");
                    let embedder = OnnxEmbedder::new(&config.embeddings).await?;
                    let llm = OllamaLlm::new(&config.llm);
                    (Arc::new(embedder), Arc::new(llm))
                }
            };

        Ok(Self::with_providers(config, embedder, llm))
    }

    /// Create a pipeline over explicit providers
    pub fn with_providers(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        let extractor = Arc::new(TextExtractor::new(config.extraction.clone()));
        let splitter = TextSplitter::from_config(&config.chunking);

        Self {
            config,
            extractor,
            splitter,
            embedder,
            answerer: Answerer::new(llm),
        }
    }

    /// Extract the text of one document
    ///
    /// Extraction is I/O-bound (disk staging, external tools, OCR) and runs
    /// on the blocking pool.
    pub async fn extract(
        &self,
        data: &[u8],
        format: DocumentFormat,
        name: &str,
    ) -> Result<String> {
        let extractor = Arc::clone(&self.extractor);
        let data = data.to_vec();
        let name = name.to_string();

        tokio::task::spawn_blocking(move || extractor.extract(&data, format, &name))
            .await
            .map_err(|e| Error::internal(format!("extraction task join error: {}", e)))?
    }

    /// Chunk extracted text into segments for one source
    pub fn chunk(&self, text: &str, source_id: &str) -> Vec<Segment> {
        self.splitter.segment(text, source_id)
    }

    /// Embed segments and build a request-scoped index
    ///
    /// Input order is preserved into the index, so duplicate segments rank
    /// deterministically. An empty segment list builds an empty index, which
    /// `ask` rejects with `NoContent`.
    pub async fn build_index(&self, segments: Vec<Segment>) -> Result<VectorIndex> {
        let texts: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        let entries: Vec<EmbeddedSegment> = segments
            .into_iter()
            .zip(vectors)
            .map(|(segment, vector)| EmbeddedSegment::new(segment, vector))
            .collect();

        VectorIndex::build(entries, DistanceMetric::Cosine)
    }

    /// Answer a question against an already built index
    pub async fn ask(
        &self,
        index: &VectorIndex,
        question: &str,
        history: &[ConversationTurn],
    ) -> Result<AnswerResult> {
        if index.is_empty() {
            return Err(Error::NoContent);
        }

        let retriever = Retriever::new(Arc::clone(&self.embedder), index);
        let retrieved = retriever
            .retrieve(question, self.config.retrieval.top_k)
            .await?;

        self.answerer.answer(question, history, &retrieved).await
    }

    /// Run the full per-request pipeline over a document set
    pub async fn answer_documents(
        &self,
        documents: &[SourceDocument],
        question: &str,
        history: &[ConversationTurn],
        cancel: &CancelToken,
    ) -> Result<AnswerResult> {
        self.answer_documents_with_progress(documents, question, history, cancel, |_| {})
            .await
    }

    /// Full pipeline with a stage callback for progress reporting
    ///
    /// Extraction failures on individual documents are absorbed and logged;
    /// the request fails only when no document yields content. The
    /// cancellation flag is checked between per-document units of work.
    pub async fn answer_documents_with_progress(
        &self,
        documents: &[SourceDocument],
        question: &str,
        history: &[ConversationTurn],
        cancel: &CancelToken,
        progress: impl Fn(RequestStage) + Send,
    ) -> Result<AnswerResult> {
        progress(RequestStage::Received);

        progress(RequestStage::Extracting);
        let mut extracted: Vec<(String, String)> = Vec::new();
        let mut first_error: Option<Error> = None;

        for document in documents {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            match self.extract(&document.data, document.format, &document.name).await {
                Ok(text) => extracted.push((document.name.clone(), text)),
                Err(e) => {
                    tracing::warn!(file = %document.name, "document skipped: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        // A batch where nothing could be read is an extraction failure, not
        // an empty-content condition
        if extracted.is_empty() {
            if let Some(error) = first_error {
                return Err(error);
            }
        }

        progress(RequestStage::Chunking);
        let mut per_source: Vec<Vec<Segment>> = Vec::with_capacity(extracted.len());
        for (source_id, text) in &extracted {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            per_source.push(self.splitter.segment(text, source_id));
        }

        progress(RequestStage::Embedding);
        let mut entries: Vec<EmbeddedSegment> = Vec::new();
        for segments in per_source {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let texts: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;
            entries.extend(
                segments
                    .into_iter()
                    .zip(vectors)
                    .map(|(segment, vector)| EmbeddedSegment::new(segment, vector)),
            );
        }

        progress(RequestStage::Indexing);
        let index = VectorIndex::build(entries, DistanceMetric::Cosine)?;

        progress(RequestStage::Retrieving);
        if index.is_empty() {
            return Err(Error::NoContent);
        }

        let retriever = Retriever::new(Arc::clone(&self.embedder), &index);
        let retrieved = retriever
            .retrieve(question, self.config.retrieval.top_k)
            .await?;

        progress(RequestStage::Answering);
        let result = self.answerer.answer(question, history, &retrieved).await?;

        progress(RequestStage::Completed);
        Ok(result)
    }

    /// Summarize a document set, one summary per document
    ///
    /// A long-running task when the set is large; the cancellation flag is
    /// checked between documents and any partial work is simply dropped.
    pub async fn summarize_documents(
        &self,
        documents: &[SourceDocument],
        cancel: &CancelToken,
    ) -> Result<String> {
        let mut summaries: Vec<String> = Vec::with_capacity(documents.len());

        for document in documents {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let text = match self.extract(&document.data, document.format, &document.name).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(file = %document.name, "document skipped: {}", e);
                    continue;
                }
            };

            let summary = self.answerer.summarize(&text).await?;
            summaries.push(format!("{}:\n{}", document.name, summary));
        }

        if summaries.is_empty() {
            return Err(Error::NoContent);
        }

        Ok(summaries.join("\n\n"))
    }

    /// Pipeline configuration
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// The embedding provider in use
    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }
}
