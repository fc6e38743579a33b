//! Format dispatch for text extraction

use std::path::Path;
use walkdir::WalkDir;

use crate::config::ExtractionConfig;
use crate::error::Result;
use crate::types::{DocumentFormat, SourceDocument};

use super::pdf::PdfExtractor;

/// Text extractor over all supported document formats
///
/// The extractor never mutates its input; transient artifacts (staged PDFs,
/// rendered page images) live in temporary directories that are cleaned up
/// regardless of outcome.
pub struct TextExtractor {
    pdf: PdfExtractor,
}

impl TextExtractor {
    /// Create an extractor from configuration
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            pdf: PdfExtractor::new(config),
        }
    }

    /// Extract the text of one document in logical reading order
    pub fn extract(&self, data: &[u8], format: DocumentFormat, name: &str) -> Result<String> {
        match format {
            DocumentFormat::Pdf => self.pdf.extract(data, name),
            DocumentFormat::Text => Ok(String::from_utf8_lossy(data).to_string()),
        }
    }

    /// Extract the text of a caller-supplied document
    pub fn extract_document(&self, document: &SourceDocument) -> Result<String> {
        self.extract(&document.data, document.format, &document.name)
    }

    /// Extract every supported file under a directory
    ///
    /// Returns `(file name, text)` pairs in directory walk order. Files that
    /// fail to read or extract are logged and skipped; only an unreadable
    /// root directory is an error.
    pub fn extract_dir(&self, root: impl AsRef<Path>) -> Result<Vec<(String, String)>> {
        let mut extracted = Vec::new();

        for entry in WalkDir::new(root.as_ref())
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let Some(format) = path
                .extension()
                .and_then(|ext| DocumentFormat::from_extension(&ext.to_string_lossy()))
            else {
                continue;
            };

            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());

            let data = match std::fs::read(path) {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!(file = %path.display(), "failed to read file: {}", e);
                    continue;
                }
            };

            match self.extract(&data, format, &name) {
                Ok(text) => extracted.push((name, text)),
                Err(e) => {
                    tracing::warn!(file = %path.display(), "extraction failed: {}", e);
                }
            }
        }

        Ok(extracted)
    }
}
