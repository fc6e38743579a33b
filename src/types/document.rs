//! Source document types

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Declared format of a source document
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// PDF document
    Pdf,
    /// Plain text (includes pasted text and markdown)
    Text,
}

impl DocumentFormat {
    /// Detect format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" | "text" | "md" | "markdown" => Some(Self::Text),
            _ => None,
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Pdf => "PDF",
            Self::Text => "Text",
        }
    }
}

/// A caller-supplied document: raw bytes plus declared format
///
/// The caller owns storage; this type only carries the bytes for the
/// duration of one request.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Identifier used in segment provenance (usually the filename)
    pub name: String,
    /// Declared format
    pub format: DocumentFormat,
    /// Raw document bytes
    pub data: Vec<u8>,
}

impl SourceDocument {
    /// Create a new source document
    pub fn new(name: impl Into<String>, format: DocumentFormat, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            format,
            data,
        }
    }

    /// Create a document from pasted text
    pub fn from_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format: DocumentFormat::Text,
            data: text.into().into_bytes(),
        }
    }

    /// Content hash, usable as a stable source id when the caller supplies
    /// no meaningful name
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.data);
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(DocumentFormat::from_extension("pdf"), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_extension("PDF"), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_extension("txt"), Some(DocumentFormat::Text));
        assert_eq!(DocumentFormat::from_extension("md"), Some(DocumentFormat::Text));
        assert_eq!(DocumentFormat::from_extension("docx"), None);
    }

    #[test]
    fn test_content_hash_is_stable() {
        let a = SourceDocument::from_text("a.txt", "same content");
        let b = SourceDocument::from_text("b.txt", "same content");
        assert_eq!(a.content_hash(), b.content_hash());
    }
}
