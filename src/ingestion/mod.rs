//! Document ingestion: text extraction and chunking

pub mod chunker;
pub mod extractor;
pub mod ocr;
pub mod pdf;

pub use chunker::TextSplitter;
pub use extractor::TextExtractor;
pub use ocr::OcrEngine;
pub use pdf::PdfExtractor;
