//! PDF text extraction with per-page ordering, table linearization, and OCR
//!
//! Extraction prefers `pdftotext` (poppler-utils) page by page, which keeps
//! top-to-bottom line order and column layout. Without it, the in-process
//! `pdf-extract` crate runs under a watchdog timeout. Pages that yield no
//! text are routed through OCR, the recognized text spliced back at the
//! page's reading-order position. A failure on one page never aborts the
//! document; only a document with no extractable text at all is an error.

use regex::Regex;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::config::ExtractionConfig;
use crate::error::{Error, Result};

use super::ocr::OcrEngine;

/// PDF text extractor
pub struct PdfExtractor {
    config: ExtractionConfig,
}

impl PdfExtractor {
    /// Create an extractor from configuration
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// Extract the full text of a PDF in logical reading order
    pub fn extract(&self, data: &[u8], file_name: &str) -> Result<String> {
        let page_count = match lopdf::Document::load_mem(data) {
            Ok(doc) => Some(doc.get_pages().len() as u32),
            Err(e) => {
                tracing::debug!(file = file_name, "lopdf could not read page tree: {}", e);
                None
            }
        };

        let text = if has_pdftotext() {
            self.extract_with_pdftotext(data, file_name, page_count)?
        } else {
            self.extract_in_process(data, file_name)?
        };

        let text = cleanup_glyphs(&text);
        let text = if self.config.linearize_tables {
            linearize_tables(&text)
        } else {
            text
        };
        let text = normalize_whitespace(&text);

        if text.trim().is_empty() {
            return Err(Error::extraction(
                file_name,
                "no extractable text in document",
            ));
        }

        Ok(text)
    }

    /// Page-by-page extraction via pdftotext, with OCR for empty pages
    fn extract_with_pdftotext(
        &self,
        data: &[u8],
        file_name: &str,
        page_count: Option<u32>,
    ) -> Result<String> {
        let workdir = tempfile::Builder::new()
            .prefix("doc-rag-pdf-")
            .tempdir()
            .map_err(|e| Error::internal(format!("Failed to create extraction workdir: {}", e)))?;

        let pdf_path = workdir.path().join("input.pdf");
        std::fs::write(&pdf_path, data)
            .map_err(|e| Error::internal(format!("Failed to stage PDF: {}", e)))?;

        let Some(pages) = page_count else {
            // Page tree unreadable; fall back to one whole-document pass
            let text = match run_pdftotext(&pdf_path, None) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(file = file_name, "whole-document extraction failed: {}", e);
                    String::new()
                }
            };
            return Ok(self.splice_ocr_if_empty(&pdf_path, text, file_name));
        };

        let ocr = self.ocr_if_available();
        let mut page_texts = Vec::with_capacity(pages as usize);

        for page in 1..=pages {
            let text = match run_pdftotext(&pdf_path, Some(page)) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(file = file_name, page, "page extraction failed: {}", e);
                    String::new()
                }
            };

            let text = if text.trim().is_empty() {
                match &ocr {
                    Some(engine) => match engine.recognize_pdf_page(&pdf_path, page) {
                        Ok(recognized) => {
                            if !recognized.trim().is_empty() {
                                tracing::debug!(file = file_name, page, "page recovered via OCR");
                            }
                            recognized
                        }
                        Err(e) => {
                            tracing::warn!(file = file_name, page, "page OCR failed: {}", e);
                            String::new()
                        }
                    },
                    None => String::new(),
                }
            } else {
                text
            };

            page_texts.push(text);
        }

        Ok(page_texts
            .iter()
            .filter(|t| !t.trim().is_empty())
            .map(|t| t.trim_end())
            .collect::<Vec<_>>()
            .join("\n\n"))
    }

    /// Whole-document extraction via pdf-extract under a watchdog timeout
    ///
    /// pdf-extract can hang on malformed fonts, so it runs on its own thread
    /// and is abandoned when the timeout elapses.
    fn extract_in_process(&self, data: &[u8], file_name: &str) -> Result<String> {
        let data_vec = data.to_vec();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = pdf_extract::extract_text_from_mem(&data_vec);
            let _ = tx.send(result);
        });

        let text = match rx.recv_timeout(Duration::from_secs(self.config.pdf_timeout_secs)) {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                tracing::warn!(file = file_name, "pdf-extract failed: {}", e);
                String::new()
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    file = file_name,
                    timeout_secs = self.config.pdf_timeout_secs,
                    "pdf-extract timed out"
                );
                String::new()
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                tracing::warn!(file = file_name, "pdf-extract thread died");
                String::new()
            }
        };

        if !text.trim().is_empty() {
            return Ok(text);
        }

        // No text layer; stage the bytes and try a full OCR pass
        let workdir = tempfile::Builder::new()
            .prefix("doc-rag-pdf-")
            .tempdir()
            .map_err(|e| Error::internal(format!("Failed to create extraction workdir: {}", e)))?;
        let pdf_path = workdir.path().join("input.pdf");
        std::fs::write(&pdf_path, data)
            .map_err(|e| Error::internal(format!("Failed to stage PDF: {}", e)))?;

        Ok(self.splice_ocr_if_empty(&pdf_path, String::new(), file_name))
    }

    fn splice_ocr_if_empty(&self, pdf_path: &Path, text: String, file_name: &str) -> String {
        if !text.trim().is_empty() {
            return text;
        }
        match self.ocr_if_available() {
            Some(engine) => match engine.recognize_pdf(pdf_path) {
                Ok(recognized) => recognized,
                Err(e) => {
                    tracing::warn!(file = file_name, "document OCR failed: {}", e);
                    String::new()
                }
            },
            None => text,
        }
    }

    fn ocr_if_available(&self) -> Option<OcrEngine> {
        if self.config.ocr_enabled && OcrEngine::is_available() {
            Some(OcrEngine::new(&self.config))
        } else {
            None
        }
    }
}

/// Run pdftotext over stdin/stdout, optionally restricted to one page
fn run_pdftotext(pdf_path: &Path, page: Option<u32>) -> Result<String> {
    let mut command = Command::new("pdftotext");
    command.args(["-layout", "-nopgbrk", "-enc", "UTF-8"]);

    if let Some(page) = page {
        let page_arg = page.to_string();
        command.args(["-f", &page_arg, "-l", &page_arg]);
    }

    let child = command
        .arg(pdf_path)
        .arg("-")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::internal(format!("Failed to spawn pdftotext: {}", e)))?;

    let output = child
        .wait_with_output()
        .map_err(|e| Error::internal(format!("pdftotext failed: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::internal(format!("pdftotext error: {}", stderr)));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Check if pdftotext is installed
pub fn has_pdftotext() -> bool {
    Command::new("pdftotext")
        .arg("-v")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Replace PDF glyph-name artifacts and typographic characters with ASCII
/// equivalents
pub fn cleanup_glyphs(text: &str) -> String {
    text.replace('\0', "")
        .replace('\u{2010}', "-")
        .replace('\u{2011}', "-")
        .replace('\u{2013}', "-")
        .replace('\u{2014}', "--")
        .replace('\u{2018}', "'")
        .replace('\u{2019}', "'")
        .replace('\u{201C}', "\"")
        .replace('\u{201D}', "\"")
        .replace('\u{2022}', "* ")
        .replace('\u{2026}', "...")
        .replace('\u{00A0}', " ")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
}

/// Rewrite column-aligned table rows into pipe-separated lines
///
/// A line counts as a table row when splitting it on runs of three or more
/// spaces yields at least two cells. Rows stay one per line so tables remain
/// searchable as plain text.
pub fn linearize_tables(text: &str) -> String {
    let gap = Regex::new(r" {3,}").expect("valid gap pattern");

    text.lines()
        .map(|line| {
            let trimmed = line.trim();
            let cells: Vec<&str> = gap
                .split(trimmed)
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .collect();

            if cells.len() >= 2 {
                cells.join(" | ")
            } else {
                line.trim_end().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Trim trailing whitespace per line and collapse runs of blank lines to a
/// single paragraph break
pub fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0usize;

    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
            if blank_run > 0 {
                out.push('\n');
            }
        }
        blank_run = 0;
        out.push_str(line);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_glyphs_normalizes_typography() {
        let text = "The \u{201C}termination\u{201D} clause \u{2013} see \u{00A7}9 \u{2026} e\u{FB00}ective";
        let cleaned = cleanup_glyphs(text);
        assert_eq!(cleaned, "The \"termination\" clause - see \u{00A7}9 ... effective");
    }

    #[test]
    fn test_linearize_tables_rewrites_column_rows() {
        let text = "Invoice summary\nItem       Qty     Price\nWidget     2       10.00\nPlain sentence with  two spaces only.";
        let linearized = linearize_tables(text);

        assert!(linearized.contains("Item | Qty | Price"));
        assert!(linearized.contains("Widget | 2 | 10.00"));
        // Ordinary prose is left alone
        assert!(linearized.contains("Plain sentence with  two spaces only."));
    }

    #[test]
    fn test_normalize_whitespace_collapses_blank_runs() {
        let text = "First paragraph.   \n\n\n\nSecond paragraph.\nSame paragraph line.\n";
        let normalized = normalize_whitespace(text);
        assert_eq!(
            normalized,
            "First paragraph.\n\nSecond paragraph.\nSame paragraph line."
        );
    }

    #[test]
    fn test_unreadable_pdf_is_an_extraction_error() {
        let extractor = PdfExtractor::new(ExtractionConfig {
            ocr_enabled: false,
            pdf_timeout_secs: 5,
            ..ExtractionConfig::default()
        });
        let result = extractor.extract(b"not a pdf at all", "bogus.pdf");

        match result {
            Err(Error::Extraction { file, .. }) => assert_eq!(file, "bogus.pdf"),
            other => panic!("expected extraction error, got {:?}", other.map(|t| t.len())),
        }
    }
}
