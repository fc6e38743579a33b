//! Optical character recognition for pages without a text layer
//!
//! Pages are rendered to images with `pdftoppm` (poppler-utils) and
//! recognized with `tesseract`. All intermediate artifacts live in a
//! temporary directory that is removed when the handle drops, on success and
//! on failure alike.

use std::path::Path;
use std::process::Command;

use crate::config::ExtractionConfig;
use crate::error::{Error, Result};

/// OCR engine backed by external poppler/tesseract tools
pub struct OcrEngine {
    language: String,
    dpi: u32,
}

impl OcrEngine {
    /// Create an OCR engine from extraction configuration
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            language: config.ocr_language.clone(),
            dpi: config.ocr_dpi,
        }
    }

    /// Check whether both required tools are installed
    pub fn is_available() -> bool {
        has_pdftoppm() && has_tesseract()
    }

    /// Recognize text on a single page of a PDF already on disk
    ///
    /// Returns the recognized text, which may be empty when the page has no
    /// legible content.
    pub fn recognize_pdf_page(&self, pdf_path: &Path, page_number: u32) -> Result<String> {
        let workdir = tempfile::Builder::new()
            .prefix("doc-rag-ocr-")
            .tempdir()
            .map_err(|e| Error::internal(format!("Failed to create OCR workdir: {}", e)))?;

        let image_prefix = workdir.path().join("page");
        let page_arg = page_number.to_string();

        let render = Command::new("pdftoppm")
            .args([
                "-png",
                "-r",
                &self.dpi.to_string(),
                "-f",
                &page_arg,
                "-l",
                &page_arg,
            ])
            .arg(pdf_path)
            .arg(&image_prefix)
            .output()
            .map_err(|e| Error::internal(format!("pdftoppm failed to start: {}", e)))?;

        if !render.status.success() {
            let stderr = String::from_utf8_lossy(&render.stderr);
            return Err(Error::internal(format!("pdftoppm error: {}", stderr)));
        }

        let mut images = page_images(workdir.path())?;
        images.sort();

        let mut text = String::new();
        for image in &images {
            match self.recognize_image_file(image) {
                Ok(page_text) => {
                    if !page_text.trim().is_empty() {
                        if !text.is_empty() {
                            text.push('\n');
                        }
                        text.push_str(page_text.trim_end());
                    }
                }
                Err(e) => {
                    tracing::warn!(page = page_number, "OCR failed on rendered image: {}", e);
                }
            }
        }

        Ok(text)
    }

    /// Recognize every page of a PDF in one pass
    ///
    /// Used when the page count is unknown; pages come back in render order
    /// joined by blank lines. Per-page recognition failures are logged and
    /// skipped.
    pub fn recognize_pdf(&self, pdf_path: &Path) -> Result<String> {
        let workdir = tempfile::Builder::new()
            .prefix("doc-rag-ocr-")
            .tempdir()
            .map_err(|e| Error::internal(format!("Failed to create OCR workdir: {}", e)))?;

        let image_prefix = workdir.path().join("page");

        let render = Command::new("pdftoppm")
            .args(["-png", "-r", &self.dpi.to_string()])
            .arg(pdf_path)
            .arg(&image_prefix)
            .output()
            .map_err(|e| Error::internal(format!("pdftoppm failed to start: {}", e)))?;

        if !render.status.success() {
            let stderr = String::from_utf8_lossy(&render.stderr);
            return Err(Error::internal(format!("pdftoppm error: {}", stderr)));
        }

        let mut images = page_images(workdir.path())?;
        images.sort();

        if images.is_empty() {
            return Err(Error::internal("pdftoppm produced no page images"));
        }

        let mut text = String::new();
        for (i, image) in images.iter().enumerate() {
            match self.recognize_image_file(image) {
                Ok(page_text) => {
                    if !page_text.trim().is_empty() {
                        if !text.is_empty() {
                            text.push_str("\n\n");
                        }
                        text.push_str(page_text.trim_end());
                    }
                }
                Err(e) => {
                    tracing::warn!(page = i + 1, "OCR failed: {}", e);
                }
            }
        }

        tracing::info!(
            chars = text.len(),
            pages = images.len(),
            "OCR pass complete"
        );

        Ok(text)
    }

    fn recognize_image_file(&self, image_path: &Path) -> Result<String> {
        let output = Command::new("tesseract")
            .arg(image_path)
            .args(["stdout", "-l", &self.language])
            .output()
            .map_err(|e| Error::internal(format!("tesseract failed to start: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::internal(format!("tesseract error: {}", stderr)));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Collect rendered page images from a work directory
fn page_images(dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| Error::internal(format!("Failed to read OCR workdir: {}", e)))?;

    Ok(entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "png"))
        .collect())
}

/// Check if tesseract is installed
pub fn has_tesseract() -> bool {
    Command::new("tesseract")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check if pdftoppm is installed
pub fn has_pdftoppm() -> bool {
    // pdftoppm -v prints to stderr; existence is enough
    Command::new("pdftoppm")
        .arg("-v")
        .output()
        .map(|_| true)
        .unwrap_or(false)
}
