//! DocSage Extract — plain-text extraction from uploaded document payloads.
//!
//! Two formats are supported:
//! - PDF: per-page text layer, pages in document order, each followed by a
//!   blank line. Pages without a text layer contribute nothing.
//! - DOCX: non-empty body paragraphs one per line, then non-empty table
//!   cells one per line (row-major, tables in document order).
//!
//! Extraction is a pure transformation of the payload; nothing is shared
//! between calls, so calling it twice on the same bytes yields the same text.

pub mod docx;
pub mod pdf;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use docsage_core::TextlessPagePolicy;
use docsage_core::{Error, Result};

/// Document formats accepted for extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Pdf,
    Docx,
}

impl Format {
    /// Detect format from a file extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    /// Detect format from a file name such as `report.PDF`.
    pub fn from_file_name(name: &str) -> Option<Self> {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Sniff the format from the payload's leading bytes.
    ///
    /// A ZIP archive only counts as DOCX when it carries `word/document.xml`.
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF") {
            return Some(Self::Pdf);
        }
        if bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
            if let Ok(mut archive) = zip::ZipArchive::new(std::io::Cursor::new(bytes)) {
                if archive.by_name(docx::MAIN_PART).is_ok() {
                    return Some(Self::Docx);
                }
            }
        }
        None
    }

    /// Canonical file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }

    /// Reject a payload whose leading bytes identify the other format.
    ///
    /// Payloads that sniff as nothing are let through; the extractor reports
    /// them as unreadable.
    pub fn check_payload(&self, payload: &[u8]) -> Result<()> {
        match Self::from_magic(payload) {
            Some(actual) if actual != *self => Err(Error::InvalidInput(format!(
                "file content is {} but the file name says .{}",
                actual, self
            ))),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Knobs for a single extraction.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Password for encrypted PDFs.
    pub pdf_password: Option<String>,
    /// Handling of PDF pages with no text layer.
    pub textless_pages: TextlessPagePolicy,
    /// Where DOCX payloads are staged (system temp dir when `None`).
    pub staging_dir: Option<PathBuf>,
}

/// Extracted text plus what the extractor saw along the way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub format: Format,
    /// The plain text, possibly empty.
    pub text: String,
    /// Pages in the PDF, or lines emitted for a DOCX.
    pub unit_count: usize,
    /// 1-based PDF page numbers that yielded no text. Always empty for DOCX.
    pub textless_pages: Vec<u32>,
}

impl ExtractedDocument {
    /// True when nothing but whitespace was extracted.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Whitespace-separated word count.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Extract plain text from a payload of the declared format.
pub fn extract(payload: &[u8], format: Format) -> Result<String> {
    extract_with(payload, format, &ExtractOptions::default()).map(|doc| doc.text)
}

/// Extract plain text with explicit options.
pub fn extract_with(
    payload: &[u8],
    format: Format,
    options: &ExtractOptions,
) -> Result<ExtractedDocument> {
    debug!(%format, bytes = payload.len(), "Extracting text");

    let document = match format {
        Format::Pdf => pdf::extract_pdf(payload, options)?,
        Format::Docx => docx::extract_docx(payload, options)?,
    };

    if !document.textless_pages.is_empty()
        && options.textless_pages == TextlessPagePolicy::Reject
    {
        return Err(Error::Extraction(format!(
            "pages without extractable text: {}",
            join_numbers(&document.textless_pages)
        )));
    }

    Ok(document)
}

/// Extract text from a file on disk, detecting the format from its extension.
pub fn extract_file(path: &Path, options: &ExtractOptions) -> Result<ExtractedDocument> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");
    let format = Format::from_file_name(name)
        .ok_or_else(|| Error::UnsupportedFormat(name.to_string()))?;
    let payload = std::fs::read(path)?;
    extract_with(&payload, format, options)
}

fn join_numbers(numbers: &[u32]) -> String {
    numbers
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
