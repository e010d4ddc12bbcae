//! PDF text extraction via the page tree.

use lopdf::Document;
use tracing::{debug, info};

use crate::{ExtractOptions, ExtractedDocument, Format};
use docsage_core::{Error, Result};

/// Separator appended after every page that produced text.
const PAGE_SEPARATOR: &str = "\n\n";

/// Extract the text layer of every page, in page order.
pub fn extract_pdf(payload: &[u8], options: &ExtractOptions) -> Result<ExtractedDocument> {
    let mut doc = Document::load_mem(payload)
        .map_err(|e| Error::Extraction(format!("failed to parse PDF: {}", e)))?;

    if doc.is_encrypted() {
        match options.pdf_password.as_deref() {
            Some(password) => doc
                .decrypt(password)
                .map_err(|e| Error::Extraction(format!("failed to decrypt PDF: {}", e)))?,
            None => {
                return Err(Error::Extraction(
                    "PDF is encrypted and no password was provided".into(),
                ))
            }
        }
    }

    let pages = doc.get_pages();
    let page_count = pages.len();
    let mut text = String::new();
    let mut textless_pages = Vec::new();

    for page_number in pages.keys().copied() {
        match page_text(&doc, page_number) {
            Some(page) => {
                text.push_str(&page);
                text.push_str(PAGE_SEPARATOR);
            }
            None => textless_pages.push(page_number),
        }
    }

    info!(
        page_count,
        textless = textless_pages.len(),
        chars = text.len(),
        "PDF text extraction complete"
    );

    Ok(ExtractedDocument {
        format: Format::Pdf,
        text,
        unit_count: page_count,
        textless_pages,
    })
}

/// Text of a single page, or `None` when the page has no usable text layer.
fn page_text(doc: &Document, page_number: u32) -> Option<String> {
    let raw = match doc.extract_text(&[page_number]) {
        Ok(raw) => raw,
        Err(e) => {
            debug!(page_number, "No text from page: {}", e);
            return None;
        }
    };

    // The page tree walker closes every text object with a newline.
    let trimmed = raw.trim_end_matches(['\r', '\n']);
    if trimmed.trim().is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
