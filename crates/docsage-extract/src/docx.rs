//! DOCX text extraction.
//!
//! The payload is staged to a uniquely named temporary file and the zip
//! container is validated from disk before the document model is parsed from
//! the in-memory payload (`docx_rs::read_docx` only takes a byte slice). The
//! staging file is owned by a `NamedTempFile`, so it is removed when this
//! module returns, on success and on every error path.

use std::io::Write;
use std::path::Path;

use docx_rs::{
    DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent, TableChild,
    TableRowChild,
};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::{ExtractOptions, ExtractedDocument, Format};
use docsage_core::{Error, Result};

/// Main document part inside a DOCX archive.
pub const MAIN_PART: &str = "word/document.xml";

/// Extract body paragraphs, then table cells, one entry per line.
pub fn extract_docx(payload: &[u8], options: &ExtractOptions) -> Result<ExtractedDocument> {
    let staged = stage_payload(payload, options.staging_dir.as_deref())?;
    debug!(path = %staged.path().display(), "Staged DOCX payload");

    validate_archive(staged.path())?;
    let docx = docx_rs::read_docx(payload)
        .map_err(|e| Error::Extraction(format!("failed to parse DOCX: {:?}", e)))?;

    let mut paragraphs = Vec::new();
    let mut cells = Vec::new();

    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(para) => {
                let text = paragraph_text(para);
                if !text.is_empty() {
                    paragraphs.push(text);
                }
            }
            DocumentChild::Table(table) => collect_cells(table, &mut cells),
            _ => {}
        }
    }

    info!(
        paragraphs = paragraphs.len(),
        cells = cells.len(),
        "DOCX text extraction complete"
    );

    let mut lines = paragraphs;
    lines.append(&mut cells);

    Ok(ExtractedDocument {
        format: Format::Docx,
        unit_count: lines.len(),
        text: lines.join("\n"),
        textless_pages: Vec::new(),
    })
}

/// Write the payload to a fresh temporary file.
fn stage_payload(payload: &[u8], staging_dir: Option<&Path>) -> Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("docsage-").suffix(".docx");
    let mut staged = match staging_dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    staged.write_all(payload)?;
    staged.flush()?;
    Ok(staged)
}

/// Open the staged archive and check it is a word-processing package.
fn validate_archive(path: &Path) -> Result<()> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| Error::Extraction(format!("invalid DOCX archive: {}", e)))?;

    if archive.by_name(MAIN_PART).is_err() {
        return Err(Error::Extraction(format!(
            "invalid DOCX archive: missing {}",
            MAIN_PART
        )));
    }
    Ok(())
}

/// Trimmed text of every non-empty cell, row-major.
#[allow(irrefutable_let_patterns)]
fn collect_cells(table: &Table, out: &mut Vec<String>) {
    for row in &table.rows {
        let TableChild::TableRow(row) = row else {
            continue;
        };
        for cell in &row.cells {
            if let TableRowChild::TableCell(cell) = cell {
                let text = cell
                    .children
                    .iter()
                    .filter_map(|content| match content {
                        TableCellContent::Paragraph(para) => Some(paragraph_text(para)),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                let text = text.trim();
                if !text.is_empty() {
                    out.push(text.to_string());
                }
            }
        }
    }
}

fn paragraph_text(para: &Paragraph) -> String {
    let mut text = String::new();
    push_children(&para.children, &mut text);
    text
}

fn push_children(children: &[ParagraphChild], text: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => {
                for rc in &run.children {
                    match rc {
                        RunChild::Text(t) => text.push_str(&t.text),
                        RunChild::Tab(_) => text.push('\t'),
                        RunChild::Break(_) => text.push('\n'),
                        _ => {}
                    }
                }
            }
            ParagraphChild::Hyperlink(link) => push_children(&link.children, text),
            _ => {}
        }
    }
}
