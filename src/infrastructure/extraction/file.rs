use calamine::{open_workbook_auto_from_rs, Reader};
use std::io::Cursor;
use tracing::debug;

use crate::domain::{ports::TextExtractor, DomainError};

const CELL_SEPARATOR: &str = " | ";

/// Extracts text from the upload formats the assistant accepts:
/// plain text, PDF, CSV and Excel workbooks.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTextExtractor;

impl FileTextExtractor {
    pub const SUPPORTED: &'static [&'static str] = &["txt", "pdf", "csv", "xls", "xlsx"];

    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for FileTextExtractor {
    fn extract(&self, bytes: &[u8], extension: &str) -> Result<String, DomainError> {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        debug!(extension = %extension, bytes = bytes.len(), "extracting text");

        match extension.as_str() {
            "txt" => Ok(decode_text(bytes)),
            "pdf" => extract_pdf(bytes),
            "csv" => extract_csv(bytes),
            "xls" | "xlsx" => extract_workbook(bytes),
            _ => Err(DomainError::unsupported_file_type(extension)),
        }
    }

    fn supports(&self, extension: &str) -> bool {
        Self::SUPPORTED.contains(&extension.to_ascii_lowercase().as_str())
    }
}

/// UTF-8, falling back to Latin-1 (every byte maps to one code point).
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, DomainError> {
    // pdf-extract panics on some malformed font tables.
    std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
        .map_err(|_| DomainError::extraction("PDF", "parser panicked on malformed document"))?
        .map_err(|e| DomainError::extraction("PDF", e.to_string()))
}

fn extract_csv(bytes: &[u8]) -> Result<String, DomainError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut lines = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| DomainError::extraction("CSV", e.to_string()))?;
        lines.push(record.iter().collect::<Vec<_>>().join(CELL_SEPARATOR));
    }
    Ok(lines.join("\n"))
}

fn extract_workbook(bytes: &[u8]) -> Result<String, DomainError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| DomainError::extraction("Excel", e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DomainError::extraction("Excel", "workbook has no worksheets"))?
        .map_err(|e| DomainError::extraction("Excel", e.to_string()))?;

    Ok(range
        .rows()
        .map(|row| {
            row.iter()
                .map(|cell| cell.to_string())
                .collect::<Vec<_>>()
                .join(CELL_SEPARATOR)
        })
        .collect::<Vec<_>>()
        .join("\n"))
}
