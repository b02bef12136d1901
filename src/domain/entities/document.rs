use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{DomainError, Result};

pub const NO_CONTENT_MESSAGE: &str =
    "No content extracted from documents. Vector store cannot be created.";

/// Text extracted from one uploaded file. Lives only for the request that uploaded it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub source_id: String,
    pub content: String,
}

impl Document {
    pub fn new(source_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_id: source_id.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: Uuid,
    pub document_id: Uuid,
    pub content: String,
    pub chunk_index: usize,
}

impl DocumentChunk {
    pub fn new(document_id: Uuid, content: impl Into<String>, chunk_index: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            content: content.into(),
            chunk_index,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Window parameters for [`chunk_content`], measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingParams {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkingParams {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(DomainError::validation("chunk size must be greater than zero"));
        }
        if overlap >= chunk_size {
            return Err(DomainError::validation(format!(
                "chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

/// Splits content into fixed-size character windows.
///
/// Window `i` starts at `i * (chunk_size - overlap)`, so every chunk after the first
/// begins with the last `overlap` characters of its predecessor. The final chunk may
/// be shorter than `chunk_size`. Blank content yields no chunks.
pub fn chunk_content(document_id: Uuid, content: &str, params: ChunkingParams) -> Vec<DocumentChunk> {
    if content.trim().is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = content.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + params.chunk_size).min(chars.len());
        let text: String = chars[start..end].iter().collect();
        chunks.push(DocumentChunk::new(document_id, text, chunks.len()));

        if end == chars.len() {
            break;
        }
        start += params.step();
    }

    chunks
}

/// Chunks every document, preserving document order then chunk order.
///
/// Fails with `EmptyInput` when nothing chunkable was extracted.
pub fn chunk_documents(documents: &[Document], params: ChunkingParams) -> Result<Vec<DocumentChunk>> {
    let chunks: Vec<DocumentChunk> = documents
        .iter()
        .flat_map(|doc| chunk_content(doc.id, &doc.content, params))
        .collect();

    if chunks.is_empty() {
        return Err(DomainError::empty_input(NO_CONTENT_MESSAGE));
    }

    Ok(chunks)
}
