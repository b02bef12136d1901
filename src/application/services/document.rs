use tracing::{debug, instrument};

use crate::domain::{
    chunk_documents, ChunkingParams, Document, DocumentChunk, DomainError, UploadedDocument,
};

/// Turns uploaded documents into ordered, overlapping chunks.
pub struct DocumentService {
    params: ChunkingParams,
}

impl DocumentService {
    pub fn new(params: ChunkingParams) -> Self {
        Self { params }
    }

    pub fn with_chunk_size(chunk_size: usize, overlap: usize) -> Result<Self, DomainError> {
        Ok(Self::new(ChunkingParams::new(chunk_size, overlap)?))
    }

    pub fn params(&self) -> ChunkingParams {
        self.params
    }

    #[instrument(skip(self, uploads), fields(documents = uploads.len()))]
    pub fn ingest(&self, uploads: &[UploadedDocument]) -> Result<Vec<DocumentChunk>, DomainError> {
        let documents: Vec<Document> = uploads
            .iter()
            .map(|u| Document::new(&u.filename, &u.text))
            .collect();

        let chunks = chunk_documents(&documents, self.params)?;
        debug!(
            chunks = chunks.len(),
            chunk_size = self.params.chunk_size(),
            overlap = self.params.overlap(),
            "documents chunked"
        );

        Ok(chunks)
    }
}
