use async_trait::async_trait;
use std::sync::RwLock;

use crate::domain::{ports::VectorStore, DocumentChunk, DomainError, Embedding, SearchResult};

/// Brute-force cosine index. One instance is built per request and dropped with it.
pub struct InMemoryVectorStore {
    chunks: RwLock<Vec<(DocumentChunk, Embedding)>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(
        &self,
        chunk: &DocumentChunk,
        embedding: &Embedding,
    ) -> Result<(), DomainError> {
        let mut store = self
            .chunks
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        if let Some((_, existing)) = store.first() {
            if existing.dimension() != embedding.dimension() {
                return Err(DomainError::embedding(format!(
                    "vector dimension {} does not match index dimension {}",
                    embedding.dimension(),
                    existing.dimension()
                )));
            }
        }

        store.retain(|(c, _)| c.id != chunk.id);
        store.push((chunk.clone(), embedding.clone()));
        Ok(())
    }

    async fn search(
        &self,
        query: &Embedding,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError> {
        let store = self
            .chunks
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        let mut results: Vec<SearchResult> = store
            .iter()
            .map(|(chunk, embedding)| SearchResult {
                chunk: chunk.clone(),
                score: query.cosine_similarity(embedding),
            })
            .collect();

        // Stable sort: equal scores keep insertion order.
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);

        Ok(results)
    }

    async fn len(&self) -> usize {
        self.chunks.read().map(|store| store.len()).unwrap_or(0)
    }
}
