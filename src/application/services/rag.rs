use std::sync::Arc;
use tracing::instrument;

use crate::domain::{
    ports::{EmbeddingService, VectorStore},
    DocumentChunk, DomainError, SearchResult,
};

/// Embeds chunks into a caller-supplied index and retrieves the nearest ones.
///
/// The service itself holds no index: each request passes its own freshly
/// created [`VectorStore`], so retrieval never sees another request's chunks.
pub struct RagService {
    embedding: Arc<dyn EmbeddingService>,
    default_top_k: usize,
}

impl RagService {
    pub fn new(embedding: Arc<dyn EmbeddingService>, default_top_k: usize) -> Self {
        Self {
            embedding,
            default_top_k,
        }
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    #[instrument(skip(self, index, chunks), fields(count = chunks.len()))]
    pub async fn index_chunks(
        &self,
        index: &dyn VectorStore,
        chunks: &[DocumentChunk],
    ) -> Result<(), DomainError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let embeddings = self.embedding.embed_batch(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(DomainError::embedding(format!(
                "{} chunks produced {} vectors",
                chunks.len(),
                embeddings.len()
            )));
        }

        for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
            index.upsert(chunk, embedding).await?;
        }

        Ok(())
    }

    #[instrument(skip(self, index))]
    pub async fn retrieve(
        &self,
        index: &dyn VectorStore,
        query: &str,
    ) -> Result<Vec<SearchResult>, DomainError> {
        self.retrieve_top_k(index, query, self.default_top_k).await
    }

    #[instrument(skip(self, index))]
    pub async fn retrieve_top_k(
        &self,
        index: &dyn VectorStore,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError> {
        let embedding = self.embedding.embed(query).await?;
        index.search(&embedding, top_k).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::FakeEmbedding;
    use crate::infrastructure::InMemoryVectorStore;
    use uuid::Uuid;

    fn chunks(texts: &[&str]) -> Vec<DocumentChunk> {
        let doc_id = Uuid::new_v4();
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| DocumentChunk::new(doc_id, *t, i))
            .collect()
    }

    #[tokio::test]
    async fn test_index_and_retrieve_relevant_chunk() {
        let embedding = Arc::new(FakeEmbedding::default());
        let rag = RagService::new(embedding.clone(), 2);
        let index = InMemoryVectorStore::new();

        let chunks = chunks(&[
            "Quarterly revenue targets for the sales team.",
            "Data accuracy requires timely validation at ingestion.",
            "Office parking rules and visitor badges.",
        ]);
        rag.index_chunks(&index, &chunks).await.unwrap();

        let results = rag.retrieve(&index, "How do I ensure data accuracy?").await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0].chunk.content,
            "Data accuracy requires timely validation at ingestion."
        );
        // One batched call for the chunks, one for the query.
        assert_eq!(embedding.calls(), 2);
    }

    #[tokio::test]
    async fn test_retrieve_top_k_caps_results() {
        let rag = RagService::new(Arc::new(FakeEmbedding::default()), 4);
        let index = InMemoryVectorStore::new();
        rag.index_chunks(&index, &chunks(&["a data", "b data", "c data"]))
            .await
            .unwrap();

        assert_eq!(rag.retrieve_top_k(&index, "data", 1).await.unwrap().len(), 1);
        assert_eq!(rag.retrieve(&index, "data").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_indexes_are_isolated() {
        let rag = RagService::new(Arc::new(FakeEmbedding::default()), 4);
        let first = InMemoryVectorStore::new();
        let second = InMemoryVectorStore::new();

        rag.index_chunks(&first, &chunks(&["lineage graph"])).await.unwrap();

        assert_eq!(first.len().await, 1);
        assert!(second.is_empty().await);
        assert!(rag.retrieve(&second, "lineage").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_propagates() {
        let rag = RagService::new(
            Arc::new(FakeEmbedding::failing(DomainError::embedding("quota exceeded"))),
            4,
        );
        let index = InMemoryVectorStore::new();

        let err = rag.index_chunks(&index, &chunks(&["x"])).await.unwrap_err();
        assert_eq!(err, DomainError::embedding("quota exceeded"));
        assert!(index.is_empty().await);
    }

    #[tokio::test]
    async fn test_empty_chunks_skip_embedding() {
        let embedding = Arc::new(FakeEmbedding::default());
        let rag = RagService::new(embedding.clone(), 4);

        rag.index_chunks(&InMemoryVectorStore::new(), &[]).await.unwrap();
        assert_eq!(embedding.calls(), 0);
    }
}
