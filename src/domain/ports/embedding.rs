use crate::domain::{errors::DomainError, Embedding};
use async_trait::async_trait;

/// Text to vector conversion backed by an external embedding model.
///
/// `embed_batch` returns one vector per input text, in input order, all of the
/// same dimension.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError>;
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError>;
    fn dimension(&self) -> usize;
}
