use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use rig::client::EmbeddingsClient;
use rig::embeddings::EmbeddingModel;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::domain::{ports::EmbeddingService, DomainError, Embedding};
use crate::infrastructure::client::ModelClient;
use crate::infrastructure::config::EmbeddingConfig;
use crate::infrastructure::deadline::with_deadline;

pub struct TextEmbedding {
    client: Arc<ModelClient>,
    model: String,
    dimension: usize,
    batch_size: usize,
    max_concurrency: usize,
    timeout: Duration,
}

impl TextEmbedding {
    pub fn new(client: Arc<ModelClient>, model: impl Into<String>) -> Self {
        let defaults = EmbeddingConfig::default();
        Self {
            client,
            model: model.into(),
            dimension: defaults.dimension,
            batch_size: defaults.batch_size,
            max_concurrency: defaults.max_concurrency,
            timeout: Duration::from_secs(defaults.timeout_seconds),
        }
    }

    pub fn from_config(client: Arc<ModelClient>, config: &EmbeddingConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
            dimension: config.dimension,
            batch_size: config.batch_size.max(1),
            max_concurrency: config.max_concurrency.max(1),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// One provider round trip; output order matches `texts`.
    async fn embed_request(&self, texts: Vec<String>) -> Result<Vec<Embedding>, DomainError> {
        let expected = texts.len();
        let call = async {
            match self.client.as_ref() {
                ModelClient::Azure(client) => {
                    client.embedding_model(&self.model).embed_texts(texts).await
                }
                ModelClient::OpenAi(client) => {
                    client.embedding_model(&self.model).embed_texts(texts).await
                }
            }
        };

        let embeddings = with_deadline(self.timeout, "embedding request", call)
            .await?
            .map_err(|e| DomainError::embedding(e.to_string()))?;

        if embeddings.len() != expected {
            return Err(DomainError::embedding(format!(
                "expected {expected} vectors, provider returned {}",
                embeddings.len()
            )));
        }

        let embeddings: Vec<Embedding> = embeddings
            .into_iter()
            .map(|e| Embedding::from_f64(e.vec))
            .collect();
        check_dimension(&embeddings, self.dimension)?;
        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingService for TextEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        self.embed_request(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::embedding("No embedding returned"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        embed_in_batches(texts, self.batch_size, self.max_concurrency, |batch| {
            debug!(model = %self.model, batch = batch.len(), "embedding batch");
            self.embed_request(batch)
        })
        .await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Splits `texts` into batches and runs at most `max_concurrency` of them at
/// once. Output order matches input order.
async fn embed_in_batches<F, Fut>(
    texts: &[&str],
    batch_size: usize,
    max_concurrency: usize,
    mut embed: F,
) -> Result<Vec<Embedding>, DomainError>
where
    F: FnMut(Vec<String>) -> Fut,
    Fut: Future<Output = Result<Vec<Embedding>, DomainError>>,
{
    let owned: Vec<Vec<String>> = texts
        .chunks(batch_size.max(1))
        .map(|batch| batch.iter().map(|t| t.to_string()).collect())
        .collect();
    let requests = owned.into_iter().map(|batch| embed(batch));

    let batches: Vec<Vec<Embedding>> = stream::iter(requests)
        .buffered(max_concurrency.max(1))
        .try_collect()
        .await?;

    Ok(batches.into_iter().flatten().collect())
}

/// Rejects vectors whose length differs from the configured dimension.
fn check_dimension(embeddings: &[Embedding], expected: usize) -> Result<(), DomainError> {
    match embeddings.iter().find(|e| e.dimension() != expected) {
        Some(e) => Err(DomainError::embedding(format!(
            "provider returned {}-dimensional vectors, embedding.dimension is {expected}",
            e.dimension()
        ))),
        None => Ok(()),
    }
}
