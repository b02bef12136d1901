//! Fake port implementations with call counters for service tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::domain::{
    ports::{CompletionOptions, EmbeddingService, LlmService, VectorStore, VectorStoreFactory},
    DomainError, Embedding,
};
use crate::infrastructure::InMemoryVectorStore;

const DIM: usize = 64;

/// Bag-of-words hashing embedder: texts sharing words get similar vectors.
#[derive(Default)]
pub struct FakeEmbedding {
    pub calls: AtomicUsize,
    pub texts: AtomicUsize,
    pub failure: Option<DomainError>,
}

impl FakeEmbedding {
    pub fn failing(error: DomainError) -> Self {
        Self {
            failure: Some(error),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector(text: &str) -> Embedding {
        let mut v = vec![0.0f32; DIM];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 2)
        {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0xcbf2_9ce4_8422_2325u64, |h, b| (h ^ b as u64).wrapping_mul(0x100_0000_01b3));
            v[(hash % DIM as u64) as usize] += 1.0;
        }
        Embedding::new(v)
    }
}

#[async_trait]
impl EmbeddingService for FakeEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(e) => Err(e.clone()),
            None => Ok(Self::vector(text)),
        }
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.fetch_add(texts.len(), Ordering::SeqCst);
        match &self.failure {
            Some(e) => Err(e.clone()),
            None => Ok(texts.iter().map(|t| Self::vector(t)).collect()),
        }
    }

    fn dimension(&self) -> usize {
        DIM
    }
}

/// Gate replies "yes" when the prompt mentions a governance keyword; free
/// completions echo the prompt unless a canned answer is set.
pub struct FakeLlm {
    pub classify_calls: AtomicUsize,
    pub complete_calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
    pub keywords: Vec<&'static str>,
    pub answer: Option<String>,
    pub answer_failure: Option<DomainError>,
    pub gate_failure: Option<DomainError>,
}

impl Default for FakeLlm {
    fn default() -> Self {
        Self {
            classify_calls: AtomicUsize::new(0),
            complete_calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            keywords: vec!["gdpr", "governance", "retention", "accuracy", "lineage", "stewardship"],
            answer: None,
            answer_failure: None,
            gate_failure: None,
        }
    }
}

impl FakeLlm {
    pub fn with_answer(answer: impl Into<String>) -> Self {
        Self {
            answer: Some(answer.into()),
            ..Default::default()
        }
    }

    pub fn classify_calls(&self) -> usize {
        self.classify_calls.load(Ordering::SeqCst)
    }

    pub fn complete_calls(&self) -> usize {
        self.complete_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.classify_calls() + self.complete_calls()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl LlmService for FakeLlm {
    async fn complete(
        &self,
        prompt: &str,
        _options: &CompletionOptions,
    ) -> Result<String, DomainError> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(e) = &self.answer_failure {
            return Err(e.clone());
        }
        Ok(self
            .answer
            .clone()
            .unwrap_or_else(|| format!("Based on the documents: {prompt}")))
    }

    async fn complete_with_system(
        &self,
        _system: &str,
        prompt: &str,
        _options: &CompletionOptions,
    ) -> Result<String, DomainError> {
        self.classify_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = &self.gate_failure {
            return Err(e.clone());
        }
        let lower = prompt.to_lowercase();
        let relevant = self.keywords.iter().any(|k| lower.contains(k));
        Ok(if relevant { "Yes" } else { "No." }.to_string())
    }
}

/// Factory for real in-memory indexes that counts how many were created.
pub fn counting_index_factory() -> (VectorStoreFactory, Arc<AtomicUsize>) {
    let created = Arc::new(AtomicUsize::new(0));
    let counter = created.clone();
    let factory: VectorStoreFactory = Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Box::new(InMemoryVectorStore::new()) as Box<dyn VectorStore>
    });
    (factory, created)
}
