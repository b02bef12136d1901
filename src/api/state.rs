use std::sync::Arc;

use crate::application::{
    AnswerGenerator, DocumentService, QnaService, RagService, RelevanceGate, SessionStore,
};
use crate::domain::{
    ports::{EmbeddingService, LlmService, TextExtractor, VectorStore, VectorStoreFactory},
    DomainError,
};
use crate::infrastructure::{AppConfig, FileTextExtractor, InMemoryVectorStore};

#[derive(Clone)]
pub struct AppState {
    pub qna: Arc<QnaService>,
    pub extractor: Arc<dyn TextExtractor>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wires the QnA pipeline from configuration around the given model adapters.
    pub fn new(
        config: AppConfig,
        llm: Arc<dyn LlmService>,
        embedding: Arc<dyn EmbeddingService>,
    ) -> Result<Self, DomainError> {
        let qna = build_qna_service(&config, llm, embedding)?;
        Ok(Self {
            qna: Arc::new(qna),
            extractor: Arc::new(FileTextExtractor::new()),
            config: Arc::new(config),
        })
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }
}

pub fn build_qna_service(
    app: &AppConfig,
    llm: Arc<dyn LlmService>,
    embedding: Arc<dyn EmbeddingService>,
) -> Result<QnaService, DomainError> {
    let config = &app.config;
    let prompts = &app.prompts;

    let templates = Arc::new(prompts.templates()?);
    let gate = RelevanceGate::new(llm.clone(), prompts.relevance.system.clone(), templates.clone());
    let documents = DocumentService::new(config.chunking.params()?);
    let rag = RagService::new(embedding, config.rag.top_k);
    let answers = AnswerGenerator::new(llm, templates)
        .with_temperature(config.llm.temperature)
        .with_policy_max_tokens(config.llm.policy_max_tokens);

    let new_index: VectorStoreFactory =
        Arc::new(|| Box::new(InMemoryVectorStore::new()) as Box<dyn VectorStore>);

    let mut service = QnaService::new(gate, documents, rag, answers, new_index).with_messages(
        prompts.messages.refusal.clone(),
        prompts.messages.error_prefix.clone(),
    );

    if config.memory.enabled {
        tracing::info!(
            ttl_seconds = config.memory.ttl_seconds,
            max_turns = config.memory.max_turns,
            "conversation memory enabled"
        );
        service = service.with_sessions(SessionStore::from_seconds(
            config.memory.ttl_seconds,
            config.memory.max_turns,
        ));
    }

    Ok(service)
}
