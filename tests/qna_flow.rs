use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use governance_qna::api::state::build_qna_service;
use governance_qna::domain::{
    ports::{CompletionOptions, EmbeddingService, LlmService},
    DomainError, Embedding, QnaRequest, ResponseVerdict, UploadedDocument,
};
use governance_qna::infrastructure::AppConfig;

const DIM: usize = 32;

/// Letter-frequency embedder: deterministic and good enough to rank texts
/// that share vocabulary.
#[derive(Default)]
struct LetterEmbedding {
    calls: AtomicUsize,
}

fn letters(text: &str) -> Embedding {
    let mut v = vec![0.0f32; DIM];
    for word in text.split_whitespace().filter(|w| w.len() > 3) {
        for b in word.to_ascii_lowercase().bytes().filter(u8::is_ascii_lowercase) {
            v[(b - b'a') as usize] += 1.0;
        }
        v[26 + word.len() % 6] += 1.0;
    }
    Embedding::new(v)
}

#[async_trait]
impl EmbeddingService for LetterEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(letters(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| letters(t)).collect())
    }

    fn dimension(&self) -> usize {
        DIM
    }
}

/// Classifies on "data" in the question and returns a structured policy
/// answer, recording every prompt it receives.
#[derive(Default)]
struct ScriptedLlm {
    prompts: Mutex<Vec<String>>,
    gate_calls: AtomicUsize,
}

#[async_trait]
impl LlmService for ScriptedLlm {
    async fn complete(&self, prompt: &str, _options: &CompletionOptions) -> Result<String, DomainError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("Alignment: In scope\nKeep a retention schedule per data class.\nPolicy alignment: matches the selected policy".into())
    }

    async fn complete_with_system(
        &self,
        _system: &str,
        prompt: &str,
        _options: &CompletionOptions,
    ) -> Result<String, DomainError> {
        self.gate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(if prompt.to_lowercase().contains("data") { "yes" } else { "no" }.into())
    }
}

fn config() -> AppConfig {
    AppConfig::from_yaml(
        "chunking:\n  chunk_size: 120\n  overlap: 20\nrag:\n  top_k: 2\nmemory:\n  enabled: true\n  ttl_seconds: 600\n  max_turns: 3\n",
        "{}",
    )
    .unwrap()
}

#[tokio::test]
async fn retrieval_flow_uses_uploaded_documents() {
    let llm = Arc::new(ScriptedLlm::default());
    let embedding = Arc::new(LetterEmbedding::default());
    let service = build_qna_service(&config(), llm.clone(), embedding.clone()).unwrap();

    let request = QnaRequest::new("How should data retention be scheduled?")
        .with_document(UploadedDocument::new(
            "retention.txt",
            "Data retention schedules are defined per data class and reviewed every year by the data owner.",
        ))
        .with_document(UploadedDocument::new("menu.csv", "Soup | 4.50\nSalad | 6.00"));

    let payload = service.respond(request).await.unwrap();

    assert_eq!(payload.verdict, ResponseVerdict::Yes);
    let prompts = llm.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Data retention schedules are defined per data class"));
    assert_eq!(embedding.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn out_of_domain_question_is_refused_before_any_work() {
    let llm = Arc::new(ScriptedLlm::default());
    let embedding = Arc::new(LetterEmbedding::default());
    let app = config();
    let service = build_qna_service(&app, llm.clone(), embedding.clone()).unwrap();

    let request = QnaRequest::new("Which team won the cup?")
        .with_document(UploadedDocument::new("notes.txt", "Irrelevant notes."));
    let payload = service.respond(request).await.unwrap();

    assert_eq!(payload.answer, app.prompts.messages.refusal);
    assert_eq!(payload.verdict, ResponseVerdict::No);
    assert_eq!(embedding.calls.load(Ordering::SeqCst), 0);
    assert!(llm.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn policy_only_flow_remembers_the_session() {
    let llm = Arc::new(ScriptedLlm::default());
    let service =
        build_qna_service(&config(), llm.clone(), Arc::new(LetterEmbedding::default())).unwrap();
    let session = uuid::Uuid::new_v4();

    for query in ["What is data retention?", "How long should customer data be kept?"] {
        let payload = service
            .respond(
                QnaRequest::new(query)
                    .with_policy("Policies & Compliance")
                    .with_session(session),
            )
            .await
            .unwrap();

        assert_eq!(payload.verdict, ResponseVerdict::NoUploads);
        assert_eq!(
            payload.answer,
            "Alignment: In scope\n\nKeep a retention schedule per data class.\n\nPolicy alignment: matches the selected policy"
        );
    }

    let prompts = llm.prompts.lock().unwrap();
    assert!(!prompts[0].contains("Previous conversation"));
    assert!(prompts[1].contains("User: What is data retention?"));
    assert_eq!(llm.gate_calls.load(Ordering::SeqCst), 2);
}
