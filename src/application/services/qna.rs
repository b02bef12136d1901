use tracing::{debug, error, info, instrument};

use crate::application::{AnswerGenerator, DocumentService, RagService, RelevanceGate, SessionStore};
use crate::domain::{
    ports::VectorStoreFactory, AnswerPayload, DomainError, Message, QnaRequest, RelevanceVerdict,
    ResponseVerdict, EMPTY_POLICY_MESSAGE, EMPTY_QUERY_MESSAGE, ERROR_PREFIX, REFUSAL_MESSAGE,
};

/// Path taken by a request once the relevance gate has ruled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QnaRoute {
    /// Out of domain: answer with the fixed refusal, touch nothing else.
    Refused,
    /// In domain with documents: chunk, embed, index, retrieve, generate.
    Retrieval,
    /// In domain without documents: answer against the selected policy.
    PolicyOnly,
}

impl QnaRoute {
    pub fn select(verdict: RelevanceVerdict, has_documents: bool) -> Self {
        match (verdict, has_documents) {
            (RelevanceVerdict::OutOfDomain, _) => Self::Refused,
            (RelevanceVerdict::InDomain, true) => Self::Retrieval,
            (RelevanceVerdict::InDomain, false) => Self::PolicyOnly,
        }
    }
}

/// Runs one question through gate → (retrieval | policy-only) → generation.
///
/// Every call is independent: the vector index is created from `new_index`
/// per request and dropped at the end of it. The only state that outlives a
/// request is the optional [`SessionStore`] used in memory mode.
pub struct QnaService {
    gate: RelevanceGate,
    documents: DocumentService,
    rag: RagService,
    answers: AnswerGenerator,
    new_index: VectorStoreFactory,
    sessions: Option<SessionStore>,
    refusal: String,
    error_prefix: String,
}

impl QnaService {
    pub fn new(
        gate: RelevanceGate,
        documents: DocumentService,
        rag: RagService,
        answers: AnswerGenerator,
        new_index: VectorStoreFactory,
    ) -> Self {
        Self {
            gate,
            documents,
            rag,
            answers,
            new_index,
            sessions: None,
            refusal: REFUSAL_MESSAGE.to_string(),
            error_prefix: ERROR_PREFIX.to_string(),
        }
    }

    /// Enables memory mode.
    pub fn with_sessions(mut self, sessions: SessionStore) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn with_messages(mut self, refusal: impl Into<String>, error_prefix: impl Into<String>) -> Self {
        self.refusal = refusal.into();
        self.error_prefix = error_prefix.into();
        self
    }

    pub fn refusal(&self) -> &str {
        &self.refusal
    }

    pub fn memory_enabled(&self) -> bool {
        self.sessions.is_some()
    }

    /// Answers a request.
    ///
    /// Input problems (empty query, missing policy, documents without
    /// extractable text) come back as `Err` for the caller to report as a client
    /// error. Upstream failures are logged and folded into the payload as an
    /// error message, so a failed model call still produces a response.
    #[instrument(skip(self, request), fields(documents = request.documents.len(), session = ?request.session_id))]
    pub async fn respond(&self, request: QnaRequest) -> Result<AnswerPayload, DomainError> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(DomainError::empty_input(EMPTY_QUERY_MESSAGE));
        }
        let has_documents = request.has_documents();
        if !has_documents && request.policy.trim().is_empty() {
            return Err(DomainError::empty_input(EMPTY_POLICY_MESSAGE));
        }

        let verdict = match self.gate.classify(query).await {
            Ok(verdict) => verdict,
            Err(e) if e.is_upstream() => {
                error!(error = %e, stage = "gate", "relevance check failed");
                let verdict = ResponseVerdict::for_request(RelevanceVerdict::OutOfDomain, has_documents);
                return Ok(self.error_payload(query, verdict, &e));
            }
            Err(e) => return Err(e),
        };

        let route = QnaRoute::select(verdict, has_documents);
        let response_verdict = ResponseVerdict::for_request(verdict, has_documents);
        info!(verdict = verdict.label(), route = ?route, "query gated");

        let history = self.history(&request);
        let outcome = match route {
            QnaRoute::Refused => {
                return Ok(AnswerPayload {
                    query: query.to_string(),
                    answer: self.refusal.clone(),
                    verdict: response_verdict,
                });
            }
            QnaRoute::Retrieval => self.answer_from_documents(&request, query, &history).await,
            QnaRoute::PolicyOnly => self
                .answers
                .answer_from_policy(&request.policy, query, &history)
                .await
                .map(|answer| answer.render()),
        };

        match outcome {
            Ok(answer) => {
                self.remember(&request, query, &answer);
                Ok(AnswerPayload {
                    query: query.to_string(),
                    answer,
                    verdict: response_verdict,
                })
            }
            Err(e) if e.is_upstream() => {
                error!(error = %e, route = ?route, "answer generation failed");
                Ok(self.error_payload(query, response_verdict, &e))
            }
            Err(e) => Err(e),
        }
    }

    async fn answer_from_documents(
        &self,
        request: &QnaRequest,
        query: &str,
        history: &[Message],
    ) -> Result<String, DomainError> {
        let chunks = self.documents.ingest(&request.documents)?;

        let index = (self.new_index)();
        self.rag.index_chunks(index.as_ref(), &chunks).await?;
        let results = self.rag.retrieve(index.as_ref(), query).await?;
        debug!(
            indexed = chunks.len(),
            retrieved = results.len(),
            top_score = results.first().map(|r| r.score),
            "context retrieved"
        );

        self.answers.answer_from_context(&results, query, history).await
    }

    fn history(&self, request: &QnaRequest) -> Vec<Message> {
        match (&self.sessions, request.session_id) {
            (Some(sessions), Some(id)) => sessions.history(id),
            _ => Vec::new(),
        }
    }

    fn remember(&self, request: &QnaRequest, query: &str, answer: &str) {
        if let (Some(sessions), Some(id)) = (&self.sessions, request.session_id) {
            sessions.record(id, query, answer);
        }
    }

    fn error_payload(&self, query: &str, verdict: ResponseVerdict, error: &DomainError) -> AnswerPayload {
        let mut answer = format!("{} {error}", self.error_prefix);
        if error.is_retryable() {
            answer.push_str(". Please try again.");
        }
        AnswerPayload {
            query: query.to_string(),
            answer,
            verdict,
        }
    }
}
