mod answer;
mod document;
mod qna;
mod rag;
mod relevance;
mod session;

pub use answer::AnswerGenerator;
pub use document::DocumentService;
pub use qna::{QnaRoute, QnaService};
pub use rag::RagService;
pub use relevance::RelevanceGate;
pub use session::SessionStore;
