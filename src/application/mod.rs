//! Application layer - Use cases and orchestration.
//!
//! Services here depend on domain ports (traits) rather than concrete
//! implementations. `QnaService` sequences the relevance gate, the
//! request-scoped retrieval pipeline and answer generation.

pub mod services;
pub mod template;

#[cfg(test)]
pub(crate) mod test_support;

pub use services::{
    AnswerGenerator, DocumentService, QnaRoute, QnaService, RagService, RelevanceGate,
    SessionStore,
};
