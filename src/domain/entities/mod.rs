mod conversation;
mod document;
mod embedding;
mod qna;

pub use conversation::{Conversation, Message, MessageRole};
pub use document::{
    chunk_content, chunk_documents, ChunkingParams, Document, DocumentChunk, SearchResult,
    NO_CONTENT_MESSAGE,
};
pub use embedding::Embedding;
pub use qna::{
    AnswerPayload, PolicyAnswer, QnaRequest, RelevanceVerdict, ResponseVerdict, UploadedDocument,
    EMPTY_POLICY_MESSAGE, EMPTY_QUERY_MESSAGE, ERROR_PREFIX, REFUSAL_MESSAGE,
};
