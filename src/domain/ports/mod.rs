mod embedding;
mod llm;
mod text_extractor;
mod vector_store;

pub use embedding::EmbeddingService;
pub use llm::{match_label, CompletionOptions, LlmService};
pub use text_extractor::{file_extension, TextExtractor};
pub use vector_store::{VectorStore, VectorStoreFactory};
