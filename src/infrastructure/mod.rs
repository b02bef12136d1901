pub mod client;
pub mod config;
pub mod deadline;
pub mod embedding;
pub mod extraction;
pub mod llm;
pub mod vector_store;

pub use client::ModelClient;
pub use config::{AppConfig, ClientRole, Config, PromptsConfig, Provider};
pub use embedding::TextEmbedding;
pub use extraction::FileTextExtractor;
pub use llm::ChatLlm;
pub use vector_store::InMemoryVectorStore;
