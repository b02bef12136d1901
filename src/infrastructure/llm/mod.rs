mod chat;

pub use chat::ChatLlm;
