use crate::domain::errors::DomainError;

/// Turns an uploaded file into plain text, dispatching on its extension.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8], extension: &str) -> Result<String, DomainError>;

    fn supports(&self, extension: &str) -> bool;
}

/// Lower-cased extension of `filename`, or an empty string when it has none.
pub fn file_extension(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => String::new(),
    }
}
