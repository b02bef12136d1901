use crate::domain::errors::DomainError;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f64,
    pub max_tokens: Option<u64>,
}

impl CompletionOptions {
    pub fn new(temperature: f64) -> Self {
        Self {
            temperature,
            max_tokens: None,
        }
    }

    /// Settings for label-style outputs.
    pub fn deterministic() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: Some(8),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self::new(0.3)
    }
}

#[async_trait]
pub trait LlmService: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, DomainError>;

    async fn complete_with_system(
        &self,
        system: &str,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, DomainError>;

    /// Constrained completion: the result is always one of `labels`.
    async fn classify(
        &self,
        system: &str,
        prompt: &str,
        labels: &[&str],
    ) -> Result<String, DomainError> {
        let raw = self
            .complete_with_system(system, prompt, &CompletionOptions::deterministic())
            .await?;

        match_label(&raw, labels)
            .map(str::to_string)
            .ok_or_else(|| DomainError::llm(format!("unexpected classifier output: {raw:?}")))
    }
}

/// Finds the single label mentioned in `raw`, ignoring case and punctuation.
///
/// Returns `None` when no label or more than one distinct label appears.
pub fn match_label<'a>(raw: &str, labels: &[&'a str]) -> Option<&'a str> {
    let normalized = raw.trim().to_lowercase();
    if let Some(label) = labels.iter().find(|l| l.eq_ignore_ascii_case(&normalized)) {
        return Some(*label);
    }

    let mut found: Option<&'a str> = None;
    for token in normalized.split(|c: char| !c.is_alphanumeric()) {
        if let Some(&label) = labels.iter().find(|l| l.eq_ignore_ascii_case(token)) {
            match found {
                Some(prev) if prev != label => return None,
                _ => found = Some(label),
            }
        }
    }
    found
}
