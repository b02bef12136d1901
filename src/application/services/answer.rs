use std::sync::Arc;
use tracing::{instrument, warn};

use crate::application::template::{
    with_history, PromptTemplates, POLICY_TEMPLATE, RETRIEVAL_TEMPLATE,
};
use crate::domain::{
    ports::{CompletionOptions, LlmService},
    DomainError, Message, PolicyAnswer, SearchResult, EMPTY_POLICY_MESSAGE, EMPTY_QUERY_MESSAGE,
};

const CONTEXT_SEPARATOR: &str = "\n\n";

/// Builds the final prompt for either retrieval mode or policy-only mode and
/// makes a single LLM call.
pub struct AnswerGenerator {
    llm: Arc<dyn LlmService>,
    templates: Arc<PromptTemplates>,
    options: CompletionOptions,
    policy_max_tokens: u64,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn LlmService>, templates: Arc<PromptTemplates>) -> Self {
        Self {
            llm,
            templates,
            options: CompletionOptions::default(),
            policy_max_tokens: 800,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.options.temperature = temperature;
        self
    }

    pub fn with_policy_max_tokens(mut self, max_tokens: u64) -> Self {
        self.policy_max_tokens = max_tokens;
        self
    }

    /// Answers from retrieved chunks, joined in retrieval order.
    #[instrument(skip(self, results, history), fields(chunks = results.len(), history = history.len()))]
    pub async fn answer_from_context(
        &self,
        results: &[SearchResult],
        query: &str,
        history: &[Message],
    ) -> Result<String, DomainError> {
        if query.trim().is_empty() {
            return Err(DomainError::empty_input(EMPTY_QUERY_MESSAGE));
        }

        let context = results
            .iter()
            .map(|r| r.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);

        let prompt = self.templates.render(
            RETRIEVAL_TEMPLATE,
            &[("context", &context), ("question", query)],
        )?;

        self.llm
            .complete(&with_history(prompt, history), &self.options)
            .await
    }

    /// Answers against the selected policy text when no documents were uploaded.
    #[instrument(skip(self, policy, history), fields(policy_chars = policy.len()))]
    pub async fn answer_from_policy(
        &self,
        policy: &str,
        query: &str,
        history: &[Message],
    ) -> Result<PolicyAnswer, DomainError> {
        if query.trim().is_empty() {
            return Err(DomainError::empty_input(EMPTY_QUERY_MESSAGE));
        }
        if policy.trim().is_empty() {
            return Err(DomainError::empty_input(EMPTY_POLICY_MESSAGE));
        }

        let prompt = self
            .templates
            .render(POLICY_TEMPLATE, &[("policy", policy), ("query", query)])?;
        let options = self.options.with_max_tokens(self.policy_max_tokens);

        let raw = self
            .llm
            .complete(&with_history(prompt, history), &options)
            .await?;

        let answer = PolicyAnswer::parse(&raw);
        if !answer.is_complete() {
            warn!(
                alignment = %answer.alignment,
                rationale = %answer.rationale,
                "policy answer missing sections, filled with placeholders"
            );
        }

        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::FakeLlm;
    use crate::domain::{DocumentChunk, MessageRole};
    use crate::infrastructure::PromptsConfig;
    use uuid::Uuid;

    fn generator(llm: Arc<FakeLlm>) -> AnswerGenerator {
        let templates = PromptsConfig::default().templates().unwrap();
        AnswerGenerator::new(llm, Arc::new(templates))
    }

    fn result(text: &str, index: usize) -> SearchResult {
        SearchResult {
            chunk: DocumentChunk::new(Uuid::new_v4(), text, index),
            score: 0.5,
        }
    }

    #[tokio::test]
    async fn test_context_prompt_preserves_order() {
        let llm = Arc::new(FakeLlm::with_answer("Validate at ingestion."));
        let answer = generator(llm.clone())
            .answer_from_context(
                &[result("first chunk", 0), result("second chunk", 1)],
                "How do I ensure data accuracy?",
                &[],
            )
            .await
            .unwrap();

        assert_eq!(answer, "Validate at ingestion.");
        let prompt = llm.last_prompt().unwrap();
        assert!(prompt.contains("<context>\nfirst chunk\n\nsecond chunk\n</context>"));
        assert!(prompt.contains("Question: How do I ensure data accuracy?"));
    }

    #[tokio::test]
    async fn test_empty_query_skips_llm() {
        let llm = Arc::new(FakeLlm::default());
        let answers = generator(llm.clone());

        let err = answers.answer_from_context(&[], "   ", &[]).await.unwrap_err();
        assert_eq!(err, DomainError::empty_input(EMPTY_QUERY_MESSAGE));

        let err = answers.answer_from_policy("GDPR", "", &[]).await.unwrap_err();
        assert_eq!(err, DomainError::empty_input(EMPTY_QUERY_MESSAGE));

        let err = answers.answer_from_policy(" ", "What is PII?", &[]).await.unwrap_err();
        assert_eq!(err, DomainError::empty_input(EMPTY_POLICY_MESSAGE));

        assert_eq!(llm.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_policy_answer_sections() {
        let llm = Arc::new(FakeLlm::with_answer(
            "Alignment: In scope\n- Tag columns holding PII.\n- Restrict access by role.\nPolicy alignment: covered by classification rules",
        ));
        let answer = generator(llm.clone())
            .answer_from_policy("Classification & Tagging", "How should PII be tagged?", &[])
            .await
            .unwrap();

        assert_eq!(answer.alignment, "In scope");
        assert!(answer.body.starts_with("- Tag columns"));
        assert_eq!(answer.rationale, "covered by classification rules");

        let prompt = llm.last_prompt().unwrap();
        assert!(prompt.contains("<policy>\nClassification & Tagging\n</policy>"));
        assert!(prompt.contains("Question: How should PII be tagged?"));
    }

    #[tokio::test]
    async fn test_placeholder_text_in_query_stays_literal() {
        let llm = Arc::new(FakeLlm::with_answer("Alignment: Out of scope\nNo.\nPolicy alignment: none"));
        generator(llm.clone())
            .answer_from_policy("Data Quality", "Show me {{policy}} please", &[])
            .await
            .unwrap();

        let prompt = llm.last_prompt().unwrap();
        assert!(prompt.contains("Question: Show me {{policy}} please"));
        assert_eq!(prompt.matches("Data Quality").count(), 1);
    }

    #[tokio::test]
    async fn test_unstructured_policy_answer_is_normalized() {
        let llm = Arc::new(FakeLlm::with_answer("Tag PII at ingestion."));
        let rendered = generator(llm)
            .answer_from_policy("Classification & Tagging", "How should PII be tagged?", &[])
            .await
            .unwrap()
            .render();

        let lines: Vec<&str> = rendered.lines().filter(|l| !l.is_empty()).collect();
        assert!(lines[0].starts_with("Alignment:"));
        assert_eq!(lines[1], "Tag PII at ingestion.");
        assert!(lines[2].starts_with("Policy alignment:"));
    }

    #[tokio::test]
    async fn test_llm_error_is_returned_typed() {
        let llm = Arc::new(FakeLlm {
            answer_failure: Some(DomainError::llm("rate limited")),
            ..Default::default()
        });
        let err = generator(llm)
            .answer_from_context(&[result("ctx", 0)], "What is lineage?", &[])
            .await
            .unwrap_err();

        assert_eq!(err, DomainError::llm("rate limited"));
    }

    #[tokio::test]
    async fn test_history_is_prepended() {
        let llm = Arc::new(FakeLlm::with_answer("ok"));
        let history = vec![
            Message::new(MessageRole::User, "What is lineage?"),
            Message::new(MessageRole::Assistant, "Tracking data flow."),
        ];
        generator(llm.clone())
            .answer_from_context(&[result("ctx", 0)], "And provenance?", &history)
            .await
            .unwrap();

        assert!(llm
            .last_prompt()
            .unwrap()
            .starts_with("Previous conversation:\nUser: What is lineage?"));
    }
}
