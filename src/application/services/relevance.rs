use std::sync::Arc;
use tracing::{debug, instrument};

use crate::application::template::{PromptTemplates, RELEVANCE_TEMPLATE};
use crate::domain::{ports::LlmService, DomainError, RelevanceVerdict};

const LABELS: [&str; 2] = [
    RelevanceVerdict::IN_DOMAIN_LABEL,
    RelevanceVerdict::OUT_OF_DOMAIN_LABEL,
];

/// Decides whether a query belongs to the data-governance domain.
///
/// The boundary lives entirely in the system instruction, which comes from the
/// prompts configuration and can be swapped with [`RelevanceGate::with_instruction`].
pub struct RelevanceGate {
    llm: Arc<dyn LlmService>,
    instruction: String,
    templates: Arc<PromptTemplates>,
}

impl RelevanceGate {
    pub fn new(
        llm: Arc<dyn LlmService>,
        instruction: impl Into<String>,
        templates: Arc<PromptTemplates>,
    ) -> Self {
        Self {
            llm,
            instruction: instruction.into(),
            templates,
        }
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    #[instrument(skip(self))]
    pub async fn classify(&self, query: &str) -> Result<RelevanceVerdict, DomainError> {
        let prompt = self.templates.render(RELEVANCE_TEMPLATE, &[("query", query)])?;
        let label = self.llm.classify(&self.instruction, &prompt, &LABELS).await?;

        let verdict = RelevanceVerdict::from_label(&label)
            .ok_or_else(|| DomainError::llm(format!("classifier returned unknown label {label:?}")))?;
        debug!(verdict = verdict.label(), "relevance verdict");

        Ok(verdict)
    }
}
