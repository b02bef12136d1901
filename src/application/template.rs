//! Prompt templates rendered with Handlebars, plus conversation history framing.

use handlebars::{Handlebars, RenderError};
use std::collections::HashMap;

use crate::domain::{DomainError, Message};

pub const RELEVANCE_TEMPLATE: &str = "relevance";
pub const RETRIEVAL_TEMPLATE: &str = "retrieval";
pub const POLICY_TEMPLATE: &str = "policy";

/// Variables each template is rendered with.
const TEMPLATE_VARIABLES: [(&str, &[&str]); 3] = [
    (RELEVANCE_TEMPLATE, &["query"]),
    (RETRIEVAL_TEMPLATE, &["context", "question"]),
    (POLICY_TEMPLATE, &["policy", "query"]),
];

/// The relevance, retrieval and policy prompts, registered once in strict mode.
///
/// Values are inserted verbatim (no HTML escaping) and are never re-parsed, so
/// user text containing `{{...}}` cannot reach another slot.
#[derive(Debug)]
pub struct PromptTemplates {
    registry: Handlebars<'static>,
}

impl PromptTemplates {
    pub fn new(relevance: &str, retrieval: &str, policy: &str) -> Result<Self, DomainError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::no_escape);

        for (name, source) in [
            (RELEVANCE_TEMPLATE, relevance),
            (RETRIEVAL_TEMPLATE, retrieval),
            (POLICY_TEMPLATE, policy),
        ] {
            registry
                .register_template_string(name, source)
                .map_err(|e| DomainError::validation(format!("prompt template `{name}`: {e}")))?;
        }

        let templates = Self { registry };
        templates.check()?;
        Ok(templates)
    }

    /// Dry-runs every template so a reference to an unknown variable fails at
    /// startup instead of on a request.
    fn check(&self) -> Result<(), DomainError> {
        for (name, variables) in TEMPLATE_VARIABLES {
            let sample: Vec<(&str, &str)> = variables.iter().map(|v| (*v, "sample")).collect();
            self.render_raw(name, &sample)
                .map_err(|e| DomainError::validation(format!("prompt template `{name}`: {e}")))?;
        }
        Ok(())
    }

    pub fn render(&self, name: &str, vars: &[(&str, &str)]) -> Result<String, DomainError> {
        self.render_raw(name, vars)
            .map_err(|e| DomainError::internal(format!("prompt template `{name}` failed: {e}")))
    }

    fn render_raw(&self, name: &str, vars: &[(&str, &str)]) -> Result<String, RenderError> {
        let data: HashMap<&str, &str> = vars.iter().copied().collect();
        self.registry.render(name, &data)
    }
}

/// Prefixes the prompt with earlier turns of the session, if any.
pub fn with_history(prompt: String, history: &[Message]) -> String {
    if history.is_empty() {
        return prompt;
    }

    let context = history
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.content))
        .collect::<Vec<_>>()
        .join("\n");

    format!("Previous conversation:\n{context}\n\n{prompt}")
}
