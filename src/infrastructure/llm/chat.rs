use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::domain::{
    ports::{CompletionOptions, LlmService},
    DomainError,
};
use crate::infrastructure::client::ModelClient;
use crate::infrastructure::config::LlmConfig;
use crate::infrastructure::deadline::with_deadline;

/// Builds a one-shot agent on the given provider client and prompts it.
macro_rules! prompt_agent {
    ($client:expr, $model:expr, $system:expr, $prompt:expr, $options:expr) => {{
        let mut builder = $client.agent($model).temperature($options.temperature);
        if let Some(system) = $system {
            builder = builder.preamble(system);
        }
        if let Some(max_tokens) = $options.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }
        builder.build().prompt($prompt).await
    }};
}

pub struct ChatLlm {
    client: Arc<ModelClient>,
    model: String,
    timeout: Duration,
}

impl ChatLlm {
    pub fn new(client: Arc<ModelClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn from_config(client: Arc<ModelClient>, config: &LlmConfig) -> Self {
        Self::new(client, &config.model).with_timeout(Duration::from_secs(config.timeout_seconds))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(
        &self,
        system: Option<&str>,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, DomainError> {
        debug!(
            provider = ?self.client.provider(),
            model = %self.model,
            prompt_chars = prompt.len(),
            "sending completion request"
        );

        let call = async {
            match self.client.as_ref() {
                ModelClient::Azure(client) => {
                    prompt_agent!(client, &self.model, system, prompt, options)
                }
                ModelClient::OpenAi(client) => {
                    prompt_agent!(client, &self.model, system, prompt, options)
                }
            }
        };

        with_deadline(self.timeout, "completion", call)
            .await?
            .map_err(|e| DomainError::llm(e.to_string()))
    }
}

#[async_trait]
impl LlmService for ChatLlm {
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, DomainError> {
        self.run(None, prompt, options).await
    }

    async fn complete_with_system(
        &self,
        system: &str,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, DomainError> {
        self.run(Some(system), prompt, options).await
    }
}
