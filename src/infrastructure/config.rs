use serde::Deserialize;
use std::path::Path;

use crate::application::template::PromptTemplates;
use crate::domain::{ChunkingParams, DomainError, ERROR_PREFIX, REFUSAL_MESSAGE};

pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";
pub const DEFAULT_PROMPTS_PATH: &str = "config/prompts.yaml";

/// Runtime settings plus prompt texts, loaded once at startup and shared read-only.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    pub config: Config,
    pub prompts: PromptsConfig,
}

impl AppConfig {
    /// Loads `config/config.yaml` and `config/prompts.yaml` (or the files named by
    /// `APP_CONFIG_PATH` / `APP_PROMPTS_PATH`), falling back to built-in defaults
    /// for missing files, then applies environment overrides and validates.
    pub fn load() -> Result<Self, DomainError> {
        let config_path =
            std::env::var("APP_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let prompts_path =
            std::env::var("APP_PROMPTS_PATH").unwrap_or_else(|_| DEFAULT_PROMPTS_PATH.into());

        let mut app = Self {
            config: load_yaml_or_default(Path::new(&config_path))?,
            prompts: load_yaml_or_default(Path::new(&prompts_path))?,
        };
        app.config.apply_env_overrides()?;
        app.validate()?;
        Ok(app)
    }

    pub fn from_yaml(config: &str, prompts: &str) -> Result<Self, DomainError> {
        let app = Self {
            config: parse_yaml(config, "config")?,
            prompts: parse_yaml(prompts, "prompts")?,
        };
        app.validate()?;
        Ok(app)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        self.config.chunking.params()?;

        if self.config.rag.top_k == 0 {
            return Err(DomainError::validation("rag.top_k must be at least 1"));
        }
        if self.config.embedding.batch_size == 0 {
            return Err(DomainError::validation("embedding.batch_size must be at least 1"));
        }
        if self.config.embedding.max_concurrency == 0 {
            return Err(DomainError::validation(
                "embedding.max_concurrency must be at least 1",
            ));
        }
        if !(0.0..=2.0).contains(&self.config.llm.temperature) {
            return Err(DomainError::validation("llm.temperature must be within 0.0..=2.0"));
        }
        if self.config.memory.enabled && self.config.memory.max_turns == 0 {
            return Err(DomainError::validation(
                "memory.max_turns must be at least 1 when memory is enabled",
            ));
        }
        if self.prompts.relevance.system.trim().is_empty() {
            return Err(DomainError::validation("prompts.relevance.system is empty"));
        }
        self.prompts.templates()?;
        Ok(())
    }
}

fn load_yaml_or_default<T>(path: &Path) -> Result<T, DomainError>
where
    T: for<'de> Deserialize<'de> + Default,
{
    if !path.exists() {
        tracing::info!(path = %path.display(), "config file not found, using defaults");
        return Ok(T::default());
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|e| DomainError::validation(format!("cannot read {}: {e}", path.display())))?;
    parse_yaml(&raw, &path.display().to_string())
}

fn parse_yaml<T>(raw: &str, source: &str) -> Result<T, DomainError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_yaml::from_str(raw)
        .map_err(|e| DomainError::validation(format!("invalid YAML in {source}: {e}")))
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub chunking: ChunkingConfig,
    pub rag: RagConfig,
    pub memory: MemoryConfig,
    pub cors: CorsConfig,
    pub policies: PoliciesConfig,
}

impl Config {
    fn apply_env_overrides(&mut self) -> Result<(), DomainError> {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse("SERVER_PORT")? {
            self.server.port = port;
        }
        if let Ok(model) = std::env::var("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(top_k) = env_parse("RAG_TOP_K")? {
            self.rag.top_k = top_k;
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, DomainError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| DomainError::validation(format!("{key} has an invalid value: {raw}"))),
        Err(_) => Ok(None),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Request body cap for multipart uploads.
    pub max_upload_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_mb: 50,
        }
    }
}

/// Hosted model provider. Credentials are read from the environment by the
/// provider client (see [`Provider::required_env`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Azure,
    #[serde(rename = "openai")]
    OpenAi,
}

impl Provider {
    /// Base variable names; the embedding role may override each with an
    /// `EMBEDDING_` prefixed variant.
    pub fn required_env(&self) -> &'static [&'static str] {
        match self {
            Self::Azure => &[AZURE_API_KEY, AZURE_ENDPOINT, AZURE_API_VERSION],
            Self::OpenAi => &[OPENAI_API_KEY],
        }
    }

    pub fn credentials(&self, role: ClientRole) -> Result<ProviderCredentials, DomainError> {
        self.credentials_from(role, |key| std::env::var(key).ok())
    }

    /// Resolves credentials through `lookup`, preferring the role's own
    /// variables and falling back to the shared ones.
    pub fn credentials_from<F>(&self, role: ClientRole, lookup: F) -> Result<ProviderCredentials, DomainError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let resolve = |key: &str| {
            role.prefix()
                .and_then(|prefix| lookup(&format!("{prefix}{key}")))
                .filter(|v| !v.trim().is_empty())
                .or_else(|| lookup(key).filter(|v| !v.trim().is_empty()))
        };

        let missing: Vec<&str> = self
            .required_env()
            .iter()
            .copied()
            .filter(|key| resolve(key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(DomainError::validation(format!(
                "missing {} credentials: {}",
                role.as_str(),
                missing.join(", ")
            )));
        }

        Ok(match self {
            Self::Azure => ProviderCredentials {
                api_key: resolve(AZURE_API_KEY).unwrap_or_default(),
                endpoint: resolve(AZURE_ENDPOINT),
                api_version: resolve(AZURE_API_VERSION),
            },
            Self::OpenAi => ProviderCredentials {
                api_key: resolve(OPENAI_API_KEY).unwrap_or_default(),
                endpoint: resolve(OPENAI_BASE_URL),
                api_version: None,
            },
        })
    }
}

const AZURE_API_KEY: &str = "AZURE_API_KEY";
const AZURE_ENDPOINT: &str = "AZURE_ENDPOINT";
const AZURE_API_VERSION: &str = "AZURE_API_VERSION";
const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
const OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";

/// Which model a provider client serves. Chat and embeddings may live on
/// different deployments with their own endpoint and key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientRole {
    Chat,
    Embedding,
}

impl ClientRole {
    fn prefix(&self) -> Option<&'static str> {
        match self {
            Self::Chat => None,
            Self::Embedding => Some("EMBEDDING_"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Embedding => "embedding",
        }
    }
}

/// Resolved connection settings for one provider client.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub api_key: String,
    /// Azure endpoint, or an OpenAI-compatible base URL.
    pub endpoint: Option<String>,
    pub api_version: Option<String>,
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("api_version", &self.api_version)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: Provider,
    /// Model name, or deployment name for Azure.
    pub model: String,
    pub temperature: f64,
    pub policy_max_tokens: u64,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Azure,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            policy_max_tokens: 800,
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: Provider,
    pub model: String,
    pub dimension: usize,
    pub batch_size: usize,
    /// Batch requests in flight at once.
    pub max_concurrency: usize,
    pub timeout_seconds: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Azure,
            model: "text-embedding-ada-002".to_string(),
            dimension: 1536,
            batch_size: 16,
            max_concurrency: 4,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl ChunkingConfig {
    pub fn params(&self) -> Result<ChunkingParams, DomainError> {
        ChunkingParams::new(self.chunk_size, self.overlap)
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 10_000,
            overlap: 1_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub top_k: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub enabled: bool,
    pub ttl_seconds: u64,
    pub max_turns: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_seconds: 1800,
            max_turns: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
        }
    }
}

/// Policy categories offered to clients. Selected policies are still passed
/// to the model verbatim.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoliciesConfig {
    pub catalog: Vec<String>,
}

impl Default for PoliciesConfig {
    fn default() -> Self {
        Self {
            catalog: [
                "Definitions & Concepts",
                "Policies & Compliance",
                "Data Access & Security",
                "Roles & Responsibilities",
                "Data Quality & Usage",
                "Classification & Tagging",
                "Security & Compliance",
                "Contextual Examples",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    pub relevance: RelevancePrompts,
    pub answer: AnswerPrompts,
    pub messages: MessagesConfig,
}

impl PromptsConfig {
    /// Compiles the three prompt templates; fails on syntax errors or unknown variables.
    pub fn templates(&self) -> Result<PromptTemplates, DomainError> {
        PromptTemplates::new(&self.relevance.user, &self.answer.retrieval, &self.answer.policy)
    }
}

/// Defines the in-domain boundary. Placeholders: `{{query}}` in `user`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelevancePrompts {
    pub system: String,
    pub user: String,
}

impl Default for RelevancePrompts {
    fn default() -> Self {
        Self {
            system: DEFAULT_RELEVANCE_SYSTEM.to_string(),
            user: "Question: {{query}}".to_string(),
        }
    }
}

/// Placeholders: `{{context}}`, `{{question}}` in `retrieval`; `{{policy}}`, `{{query}}` in `policy`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnswerPrompts {
    pub retrieval: String,
    pub policy: String,
}

impl Default for AnswerPrompts {
    fn default() -> Self {
        Self {
            retrieval: DEFAULT_RETRIEVAL_PROMPT.to_string(),
            policy: DEFAULT_POLICY_PROMPT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MessagesConfig {
    pub refusal: String,
    pub error_prefix: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            refusal: REFUSAL_MESSAGE.to_string(),
            error_prefix: ERROR_PREFIX.to_string(),
        }
    }
}

const DEFAULT_RELEVANCE_SYSTEM: &str = "\
You are a data governance expert. Your task is to determine whether the user's question is related to data governance or any of its supporting domains. Consider the question relevant if it pertains to any of the following areas:

Core Data Governance Areas:
- Data quality (accuracy, completeness, consistency, timeliness, validity)
- Data profiling, anomaly detection, outlier identification
- Data cleaning, data remediation, data standardization (including formulas or techniques)
- Metadata management, data lineage, data cataloging
- Access control, data classification, role-based permissions
- Policy enforcement, data stewardship, governance frameworks
- Compliance (GDPR, HIPAA, CCPA, etc.), auditability, regulatory reporting

Indirect or Technical Relevance:
- Statistical, analytical, or technical methods that contribute to maintaining data integrity, improving trustworthiness of data, or supporting governance processes or decision-making
- Questions involving data architecture, data modeling, or data integration that impact governance

Not Relevant:
- Questions purely about business strategy, software development, infrastructure, or unrelated technical domains unless they directly affect data governance.

Output format: Respond with only one word, either 'yes' or 'no'.
Do not explain your answer. Do not add anything else.";

const DEFAULT_RETRIEVAL_PROMPT: &str = "\
You are a helpful assistant. Use the following context to answer the question in detail. Be concise, accurate, and conversational.

<context>
{{context}}
</context>

Question: {{question}}

Assistant:";

const DEFAULT_POLICY_PROMPT: &str = "\
You are a helpful assistant. There are no context documents available.
You must GAUGE the user's query strictly against the provided POLICY and answer ONLY within the policy scope.

If fully in scope: answer concisely with bullet points or short steps.
If partially covered: answer what is covered and ask ONE clarifying question.
If not covered: say \"Not covered by policy\" and suggest the closest relevant angle. Do not invent policy content.

<policy>
{{policy}}
</policy>

Question: {{query}}

Answer format:
1) One-line \"Alignment\" statement (in/out/partial scope).
2) The answer (bullets or short steps). If partial, add ONE clarifying question.
3) End with: \"Policy alignment: <short reason>\"

Assistant:";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let app = AppConfig::default();
        app.validate().unwrap();

        assert_eq!(app.config.rag.top_k, 4);
        assert_eq!(app.config.chunking.chunk_size, 10_000);
        assert_eq!(app.config.chunking.overlap, 1_000);
        assert_eq!(app.config.policies.catalog.len(), 8);
        assert!(app.prompts.answer.retrieval.contains("{{context}}"));
        assert!(app.prompts.answer.policy.contains("{{policy}}"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = "rag:\n  top_k: 6\nllm:\n  provider: openai\n  model: gpt-4o\n";
        let app = AppConfig::from_yaml(config, "{}").unwrap();

        assert_eq!(app.config.rag.top_k, 6);
        assert_eq!(app.config.llm.provider, Provider::OpenAi);
        assert_eq!(app.config.llm.model, "gpt-4o");
        assert_eq!(app.config.llm.timeout_seconds, 60);
        assert_eq!(app.config.embedding.provider, Provider::Azure);
        assert!(!app.prompts.relevance.system.is_empty());
    }

    #[test]
    fn test_invalid_chunking_rejected() {
        let config = "chunking:\n  chunk_size: 100\n  overlap: 100\n";
        assert!(matches!(
            AppConfig::from_yaml(config, "{}"),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn test_zero_top_k_rejected() {
        assert!(AppConfig::from_yaml("rag:\n  top_k: 0\n", "{}").is_err());
    }

    #[test]
    fn test_embedding_concurrency() {
        assert_eq!(AppConfig::default().config.embedding.max_concurrency, 4);
        assert!(matches!(
            AppConfig::from_yaml("embedding:\n  max_concurrency: 0\n", "{}"),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn test_prompt_override() {
        let prompts = "relevance:\n  system: Only answer yes for questions about lineage.\n";
        let app = AppConfig::from_yaml("{}", prompts).unwrap();

        assert_eq!(
            app.prompts.relevance.system,
            "Only answer yes for questions about lineage."
        );
        assert_eq!(app.prompts.relevance.user, "Question: {{query}}");
    }

    #[test]
    fn test_bad_prompt_template_rejected_at_load() {
        let prompts = "answer:\n  retrieval: \"{{context}} {{documents}}\"\n";
        assert!(matches!(
            AppConfig::from_yaml("{}", prompts),
            Err(DomainError::Validation(_))
        ));

        let prompts = "relevance:\n  user: \"Question: {{query\"\n";
        assert!(AppConfig::from_yaml("{}", prompts).is_err());
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: std::collections::HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_embedding_credentials_override_chat() {
        let env = lookup(&[
            ("AZURE_API_KEY", "chat-key"),
            ("AZURE_ENDPOINT", "https://chat.openai.azure.com"),
            ("AZURE_API_VERSION", "2024-06-01"),
            ("EMBEDDING_AZURE_ENDPOINT", "https://embed.openai.azure.com"),
            ("EMBEDDING_AZURE_API_VERSION", "2023-05-15"),
        ]);

        let chat = Provider::Azure.credentials_from(ClientRole::Chat, &env).unwrap();
        let embedding = Provider::Azure.credentials_from(ClientRole::Embedding, &env).unwrap();

        assert_eq!(chat.endpoint.as_deref(), Some("https://chat.openai.azure.com"));
        assert_eq!(embedding.endpoint.as_deref(), Some("https://embed.openai.azure.com"));
        assert_eq!(embedding.api_version.as_deref(), Some("2023-05-15"));
        // Falls back to the shared key.
        assert_eq!(embedding.api_key, "chat-key");
    }

    #[test]
    fn test_missing_credentials_are_listed() {
        let env = lookup(&[("AZURE_API_KEY", "k"), ("AZURE_ENDPOINT", " ")]);
        let err = Provider::Azure
            .credentials_from(ClientRole::Embedding, &env)
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Validation error: missing embedding credentials: AZURE_ENDPOINT, AZURE_API_VERSION"
        );
        assert!(format!("{:?}", Provider::OpenAi.credentials_from(ClientRole::Chat, lookup(&[("OPENAI_API_KEY", "sk")])).unwrap())
            .contains("<redacted>"));
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(AppConfig::from_yaml("rag: [", "{}").is_err());
    }
}
