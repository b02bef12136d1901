use rig::providers::{azure, openai};

use crate::domain::DomainError;
use crate::infrastructure::config::{ClientRole, Provider, ProviderCredentials};

/// Provider SDK client, built once at startup and shared by every request.
pub enum ModelClient {
    Azure(azure::Client),
    OpenAi(openai::Client),
}

impl ModelClient {
    /// Builds the client for `role` from the environment, failing early with
    /// the names of any missing variables.
    pub fn from_env(provider: Provider, role: ClientRole) -> Result<Self, DomainError> {
        let credentials = provider.credentials(role)?;
        Self::from_credentials(provider, credentials)
    }

    pub fn from_credentials(
        provider: Provider,
        credentials: ProviderCredentials,
    ) -> Result<Self, DomainError> {
        let ProviderCredentials {
            api_key,
            endpoint,
            api_version,
        } = credentials;

        match provider {
            Provider::Azure => {
                let endpoint = endpoint
                    .ok_or_else(|| DomainError::validation("azure endpoint is not set"))?;
                let api_version = api_version
                    .ok_or_else(|| DomainError::validation("azure api version is not set"))?;

                let client: azure::Client = azure::Client::builder()
                    .api_key(azure::AzureOpenAIAuth::ApiKey(api_key))
                    .azure_endpoint(endpoint)
                    .api_version(&api_version)
                    .build()
                    .map_err(|e| DomainError::validation(format!("azure client: {e}")))?;
                Ok(Self::Azure(client))
            }
            Provider::OpenAi => {
                let mut builder = openai::Client::builder().api_key(&api_key);
                if let Some(base_url) = &endpoint {
                    builder = builder.base_url(base_url);
                }
                let client: openai::Client = builder
                    .build()
                    .map_err(|e| DomainError::validation(format!("openai client: {e}")))?;
                Ok(Self::OpenAi(client))
            }
        }
    }

    pub fn provider(&self) -> Provider {
        match self {
            Self::Azure(_) => Provider::Azure,
            Self::OpenAi(_) => Provider::OpenAi,
        }
    }
}
